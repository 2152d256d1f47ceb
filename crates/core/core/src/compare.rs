//! Timing-safe byte comparison.

use subtle::ConstantTimeEq;

/// Compares two byte strings in time independent of where they differ.
///
/// Differing lengths return `false` straight away. That is the only
/// data-dependent branch: digest lengths for a fixed algorithm are public.
/// Equal-length inputs are folded byte by byte through `subtle`, which
/// never exits on the first mismatch.
pub fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_inputs() {
        assert!(timing_safe_eq(b"abcdef", b"abcdef"));
        assert!(timing_safe_eq(b"", b""));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(!timing_safe_eq(b"abc", b"abcd"));
        assert!(!timing_safe_eq(b"", b"a"));
    }

    #[test]
    fn test_mismatch_at_every_position() {
        let reference = [0x5a_u8; 32];
        for position in 0..reference.len() {
            let mut candidate = reference;
            candidate[position] ^= 0x01;
            assert!(
                !timing_safe_eq(&reference, &candidate),
                "flip at byte {position} must be detected"
            );
        }
    }
}
