//! Client address extraction for Axum handlers.

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// Where the client address is read from.
///
/// Insert it as a request extension. When absent, only the socket peer
/// address is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientIpSource {
    /// The TCP peer address from `ConnectInfo`.
    #[default]
    ConnectInfo,
    /// The first `X-Forwarded-For` entry, falling back to the peer address.
    /// Only safe behind a proxy that overwrites the header.
    XForwardedFor,
}

/// Extractor for the client IP address.
///
/// Never rejects. `None` means the address is unknown, which the rate
/// limiter keys as `unknown`.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ClientIp(ip): ClientIp) -> String {
///     format!("{ip:?}")
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.extensions, &parts.headers)))
    }
}

/// Resolves the client address from request extensions and headers.
pub fn client_ip(extensions: &Extensions, headers: &HeaderMap) -> Option<IpAddr> {
    let source = extensions.get::<ClientIpSource>().copied().unwrap_or_default();

    if source == ClientIpSource::XForwardedFor {
        if let Some(ip) = forwarded_for(headers) {
            return Some(ip);
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 443))));
        extensions
    }

    fn forwarded() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers
    }

    #[test]
    fn test_peer_address_by_default() {
        assert_eq!(client_ip(&peer(), &forwarded()), Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_for_when_trusted() {
        let mut extensions = peer();
        extensions.insert(ClientIpSource::XForwardedFor);
        assert_eq!(client_ip(&extensions, &forwarded()), Some("203.0.113.7".parse().unwrap()));

        // Garbage falls back to the peer
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        assert_eq!(client_ip(&extensions, &headers), Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_unknown_address() {
        assert_eq!(client_ip(&Extensions::new(), &HeaderMap::new()), None);
    }
}
