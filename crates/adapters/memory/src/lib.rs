//! # Hookgate Memory Adapter
//!
//! An in-memory [`CredentialStore`] for Hookgate, intended for testing and
//! for deployments that load organization credentials from a config file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hookgate_adapter_memory::MemoryCredentialStore;
//!
//! let store = MemoryCredentialStore::new();
//! store
//!     .insert("org_123", ProviderId::StripeLike, ProviderCredentials::with_secret("whsec_..."))
//!     .await;
//! ```

use async_trait::async_trait;
use hookgate_core::error::GatewayResult;
use hookgate_core::traits::CredentialStore;
use hookgate_core::types::{ProviderCredentials, ProviderId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Credentials keyed by organization and provider.
type Store = Arc<RwLock<HashMap<(String, ProviderId), ProviderCredentials>>>;

/// In-memory credential store.
///
/// Cloning is cheap and clones share the same data. Lookups are counted so
/// tests can assert when the store was (or was not) consulted.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    credentials: Store,
    lookups: Arc<AtomicUsize>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores credentials for an organization and provider, replacing any
    /// previous record.
    pub async fn insert(
        &self,
        organization_id: impl Into<String>,
        provider: ProviderId,
        credentials: ProviderCredentials,
    ) {
        let mut store = self.credentials.write().await;
        store.insert((organization_id.into(), provider), credentials);
    }

    /// Removes the credentials for an organization and provider.
    pub async fn remove(
        &self,
        organization_id: &str,
        provider: ProviderId,
    ) -> Option<ProviderCredentials> {
        let mut store = self.credentials.write().await;
        store.remove(&(organization_id.to_string(), provider))
    }

    /// Clears all stored credentials.
    pub async fn clear(&self) {
        self.credentials.write().await.clear();
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.credentials.read().await.is_empty()
    }

    /// Returns how many lookups have been served.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn fetch(
        &self,
        organization_id: &str,
        provider: ProviderId,
    ) -> GatewayResult<Option<ProviderCredentials>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let store = self.credentials.read().await;
        Ok(store.get(&(organization_id.to_string(), provider)).cloned())
    }
}
