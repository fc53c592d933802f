// # Memory Store
//
// In-memory implementation of AccountStore and CertificateStore.
//
// Nothing survives a restart: the next run registers a fresh account and
// treats every certificate as missing. Useful for tests and for embedding
// dnscert where the caller persists artifacts itself.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::store::{Account, AccountStore, CertificateResource, CertificateStore};

/// In-memory account and certificate store
///
/// Clones share the same maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    accounts: Arc<RwLock<HashMap<(String, String), Account>>>,
    certificates: Arc<RwLock<HashMap<String, CertificateResource>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored certificates
    pub async fn certificate_count(&self) -> usize {
        self.certificates.read().await.len()
    }

    /// Number of stored accounts
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Remove every account and certificate
    pub async fn clear(&self) {
        self.accounts.write().await.clear();
        self.certificates.write().await.clear();
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn load_account(&self, email: &str, host: &str) -> Result<Option<Account>, Error> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(&(email.to_string(), host.to_string()))
            .cloned())
    }

    async fn save_account(&self, email: &str, host: &str, account: &Account) -> Result<(), Error> {
        let mut accounts = self.accounts.write().await;
        accounts.insert((email.to_string(), host.to_string()), account.clone());
        Ok(())
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn get_certificate(&self, name: &str) -> Result<Option<CertificateResource>, Error> {
        let certificates = self.certificates.read().await;
        Ok(certificates.get(name).cloned())
    }

    async fn store_certificate(
        &self,
        name: &str,
        certificate: &CertificateResource,
    ) -> Result<(), Error> {
        let mut certificates = self.certificates.write().await;
        certificates.insert(name.to_string(), certificate.clone());
        Ok(())
    }
}
