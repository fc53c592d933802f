// # Store Traits
//
// Defines the persistence interfaces for ACME accounts and issued
// certificates.
//
// ## Purpose
//
// - The account store keeps the registration and signing key of one ACME
//   account per (email, CA host), so a process reuses its account instead
//   of registering a new one on every run.
// - The certificate store keeps the last issued bundle per logical
//   certificate name. Renewal decisions are made from what it returns.
//
// ## Implementations
//
// - File-based: `FileStore` (directory layout compatible across runs)
// - In-memory: `MemoryStore` (tests, embedding)
//
// ## Usage
//
// ```rust,ignore
// use dnscert_core::CertificateStore;
//
// async fn show(store: &dyn CertificateStore) -> dnscert_core::Result<()> {
//     if let Some(cert) = store.get_certificate("web").await? {
//         println!("{} ({} bytes of PEM)", cert.domain, cert.certificate.len());
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ACME account
///
/// The registration resource is opaque to dnscert: it is produced by the
/// transport when the account is registered and handed back to it on every
/// order.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// Operator email
    pub email: String,

    /// Registration resource returned by the CA
    #[serde(default)]
    pub registration: Option<serde_json::Value>,

    /// PEM-encoded account private key
    #[serde(skip)]
    pub key_pem: String,
}

impl Account {
    /// Create an account record
    pub fn new(
        email: impl Into<String>,
        registration: Option<serde_json::Value>,
        key_pem: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            registration,
            key_pem: key_pem.into(),
        }
    }
}

// Custom Debug implementation that hides the account key
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("registration", &self.registration.is_some())
            .field("key_pem", &"<REDACTED>")
            .finish()
    }
}

/// An issued certificate bundle
///
/// The PEM material is kept out of the serialized metadata; stores persist
/// it separately.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResource {
    /// Primary name of the certificate
    pub domain: String,

    /// Certificate URL at the CA
    #[serde(default)]
    pub cert_url: String,

    /// Stable certificate URL at the CA
    #[serde(default)]
    pub cert_stable_url: String,

    /// PEM private key
    #[serde(skip)]
    pub private_key: Vec<u8>,

    /// PEM certificate chain, leaf first
    #[serde(skip)]
    pub certificate: Vec<u8>,

    /// PEM issuer chain
    #[serde(skip)]
    pub issuer_certificate: Vec<u8>,

    /// PEM certificate signing request
    #[serde(skip)]
    pub csr: Vec<u8>,
}

impl fmt::Debug for CertificateResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateResource")
            .field("domain", &self.domain)
            .field("cert_url", &self.cert_url)
            .field("cert_stable_url", &self.cert_stable_url)
            .field("certificate_len", &self.certificate.len())
            .field("private_key", &"<REDACTED>")
            .finish()
    }
}

/// Trait for account persistence
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load the account registered for `email` at `host`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Account))`: A stored account
    /// - `Ok(None)`: No account stored
    /// - `Err(Error)`: Storage error
    async fn load_account(&self, email: &str, host: &str) -> Result<Option<Account>, crate::Error>;

    /// Save the account registered for `email` at `host`
    async fn save_account(
        &self,
        email: &str,
        host: &str,
        account: &Account,
    ) -> Result<(), crate::Error>;
}

/// Trait for certificate persistence
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Get the stored certificate for a logical name
    ///
    /// # Returns
    ///
    /// - `Ok(Some(CertificateResource))`: The stored bundle
    /// - `Ok(None)`: Nothing stored under this name
    /// - `Err(Error)`: Storage error
    async fn get_certificate(&self, name: &str)
    -> Result<Option<CertificateResource>, crate::Error>;

    /// Store a certificate under a logical name, replacing any previous one
    async fn store_certificate(
        &self,
        name: &str,
        certificate: &CertificateResource,
    ) -> Result<(), crate::Error>;
}
