// # Challenge Transport Trait
//
// Defines the interface to the ACME protocol client.
//
// The transport owns everything on the wire: directory discovery, JWS
// signing, orders, authorizations and finalization. dnscert configures it
// (key type, directory, allowed challenge types), registers itself as the
// DNS-01 solver and then asks it to obtain or renew a certificate. While an
// order is in flight the transport calls back into the registered
// `Dns01Provider` once per name that needs validation.
//
// ## Lifecycle
//
// ```rust,ignore
// let mut transport = factory.create(config)?;
// transport.remove_challenge(ChallengeType::Http01);
// transport.remove_challenge(ChallengeType::TlsAlpn01);
// transport.set_dns01_provider(coordinator.clone());
// let cert = transport.obtain(ObtainRequest { .. }).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::traits::store::{Account, CertificateResource};

/// Private key algorithm for the certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    /// RSA, 2048 bits
    Rsa2048,
    /// ECDSA on P-256
    Ec256,
}

impl KeyType {
    /// Pick the key type for a certificate request
    pub fn for_ecc(use_ecc: bool) -> Self {
        if use_ecc { KeyType::Ec256 } else { KeyType::Rsa2048 }
    }
}

/// ACME challenge types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeType {
    /// HTTP-01
    Http01,
    /// TLS-ALPN-01
    TlsAlpn01,
    /// DNS-01
    Dns01,
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChallengeType::Http01 => "http-01",
            ChallengeType::TlsAlpn01 => "tls-alpn-01",
            ChallengeType::Dns01 => "dns-01",
        };
        f.write_str(s)
    }
}

/// Settings a transport is created with
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// ACME directory URL
    pub directory_url: String,

    /// Certificate key type
    pub key_type: KeyType,

    /// Registered account used to sign requests
    pub account: Account,
}

/// Parameters of a new certificate order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObtainRequest {
    /// Names to include, in request order
    pub domains: Vec<String>,

    /// Return the full chain rather than the leaf only
    pub bundle: bool,

    /// Request the OCSP must-staple extension
    pub must_staple: bool,
}

/// DNS-01 solver contract the transport calls into
///
/// `present` publishes the validation record for `domain`; `clean_up` is
/// called once the authorization is done. Before asking the CA to validate,
/// the transport consults `pre_check` with the record name and value and
/// waits until it returns `true`.
#[async_trait]
pub trait Dns01Provider: Send + Sync {
    /// Publish the validation record for `domain`
    async fn present(&self, domain: &str, token: &str, key_auth: &str)
    -> Result<(), crate::Error>;

    /// Remove the validation record for `domain`
    async fn clean_up(&self, domain: &str, token: &str, key_auth: &str)
    -> Result<(), crate::Error>;

    /// Whether the record `fqdn` with `value` can be validated now
    async fn pre_check(&self, _fqdn: &str, _value: &str) -> Result<bool, crate::Error> {
        Ok(true)
    }
}

/// A configured ACME client
#[async_trait]
pub trait ChallengeTransport: Send + Sync {
    /// Never attempt the given challenge type
    fn remove_challenge(&mut self, challenge: ChallengeType);

    /// Register the DNS-01 solver
    fn set_dns01_provider(&mut self, provider: Arc<dyn Dns01Provider>);

    /// Order a new certificate
    ///
    /// # Returns
    ///
    /// - `Ok(CertificateResource)`: The issued certificate and its key
    /// - `Err(Error)`: Typically `Error::Protocol` when the CA refuses
    async fn obtain(&self, request: ObtainRequest) -> Result<CertificateResource, crate::Error>;

    /// Renew an existing certificate for the same names
    ///
    /// # Parameters
    ///
    /// - `existing`: The stored certificate
    /// - `force`: Renew even if the CA considers it too early
    /// - `must_staple`: Request the OCSP must-staple extension
    /// - `preferred_chain`: Issuer common name of the preferred alternate chain
    async fn renew(
        &self,
        existing: &CertificateResource,
        force: bool,
        must_staple: bool,
        preferred_chain: Option<&str>,
    ) -> Result<CertificateResource, crate::Error>;
}

/// Helper trait for constructing transports and registering accounts
#[async_trait]
pub trait ChallengeTransportFactory: Send + Sync {
    /// Create a transport bound to one account and directory
    fn create(&self, config: TransportConfig) -> Result<Box<dyn ChallengeTransport>, crate::Error>;

    /// Register a new account with the CA, accepting its terms of service
    async fn register_account(
        &self,
        directory_url: &str,
        email: &str,
    ) -> Result<Account, crate::Error>;
}
