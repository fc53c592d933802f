//! Configuration types for dnscert
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::challenge::ReadinessPolicy;
use crate::zone::DomainConfig;

/// Let's Encrypt production directory
pub const LETS_ENCRYPT_LIVE: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// Let's Encrypt staging directory
pub const LETS_ENCRYPT_STAGE: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Maximum number of names on a single certificate
pub const MAX_NAMES_PER_CERT: usize = 100;

/// Main certificate manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertManagerConfig {
    /// Operator email used for the ACME account
    pub email: String,

    /// ACME server: "live", "staging" or a directory URL
    #[serde(default = "default_acme_server")]
    pub acme_server: String,

    /// Where accounts and certificates are kept
    #[serde(default)]
    pub storage: StorageConfig,

    /// Renew certificates with fewer days of validity left than this
    #[serde(default = "default_renew_under_days")]
    pub renew_under_days: u32,

    /// Provider instances that must not receive challenge records
    #[serde(default)]
    pub ignored_providers: BTreeSet<String>,

    /// When the CA may start validating a published record
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Only process these certificate names (empty means all)
    #[serde(default)]
    pub only: Vec<String>,

    /// Certificates to manage
    #[serde(default)]
    pub certificates: Vec<CertConfig>,
}

impl CertManagerConfig {
    /// Create a configuration with defaults for the given operator email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            acme_server: default_acme_server(),
            storage: StorageConfig::default(),
            renew_under_days: default_renew_under_days(),
            ignored_providers: BTreeSet::new(),
            readiness: ReadinessConfig::default(),
            only: Vec::new(),
            certificates: Vec::new(),
        }
    }

    /// Resolve the ACME server alias to a directory URL
    pub fn directory_url(&self) -> &str {
        match self.acme_server.as_str() {
            "live" => LETS_ENCRYPT_LIVE,
            "staging" => LETS_ENCRYPT_STAGE,
            other => other,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.email.trim().is_empty() {
            return Err(crate::Error::config("ACME account email cannot be empty"));
        }

        directory_host(self.directory_url())?;
        validate_certificate_list(&self.certificates)?;

        for name in &self.only {
            if !self.certificates.iter().any(|c| &c.cert_name == name) {
                return Err(crate::Error::config(format!(
                    "Certificate '{}' selected but not configured",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Certificates selected for this run, in configuration order
    pub fn selected_certificates(&self) -> impl Iterator<Item = &CertConfig> {
        self.certificates
            .iter()
            .filter(|c| self.only.is_empty() || self.only.contains(&c.cert_name))
    }

    /// Ignored providers as a lookup set
    pub fn ignored_provider_set(&self) -> HashSet<String> {
        self.ignored_providers.iter().cloned().collect()
    }
}

/// Parse an ACME directory URL and return its host
///
/// The host keys account storage, so a URL without one is rejected.
pub fn directory_host(directory: &str) -> Result<String, crate::Error> {
    url::Url::parse(directory)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            crate::Error::config(format!("ACME directory '{}' is not a valid URL", directory))
        })
}

/// A certificate to issue and keep renewed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertConfig {
    /// Logical name, used as the storage key
    pub cert_name: String,

    /// DNS names on the certificate
    pub names: Vec<String>,

    /// Use an ECDSA key instead of RSA
    #[serde(default)]
    pub use_ecc: bool,

    /// Request the OCSP must-staple extension
    #[serde(default)]
    pub must_staple: bool,
}

impl CertConfig {
    /// Create a certificate request
    pub fn new<I, S>(cert_name: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cert_name: cert_name.into(),
            names: names.into_iter().map(Into::into).collect(),
            use_ecc: false,
            must_staple: false,
        }
    }

    /// Use an ECDSA key
    pub fn with_ecc(mut self, use_ecc: bool) -> Self {
        self.use_ecc = use_ecc;
        self
    }

    /// Request must-staple
    pub fn with_must_staple(mut self, must_staple: bool) -> Self {
        self.must_staple = must_staple;
        self
    }

    /// Validate a single certificate entry
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_path_component(&self.cert_name)
            .map_err(|e| crate::Error::config(format!("Invalid cert_name: {}", e)))?;

        if self.names.is_empty() {
            return Err(crate::Error::config(format!(
                "Certificate '{}' has no names",
                self.cert_name
            )));
        }
        if self.names.len() > MAX_NAMES_PER_CERT {
            return Err(crate::Error::config(format!(
                "Certificate '{}' has {} names (max {})",
                self.cert_name,
                self.names.len(),
                MAX_NAMES_PER_CERT
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.names {
            if name.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "Certificate '{}' contains an empty name",
                    self.cert_name
                )));
            }
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(crate::Error::config(format!(
                    "Certificate '{}' lists {} more than once",
                    self.cert_name, name
                )));
            }
        }

        Ok(())
    }
}

fn validate_certificate_list(certs: &[CertConfig]) -> Result<(), crate::Error> {
    let mut seen = HashSet::new();
    for cert in certs {
        cert.validate()?;
        if !seen.insert(cert.cert_name.as_str()) {
            return Err(crate::Error::config(format!(
                "Certificate name '{}' is used more than once",
                cert.cert_name
            )));
        }
    }
    Ok(())
}

/// Check that `name` is usable as a single file name
pub(crate) fn validate_path_component(name: &str) -> Result<(), crate::Error> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(crate::Error::invalid_input(format!(
            "'{}' is not a usable name",
            name
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(crate::Error::invalid_input(format!(
            "'{}' must not contain path separators",
            name
        )));
    }
    Ok(())
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Directory-based store
    File {
        /// Root directory
        path: PathBuf,
    },

    /// In-memory store (not persistent)
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            path: PathBuf::from("."),
        }
    }
}

/// Readiness policy configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadinessConfig {
    /// Let the CA validate as soon as the record is published
    #[default]
    Immediate,

    /// Wait once per manager before the first validation
    DelayOnce {
        /// Seconds to wait
        secs: u64,
    },
}

impl ReadinessConfig {
    /// Build the runtime policy
    pub fn to_policy(&self) -> ReadinessPolicy {
        match self {
            ReadinessConfig::Immediate => ReadinessPolicy::Immediate,
            ReadinessConfig::DelayOnce { secs } => {
                ReadinessPolicy::DelayOnce(Duration::from_secs(*secs))
            }
        }
    }
}

/// One named DNS provider definition
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Instance name referenced by zones
    pub name: String,

    /// Provider type registered in the `ProviderRegistry`
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Provider-specific settings (credentials, endpoints)
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl ProviderConfig {
    /// Validate the provider definition
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::config("Provider name cannot be empty"));
        }
        if self.provider_type.is_empty() {
            return Err(crate::Error::config(format!(
                "Provider '{}' has no type",
                self.name
            )));
        }
        Ok(())
    }
}

// Settings usually hold credentials; only their keys are printed
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.settings.keys().collect();
        keys.sort();
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("settings", &keys)
            .finish()
    }
}

/// Serializable description of every zone and the providers serving them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsConfigSpec {
    /// Provider definitions
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Zones
    #[serde(default)]
    pub domains: Vec<ZoneSpec>,
}

/// A zone and the providers it uses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSpec {
    /// Desired zone configuration
    #[serde(flatten)]
    pub domain: DomainConfig,

    /// Providers serving this zone, by instance name
    #[serde(default)]
    pub providers: Vec<ProviderUse>,
}

/// Reference from a zone to a provider instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUse {
    /// Provider instance name
    pub name: String,

    /// How many of its nameservers to use (all when absent)
    #[serde(default)]
    pub nameserver_count: Option<usize>,
}

fn default_acme_server() -> String {
    "live".to_string()
}

fn default_renew_under_days() -> u32 {
    15
}
