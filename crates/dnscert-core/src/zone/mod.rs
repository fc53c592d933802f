//! Desired-state DNS model
//!
//! These are the zone configurations the reconciliation engine compares
//! against live provider state. The challenge coordinator snapshots them,
//! stages validation records on private copies and restores the originals.
//!
//! `DomainConfig` implements `Clone` as a total deep copy of the desired
//! records: records, nameservers and metadata are owned values. Provider
//! drivers are shared handles (`Arc`), not configuration, and are shared
//! between a zone and its copies.

use crate::error::{Error, Result};
use crate::traits::DnsServiceProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// TTL applied to records that do not specify one
pub const DEFAULT_TTL: u32 = 300;

/// The full set of zones known to this process
#[derive(Debug, Clone, Default)]
pub struct DnsConfig {
    /// Configured zones
    pub domains: Vec<DomainConfig>,
}

impl DnsConfig {
    /// Create a configuration from a list of zones
    pub fn new(domains: Vec<DomainConfig>) -> Self {
        Self { domains }
    }

    /// Find the zone that owns `fqdn`
    ///
    /// The longest configured zone name that equals `fqdn` or is a parent of
    /// it wins, so `a.sub.example.com` resolves to `sub.example.com` when both
    /// `example.com` and `sub.example.com` are configured. A trailing dot and a
    /// leading wildcard label are ignored.
    pub fn domain_containing_fqdn(&self, fqdn: &str) -> Option<&DomainConfig> {
        let fqdn = normalize_name(fqdn);
        self.domains
            .iter()
            .filter(|d| {
                let zone = normalize_name(&d.name);
                fqdn == zone || fqdn.ends_with(&format!(".{}", zone))
            })
            .max_by_key(|d| d.name.len())
    }

    /// Look up a zone by exact name
    pub fn domain(&self, name: &str) -> Option<&DomainConfig> {
        let name = normalize_name(name);
        self.domains.iter().find(|d| normalize_name(&d.name) == name)
    }
}

/// Desired configuration of a single zone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Zone name (e.g., "example.com")
    pub name: String,

    /// Desired records
    #[serde(default)]
    pub records: Vec<RecordConfig>,

    /// Explicitly configured nameservers
    #[serde(default)]
    pub nameservers: Vec<Nameserver>,

    /// Free-form zone metadata (e.g., `ns_ttl`)
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// DNS providers serving this zone
    #[serde(skip)]
    pub providers: Vec<ProviderInstance>,
}

impl DomainConfig {
    /// Create an empty zone
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a desired record
    pub fn with_record(mut self, record: RecordConfig) -> Self {
        self.records.push(record);
        self
    }

    /// Attach a DNS provider
    pub fn with_provider(mut self, provider: ProviderInstance) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add an explicit nameserver
    pub fn with_nameserver(mut self, name: impl Into<String>) -> Self {
        self.nameservers.push(Nameserver::new(name));
        self
    }

    /// Fill in `name_fqdn` for records that were loaded without one
    pub fn resolve_record_names(&mut self) {
        for record in &mut self.records {
            if record.name_fqdn.is_empty() {
                record.name_fqdn = label_to_fqdn(&record.name, &self.name);
            }
        }
    }

    /// Records of the given type
    pub fn records_of_type(&self, record_type: RecordType) -> impl Iterator<Item = &RecordConfig> {
        self.records
            .iter()
            .filter(move |r| r.record_type == record_type)
    }
}

/// A nameserver hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nameserver {
    /// Hostname, without trailing dot
    pub name: String,
}

impl Nameserver {
    /// Create a nameserver entry, stripping any trailing dot
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: name.trim_end_matches('.').to_string(),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Mail exchanger
    Mx,
    /// Nameserver delegation
    Ns,
    /// Text record
    Txt,
    /// Certification authority authorization
    Caa,
    /// Service locator
    Srv,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Caa => "CAA",
            RecordType::Srv => "SRV",
        };
        f.write_str(s)
    }
}

/// A single desired DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Label relative to the zone; `@` is the apex
    pub name: String,

    /// Fully qualified name, without trailing dot
    #[serde(default)]
    pub name_fqdn: String,

    /// Record data
    pub target: String,

    /// Time-to-live
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Identifier assigned by the provider for records read from live state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl RecordConfig {
    /// Create a record from a zone-relative label
    pub fn new(
        record_type: RecordType,
        label: impl Into<String>,
        zone: &str,
        target: impl Into<String>,
    ) -> Self {
        let label = label.into();
        let name_fqdn = label_to_fqdn(&label, zone);
        Self {
            record_type,
            name: label,
            name_fqdn,
            target: target.into(),
            ttl: DEFAULT_TTL,
            metadata: HashMap::new(),
            provider_id: None,
        }
    }

    /// Create a TXT record from a fully-qualified name
    pub fn txt_from_fqdn(fqdn: &str, zone: &str, value: impl Into<String>) -> Result<Self> {
        let mut record = Self::new(RecordType::Txt, "@", zone, value);
        record.set_label_from_fqdn(fqdn, zone)?;
        Ok(record)
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the label from a fully-qualified name inside `origin`
    ///
    /// Fails if `fqdn` is not `origin` itself or a name below it.
    pub fn set_label_from_fqdn(&mut self, fqdn: &str, origin: &str) -> Result<()> {
        let fqdn = fqdn.trim_end_matches('.').to_ascii_lowercase();
        let origin = origin.trim_end_matches('.').to_ascii_lowercase();

        let label = if fqdn == origin {
            "@".to_string()
        } else if let Some(prefix) = fqdn.strip_suffix(&format!(".{}", origin)) {
            prefix.to_string()
        } else {
            return Err(Error::invalid_input(format!(
                "{} is not a name inside zone {}",
                fqdn, origin
            )));
        };

        self.name = label;
        self.name_fqdn = fqdn;
        Ok(())
    }
}

/// A DNS provider attached to a zone
#[derive(Clone)]
pub struct ProviderInstance {
    /// Instance name, used by the ignore list and in correction messages
    pub name: String,

    /// Provider type (e.g., "hetzner", "cloudflare")
    pub provider_type: String,

    /// How many of the provider's nameservers to use; `None` means all
    pub nameserver_count: Option<usize>,

    /// Provider driver
    pub driver: Arc<dyn DnsServiceProvider>,
}

impl ProviderInstance {
    /// Create an instance that contributes all of its nameservers
    pub fn new(name: impl Into<String>, driver: Arc<dyn DnsServiceProvider>) -> Self {
        Self {
            name: name.into(),
            provider_type: driver.provider_name().to_string(),
            nameserver_count: None,
            driver,
        }
    }

    /// Limit how many nameservers this provider contributes
    pub fn with_nameserver_count(mut self, count: usize) -> Self {
        self.nameserver_count = Some(count);
        self
    }
}

impl fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("nameserver_count", &self.nameserver_count)
            .finish()
    }
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn label_to_fqdn(label: &str, zone: &str) -> String {
    let zone = zone.trim_end_matches('.');
    if label == "@" || label.is_empty() {
        zone.to_string()
    } else {
        format!("{}.{}", label, zone)
    }
}

fn normalize_name(name: &str) -> String {
    let name = name.trim_end_matches('.');
    name.strip_prefix("*.").unwrap_or(name).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DnsConfig {
        DnsConfig::new(vec![
            DomainConfig::new("example.com"),
            DomainConfig::new("sub.example.com"),
            DomainConfig::new("other.org"),
        ])
    }

    #[test]
    fn longest_zone_suffix_wins() {
        let cfg = config();
        assert_eq!(
            cfg.domain_containing_fqdn("a.sub.example.com").map(|d| d.name.as_str()),
            Some("sub.example.com")
        );
        assert_eq!(
            cfg.domain_containing_fqdn("www.example.com.").map(|d| d.name.as_str()),
            Some("example.com")
        );
        assert_eq!(
            cfg.domain_containing_fqdn("*.other.org").map(|d| d.name.as_str()),
            Some("other.org")
        );
    }

    #[test]
    fn suffix_match_respects_label_boundaries() {
        let cfg = config();
        assert!(cfg.domain_containing_fqdn("notexample.com").is_none());
    }

    #[test]
    fn label_from_fqdn() {
        let mut rec = RecordConfig::new(RecordType::Txt, "@", "example.com", "v");
        rec.set_label_from_fqdn("_acme-challenge.www.example.com.", "example.com")
            .unwrap();
        assert_eq!(rec.name, "_acme-challenge.www");
        assert_eq!(rec.name_fqdn, "_acme-challenge.www.example.com");

        rec.set_label_from_fqdn("example.com", "example.com").unwrap();
        assert_eq!(rec.name, "@");

        assert!(rec.set_label_from_fqdn("www.other.org", "example.com").is_err());
    }

    #[test]
    fn clone_is_independent_of_original() {
        let original = DomainConfig::new("example.com").with_record(RecordConfig::new(
            RecordType::A,
            "www",
            "example.com",
            "192.0.2.1",
        ));
        let mut copy = original.clone();
        copy.records.push(RecordConfig::new(RecordType::Txt, "x", "example.com", "y"));
        copy.records[0].target = "192.0.2.2".to_string();

        assert_eq!(original.records.len(), 1);
        assert_eq!(original.records[0].target, "192.0.2.1");
    }

    #[test]
    fn record_type_serializes_uppercase() {
        let rec = RecordConfig::new(RecordType::Aaaa, "www", "example.com", "2001:db8::1");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "AAAA");
        assert!(json.get("provider_id").is_none());
    }
}
