//! Plugin-based provider registry
//!
//! The registry maps provider type names to driver factories, so zones can
//! be described in configuration and wired to drivers at runtime without
//! hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnscert_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! registry.register_provider("hetzner", Box::new(HetznerFactory));
//!
//! let spec: DnsConfigSpec = serde_json::from_str(&text)?;
//! let dns = registry.build_dns_config(&spec)?;
//! ```
//!
//! ## Registration
//!
//! Driver crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("hetzner", Box::new(HetznerFactory));
//! }
//! ```

use crate::config::{DnsConfigSpec, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsServiceProvider, DnsServiceProviderFactory};
use crate::zone::{DnsConfig, ProviderInstance};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Provider registry for plugin-based driver creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered driver factories
    providers: RwLock<HashMap<String, Box<dyn DnsServiceProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "hetzner", "cloudflare")
    /// - `factory`: Factory object for creating driver instances
    pub fn register_provider(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DnsServiceProviderFactory>,
    ) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Create a driver from one provider definition
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn DnsServiceProvider>)`: Created driver
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn DnsServiceProvider>> {
        config.validate()?;
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let factory = providers.get(&config.provider_type).ok_or_else(|| {
            Error::config(format!("Unknown provider type: {}", config.provider_type))
        })?;

        factory.create(config)
    }

    /// Build the zone set described by `spec`
    ///
    /// One driver is created per provider definition and shared by every zone
    /// that references it.
    pub fn build_dns_config(&self, spec: &DnsConfigSpec) -> Result<DnsConfig> {
        let mut drivers: HashMap<&str, (&ProviderConfig, Arc<dyn DnsServiceProvider>)> =
            HashMap::new();
        for provider in &spec.providers {
            if drivers.contains_key(provider.name.as_str()) {
                return Err(Error::config(format!(
                    "Provider '{}' is defined more than once",
                    provider.name
                )));
            }
            let driver = self.create_provider(provider)?;
            debug!(provider = %provider.name, "Created {} driver", provider.provider_type);
            drivers.insert(provider.name.as_str(), (provider, driver));
        }

        let mut seen = HashSet::new();
        let mut domains = Vec::with_capacity(spec.domains.len());
        for zone in &spec.domains {
            let key = zone.domain.name.trim_end_matches('.').to_ascii_lowercase();
            if key.is_empty() {
                return Err(Error::config("Zone name cannot be empty"));
            }
            if !seen.insert(key) {
                return Err(Error::config(format!(
                    "Zone '{}' is defined more than once",
                    zone.domain.name
                )));
            }

            let mut domain = zone.domain.clone();
            domain.resolve_record_names();
            domain.providers.clear();
            for used in &zone.providers {
                let (config, driver) = drivers.get(used.name.as_str()).ok_or_else(|| {
                    Error::config(format!(
                        "Zone '{}' uses unknown provider '{}'",
                        zone.domain.name, used.name
                    ))
                })?;
                domain.providers.push(ProviderInstance {
                    name: config.name.clone(),
                    provider_type: config.provider_type.clone(),
                    nameserver_count: used.nameserver_count,
                    driver: Arc::clone(driver),
                });
            }
            domains.push(domain);
        }

        Ok(DnsConfig::new(domains))
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}
