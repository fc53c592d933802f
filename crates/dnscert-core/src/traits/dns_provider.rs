// # DNS Service Provider Trait
//
// Defines the interface dnscert needs from a DNS provider driver.
//
// Provider drivers are owned by the reconciliation layer: listing zone
// records, diffing and applying corrections all happen behind the
// `ReconciliationEngine`. The challenge coordinator only needs the driver
// for two things:
//
// - Identifying it (ignore list, correction messages)
// - Asking it which nameservers serve a zone, so delegation NS records are
//   part of the desired state before anything is compared
//
// ## Usage
//
// ```rust,ignore
// use dnscert_core::DnsServiceProvider;
//
// async fn show(driver: &dyn DnsServiceProvider) -> dnscert_core::Result<()> {
//     for ns in driver.get_nameservers("example.com").await? {
//         println!("{}", ns.name);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::zone::Nameserver;

/// Trait for DNS provider drivers
///
/// # Thread Safety
///
/// Implementations must be thread-safe. The same driver instance is shared
/// by every zone it serves and by concurrent challenge flows.
#[async_trait]
pub trait DnsServiceProvider: Send + Sync {
    /// Get the nameservers this provider assigns to a zone
    ///
    /// # Parameters
    ///
    /// - `zone`: The zone name (e.g., "example.com")
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Nameserver>)`: Nameservers, in provider order
    /// - `Err(Error)`: If the provider could not be queried
    async fn get_nameservers(&self, zone: &str) -> Result<Vec<Nameserver>, crate::Error>;

    /// Get the provider type name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "cloudflare", "hetzner")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing provider drivers from configuration
pub trait DnsServiceProviderFactory: Send + Sync {
    /// Create a driver instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration of one named provider
    ///
    /// # Returns
    ///
    /// A shared driver handle
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Arc<dyn DnsServiceProvider>, crate::Error>;
}
