//! Core traits for dnscert
//!
//! This module defines the abstract interfaces to every external collaborator.
//!
//! - [`DnsServiceProvider`]: Provider driver (identity, nameservers)
//! - [`ReconciliationEngine`]: Desired-state diff engine producing [`Correction`]s
//! - [`ChallengeTransport`]: ACME client driving orders and calling [`Dns01Provider`]
//! - [`AccountStore`] / [`CertificateStore`]: Persistence
//! - [`Notifier`]: Change notifications

pub mod dns_provider;
pub mod notifier;
pub mod reconciler;
pub mod store;
pub mod transport;

pub use dns_provider::{DnsServiceProvider, DnsServiceProviderFactory};
pub use notifier::{NoopNotifier, Notifier};
pub use reconciler::{Correction, CorrectionAction, ReconciliationEngine, ZoneCorrections};
pub use store::{Account, AccountStore, CertificateResource, CertificateStore};
pub use transport::{
    ChallengeTransport, ChallengeTransportFactory, ChallengeType, Dns01Provider, KeyType,
    ObtainRequest, TransportConfig,
};
