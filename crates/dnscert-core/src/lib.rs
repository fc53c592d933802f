// # dnscert-core
//
// Core library for ACME DNS-01 certificate issuance over a declarative DNS
// reconciliation engine.
//
// ## Architecture Overview
//
// - **CertManager**: Decides per certificate between no-op, renewal and a
//   new order, drives the ACME transport and persists the result
// - **ChallengeCoordinator**: DNS-01 solver; stages validation records on
//   private copies of zone configurations and restores the originals
// - **ReconciliationEngine**: Trait for the desired-state diff engine that
//   turns a zone configuration into provider corrections
// - **ChallengeTransport**: Trait for the ACME protocol client
// - **AccountStore / CertificateStore**: Persistence traits, with file and
//   in-memory implementations
// - **ProviderRegistry**: Plugin-based registry for DNS provider drivers
//
// ## Design Principles
//
// 1. **Snapshot, never mutate**: Caller zone configurations are read-only;
//    challenge records only ever exist in working copies
// 2. **Refuse on drift**: A zone with pending corrections is never touched
// 3. **Clean up exactly once**: Every zone touched in a round is restored
//    once, whatever the outcome of the order
// 4. **Library-first**: Protocol, provider APIs and diffing are plugged in
//    through traits

pub mod challenge;
pub mod config;
pub mod error;
pub mod issuance;
pub mod registry;
pub mod store;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use challenge::{ChallengeCoordinator, CoordinatorConfig, ReadinessPolicy, ZoneStage};
pub use config::{CertConfig, CertManagerConfig, DnsConfigSpec, ProviderConfig, StorageConfig};
pub use error::{Error, Result};
pub use issuance::{BatchSummary, CertManager, Collaborators, RenewalAction};
pub use registry::ProviderRegistry;
pub use store::{FileStore, MemoryStore};
pub use traits::{
    AccountStore, CertificateStore, ChallengeTransport, ChallengeTransportFactory,
    DnsServiceProvider, Notifier, ReconciliationEngine,
};
pub use zone::{DnsConfig, DomainConfig, RecordConfig, RecordType};
