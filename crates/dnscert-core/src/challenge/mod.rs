//! DNS-01 challenge coordination
//!
//! The [`ChallengeCoordinator`] is the DNS-01 solver handed to the ACME
//! transport. For every name the transport needs validated it:
//!
//! 1. Finds the configured zone owning the challenge record
//! 2. On first use in a round, snapshots the zone, injects its NS records and
//!    refuses to continue if the zone already has pending corrections
//! 3. Appends the TXT record to a private working copy and reconciles it
//!
//! Removal is deferred: the transport's `clean_up` is a no-op and
//! [`ChallengeCoordinator::final_clean_up`] reconciles every touched zone
//! back to its original desired state once the order is finished.
//!
//! ## Concurrency
//!
//! Zone slots are created under one lock on the working set. Each zone then
//! has its own async mutex, held from preparation through reconciliation,
//! so concurrent presents on one zone share a single working copy while
//! different zones proceed in parallel.

pub mod dns01;
pub mod nameservers;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::traits::{Correction, Dns01Provider, Notifier, ReconciliationEngine};
use crate::zone::{DEFAULT_TTL, DnsConfig, DomainConfig, RecordConfig};

/// Provider name used in notifications for certificate-driven changes
pub const NOTIFY_PROVIDER: &str = "certs";

/// When the transport may ask the CA to validate a published record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessPolicy {
    /// Validate as soon as the record is published
    #[default]
    Immediate,

    /// Sleep once, before the first validation of the coordinator's lifetime
    DelayOnce(Duration),
}

/// Coordinator settings
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Provider instance names that are never reconciled
    pub ignored_providers: HashSet<String>,

    /// Readiness policy consulted by `pre_check`
    pub readiness: ReadinessPolicy,
}

/// Lifecycle stage of one zone within an issuance round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStage {
    /// No challenge has touched the zone
    Unseen,
    /// Snapshot taken and verified free of drift
    Prepared,
    /// At least one challenge record published
    Published,
    /// Restored to its original desired state
    Cleaned,
}

struct StagedZone {
    original: DomainConfig,
    working: DomainConfig,
}

struct ZoneSlot {
    stage: ZoneStage,
    staged: Option<StagedZone>,
}

#[derive(Default)]
struct WorkingSet {
    zones: HashMap<String, Arc<Mutex<ZoneSlot>>>,
    originals: Vec<String>,
}

/// DNS-01 solver backed by the reconciliation engine
pub struct ChallengeCoordinator {
    dns: Arc<DnsConfig>,
    engine: Arc<dyn ReconciliationEngine>,
    notifier: Arc<dyn Notifier>,
    config: CoordinatorConfig,
    working_set: Mutex<WorkingSet>,
    waited_once: OnceCell<()>,
}

impl ChallengeCoordinator {
    /// Create a coordinator over the given zones
    pub fn new(
        dns: Arc<DnsConfig>,
        engine: Arc<dyn ReconciliationEngine>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            dns,
            engine,
            notifier,
            config,
            working_set: Mutex::new(WorkingSet::default()),
            waited_once: OnceCell::new(),
        }
    }

    /// Current stage of a zone
    pub async fn zone_stage(&self, zone: &str) -> ZoneStage {
        let slot = {
            let set = self.working_set.lock().await;
            set.zones.get(&zone_key(zone)).cloned()
        };
        match slot {
            Some(slot) => slot.lock().await.stage,
            None => ZoneStage::Unseen,
        }
    }

    /// Copy of a zone's working configuration, if it is staged
    pub async fn working_copy(&self, zone: &str) -> Option<DomainConfig> {
        let slot = {
            let set = self.working_set.lock().await;
            set.zones.get(&zone_key(zone)).cloned()
        }?;
        let slot = slot.lock().await;
        slot.staged.as_ref().map(|s| s.working.clone())
    }

    /// Zones awaiting final cleanup, in the order they were prepared
    pub async fn pending_cleanup(&self) -> Vec<String> {
        self.working_set.lock().await.originals.clone()
    }

    /// Restore every zone touched in this round
    ///
    /// Each recorded zone is reconciled back to its original configuration
    /// independently of the others. Failures are logged per zone and the last
    /// one is returned. The working set is drained, so calling this again
    /// without new presents does nothing.
    pub async fn final_clean_up(&self) -> Result<()> {
        let pending: Vec<(String, Arc<Mutex<ZoneSlot>>)> = {
            let mut set = self.working_set.lock().await;
            let names = std::mem::take(&mut set.originals);
            names
                .into_iter()
                .filter_map(|name| set.zones.get(&name).map(|s| (name, Arc::clone(s))))
                .collect()
        };

        let mut last_err = None;
        for (name, slot) in pending {
            let mut slot = slot.lock().await;
            let Some(staged) = slot.staged.take() else {
                continue;
            };
            slot.stage = ZoneStage::Cleaned;

            info!(zone = %name, "Restoring zone");
            if let Err(e) = self.run_corrections(&staged.original).await {
                error!(zone = %name, "Cleanup failed: {}", e);
                last_err = Some(e);
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn slot(&self, zone: &str) -> Arc<Mutex<ZoneSlot>> {
        let mut set = self.working_set.lock().await;
        Arc::clone(set.zones.entry(zone_key(zone)).or_insert_with(|| {
            Arc::new(Mutex::new(ZoneSlot {
                stage: ZoneStage::Unseen,
                staged: None,
            }))
        }))
    }

    /// Snapshot a zone with its delegation and verify it has no drift
    async fn prepare_zone(&self, zone: &DomainConfig) -> Result<DomainConfig> {
        let mut snapshot = zone.clone();
        snapshot.nameservers = nameservers::determine_nameservers(&snapshot).await?;
        nameservers::add_ns_records(&mut snapshot);
        self.ensure_no_pending_corrections(&snapshot).await?;
        Ok(snapshot)
    }

    async fn ensure_no_pending_corrections(&self, zone: &DomainConfig) -> Result<()> {
        let corrections = self.collect_corrections(zone).await?;
        if corrections.is_empty() {
            return Ok(());
        }

        for correction in &corrections {
            info!(zone = %zone.name, "Pending: {}", correction.msg);
        }
        Err(Error::pending_drift(&zone.name, corrections.len()))
    }

    /// Reconcile `zone` against every provider that is not ignored
    async fn collect_corrections(&self, zone: &DomainConfig) -> Result<Vec<Correction>> {
        let mut collected = Vec::new();
        for provider in &zone.providers {
            if self.config.ignored_providers.contains(&provider.name) {
                debug!(zone = %zone.name, provider = %provider.name, "Skipping ignored provider");
                continue;
            }

            let result = self.engine.reconcile(provider, zone).await?;
            for report in &result.reports {
                info!("INFO[{}] {}", provider.name, report.msg);
            }
            for mut correction in result.corrections {
                if correction.is_report() {
                    info!("INFO[{}] {}", provider.name, correction.msg);
                    continue;
                }
                correction.msg = format!("[{}] {}", provider.name, correction.msg);
                collected.push(correction);
            }
        }
        Ok(collected)
    }

    /// Reconcile `zone` and execute the corrections in order
    ///
    /// Every executed correction is reported to the notifier. The first
    /// failing correction or notification stops the run.
    async fn run_corrections(&self, zone: &DomainConfig) -> Result<()> {
        let corrections = self.collect_corrections(zone).await?;
        for correction in corrections {
            info!(zone = %zone.name, "Running correction: {}", correction.msg);
            let outcome = correction.execute().await;
            let notified = self
                .notifier
                .notify(
                    &zone.name,
                    NOTIFY_PROVIDER,
                    &correction.msg,
                    outcome.as_ref().err(),
                    false,
                )
                .await;

            outcome.map_err(|e| Error::reconciliation(&zone.name, e.to_string()))?;
            notified?;
        }
        Ok(())
    }
}

#[async_trait]
impl Dns01Provider for ChallengeCoordinator {
    async fn present(&self, domain: &str, _token: &str, key_auth: &str) -> Result<()> {
        let (fqdn, value) = dns01::challenge_record(domain, key_auth);
        let zone = self
            .dns
            .domain_containing_fqdn(&fqdn)
            .ok_or_else(|| Error::not_found(format!("no configured zone contains {}", fqdn)))?;

        let slot = self.slot(&zone.name).await;
        let mut slot = slot.lock().await;

        let mut staged = match slot.staged.take() {
            Some(staged) => staged,
            None => {
                debug!(zone = %zone.name, "Preparing zone");
                let original = self.prepare_zone(zone).await?;
                self.working_set
                    .lock()
                    .await
                    .originals
                    .push(zone_key(&zone.name));
                slot.stage = ZoneStage::Prepared;
                StagedZone {
                    working: original.clone(),
                    original,
                }
            }
        };

        let record = match RecordConfig::txt_from_fqdn(&fqdn, &staged.working.name, value) {
            Ok(record) => record.with_ttl(DEFAULT_TTL),
            Err(e) => {
                slot.staged = Some(staged);
                return Err(e);
            }
        };
        info!(zone = %zone.name, record = %fqdn, "Publishing challenge record");
        staged.working.records.push(record);

        let outcome = self.run_corrections(&staged.working).await;
        slot.staged = Some(staged);
        outcome?;

        slot.stage = ZoneStage::Published;
        Ok(())
    }

    async fn clean_up(&self, _domain: &str, _token: &str, _key_auth: &str) -> Result<()> {
        // Deferred to final_clean_up
        Ok(())
    }

    async fn pre_check(&self, fqdn: &str, _value: &str) -> Result<bool> {
        if let ReadinessPolicy::DelayOnce(delay) = self.config.readiness {
            self.waited_once
                .get_or_init(|| async move {
                    info!(record = %fqdn, "Waiting {:?} for DNS propagation", delay);
                    tokio::time::sleep(delay).await;
                })
                .await;
        }
        Ok(true)
    }
}

fn zone_key(zone: &str) -> String {
    zone.trim_end_matches('.').to_ascii_lowercase()
}
