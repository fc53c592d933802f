//! Certificate issuance and renewal
//!
//! [`CertManager`] decides, per certificate, whether to do nothing, renew or
//! issue a new certificate, drives the ACME transport with the challenge
//! coordinator as its DNS-01 solver and persists the result.
//!
//! ## Flow
//!
//! ```text
//! issue_or_renew(cert)
//!   ├─ certificate store lookup ─ parse leaf ─ plan_action
//!   ├─ Skip  → Ok(false), no transport contact
//!   ├─ Obtain / Renew → transport → present() per name → artifact
//!   ├─ store artifact (failure → degraded)
//!   └─ final_clean_up() (always)
//! ```

pub mod certinfo;

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::challenge::{ChallengeCoordinator, CoordinatorConfig, NOTIFY_PROVIDER};
use crate::config::{CertConfig, CertManagerConfig, directory_host};
use crate::error::{Error, Result};
use crate::traits::{
    Account, AccountStore, CertificateStore, ChallengeTransport, ChallengeTransportFactory,
    ChallengeType, Dns01Provider, KeyType, Notifier, ObtainRequest, ReconciliationEngine,
    TransportConfig,
};
use crate::zone::DnsConfig;

pub use certinfo::{CertInfo, dns_names_equal, parse_certificate};

/// Why a new certificate is ordered instead of renewing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObtainReason {
    /// Nothing is stored under the certificate name
    NoExisting,
    /// The stored certificate covers a different set of names
    NamesChanged,
}

/// What to do for one certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalAction {
    /// Valid long enough and covering the requested names
    Skip,
    /// Order a new certificate
    Obtain(ObtainReason),
    /// Renew the stored certificate
    Renew,
}

impl fmt::Display for RenewalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewalAction::Skip => f.write_str("nothing to do"),
            RenewalAction::Obtain(ObtainReason::NoExisting) => {
                f.write_str("no existing certificate, issuing a new one")
            }
            RenewalAction::Obtain(ObtainReason::NamesChanged) => {
                f.write_str("name list changed, issuing a new certificate")
            }
            RenewalAction::Renew => f.write_str("renewing certificate"),
        }
    }
}

/// Decide the action for a certificate request
///
/// A changed name list always leads to a new order, regardless of the
/// remaining validity.
pub fn plan_action(
    requested: &[String],
    existing: Option<&CertInfo>,
    renew_under_days: u32,
    now: DateTime<Utc>,
) -> RenewalAction {
    let Some(existing) = existing else {
        return RenewalAction::Obtain(ObtainReason::NoExisting);
    };

    let names_ok = dns_names_equal(requested, &existing.names);
    if !names_ok {
        return RenewalAction::Obtain(ObtainReason::NamesChanged);
    }
    if existing.days_remaining(now) >= f64::from(renew_under_days) {
        return RenewalAction::Skip;
    }
    RenewalAction::Renew
}

/// External collaborators of a [`CertManager`]
#[derive(Clone)]
pub struct Collaborators {
    /// ACME account persistence
    pub account_store: Arc<dyn AccountStore>,

    /// Certificate persistence
    pub cert_store: Arc<dyn CertificateStore>,

    /// ACME client factory
    pub transport: Arc<dyn ChallengeTransportFactory>,

    /// Desired-state DNS engine
    pub engine: Arc<dyn ReconciliationEngine>,

    /// Change notifications
    pub notifier: Arc<dyn Notifier>,
}

/// Result of a batch run over several certificates
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Certificates obtained or renewed, including degraded ones
    pub issued: Vec<String>,

    /// Certificates left untouched
    pub unchanged: Vec<String>,

    /// Certificates whose run returned an error
    pub failed: Vec<(String, Error)>,
}

impl BatchSummary {
    /// Whether every certificate was processed without error
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Issues and renews certificates for one ACME account
pub struct CertManager {
    directory_url: String,
    account: Account,
    cert_store: Arc<dyn CertificateStore>,
    transport: Arc<dyn ChallengeTransportFactory>,
    notifier: Arc<dyn Notifier>,
    coordinator: Arc<ChallengeCoordinator>,
    round: Mutex<()>,
}

impl CertManager {
    /// Create a manager, loading or registering the ACME account
    ///
    /// # Errors
    ///
    /// - `Error::Config`: invalid configuration or directory URL; nothing
    ///   has been contacted yet
    /// - `Error::Store`: the account could not be loaded or saved
    /// - Any error from account registration
    pub async fn new(
        config: &CertManagerConfig,
        dns: Arc<DnsConfig>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        config.validate()?;

        let directory_url = config.directory_url().to_string();
        let host = directory_host(&directory_url)?;

        let account = match collaborators
            .account_store
            .load_account(&config.email, &host)
            .await?
        {
            Some(account) => {
                debug!(email = %config.email, host = %host, "Loaded ACME account");
                account
            }
            None => {
                info!(email = %config.email, host = %host, "Registering ACME account");
                let account = collaborators
                    .transport
                    .register_account(&directory_url, &config.email)
                    .await?;
                collaborators
                    .account_store
                    .save_account(&config.email, &host, &account)
                    .await?;
                account
            }
        };

        let coordinator = Arc::new(ChallengeCoordinator::new(
            dns,
            collaborators.engine,
            Arc::clone(&collaborators.notifier),
            CoordinatorConfig {
                ignored_providers: config.ignored_provider_set(),
                readiness: config.readiness.to_policy(),
            },
        ));

        Ok(Self {
            directory_url,
            account,
            cert_store: collaborators.cert_store,
            transport: collaborators.transport,
            notifier: collaborators.notifier,
            coordinator,
            round: Mutex::new(()),
        })
    }

    /// The account used for every order
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The DNS-01 solver shared by all rounds
    pub fn coordinator(&self) -> &Arc<ChallengeCoordinator> {
        &self.coordinator
    }

    /// Issue or renew one certificate
    ///
    /// Returns whether a new certificate was obtained. Calls on one manager
    /// are serialized; each is one issuance round whose touched zones are
    /// restored before returning.
    ///
    /// # Errors
    ///
    /// An error with [`Error::certificate_changed`] set means the
    /// certificate was obtained but storing it or restoring the zones
    /// failed.
    pub async fn issue_or_renew(&self, cert: &CertConfig, renew_under_days: u32) -> Result<bool> {
        let _round = self.round.lock().await;
        info!(cert = %cert.cert_name, "Checking certificate");

        let outcome = self.run_round(cert, renew_under_days).await;
        let cleanup = self.coordinator.final_clean_up().await;

        match (outcome, cleanup) {
            (Ok(changed), Ok(())) => Ok(changed),
            (Ok(true), Err(e)) => {
                warn!(cert = %cert.cert_name, "Certificate issued but zone cleanup failed");
                Err(Error::degraded(e))
            }
            (Ok(false), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                debug!(cert = %cert.cert_name, "Ignoring cleanup error after failed issuance: {}", cleanup);
                Err(e)
            }
        }
    }

    /// Process every selected certificate of `config` in order
    ///
    /// Each certificate that changed or failed is reported to the notifier.
    /// A failure does not stop the batch.
    pub async fn issue_all(&self, config: &CertManagerConfig) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for cert in config.selected_certificates() {
            let result = self.issue_or_renew(cert, config.renew_under_days).await;

            let (changed, err) = match result {
                Ok(changed) => (changed, None),
                Err(e) => (e.certificate_changed(), Some(e)),
            };

            if changed || err.is_some() {
                let msg = if changed {
                    "Issued new certificate"
                } else {
                    "Certificate issuance failed"
                };
                if let Err(e) = self
                    .notifier
                    .notify(&cert.cert_name, NOTIFY_PROVIDER, msg, err.as_ref(), false)
                    .await
                {
                    warn!(cert = %cert.cert_name, "Notification failed: {}", e);
                }
            }

            if changed {
                summary.issued.push(cert.cert_name.clone());
            } else if err.is_none() {
                summary.unchanged.push(cert.cert_name.clone());
            }
            if let Some(e) = err {
                warn!(cert = %cert.cert_name, "Certificate run failed: {}", e);
                summary.failed.push((cert.cert_name.clone(), e));
            }
        }

        self.notifier.done().await;

        info!(
            issued = summary.issued.len(),
            unchanged = summary.unchanged.len(),
            failed = summary.failed.len(),
            "Certificate run finished"
        );
        Ok(summary)
    }

    async fn run_round(&self, cert: &CertConfig, renew_under_days: u32) -> Result<bool> {
        cert.validate()?;

        let existing = self.cert_store.get_certificate(&cert.cert_name).await?;
        let info = existing
            .as_ref()
            .map(|e| parse_certificate(&e.certificate))
            .transpose()?;

        let now = Utc::now();
        if let Some(info) = &info {
            info!(
                cert = %cert.cert_name,
                "Found existing certificate, {:.2} days remaining",
                info.days_remaining(now)
            );
        }

        let action = plan_action(&cert.names, info.as_ref(), renew_under_days, now);
        info!(cert = %cert.cert_name, "Decision: {}", action);

        let issued = match (action, existing) {
            (RenewalAction::Skip, _) => return Ok(false),
            (RenewalAction::Renew, Some(existing)) => {
                let transport = self.transport_for(cert)?;
                transport
                    .renew(&existing, true, cert.must_staple, None)
                    .await?
            }
            (RenewalAction::Obtain(_), _) | (RenewalAction::Renew, None) => {
                let transport = self.transport_for(cert)?;
                transport
                    .obtain(ObtainRequest {
                        domains: cert.names.clone(),
                        bundle: true,
                        must_staple: cert.must_staple,
                    })
                    .await?
            }
        };

        info!(cert = %cert.cert_name, "Obtained certificate");

        if let Err(e) = self
            .cert_store
            .store_certificate(&cert.cert_name, &issued)
            .await
        {
            warn!(cert = %cert.cert_name, "Failed to store certificate: {}", e);
            return Err(Error::degraded(e));
        }

        Ok(true)
    }

    fn transport_for(&self, cert: &CertConfig) -> Result<Box<dyn ChallengeTransport>> {
        let mut transport = self.transport.create(TransportConfig {
            directory_url: self.directory_url.clone(),
            key_type: KeyType::for_ecc(cert.use_ecc),
            account: self.account.clone(),
        })?;

        transport.remove_challenge(ChallengeType::Http01);
        transport.remove_challenge(ChallengeType::TlsAlpn01);
        let solver: Arc<dyn Dns01Provider> = self.coordinator.clone();
        transport.set_dns01_provider(solver);

        Ok(transport)
    }
}
