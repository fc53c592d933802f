//! Minimal embedding example for dnscert-core
//!
//! Wires the certificate manager to in-process stand-ins for every external
//! collaborator: a provider whose live zone is a map, a diff engine over that
//! map and an ACME "CA" that validates through the registered DNS-01 solver
//! and signs nothing but self-signed certificates.
//!
//! Run twice in one process: the first batch issues, the second finds the
//! stored certificate fresh and does nothing.

use anyhow::Context;
use async_trait::async_trait;
use dnscert_core::config::ProviderConfig;
use dnscert_core::traits::{
    Account, CertificateResource, ChallengeTransport, ChallengeTransportFactory, ChallengeType,
    Correction, DnsServiceProviderFactory, Dns01Provider, Notifier, ObtainRequest,
    TransportConfig, ZoneCorrections,
};
use dnscert_core::zone::{DomainConfig, Nameserver, ProviderInstance};
use dnscert_core::{
    CertManager, CertManagerConfig, Collaborators, DnsConfigSpec, DnsServiceProvider, Error,
    ProviderRegistry, ReconciliationEngine,
};
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

type Zone = BTreeSet<(String, String, String)>;

/// Provider driver for the in-process DNS service
struct EmbeddedProvider;

#[async_trait]
impl DnsServiceProvider for EmbeddedProvider {
    async fn get_nameservers(&self, _zone: &str) -> dnscert_core::Result<Vec<Nameserver>> {
        Ok(Vec::new())
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

struct EmbeddedProviderFactory;

impl DnsServiceProviderFactory for EmbeddedProviderFactory {
    fn create(&self, _config: &ProviderConfig) -> dnscert_core::Result<Arc<dyn DnsServiceProvider>> {
        Ok(Arc::new(EmbeddedProvider))
    }
}

/// Diff engine over an in-memory live zone
#[derive(Default)]
struct MapEngine {
    live: Arc<Mutex<HashMap<String, Zone>>>,
}

#[async_trait]
impl ReconciliationEngine for MapEngine {
    async fn reconcile(
        &self,
        _provider: &ProviderInstance,
        desired: &DomainConfig,
    ) -> dnscert_core::Result<ZoneCorrections> {
        let want: Zone = desired
            .records
            .iter()
            .map(|r| (r.record_type.to_string(), r.name_fqdn.clone(), r.target.clone()))
            .collect();
        let have = {
            let live = self.live.lock().map_err(|_| Error::Other("zone map poisoned".into()))?;
            live.get(&desired.name).cloned().unwrap_or_default()
        };

        let mut corrections = Vec::new();
        for (record, add) in have
            .difference(&want)
            .map(|r| (r.clone(), false))
            .chain(want.difference(&have).map(|r| (r.clone(), true)))
        {
            let verb = if add { "CREATE" } else { "DELETE" };
            let msg = format!("{} {} {} {}", verb, record.0, record.1, record.2);
            let live = Arc::clone(&self.live);
            let zone = desired.name.clone();
            corrections.push(Correction::new(msg, move || {
                let live = Arc::clone(&live);
                let zone = zone.clone();
                let record = record.clone();
                async move {
                    let mut live = live
                        .lock()
                        .map_err(|_| Error::Other("zone map poisoned".into()))?;
                    let entry = live.entry(zone).or_default();
                    if add {
                        entry.insert(record);
                    } else {
                        entry.remove(&record);
                    }
                    Ok(())
                }
            }));
        }

        Ok(ZoneCorrections {
            reports: Vec::new(),
            change_count: corrections.len(),
            corrections,
        })
    }
}

/// ACME stand-in that validates through DNS-01 and self-signs
struct SelfSignedCa;

struct SelfSignedTransport {
    dns01: Option<Arc<dyn Dns01Provider>>,
}

#[async_trait]
impl ChallengeTransportFactory for SelfSignedCa {
    fn create(&self, config: TransportConfig) -> dnscert_core::Result<Box<dyn ChallengeTransport>> {
        info!("Transport for {} ({:?})", config.directory_url, config.key_type);
        Ok(Box::new(SelfSignedTransport { dns01: None }))
    }

    async fn register_account(&self, _directory_url: &str, email: &str) -> dnscert_core::Result<Account> {
        let key = rcgen::KeyPair::generate().map_err(|e| Error::protocol(e.to_string()))?;
        Ok(Account::new(email, None, key.serialize_pem()))
    }
}

impl SelfSignedTransport {
    async fn sign(&self, domains: &[String]) -> dnscert_core::Result<CertificateResource> {
        let solver = self
            .dns01
            .as_ref()
            .ok_or_else(|| Error::protocol("no DNS-01 solver registered"))?;
        for domain in domains {
            let key_auth = format!("demo-token.{}", domain);
            solver.present(domain, "demo-token", &key_auth).await?;
            solver.pre_check(domain, &key_auth).await?;
            solver.clean_up(domain, "demo-token", &key_auth).await?;
        }

        let mut params = rcgen::CertificateParams::new(domains.to_vec())
            .map_err(|e| Error::protocol(e.to_string()))?;
        params.not_after = (SystemTime::now() + Duration::from_secs(90 * 86_400)).into();
        let key = rcgen::KeyPair::generate().map_err(|e| Error::protocol(e.to_string()))?;
        let cert = params
            .self_signed(&key)
            .map_err(|e| Error::protocol(e.to_string()))?;

        Ok(CertificateResource {
            domain: domains.first().cloned().unwrap_or_default(),
            certificate: cert.pem().into_bytes(),
            private_key: key.serialize_pem().into_bytes(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ChallengeTransport for SelfSignedTransport {
    fn remove_challenge(&mut self, challenge: ChallengeType) {
        info!("Disabled {}", challenge);
    }

    fn set_dns01_provider(&mut self, provider: Arc<dyn Dns01Provider>) {
        self.dns01 = Some(provider);
    }

    async fn obtain(&self, request: ObtainRequest) -> dnscert_core::Result<CertificateResource> {
        self.sign(&request.domains).await
    }

    async fn renew(
        &self,
        existing: &CertificateResource,
        _force: bool,
        _must_staple: bool,
        _preferred_chain: Option<&str>,
    ) -> dnscert_core::Result<CertificateResource> {
        let names = dnscert_core::issuance::parse_certificate(&existing.certificate)?.names;
        self.sign(&names).await
    }
}

/// Notifier that writes to the log
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        domain: &str,
        provider: &str,
        msg: &str,
        err: Option<&Error>,
        _preview: bool,
    ) -> dnscert_core::Result<()> {
        match err {
            Some(e) => info!("[{}:{}] {} failed: {}", provider, domain, msg, e),
            None => info!("[{}:{}] {}", provider, domain, msg),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = match env::var("DNSCERT_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting tracing subscriber")?;

    let registry = ProviderRegistry::new();
    registry.register_provider("embedded", Box::new(EmbeddedProviderFactory));

    let spec: DnsConfigSpec = serde_json::from_value(serde_json::json!({
        "providers": [ { "name": "local", "type": "embedded" } ],
        "domains": [
            {
                "name": "example.test",
                "records": [ { "type": "A", "name": "www", "target": "192.0.2.10" } ],
                "providers": [ { "name": "local" } ]
            }
        ]
    }))?;
    let dns = Arc::new(registry.build_dns_config(&spec)?);

    let config: CertManagerConfig = serde_json::from_value(serde_json::json!({
        "email": "ops@example.test",
        "acme_server": "https://ca.example.test/directory",
        "storage": { "type": "memory" },
        "renew_under_days": 30,
        "certificates": [
            { "cert_name": "web", "names": ["example.test", "www.example.test"] }
        ]
    }))?;

    // Bring the live zone in line with the desired records first
    let engine = Arc::new(MapEngine::default());
    for zone in &dns.domains {
        for provider in &zone.providers {
            for correction in engine.reconcile(provider, zone).await?.corrections {
                correction.execute().await?;
            }
        }
    }

    let stores = config.storage.open();
    let manager = CertManager::new(
        &config,
        Arc::clone(&dns),
        Collaborators {
            account_store: stores.accounts,
            cert_store: stores.certificates,
            transport: Arc::new(SelfSignedCa),
            engine,
            notifier: Arc::new(LogNotifier),
        },
    )
    .await?;

    for round in 1..=2 {
        let summary = manager.issue_all(&config).await?;
        println!(
            "Round {}: issued {:?}, unchanged {:?}, failed {}",
            round,
            summary.issued,
            summary.unchanged,
            summary.failed.len()
        );
    }

    Ok(())
}
