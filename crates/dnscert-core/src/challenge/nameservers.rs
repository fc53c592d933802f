//! Nameserver determination and NS record injection
//!
//! Before a zone is compared against live state, its delegation must be
//! part of the desired records; otherwise every provider reports the apex
//! NS records as pending deletions.

use tracing::{debug, warn};

use crate::error::Result;
use crate::zone::{DEFAULT_TTL, DomainConfig, Nameserver, RecordConfig, RecordType};

/// Metadata key overriding the TTL of injected NS records
pub const NS_TTL_METADATA: &str = "ns_ttl";

/// Effective nameserver set for a zone
///
/// Explicit nameservers come first, followed by each provider's
/// nameservers, limited by the provider's `nameserver_count`. A count of
/// zero skips the provider. Duplicates are dropped.
pub async fn determine_nameservers(domain: &DomainConfig) -> Result<Vec<Nameserver>> {
    let mut nameservers: Vec<Nameserver> = Vec::new();
    for ns in &domain.nameservers {
        push_unique(&mut nameservers, Nameserver::new(ns.name.clone()));
    }

    for provider in &domain.providers {
        if provider.nameserver_count == Some(0) {
            continue;
        }

        debug!(
            zone = %domain.name,
            provider = %provider.name,
            "Getting nameservers"
        );
        let mut found = provider.driver.get_nameservers(&domain.name).await?;
        if let Some(limit) = provider.nameserver_count {
            found.truncate(limit);
        }
        for ns in found {
            push_unique(&mut nameservers, Nameserver::new(ns.name));
        }
    }

    Ok(nameservers)
}

/// Add an apex NS record for every nameserver not already present
pub fn add_ns_records(domain: &mut DomainConfig) {
    let ttl = match domain.metadata.get(NS_TTL_METADATA) {
        Some(raw) => raw.parse::<u32>().unwrap_or_else(|_| {
            warn!(
                zone = %domain.name,
                "{} value '{}' is not a valid TTL, using {}",
                NS_TTL_METADATA,
                raw,
                DEFAULT_TTL
            );
            DEFAULT_TTL
        }),
        None => DEFAULT_TTL,
    };

    let missing: Vec<String> = domain
        .nameservers
        .iter()
        .map(|ns| format!("{}.", ns.name.trim_end_matches('.')))
        .filter(|target| {
            !domain
                .records_of_type(RecordType::Ns)
                .any(|r| r.name == "@" && r.target.eq_ignore_ascii_case(target))
        })
        .collect();

    for target in missing {
        let record = RecordConfig::new(RecordType::Ns, "@", &domain.name, target).with_ttl(ttl);
        domain.records.push(record);
    }
}

fn push_unique(list: &mut Vec<Nameserver>, ns: Nameserver) {
    if !list.iter().any(|n| n.name.eq_ignore_ascii_case(&ns.name)) {
        list.push(ns);
    }
}
