//! Stored certificate inspection

use chrono::{DateTime, Utc};
use x509_parser::extensions::GeneralName;
use x509_parser::parse_x509_certificate;
use x509_parser::pem::parse_x509_pem;

use crate::error::{Error, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// What the renewal decision needs to know about a certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// DNS names from the subject alternative name extension
    pub names: Vec<String>,

    /// End of the validity period
    pub not_after: DateTime<Utc>,
}

impl CertInfo {
    /// Remaining validity in fractional days; negative once expired
    pub fn days_remaining(&self, now: DateTime<Utc>) -> f64 {
        (self.not_after - now).num_seconds() as f64 / SECONDS_PER_DAY
    }
}

/// Parse the leaf of a PEM certificate chain
pub fn parse_certificate(pem_chain: &[u8]) -> Result<CertInfo> {
    let (_, pem) = parse_x509_pem(pem_chain)
        .map_err(|e| Error::parse(format!("Failed to parse PEM: {}", e)))?;

    let (_, cert) = parse_x509_certificate(&pem.contents)
        .map_err(|e| Error::parse(format!("Failed to parse certificate: {}", e)))?;

    let timestamp = cert.validity().not_after.timestamp();
    let not_after = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| Error::parse("Invalid expiry timestamp"))?;

    let san = cert
        .subject_alternative_name()
        .map_err(|e| Error::parse(format!("Invalid subjectAltName: {}", e)))?;

    let names = san
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(CertInfo { names, not_after })
}

/// Whether two name lists hold the same names, ignoring order and case
///
/// Lists of different length never match, so a duplicated name is a change.
pub fn dns_names_equal(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut a: Vec<String> = a.iter().map(|n| n.to_ascii_lowercase()).collect();
    let mut b: Vec<String> = b.iter().map(|n| n.to_ascii_lowercase()).collect();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn name_sets_ignore_order() {
        assert!(dns_names_equal(
            &names(&["a.example", "b.example"]),
            &names(&["b.example", "a.example"])
        ));
        assert!(dns_names_equal(&names(&[]), &names(&[])));
        assert!(!dns_names_equal(
            &names(&["a.example"]),
            &names(&["a.example", "b.example"])
        ));
        assert!(!dns_names_equal(
            &names(&["a.example", "a.example"]),
            &names(&["a.example", "b.example"])
        ));
    }

    #[test]
    fn days_remaining_is_fractional() {
        let now = Utc::now();
        let info = CertInfo {
            names: Vec::new(),
            not_after: now + Duration::hours(30 * 24 - 2),
        };
        let days = info.days_remaining(now);
        assert!(days < 30.0);
        assert!(days > 29.9);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_certificate(b"not a certificate"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn reads_sans_and_expiry() {
        let mut params =
            rcgen::CertificateParams::new(vec!["a.example".to_string(), "b.example".to_string()])
                .unwrap();
        let expires = std::time::SystemTime::now() + std::time::Duration::from_secs(10 * 86_400);
        params.not_after = expires.into();
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();

        let info = parse_certificate(cert.pem().as_bytes()).unwrap();
        assert_eq!(info.names, names(&["a.example", "b.example"]));
        let days = info.days_remaining(Utc::now());
        assert!(days > 9.9 && days <= 10.0);
    }
}
