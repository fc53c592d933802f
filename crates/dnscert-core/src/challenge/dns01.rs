//! DNS-01 validation record derivation
//!
//! The record for a name is a TXT record at `_acme-challenge.<name>` whose
//! value is the base64url-encoded (unpadded) SHA-256 digest of the key
//! authorization.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// ACME challenge record label
pub const ACME_CHALLENGE_LABEL: &str = "_acme-challenge";

/// Strip a leading wildcard label
///
/// `*.example.com` is validated at `_acme-challenge.example.com`.
pub fn normalize_domain(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

/// Fully qualified challenge record name, with trailing dot
pub fn challenge_record_fqdn(domain: &str) -> String {
    let domain = normalize_domain(domain).trim_end_matches('.');
    format!("{}.{}.", ACME_CHALLENGE_LABEL, domain)
}

/// DNS-01 TXT value for a key authorization
pub fn challenge_value(key_auth: &str) -> String {
    let digest = Sha256::digest(key_auth.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Record name and value to publish for `domain`
pub fn challenge_record(domain: &str, key_auth: &str) -> (String, String) {
    (challenge_record_fqdn(domain), challenge_value(key_auth))
}
