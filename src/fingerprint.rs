//! Cache key derivation
//!
//! A [`Fingerprint`] identifies one (user, domain, payload content, pipeline
//! version) combination. The payload digest is computed over the canonical
//! JSON of each record, sorted, so re-fetched records with equal field values
//! hash identically regardless of order.

use crate::error::Result;
use crate::types::{Domain, DomainRecord, UserId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    user_id: UserId,
    domain: Domain,
    digest: String,
}

impl Fingerprint {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Flat key form (`<user>:<domain>:<digest>`)
    pub fn key(&self) -> String {
        format!("{}{}", Self::domain_prefix(&self.user_id, self.domain), self.digest)
    }

    /// Key prefix shared by every entry of a user
    pub fn user_prefix(user_id: &UserId) -> String {
        format!("{}:", escape_segment(user_id.as_str()))
    }

    /// Key prefix shared by every entry of a user in one domain
    pub fn domain_prefix(user_id: &UserId, domain: Domain) -> String {
        format!("{}{}:", Self::user_prefix(user_id), domain.as_str())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Derive the cache key for a request
pub fn fingerprint(
    user_id: &UserId,
    domain: Domain,
    payload: &[DomainRecord],
    pipeline_version: &str,
) -> Result<Fingerprint> {
    let mut canonical = payload
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    canonical.sort_unstable();

    let mut hasher = Sha256::new();
    write_field(&mut hasher, pipeline_version.as_bytes());
    write_field(&mut hasher, user_id.as_str().as_bytes());
    write_field(&mut hasher, domain.as_str().as_bytes());
    hasher.update((canonical.len() as u64).to_le_bytes());
    for record in &canonical {
        write_field(&mut hasher, record.as_bytes());
    }

    Ok(Fingerprint {
        user_id: user_id.clone(),
        domain,
        digest: format!("{:x}", hasher.finalize()),
    })
}

/// Length-prefixed write so field boundaries cannot collide
fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}
