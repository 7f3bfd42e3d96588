//! Identifier generation for settlements.
//!
//! Two identifier families: the UETR (Unique End-to-end Transaction
//! Reference, a UUID v4 string) used as the settlement's primary reference,
//! and a human-traceable end-to-end id combining a prefix, a UTC timestamp
//! and random hex. Both are stateless; collisions are negligible.

use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

/// Default prefix for end-to-end ids.
pub const E2E_PREFIX: &str = "E2E";

/// Generates a UETR as a canonical UUID v4 string.
pub fn new_transaction_reference() -> String {
    Uuid::new_v4().to_string()
}

/// Generates an end-to-end id: `{prefix}{YYYYMMDDHHMMSS}{8 hex chars}`.
///
/// The 4 random bytes keep ids generated within the same second distinct.
pub fn new_end_to_end_id(prefix: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}{}", prefix, timestamp, hex::encode_upper(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_transaction_reference_is_canonical_uuid() {
        let reference = new_transaction_reference();
        assert_eq!(reference.len(), 36);
        assert!(Uuid::parse_str(&reference).is_ok());
    }

    #[test]
    fn test_transaction_references_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(new_transaction_reference()));
        }
    }

    #[test]
    fn test_end_to_end_id_format() {
        let id = new_end_to_end_id(E2E_PREFIX);
        assert!(id.starts_with("E2E"));
        // prefix (3) + timestamp (14) + hex (8)
        assert_eq!(id.len(), 25);
        let hex_part = &id[17..];
        assert!(hex_part
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_end_to_end_ids_distinct_within_same_second() {
        let mut seen = HashSet::new();
        // All of these run well inside one second; the random suffix must
        // keep them apart.
        for _ in 0..1_000 {
            assert!(seen.insert(new_end_to_end_id("PAY")));
        }
    }
}
