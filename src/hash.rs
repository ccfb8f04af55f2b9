use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

/// Joins the hashed fields. Changing this (or the field order) would
/// re-key every stored transaction, so it is fixed forever.
const DELIMITER: &str = "|";

/// Dedup key for one transaction: digest of the ordered economic fields.
/// Two rows with the same account, date, amounts and description collapse
/// to one stored row no matter which upload they arrived in.
pub fn content_hash(
    account_id: i64,
    date: &str,
    withdrawal: f64,
    deposit: f64,
    description: &str,
) -> String {
    let material = [
        account_id.to_string(),
        date.to_string(),
        format!("{withdrawal:.2}"),
        format!("{deposit:.2}"),
        description.to_string(),
    ]
    .join(DELIMITER);
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of the raw uploaded bytes. Used only for batch-level
/// duplicate-file detection, never for transaction dedup.
pub fn file_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn file_hash_of(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    Ok(file_hash(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = content_hash(1, "2026-01-02", 0.0, 500.0, "STRIPE PAYOUT");
        let b = content_hash(1, "2026-01-02", 0.0, 500.0, "STRIPE PAYOUT");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_varies_by_field() {
        let base = content_hash(1, "2026-01-02", 0.0, 500.0, "STRIPE PAYOUT");
        assert_ne!(base, content_hash(2, "2026-01-02", 0.0, 500.0, "STRIPE PAYOUT"));
        assert_ne!(base, content_hash(1, "2026-01-03", 0.0, 500.0, "STRIPE PAYOUT"));
        assert_ne!(base, content_hash(1, "2026-01-02", 500.0, 0.0, "STRIPE PAYOUT"));
        assert_ne!(base, content_hash(1, "2026-01-02", 0.0, 500.01, "STRIPE PAYOUT"));
        assert_ne!(base, content_hash(1, "2026-01-02", 0.0, 500.0, "stripe payout"));
    }

    #[test]
    fn test_amounts_hash_as_two_decimal_strings() {
        // 500 and 500.00 are the same economic amount.
        assert_eq!(
            content_hash(1, "2026-01-02", 0.0, 500.0, "X"),
            content_hash(1, "2026-01-02", 0.0, 500.004, "X"),
        );
    }

    #[test]
    fn test_file_hash_tracks_bytes_only() {
        assert_eq!(file_hash(b"abc"), file_hash(b"abc"));
        assert_ne!(file_hash(b"abc"), file_hash(b"abd"));
    }
}
