//! Ordering of anchored operations for replay.

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

/// An operation with the transaction number assigned to it when it was anchored.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Externally assigned sequence number. Used only for ordering.
    pub transaction_number: u64,
    /// The operation.
    pub operation: Operation,
}

/// Sort records by ascending transaction number. Records sharing a number are ordered by
/// operation hash, then by their position in the input. Duplicates are kept.
#[must_use]
pub fn order(records: &[TransactionRecord]) -> Vec<TransactionRecord> {
    let mut ordered = records.to_vec();
    // an operation's hash is infallible in practice; an empty key only affects tie-breaking
    ordered.sort_by_cached_key(|r| (r.transaction_number, r.operation.hash().unwrap_or_default()));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(transaction_number: u64, payload: &str) -> TransactionRecord {
        TransactionRecord {
            transaction_number,
            operation: Operation {
                protected: "e30".to_string(),
                payload: payload.to_string(),
                signature: String::new(),
            },
        }
    }

    #[test]
    fn ascending_by_number() {
        let records = vec![record(814, "YQ"), record(812, "Yg"), record(813, "Yw")];
        let numbers: Vec<u64> = order(&records).iter().map(|r| r.transaction_number).collect();
        assert_eq!(numbers, vec![812, 813, 814]);

        let reversed: Vec<TransactionRecord> = records.iter().rev().cloned().collect();
        assert_eq!(order(&reversed), order(&records));
    }

    #[test]
    fn ties_break_by_hash() {
        let a = record(7, "YQ");
        let b = record(7, "Yg");
        let first = order(&[a.clone(), b.clone()]);
        let second = order(&[b, a]);
        assert_eq!(first, second);

        let hashes: Vec<String> =
            first.iter().map(|r| r.operation.hash().expect("should hash")).collect();
        assert!(hashes[0] <= hashes[1]);
    }

    #[test]
    fn duplicates_kept() {
        let a = record(1, "YQ");
        assert_eq!(order(&[a.clone(), a.clone()]), vec![a.clone(), a]);
    }
}
