//! The designated oracle committee.

use crate::crypto::ECPoint;
use crate::script::Contract;
use crate::service::OracleServiceError;
use neo_primitives::UInt160;

/// Upper bound on committee size accepted by `System.Crypto.CheckMultisig`.
pub const MAX_COMMITTEE_SIZE: usize = 1024;

/// The oracle-role keys at some height, with the signing threshold `M`.
///
/// Keys are held in canonical order, which is also the order signatures
/// appear in the assembled witness. A committee is immutable; a new one is
/// swapped in whole when the designation changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committee {
    keys: Vec<ECPoint>,
    threshold: usize,
    contract: Contract,
}

impl Committee {
    /// Builds a committee requiring `threshold` of `keys` to sign.
    pub fn new(mut keys: Vec<ECPoint>, threshold: usize) -> Result<Self, OracleServiceError> {
        keys.sort();
        keys.dedup();
        if keys.is_empty() {
            return Err(OracleServiceError::InvalidCommittee(
                "no oracle nodes designated".to_string(),
            ));
        }
        if keys.len() > MAX_COMMITTEE_SIZE {
            return Err(OracleServiceError::InvalidCommittee(format!(
                "{} oracle nodes exceeds the limit of {MAX_COMMITTEE_SIZE}",
                keys.len()
            )));
        }
        if threshold == 0 || threshold > keys.len() {
            return Err(OracleServiceError::InvalidCommittee(format!(
                "threshold {threshold} out of range for {} oracle nodes",
                keys.len()
            )));
        }
        let contract = Contract::create_multi_sig_contract(threshold, &keys);
        Ok(Self {
            keys,
            threshold,
            contract,
        })
    }

    /// Builds a committee with the Byzantine fault tolerant threshold
    /// `n - (n - 1) / 3`.
    pub fn bft(keys: Vec<ECPoint>) -> Result<Self, OracleServiceError> {
        let mut unique = keys;
        unique.sort();
        unique.dedup();
        let threshold = bft_threshold(unique.len());
        Self::new(unique, threshold)
    }

    pub fn keys(&self) -> &[ECPoint] {
        &self.keys
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &ECPoint) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    /// The `M`-of-`N` verification contract.
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Account that co-signs every response transaction.
    pub fn script_hash(&self) -> UInt160 {
        self.contract.script_hash()
    }
}

/// Honest-majority threshold for `n` nodes.
pub fn bft_threshold(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    n - (n - 1) / 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn key(seed: u8) -> ECPoint {
        let mut private = [0u8; 32];
        private[31] = seed;
        KeyPair::from_private_key(&private).unwrap().public_key()
    }

    #[test]
    fn test_bft_threshold() {
        assert_eq!(bft_threshold(1), 1);
        assert_eq!(bft_threshold(2), 2);
        assert_eq!(bft_threshold(4), 3);
        assert_eq!(bft_threshold(7), 5);
    }

    #[test]
    fn test_keys_are_sorted_and_deduplicated() {
        let committee = Committee::bft(vec![key(3), key(1), key(2), key(1)]).unwrap();
        assert_eq!(committee.len(), 3);
        assert_eq!(committee.threshold(), 3);
        let mut expected = vec![key(1), key(2), key(3)];
        expected.sort();
        assert_eq!(committee.keys(), expected.as_slice());
        assert!(committee.contains(&key(2)));
        assert!(!committee.contains(&key(4)));
    }

    #[test]
    fn test_order_independent_script_hash() {
        let a = Committee::new(vec![key(1), key(2)], 2).unwrap();
        let b = Committee::new(vec![key(2), key(1)], 2).unwrap();
        assert_eq!(a.script_hash(), b.script_hash());
        let c = Committee::new(vec![key(2), key(1)], 1).unwrap();
        assert_ne!(a.script_hash(), c.script_hash());
    }

    #[test]
    fn test_invalid_committees() {
        assert!(Committee::bft(Vec::new()).is_err());
        assert!(Committee::new(vec![key(1)], 0).is_err());
        assert!(Committee::new(vec![key(1)], 2).is_err());
    }
}
