use crate::committee::Committee;
use crate::crypto::ECPoint;
use crate::payloads::{Transaction, Witness};
use crate::script::create_invocation_script;
use neo_primitives::UInt256;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of offering a signature to a [`SignatureSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitResult {
    Accepted,
    /// A signature for this key is already held; the set is unchanged.
    Duplicate,
    NotDesignated,
    /// Signed a different hash than the one recorded first.
    HashMismatch,
    AlreadyFinalized,
}

impl AdmitResult {
    pub fn as_str(self) -> &'static str {
        match self {
            AdmitResult::Accepted => "accepted",
            AdmitResult::Duplicate => "duplicate",
            AdmitResult::NotDesignated => "not_designated",
            AdmitResult::HashMismatch => "hash_mismatch",
            AdmitResult::AlreadyFinalized => "already_finalized",
        }
    }
}

/// Signatures collected for one request's response transaction.
///
/// Every admitted signature covers the same hash: the first one recorded,
/// either through [`record_transaction`](Self::record_transaction) or the
/// first admission. Signatures are kept in committee key order so the
/// assembled witness is canonical regardless of arrival order.
#[derive(Debug)]
pub struct SignatureSet {
    committee: Arc<Committee>,
    hash: Option<UInt256>,
    transaction: Option<Transaction>,
    signatures: BTreeMap<ECPoint, Vec<u8>>,
    finalized: bool,
}

impl SignatureSet {
    pub fn new(committee: Arc<Committee>) -> Self {
        Self {
            committee,
            hash: None,
            transaction: None,
            signatures: BTreeMap::new(),
            finalized: false,
        }
    }

    pub fn committee(&self) -> &Committee {
        &self.committee
    }

    /// Records the transaction the signatures are assembled into. Returns
    /// false if a different hash was recorded first.
    pub fn record_transaction(&mut self, tx: Transaction) -> bool {
        let hash = tx.hash();
        match self.hash {
            Some(recorded) if recorded != hash => false,
            _ => {
                self.hash = Some(hash);
                self.transaction.get_or_insert(tx);
                true
            }
        }
    }

    pub fn hash(&self) -> Option<UInt256> {
        self.hash
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Admits `signature` by `key` over `tx_hash`.
    ///
    /// The signature itself is not verified here; callers check it against
    /// `tx_hash` first.
    pub fn admit(&mut self, key: ECPoint, signature: Vec<u8>, tx_hash: UInt256) -> AdmitResult {
        if self.finalized {
            return AdmitResult::AlreadyFinalized;
        }
        if !self.committee.contains(&key) {
            return AdmitResult::NotDesignated;
        }
        if self.hash.is_some_and(|recorded| recorded != tx_hash) {
            return AdmitResult::HashMismatch;
        }
        if self.signatures.contains_key(&key) {
            return AdmitResult::Duplicate;
        }
        self.hash = Some(tx_hash);
        self.signatures.insert(key, signature);
        AdmitResult::Accepted
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn contains(&self, key: &ECPoint) -> bool {
        self.signatures.contains_key(key)
    }

    pub fn is_finalizable(&self) -> bool {
        !self.finalized
            && self.transaction.is_some()
            && self.signatures.len() >= self.committee.threshold()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Builds the witnessed transaction. Succeeds at most once.
    pub fn assemble(&mut self) -> Option<Transaction> {
        if !self.is_finalizable() {
            return None;
        }
        let mut tx = self.transaction.clone()?;
        self.finalized = true;

        let invocation = create_invocation_script(
            self.signatures
                .values()
                .take(self.committee.threshold())
                .map(Vec::as_slice),
        );
        let committee_hash = self.committee.script_hash();
        let index = tx
            .get_script_hashes_for_verifying()
            .iter()
            .position(|hash| *hash == committee_hash)
            .unwrap_or(1);

        let mut witnesses = tx.witnesses().to_vec();
        witnesses.resize_with(tx.signers().len().max(index + 1), Witness::empty);
        witnesses[index] =
            Witness::new_with_scripts(invocation, self.committee.contract().script.clone());
        tx.set_witnesses(witnesses);
        Some(tx)
    }
}
