use super::OracleServiceError;
use crate::crypto::{get_sign_data, ECPoint, SIGNATURE_SIZE};
use crate::interfaces::OracleSigner;
use crate::payloads::Transaction;
use neo_primitives::UInt256;

/// Signs a response transaction: the signature covers the network magic
/// followed by the transaction hash.
pub(super) fn sign_transaction(
    tx: &Transaction,
    signer: &dyn OracleSigner,
    network: u32,
) -> Result<(UInt256, Vec<u8>), OracleServiceError> {
    let hash = tx.hash();
    let signature = signer.sign(&get_sign_data(&hash, network))?;
    Ok((hash, signature))
}

/// Checks `signature` by `pubkey` over the sign data of `hash`.
pub fn verify_oracle_signature(
    pubkey: &ECPoint,
    hash: &UInt256,
    network: u32,
    signature: &[u8],
) -> bool {
    if signature.len() != SIGNATURE_SIZE {
        return false;
    }
    pubkey.verify_signature(&get_sign_data(hash, network), signature)
}
