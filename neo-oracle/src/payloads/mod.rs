//! Network payloads carried by an oracle response transaction.

pub mod oracle_response;
pub mod signer;
pub mod transaction;
pub mod witness;

pub use oracle_response::{OracleResponse, MAX_RESULT_SIZE, ORACLE_CONTRACT_HASH};
pub use signer::{Signer, WitnessScope};
pub use transaction::{Transaction, HEADER_SIZE, MAX_TRANSACTION_ATTRIBUTES};
pub use witness::Witness;
