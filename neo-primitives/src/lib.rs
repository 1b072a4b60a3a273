//! # Neo Primitives
//!
//! Fundamental value types shared by the oracle service crates:
//! - `UInt160`: 160-bit script hashes (contract and account identifiers)
//! - `UInt256`: 256-bit transaction hashes
//! - `OracleResponseCode`: the on-chain status byte of an oracle response
//!
//! ## Example
//!
//! ```rust
//! use neo_primitives::{UInt160, UInt256};
//!
//! let hash = UInt256::zero();
//! assert!(hash.is_zero());
//!
//! let script_hash = UInt160::parse("0x0000000000000000000000000000000000000001").unwrap();
//! assert!(!script_hash.is_zero());
//! ```

pub mod error;
pub mod oracle_response_code;
pub mod uint160;
pub mod uint256;

#[cfg(test)]
mod tests;

pub use error::{PrimitiveError, PrimitiveResult};
pub use oracle_response_code::OracleResponseCode;
pub use uint160::{UInt160, UINT160_SIZE};
pub use uint256::{UInt256, UINT256_SIZE};
