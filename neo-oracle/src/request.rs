//! Oracle requests as observed on-chain.

use neo_primitives::{UInt160, UInt256};
use serde::{Deserialize, Serialize};

/// A request for off-chain data, created by a contract calling the native
/// oracle contract. Never mutated after it is read from the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    /// Chain-assigned identifier, unique and monotonic.
    pub id: u64,
    /// The transaction that created the request.
    pub original_tx_id: UInt256,
    pub url: String,
    /// Optional JSONPath expression applied to the fetched body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub callback_contract: UInt160,
    pub callback_method: String,
    #[serde(default, with = "hex_bytes")]
    pub user_data: Vec<u8>,
    /// GAS budget funding both fees of the response transaction.
    pub gas_for_response: i64,
}

impl OracleRequest {
    /// The filter, treating an empty expression as absent.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref().filter(|filter| !filter.is_empty())
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
