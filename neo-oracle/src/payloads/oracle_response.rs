//! The `OracleResponse` transaction attribute.

use crate::io::{get_var_size_bytes, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use crate::script::ScriptBuilder;
use neo_primitives::{OracleResponseCode, UInt160};
use once_cell::sync::Lazy;

/// Indicates the maximum size of the `result` field.
pub const MAX_RESULT_SIZE: usize = u16::MAX as usize;

/// Attribute type byte of `OracleResponse`.
pub const ORACLE_RESPONSE_ATTRIBUTE_TYPE: u8 = 0x11;

/// Script hash of the native oracle contract
/// (`0xfe924b7cfe89ddd271abaf7210a80a7e11178758`).
pub const ORACLE_CONTRACT_HASH: UInt160 = UInt160::from_array([
    0x58, 0x87, 0x17, 0x11, 0x7e, 0x0a, 0xa8, 0x10, 0x72, 0xaf, 0xab, 0x71, 0xd2, 0xdd, 0x89, 0xfe,
    0x7c, 0x4b, 0x92, 0xfe,
]);

static FIXED_SCRIPT: Lazy<Vec<u8>> = Lazy::new(|| {
    ScriptBuilder::new()
        .emit_dynamic_call(&ORACLE_CONTRACT_HASH, "finish")
        .to_array()
});

/// Indicates that the transaction is an oracle response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    /// The ID of the oracle request.
    pub id: u64,
    /// The response code for the oracle request.
    pub code: OracleResponseCode,
    /// The result for the oracle request. Empty unless `code` is `Success`.
    pub result: Vec<u8>,
}

impl OracleResponse {
    pub fn new(id: u64, code: OracleResponseCode, result: Vec<u8>) -> Self {
        Self { id, code, result }
    }

    /// A failed response: the code with an empty result.
    pub fn failure(id: u64, code: OracleResponseCode) -> Self {
        Self::new(id, code, Vec::new())
    }

    /// The fixed `Transaction.script` of every oracle response transaction:
    /// `System.Contract.Call(oracle, "finish")`.
    pub fn fixed_script() -> &'static [u8] {
        &FIXED_SCRIPT
    }

    /// Reads the attribute body (everything after the type byte).
    pub fn deserialize_without_type(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let id = reader.read_u64()?;
        let byte = reader.read_u8()?;
        let code = OracleResponseCode::from_byte(byte)
            .ok_or_else(|| IoError::InvalidData(format!("unknown oracle response code {byte:#04x}")))?;
        let result = reader.read_var_bytes(MAX_RESULT_SIZE)?;
        if code != OracleResponseCode::Success && !result.is_empty() {
            return Err(IoError::InvalidData(
                "result must be empty for non-success codes".to_string(),
            ));
        }
        Ok(Self { id, code, result })
    }
}

impl Serializable for OracleResponse {
    fn size(&self) -> usize {
        1 + 8 + 1 + get_var_size_bytes(&self.result)
    }

    fn serialize(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_u8(ORACLE_RESPONSE_ATTRIBUTE_TYPE);
        writer.write_u64(self.id);
        writer.write_u8(self.code.to_byte());
        writer.write_var_bytes(&self.result);
    }
}
