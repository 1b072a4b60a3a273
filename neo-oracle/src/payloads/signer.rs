//! Transaction signers.

use crate::io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use neo_primitives::{UInt160, UINT160_SIZE};

/// Witness scope of a signer. Oracle response transactions only ever use
/// `NONE`, so the scope-specific trailing fields are not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WitnessScope(u8);

impl WitnessScope {
    pub const NONE: WitnessScope = WitnessScope(0x00);

    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Represents a signer of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    pub account: UInt160,
    pub scopes: WitnessScope,
}

impl Signer {
    pub fn new(account: UInt160, scopes: WitnessScope) -> Self {
        Self { account, scopes }
    }

    pub fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let account = UInt160::from_bytes(&reader.read_bytes(UINT160_SIZE)?)
            .map_err(|err| IoError::InvalidData(err.to_string()))?;
        let scopes = reader.read_u8()?;
        if scopes != WitnessScope::NONE.bits() {
            return Err(IoError::InvalidData(format!(
                "unsupported witness scope {scopes:#04x}"
            )));
        }
        Ok(Self::new(account, WitnessScope::NONE))
    }
}

impl Serializable for Signer {
    fn size(&self) -> usize {
        UINT160_SIZE + 1
    }

    fn serialize(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_bytes(self.account.as_bytes());
        writer.write_u8(self.scopes.bits());
    }
}
