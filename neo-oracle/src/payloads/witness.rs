//! Transaction witnesses.

use crate::io::{get_var_size_bytes, BinaryWriter, IoResult, MemoryReader, Serializable};

const MAX_INVOCATION_SCRIPT: usize = 1024;
const MAX_VERIFICATION_SCRIPT: usize = 1024;

/// Represents a witness of a verifiable object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witness {
    pub invocation_script: Vec<u8>,
    pub verification_script: Vec<u8>,
}

impl Witness {
    /// A witness with both scripts empty. Used for contract-verified signers.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new_with_scripts(invocation_script: Vec<u8>, verification_script: Vec<u8>) -> Self {
        Self {
            invocation_script,
            verification_script,
        }
    }

    pub fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let invocation_script = reader.read_var_bytes(MAX_INVOCATION_SCRIPT)?;
        let verification_script = reader.read_var_bytes(MAX_VERIFICATION_SCRIPT)?;
        Ok(Self::new_with_scripts(invocation_script, verification_script))
    }
}

impl Serializable for Witness {
    fn size(&self) -> usize {
        get_var_size_bytes(&self.invocation_script) + get_var_size_bytes(&self.verification_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_var_bytes(&self.invocation_script);
        writer.write_var_bytes(&self.verification_script);
    }
}
