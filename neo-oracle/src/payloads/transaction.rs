//! The subset of a Neo N3 transaction used for oracle responses.

use super::oracle_response::{OracleResponse, ORACLE_RESPONSE_ATTRIBUTE_TYPE};
use super::signer::Signer;
use super::witness::Witness;
use crate::io::{
    get_var_size_bytes, get_var_size_serializable_slice, BinaryWriter, IoError, IoResult,
    MemoryReader, Serializable,
};
use neo_primitives::{UInt160, UInt256};

/// Size of the fixed-width transaction header: version, nonce, system fee,
/// network fee and valid-until-block.
pub const HEADER_SIZE: usize = 1 + 4 + 8 + 8 + 4;

/// Maximum number of attributes a transaction may carry.
pub const MAX_TRANSACTION_ATTRIBUTES: usize = 16;

const MAX_SCRIPT_SIZE: usize = u16::MAX as usize;

/// A transaction carrying an oracle response back on-chain.
///
/// The only attribute type modelled is `OracleResponse`, which is the only
/// attribute an oracle response transaction may have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    version: u8,
    nonce: u32,
    system_fee: i64,
    network_fee: i64,
    valid_until_block: u32,
    signers: Vec<Signer>,
    attributes: Vec<OracleResponse>,
    script: Vec<u8>,
    witnesses: Vec<Witness>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn set_nonce(&mut self, nonce: u32) {
        self.nonce = nonce;
    }

    pub fn system_fee(&self) -> i64 {
        self.system_fee
    }

    pub fn set_system_fee(&mut self, fee: i64) {
        self.system_fee = fee;
    }

    pub fn network_fee(&self) -> i64 {
        self.network_fee
    }

    pub fn set_network_fee(&mut self, fee: i64) {
        self.network_fee = fee;
    }

    pub fn valid_until_block(&self) -> u32 {
        self.valid_until_block
    }

    pub fn set_valid_until_block(&mut self, height: u32) {
        self.valid_until_block = height;
    }

    pub fn signers(&self) -> &[Signer] {
        &self.signers
    }

    pub fn set_signers(&mut self, signers: Vec<Signer>) {
        self.signers = signers;
    }

    pub fn attributes(&self) -> &[OracleResponse] {
        &self.attributes
    }

    pub fn set_attributes(&mut self, attributes: Vec<OracleResponse>) {
        self.attributes = attributes;
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn set_script(&mut self, script: Vec<u8>) {
        self.script = script;
    }

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    pub fn set_witnesses(&mut self, witnesses: Vec<Witness>) {
        self.witnesses = witnesses;
    }

    /// The oracle response attribute, if present.
    pub fn oracle_response(&self) -> Option<&OracleResponse> {
        self.attributes.first()
    }

    /// Script hashes that must be witnessed, in witness order.
    pub fn get_script_hashes_for_verifying(&self) -> Vec<UInt160> {
        self.signers.iter().map(|signer| signer.account).collect()
    }

    /// Sender of the transaction: the first signer.
    pub fn sender(&self) -> Option<UInt160> {
        self.signers.first().map(|signer| signer.account)
    }

    /// Transaction hash: SHA-256 of the unsigned serialization.
    pub fn hash(&self) -> UInt256 {
        UInt256::sha256(&self.get_hash_data())
    }

    /// The unsigned serialization (everything except witnesses).
    pub fn get_hash_data(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.unsigned_size());
        self.serialize_unsigned(&mut BinaryWriter::new(&mut buffer));
        buffer
    }

    fn unsigned_size(&self) -> usize {
        HEADER_SIZE
            + get_var_size_serializable_slice(&self.signers)
            + get_var_size_serializable_slice(&self.attributes)
            + get_var_size_bytes(&self.script)
    }

    fn serialize_unsigned(&self, writer: &mut BinaryWriter<'_>) {
        writer.write_u8(self.version);
        writer.write_u32(self.nonce);
        writer.write_i64(self.system_fee);
        writer.write_i64(self.network_fee);
        writer.write_u32(self.valid_until_block);
        writer.write_serializable_slice(&self.signers);
        writer.write_serializable_slice(&self.attributes);
        writer.write_var_bytes(&self.script);
    }

    /// Decodes a full (witnessed) transaction.
    pub fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let version = reader.read_u8()?;
        if version > 0 {
            return Err(IoError::InvalidData(format!("unsupported version {version}")));
        }
        let nonce = reader.read_u32()?;
        let system_fee = reader.read_u64()? as i64;
        let network_fee = reader.read_u64()? as i64;
        if system_fee < 0 || network_fee < 0 {
            return Err(IoError::InvalidData("negative fee".to_string()));
        }
        let valid_until_block = reader.read_u32()?;

        let signer_count = reader.read_var_int(MAX_TRANSACTION_ATTRIBUTES as u64)? as usize;
        let mut signers = Vec::with_capacity(signer_count);
        for _ in 0..signer_count {
            signers.push(Signer::deserialize(reader)?);
        }

        let attribute_count = reader.read_var_int(MAX_TRANSACTION_ATTRIBUTES as u64)? as usize;
        let mut attributes = Vec::with_capacity(attribute_count);
        for _ in 0..attribute_count {
            let kind = reader.read_u8()?;
            if kind != ORACLE_RESPONSE_ATTRIBUTE_TYPE {
                return Err(IoError::InvalidData(format!(
                    "unsupported attribute type {kind:#04x}"
                )));
            }
            attributes.push(OracleResponse::deserialize_without_type(reader)?);
        }

        let script = reader.read_var_bytes(MAX_SCRIPT_SIZE)?;

        let witness_count = reader.read_var_int(signer_count as u64)? as usize;
        let mut witnesses = Vec::with_capacity(witness_count);
        for _ in 0..witness_count {
            witnesses.push(Witness::deserialize(reader)?);
        }

        Ok(Self {
            version,
            nonce,
            system_fee,
            network_fee,
            valid_until_block,
            signers,
            attributes,
            script,
            witnesses,
        })
    }

    pub fn from_bytes(data: &[u8]) -> IoResult<Self> {
        Self::deserialize(&mut MemoryReader::new(data))
    }
}

impl Serializable for Transaction {
    fn size(&self) -> usize {
        self.unsigned_size() + get_var_size_serializable_slice(&self.witnesses)
    }

    fn serialize(&self, writer: &mut BinaryWriter<'_>) {
        self.serialize_unsigned(writer);
        writer.write_serializable_slice(&self.witnesses);
    }
}
