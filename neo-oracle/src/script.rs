//! VM script construction for oracle response transactions.
//!
//! Only the opcodes needed to build the fixed response script, the
//! committee multi-signature contract and witness invocation scripts are
//! modelled here.

use crate::crypto::ECPoint;
use neo_primitives::UInt160;
use sha2::{Digest, Sha256};

/// Opcodes emitted by the oracle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    PUSHINT8 = 0x00,
    PUSHINT16 = 0x01,
    PUSHDATA1 = 0x0C,
    PUSHDATA2 = 0x0D,
    PUSHDATA4 = 0x0E,
    PUSH0 = 0x10,
    PUSH1 = 0x11,
    PUSH15 = 0x1F,
    PUSH16 = 0x20,
    SYSCALL = 0x41,
    PACK = 0xC0,
}

/// Execution price of an opcode, in units of the exec fee factor.
pub fn opcode_price(op: u8) -> i64 {
    match op {
        // PUSHINT8..PUSHINT16, PUSH0..PUSH16
        0x00 | 0x01 | 0x10..=0x20 => 1,
        // PUSHDATA1
        0x0C => 1 << 3,
        // PUSHDATA2
        0x0D => 1 << 9,
        // PUSHDATA4
        0x0E => 1 << 12,
        // SYSCALL carries its own price
        0x41 => 0,
        // PACK
        0xC0 => 1 << 11,
        _ => 1 << 15,
    }
}

/// Price of `System.Crypto.CheckSig`, charged once per committee key.
pub const CHECK_SIG_PRICE: i64 = 1 << 15;

/// Callflags value for `CallFlags.All`.
pub const CALL_FLAGS_ALL: i64 = 0x0F;

/// Interop service identifier: first four bytes of `SHA256(name)`.
pub fn interop_hash(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Helps construct VM scripts programmatically.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_opcode(&mut self, op: OpCode) -> &mut Self {
        self.script.push(op as u8);
        self
    }

    /// Emits a push of raw bytes using the shortest `PUSHDATA` form.
    pub fn emit_push(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len <= 0xFF {
            self.emit_opcode(OpCode::PUSHDATA1);
            self.script.push(len as u8);
        } else if len <= 0xFFFF {
            self.emit_opcode(OpCode::PUSHDATA2);
            self.script.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.emit_opcode(OpCode::PUSHDATA4);
            self.script.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.script.extend_from_slice(data);
        self
    }

    /// Emits a push of a small integer.
    pub fn emit_push_int(&mut self, value: i64) -> &mut Self {
        if (0..=16).contains(&value) {
            self.script.push(OpCode::PUSH0 as u8 + value as u8);
        } else if i8::try_from(value).is_ok() {
            self.emit_opcode(OpCode::PUSHINT8);
            self.script.push(value as i8 as u8);
        } else {
            self.emit_opcode(OpCode::PUSHINT16);
            self.script
                .extend_from_slice(&(value as i16).to_le_bytes());
        }
        self
    }

    pub fn emit_syscall(&mut self, name: &str) -> &mut Self {
        self.emit_opcode(OpCode::SYSCALL);
        self.script
            .extend_from_slice(&interop_hash(name).to_le_bytes());
        self
    }

    /// Emits `System.Contract.Call(hash, method, CallFlags.All, [])`.
    ///
    /// The empty argument array is emitted as `PUSH0 PACK`.
    pub fn emit_dynamic_call(&mut self, hash: &UInt160, method: &str) -> &mut Self {
        self.emit_push_int(0);
        self.emit_opcode(OpCode::PACK);
        self.emit_push_int(CALL_FLAGS_ALL);
        self.emit_push(method.as_bytes());
        self.emit_push(hash.as_bytes());
        self.emit_syscall("System.Contract.Call")
    }

    pub fn to_array(&self) -> Vec<u8> {
        self.script.clone()
    }
}

/// The verification contract of a committee's multi-signature account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub script: Vec<u8>,
    script_hash: UInt160,
}

impl Contract {
    /// Creates the `m`-of-`keys` multi-signature contract. `keys` must be
    /// non-empty and already in canonical order.
    pub fn create_multi_sig_contract(m: usize, keys: &[ECPoint]) -> Self {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_int(m as i64);
        for key in keys {
            builder.emit_push(key.as_bytes());
        }
        builder.emit_push_int(keys.len() as i64);
        builder.emit_syscall("System.Crypto.CheckMultisig");
        let script = builder.to_array();
        let script_hash = UInt160::from_script(&script);
        Self {
            script,
            script_hash,
        }
    }

    pub fn script_hash(&self) -> UInt160 {
        self.script_hash
    }
}

/// Verification cost of an `m`-of-`n` multi-signature contract, before the
/// exec fee factor is applied.
pub fn multi_signature_contract_cost(m: usize, n: usize) -> i64 {
    let mut fee = opcode_price(OpCode::PUSHDATA1 as u8) * (m + n) as i64;
    fee += opcode_price(ScriptBuilder::new().emit_push_int(m as i64).to_array()[0]);
    fee += opcode_price(ScriptBuilder::new().emit_push_int(n as i64).to_array()[0]);
    fee += opcode_price(OpCode::SYSCALL as u8);
    fee += CHECK_SIG_PRICE * n as i64;
    fee
}

/// Builds a witness invocation script pushing each signature in order.
pub fn create_invocation_script<'a, I>(signatures: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut builder = ScriptBuilder::new();
    for signature in signatures {
        builder.emit_push(signature);
    }
    builder.to_array()
}
