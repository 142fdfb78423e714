//! Solana transaction message compilation and wire format.
//!
//! The wallet signs the serialized message; this module produces that
//! message and assembles the signed wire transaction afterwards.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::SolError;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` in Solana's compact-u16 format (1 to 3 bytes, 7 bits each).
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    u16::try_from(value)
        .map(|v| (v, consumed))
        .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

/// A Solana instruction before compilation.
#[derive(Debug, Clone)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled legacy transaction message.
#[derive(Debug, Clone)]
pub struct SolMessage {
    /// Account keys in canonical order: writable signers (fee payer first),
    /// read-only signers, writable non-signers, read-only non-signers.
    pub account_keys: Vec<[u8; 32]>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

/// An instruction whose accounts are indices into `account_keys`.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile instructions into a message paid for by `fee_payer`.
///
/// The fee payer is always a writable signer at index 0.
pub fn compile_message(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolMessage, SolError> {
    struct AccountEntry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    fn rank(e: &AccountEntry) -> u8 {
        match (e.is_signer, e.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }

    if instructions.is_empty() {
        return Err(SolError::TransactionBuildError(
            "message needs at least one instruction".into(),
        ));
    }

    // Instruction account lists are tiny; a Vec keeps insertion order.
    let mut entries: Vec<AccountEntry> = Vec::new();
    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);
    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort keeps the fee payer first among writable signers.
    entries.sort_by_key(rank);

    if entries.len() > u8::MAX as usize {
        return Err(SolError::TransactionBuildError(
            "too many accounts for a legacy message".into(),
        ));
    }

    let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
    let num_required_signatures = count(|e| e.is_signer);
    let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
    let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &[u8; 32]| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError("account not in account keys".into()))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey))
            .collect::<Result<Vec<_>, _>>()?;

        compiled.push(CompiledInstruction {
            program_id_index: index_of(&ix.program_id)?,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(SolMessage {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}

/// Serialize a message into the bytes the wallet signs.
pub fn serialize_message(message: &SolMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    buf.push(message.num_required_signatures);
    buf.push(message.num_readonly_signed);
    buf.push(message.num_readonly_unsigned);

    buf.extend_from_slice(&encode_compact_u16(message.account_keys.len() as u16));
    for key in &message.account_keys {
        buf.extend_from_slice(key);
    }

    buf.extend_from_slice(&message.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(message.instructions.len() as u16));
    for ix in &message.instructions {
        buf.push(ix.program_id_index);
        buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
        buf.extend_from_slice(&ix.account_indices);
        buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
        buf.extend_from_slice(&ix.data);
    }

    buf
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// Check that `signature` is `signer`'s Ed25519 signature over `message`.
pub fn verify_signature(
    signer: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), SolError> {
    let key = VerifyingKey::from_bytes(signer)
        .map_err(|e| SolError::InvalidSignature(format!("invalid signer key: {e}")))?;

    key.verify(message, &Signature::from_bytes(signature))
        .map_err(|e| SolError::InvalidSignature(e.to_string()))
}

/// Assemble a single-signer wire transaction from a serialized message and
/// the fee payer's signature.
pub fn assemble_signed_transaction(message: &[u8], signature: &[u8; 64]) -> Vec<u8> {
    let mut wire = Vec::with_capacity(1 + 64 + message.len());
    wire.extend_from_slice(&encode_compact_u16(1));
    wire.extend_from_slice(signature);
    wire.extend_from_slice(message);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spl_token::{build_transfer_checked, TOKEN_PROGRAM_ID};
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn compact_u16_small_values() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
    }

    #[test]
    fn compact_u16_multi_byte_values() {
        assert_eq!(encode_compact_u16(0x80), vec![0x80, 0x01]);
        assert_eq!(encode_compact_u16(0x3fff), vec![0xff, 0x7f]);
        assert_eq!(encode_compact_u16(0x4000), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn compact_u16_decode_matches_encode() {
        for value in [0u16, 1, 0x7f, 0x80, 0x3fff, 0x4000, u16::MAX] {
            let encoded = encode_compact_u16(value);
            assert_eq!(decode_compact_u16(&encoded).unwrap(), (value, encoded.len()));
        }
    }

    #[test]
    fn compact_u16_decode_truncated() {
        assert!(decode_compact_u16(&[]).is_err());
        assert!(decode_compact_u16(&[0x80]).is_err());
    }

    fn transfer_message(owner: &[u8; 32]) -> SolMessage {
        let ix = build_transfer_checked(&[1; 32], &[4; 32], &[2; 32], owner, 1_000_000, 6).unwrap();
        compile_message(&[ix], owner, &[9; 32]).unwrap()
    }

    #[test]
    fn compile_orders_accounts_canonically() {
        let owner = [3u8; 32];
        let message = transfer_message(&owner);

        // Owner (fee payer) is the only signer and sits at index 0.
        assert_eq!(message.account_keys[0], owner);
        assert_eq!(message.num_required_signatures, 1);
        assert_eq!(message.num_readonly_signed, 0);
        // Mint and token program are read-only non-signers.
        assert_eq!(message.num_readonly_unsigned, 2);
        assert_eq!(message.account_keys.len(), 5);
        assert_eq!(*message.account_keys.last().unwrap(), TOKEN_PROGRAM_ID);
    }

    #[test]
    fn compile_resolves_instruction_indices() {
        let message = transfer_message(&[3u8; 32]);
        let ix = &message.instructions[0];

        assert_eq!(message.account_keys[ix.program_id_index as usize], TOKEN_PROGRAM_ID);
        let keys: Vec<[u8; 32]> = ix
            .account_indices
            .iter()
            .map(|i| message.account_keys[*i as usize])
            .collect();
        assert_eq!(keys, vec![[1; 32], [4; 32], [2; 32], [3; 32]]);
    }

    #[test]
    fn compile_rejects_empty_instruction_list() {
        assert!(compile_message(&[], &[3; 32], &[9; 32]).is_err());
    }

    #[test]
    fn serialized_message_layout() {
        let message = transfer_message(&[3u8; 32]);
        let bytes = serialize_message(&message);

        assert_eq!(&bytes[..3], &[1, 0, 2]);
        assert_eq!(bytes[3], 5); // account count
        let blockhash_at = 4 + 5 * 32;
        assert_eq!(&bytes[blockhash_at..blockhash_at + 32], &[9; 32]);
        assert_eq!(bytes[blockhash_at + 32], 1); // one instruction
    }

    #[test]
    fn wallet_signature_verifies_and_assembles() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let owner = signing_key.verifying_key().to_bytes();
        let message = serialize_message(&transfer_message(&owner));

        let signature = signing_key.sign(&message).to_bytes();
        verify_signature(&owner, &message, &signature).unwrap();

        let wire = assemble_signed_transaction(&message, &signature);
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[1..65], &signature);
        assert_eq!(&wire[65..], message.as_slice());
    }

    #[test]
    fn signature_from_another_key_is_rejected() {
        let owner = SigningKey::from_bytes(&[7u8; 32]).verifying_key().to_bytes();
        let impostor = SigningKey::from_bytes(&[8u8; 32]);
        let message = serialize_message(&transfer_message(&owner));

        let signature = impostor.sign(&message).to_bytes();
        assert!(matches!(
            verify_signature(&owner, &message, &signature),
            Err(SolError::InvalidSignature(_))
        ));
    }
}
