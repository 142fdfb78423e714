//! SPL Token operations for Solana.
//!
//! Associated token account (ATA) derivation and the `TransferChecked`
//! instruction, without the `solana-sdk` or `spl-token` crates.
//!
//! An ATA address is a pure derivation: it says where the account would
//! live, not that it has been created.

use sha2::{Digest, Sha256};

use crate::error::SolError;
use crate::transaction::SolAccountMeta;
use crate::transaction::SolInstruction;

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: [u8; 32] = {
    // Base58 cannot be decoded in a const context.
    [
        0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb,
        0x79, 0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85,
        0x7e, 0xff, 0x00, 0xa9,
    ]
};

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: [u8; 32] = {
    [
        0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e,
        0x0d, 0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8,
        0xdb, 0xe9, 0xf8, 0x59,
    ]
};

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

// ---------------------------------------------------------------------------
// SPL Token TransferChecked
// ---------------------------------------------------------------------------

/// SPL Token `TransferChecked` instruction index.
const TRANSFER_CHECKED_IX_INDEX: u8 = 12;

/// Build an SPL Token `TransferChecked` instruction.
///
/// Moves `amount` smallest units from `source` to `destination`. Unlike the
/// plain `Transfer` instruction, the token program checks `mint` and
/// `decimals` against the source account, so an amount normalized with the
/// wrong precision is rejected on-chain instead of moving the wrong value.
///
/// # Wire format
///
/// `[12]` + u64 LE amount + u8 decimals = 10 bytes. Accounts:
/// source (writable), mint (read-only), destination (writable),
/// owner (signer).
pub fn build_transfer_checked(
    source: &[u8; 32],
    mint: &[u8; 32],
    destination: &[u8; 32],
    owner: &[u8; 32],
    amount: u64,
    decimals: u8,
) -> Result<SolInstruction, SolError> {
    if amount == 0 {
        return Err(SolError::TransactionBuildError(
            "SPL transfer amount must be > 0".into(),
        ));
    }

    let mut data = Vec::with_capacity(10);
    data.push(TRANSFER_CHECKED_IX_INDEX);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Ok(SolInstruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta {
                pubkey: *source,
                is_signer: false,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: *mint,
                is_signer: false,
                is_writable: false,
            },
            SolAccountMeta {
                pubkey: *destination,
                is_signer: false,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: *owner,
                is_signer: true,
                is_writable: false,
            },
        ],
        data,
    })
}

// ---------------------------------------------------------------------------
// Associated Token Account (PDA) derivation
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair.
///
/// The ATA is a Program Derived Address (PDA) with seeds:
///   `[wallet_address, token_program_id, mint_address]`
/// derived from the Associated Token Account program.
///
/// The derivation searches for a bump seed (255 down to 0) such that the
/// resulting point is NOT on the Ed25519 curve.
pub fn derive_associated_token_address(
    wallet: &[u8; 32],
    mint: &[u8; 32],
) -> Result<[u8; 32], SolError> {
    find_program_address(
        &[wallet.as_ref(), &TOKEN_PROGRAM_ID, mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// First program address for `seeds` that lies off the Ed25519 curve,
/// trying bump seeds from 255 downwards. Returns the address and its bump.
fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), SolError> {
    (0u8..=255)
        .rev()
        .find_map(|bump| {
            let candidate = program_address_hash(seeds, bump, program_id);
            (!is_on_curve(&candidate)).then_some((candidate, bump))
        })
        .ok_or_else(|| SolError::InvalidAddress("no off-curve bump seed for PDA".into()))
}

/// `SHA-256(seeds.. || bump || program_id || "ProgramDerivedAddress")`
fn program_address_hash(seeds: &[&[u8]], bump: u8, program_id: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);
    hasher.finalize().into()
}

fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address;

    // -- Constant verification ----------------------------------------------

    #[test]
    fn token_program_id_roundtrip() {
        let addr = address::bytes_to_address(&TOKEN_PROGRAM_ID);
        assert_eq!(addr, "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
    }

    #[test]
    fn associated_token_program_id_roundtrip() {
        let addr = address::bytes_to_address(&ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(addr, "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
    }

    // -- TransferChecked instruction ----------------------------------------

    fn sample_ix(amount: u64) -> Result<SolInstruction, SolError> {
        build_transfer_checked(&[1u8; 32], &[4u8; 32], &[2u8; 32], &[3u8; 32], amount, 6)
    }

    #[test]
    fn transfer_checked_data_encoding() {
        let ix = sample_ix(500_000).unwrap();

        assert_eq!(ix.data.len(), 10);
        assert_eq!(ix.data[0], 12);
        let encoded_amount = u64::from_le_bytes(ix.data[1..9].try_into().unwrap());
        assert_eq!(encoded_amount, 500_000);
        assert_eq!(ix.data[9], 6);
    }

    #[test]
    fn transfer_checked_account_roles() {
        let ix = sample_ix(100).unwrap();

        assert_eq!(ix.accounts.len(), 4);

        // Source: writable.
        assert_eq!(ix.accounts[0].pubkey, [1u8; 32]);
        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);

        // Mint: read-only.
        assert_eq!(ix.accounts[1].pubkey, [4u8; 32]);
        assert!(!ix.accounts[1].is_writable && !ix.accounts[1].is_signer);

        // Destination: writable.
        assert_eq!(ix.accounts[2].pubkey, [2u8; 32]);
        assert!(ix.accounts[2].is_writable && !ix.accounts[2].is_signer);

        // Owner: signer, not writable.
        assert_eq!(ix.accounts[3].pubkey, [3u8; 32]);
        assert!(ix.accounts[3].is_signer && !ix.accounts[3].is_writable);
    }

    #[test]
    fn transfer_checked_uses_token_program() {
        assert_eq!(sample_ix(100).unwrap().program_id, TOKEN_PROGRAM_ID);
    }

    #[test]
    fn transfer_checked_zero_amount_fails() {
        assert!(sample_ix(0).is_err());
    }

    // -- PDA derivation -----------------------------------------------------

    #[test]
    fn ata_is_off_curve_and_deterministic() {
        let ata1 = derive_associated_token_address(&[0x11; 32], &[0x22; 32]).unwrap();
        let ata2 = derive_associated_token_address(&[0x11; 32], &[0x22; 32]).unwrap();

        assert_eq!(ata1, ata2);
        assert!(!is_on_curve(&ata1), "PDA must not be on the Ed25519 curve");
    }

    #[test]
    fn ata_depends_on_wallet_and_mint() {
        let base = derive_associated_token_address(&[0x01; 32], &[0xff; 32]).unwrap();
        let other_wallet = derive_associated_token_address(&[0x02; 32], &[0xff; 32]).unwrap();
        let other_mint = derive_associated_token_address(&[0x01; 32], &[0xfe; 32]).unwrap();

        assert_ne!(base, other_wallet);
        assert_ne!(base, other_mint);
    }

    #[test]
    fn is_on_curve_accepts_basepoint() {
        // Compressed Ed25519 basepoint.
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(is_on_curve(&basepoint));
    }

    #[test]
    fn is_on_curve_rejects_off_curve_bytes() {
        assert!(!is_on_curve(&[0x02; 32]));
    }

    #[test]
    fn usdc_ata_is_a_valid_off_curve_address() {
        let usdc_mint =
            address::address_to_bytes("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        let wallet = [0x42u8; 32];

        let ata = derive_associated_token_address(&wallet, &usdc_mint).unwrap();

        assert!(!is_on_curve(&ata));
        assert!(address::validate_address(&address::bytes_to_address(&ata)).is_ok());
    }
}
