//! Metaplex token metadata account decoding.

use borsh::BorshDeserialize;
use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};

use crate::error::{BridgeError, BridgeResult};

/// Metaplex Token Metadata program.
pub const METADATA_PROGRAM_ID: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

/// Account discriminator of a `MetadataV1` account.
pub const METADATA_V1_KEY: u8 = 4;

/// Suffix hashed into every program-derived address.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Byte offset of the mint inside a metadata account.
pub const MINT_OFFSET: usize = 1 + 32;

/// Leading fields of a metadata account. The remainder (creators,
/// collection, uses) is never read.
#[derive(BorshDeserialize, Debug)]
struct MetadataPrefix {
    key: u8,
    update_authority: [u8; 32],
    mint: [u8; 32],
    name: String,
    symbol: String,
    uri: String,
}

/// Decoded on-chain metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnChainMetadata {
    pub update_authority: [u8; 32],
    pub mint: [u8; 32],
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Decode a metadata account, trimming the NUL padding Metaplex stores in
/// fixed-width strings.
pub fn parse_metadata(data: &[u8]) -> BridgeResult<OnChainMetadata> {
    let prefix = MetadataPrefix::deserialize(&mut &data[..])
        .map_err(|e| BridgeError::Serialization(format!("metadata account: {}", e)))?;

    if prefix.key != METADATA_V1_KEY {
        return Err(BridgeError::Serialization(format!(
            "unexpected metadata key {}",
            prefix.key
        )));
    }

    Ok(OnChainMetadata {
        update_authority: prefix.update_authority,
        mint: prefix.mint,
        name: trim_padding(&prefix.name),
        symbol: trim_padding(&prefix.symbol),
        uri: trim_padding(&prefix.uri),
    })
}

fn trim_padding(value: &str) -> String {
    value.trim_end_matches('\0').trim().to_string()
}

/// Decode a base58 Solana public key.
pub fn decode_pubkey(address: &str) -> BridgeResult<[u8; 32]> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| BridgeError::InvalidAddress(format!("{}: {}", address, e)))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        BridgeError::InvalidAddress(format!("{}: expected 32 bytes, got {}", address, bytes.len()))
    })
}

/// Program-derived address for `seeds`: the first bump, counting down from
/// 255, whose hash is not an ed25519 point.
pub fn find_program_address(seeds: &[&[u8]], program: &[u8; 32]) -> Option<([u8; 32], u8)> {
    (0..=u8::MAX).rev().find_map(|bump| {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([bump]);
        hasher.update(program);
        hasher.update(PDA_MARKER);
        let hash: [u8; 32] = hasher.finalize().into();
        (!is_on_curve(&hash)).then_some((hash, bump))
    })
}

fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

/// Derive the metadata account address for `mint`.
pub fn metadata_address(mint: &str) -> BridgeResult<String> {
    let program = decode_pubkey(METADATA_PROGRAM_ID)?;
    let mint = decode_pubkey(mint)?;

    let (pda, _bump) = find_program_address(
        &[b"metadata".as_slice(), program.as_slice(), mint.as_slice()],
        &program,
    )
    .ok_or_else(|| BridgeError::InvalidAddress("no metadata address for mint".into()))?;
    Ok(bs58::encode(pda).into_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use borsh::BorshSerialize;

    #[derive(BorshSerialize)]
    struct Fixture {
        key: u8,
        update_authority: [u8; 32],
        mint: [u8; 32],
        name: String,
        symbol: String,
        uri: String,
        seller_fee_basis_points: u16,
    }

    /// Encoded metadata account with Metaplex-style padding.
    pub(crate) fn metadata_account(name: &str, symbol: &str, uri: &str) -> Vec<u8> {
        let pad = |s: &str, width: usize| {
            let mut padded = s.to_string();
            padded.extend(std::iter::repeat('\0').take(width - s.len()));
            padded
        };
        borsh::to_vec(&Fixture {
            key: METADATA_V1_KEY,
            update_authority: [1; 32],
            mint: [2; 32],
            name: pad(name, 32),
            symbol: pad(symbol, 10),
            uri: pad(uri, 200),
            seller_fee_basis_points: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_padded_metadata() {
        let data = metadata_account("Wrapped Thing", "WTH", "https://example.org/wth.json");
        let metadata = parse_metadata(&data).unwrap();
        assert_eq!(metadata.name, "Wrapped Thing");
        assert_eq!(metadata.symbol, "WTH");
        assert_eq!(metadata.uri, "https://example.org/wth.json");
        assert_eq!(metadata.mint, [2; 32]);
    }

    #[test]
    fn test_rejects_wrong_key_and_truncated() {
        let mut data = metadata_account("A", "B", "");
        data[0] = 1;
        assert!(parse_metadata(&data).is_err());
        assert!(parse_metadata(&[METADATA_V1_KEY; 10]).is_err());
    }

    #[test]
    fn test_metadata_address_matches_known_accounts() {
        assert_eq!(
            metadata_address("So11111111111111111111111111111111111111112").unwrap(),
            "6dM4TqWyWJsbx7obrdLcviBkTafD5E8av61zfU6jq57X"
        );
        assert_eq!(
            metadata_address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap(),
            "5x38Kp4hvdomTCnCrAny4UtMUt5rQBdB6px2K1Ui45Wq"
        );
    }

    #[test]
    fn test_pda_skips_on_curve_bumps() {
        let program = decode_pubkey(METADATA_PROGRAM_ID).unwrap();
        let mint = [1u8; 32];
        let seeds = [b"metadata".as_slice(), program.as_slice(), mint.as_slice()];
        let (pda, bump) = find_program_address(&seeds, &program).unwrap();
        assert_eq!(bump, 254);
        assert_eq!(
            bs58::encode(pda).into_string(),
            "A9e7KK1odkd3Zxc9YnF7Rsd7sCDiFQHgsCPVK3qZYRu2"
        );
    }

    #[test]
    fn test_metadata_address_rejects_bad_mint() {
        assert!(matches!(
            metadata_address("not-a-key"),
            Err(BridgeError::InvalidAddress(_))
        ));
        // 31 bytes
        assert!(metadata_address("So1MintAddress1111111111111111111111111111").is_err());
    }
}
