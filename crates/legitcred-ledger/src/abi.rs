//! Minimal Solidity ABI encoding for the credential contract.
//!
//! Only the shapes the contract uses are supported: `uint256` and `address`
//! words, a single dynamic `string`, and the ERC-721 `Transfer` event.

use sha3::{Digest, Keccak256};

use legitcred_core::{Address, TokenId};

use crate::error::LedgerError;
use crate::types::{LogEntry, TransferEvent};

pub const TOTAL_SUPPLY: &str = "totalSupply()";
pub const GET_META_DATA: &str = "getMetaData(uint256)";
pub const OWNER_OF: &str = "ownerOf(uint256)";
pub const MINT: &str = "mint(address,string)";
pub const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

const WORD: usize = 32;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// 4-byte function selector of a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// topic[0] of an event with the given canonical signature.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

pub fn encode_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn encode_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Calldata for a function whose arguments are all static words.
pub fn encode_call(signature: &str, args: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Calldata for a `(uint256 tokenId)` function.
pub fn encode_token_call(signature: &str, token_id: TokenId) -> Vec<u8> {
    encode_call(signature, &[encode_u64(token_id.value())])
}

/// Calldata for `mint(address,string)`.
pub fn encode_mint(recipient: &Address, pointer: &str) -> Vec<u8> {
    let bytes = pointer.as_bytes();
    let padded_len = bytes.len().div_ceil(WORD) * WORD;

    let mut data = encode_call(
        MINT,
        &[
            encode_address(recipient),
            // head is two words, so the string tail starts at 0x40
            encode_u64((2 * WORD) as u64),
            encode_u64(bytes.len() as u64),
        ],
    );
    data.extend_from_slice(bytes);
    data.resize(data.len() + (padded_len - bytes.len()), 0);
    data
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], LedgerError> {
    let end = offset
        .checked_add(WORD)
        .ok_or_else(|| LedgerError::Decode(format!("word offset {} out of range", offset)))?;
    data.get(offset..end).ok_or_else(|| {
        LedgerError::Decode(format!(
            "return data too short: need word at {}, have {} bytes",
            offset,
            data.len()
        ))
    })
}

fn word_to_u64(word: &[u8]) -> Option<u64> {
    if word.len() != WORD || word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Some(u64::from_be_bytes(buf))
}

fn word_to_address(word: &[u8]) -> Option<Address> {
    if word.len() != WORD || word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 20];
    buf.copy_from_slice(&word[12..]);
    Some(Address::from_bytes(buf))
}

/// Decode a single `uint256` return value that must fit in a `u64`.
pub fn decode_u64(data: &[u8]) -> Result<u64, LedgerError> {
    word_to_u64(word_at(data, 0)?)
        .ok_or_else(|| LedgerError::Decode("uint256 value exceeds u64".into()))
}

/// Decode a single `address` return value.
pub fn decode_address(data: &[u8]) -> Result<Address, LedgerError> {
    word_to_address(word_at(data, 0)?)
        .ok_or_else(|| LedgerError::Decode("address word has non-zero padding".into()))
}

fn to_usize(value: u64) -> Result<usize, LedgerError> {
    usize::try_from(value)
        .map_err(|_| LedgerError::Decode(format!("{} does not fit in usize", value)))
}

/// Decode a single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> Result<String, LedgerError> {
    let offset = to_usize(decode_u64(data)?)?;
    let len = word_to_u64(word_at(data, offset)?)
        .ok_or_else(|| LedgerError::Decode("string length exceeds u64".into()))?;
    let len = to_usize(len)?;
    let bytes = offset
        .checked_add(WORD)
        .and_then(|start| Some(start..start.checked_add(len)?))
        .and_then(|range| data.get(range))
        .ok_or_else(|| LedgerError::Decode("string body out of bounds".into()))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| LedgerError::Decode(format!("string is not utf-8: {}", e)))
}

/// Decode an ERC-721 `Transfer(address indexed, address indexed, uint256 indexed)`.
///
/// ERC-20 transfers share topic[0] but carry only three topics and are ignored.
pub fn decode_transfer(log: &LogEntry) -> Option<TransferEvent> {
    if log.topics.len() != 4 || log.topics[0] != event_topic(TRANSFER_EVENT) {
        return None;
    }
    let from = word_to_address(&log.topics[1])?;
    let to = word_to_address(&log.topics[2])?;
    let token_id = TokenId::new(word_to_u64(&log.topics[3])?).ok()?;
    Some(TransferEvent { from, to, token_id })
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(raw: &str) -> Result<Vec<u8>, LedgerError> {
    let body = raw.trim().strip_prefix("0x").unwrap_or(raw.trim());
    hex::decode(body).map_err(|e| LedgerError::Decode(format!("invalid hex {:?}: {}", raw, e)))
}

/// Parse a 32-byte hex word (log topic).
pub fn parse_word(raw: &str) -> Result<[u8; 32], LedgerError> {
    let bytes = from_hex(raw)?;
    if bytes.len() != WORD {
        return Err(LedgerError::Decode(format!(
            "expected 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes);
    Ok(word)
}

/// Parse a JSON-RPC hex quantity such as `0x1b4`.
pub fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let body = raw
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Decode(format!("quantity must be 0x-prefixed: {}", raw)))?;
    u64::from_str_radix(body, 16)
        .map_err(|_| LedgerError::Decode(format!("invalid quantity: {}", raw)))
}
