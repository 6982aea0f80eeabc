//! Minimal ABI encoding for the calls this engine makes.
//!
//! Covers ERC-20 reads/writes and the V2 router surface. Head words first;
//! a single trailing dynamic argument (the swap path) gets an offset word
//! pointing past the head.

use sha3::{Digest, Keccak256};

use crate::error::ChainError;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 4-byte function selector from a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word_uint(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_address(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

fn append_address_array(data: &mut Vec<u8>, path: &[[u8; 20]]) {
    data.extend_from_slice(&word_uint(path.len() as u128));
    for address in path {
        data.extend_from_slice(&word_address(address));
    }
}

// ==================== ERC-20 ====================

pub fn erc20_balance_of(holder: &[u8; 20]) -> Vec<u8> {
    let mut data = selector("balanceOf(address)").to_vec();
    data.extend_from_slice(&word_address(holder));
    data
}

pub fn erc20_decimals() -> Vec<u8> {
    selector("decimals()").to_vec()
}

pub fn erc20_symbol() -> Vec<u8> {
    selector("symbol()").to_vec()
}

pub fn erc20_name() -> Vec<u8> {
    selector("name()").to_vec()
}

pub fn erc20_transfer(to: &[u8; 20], amount: u128) -> Vec<u8> {
    let mut data = selector("transfer(address,uint256)").to_vec();
    data.extend_from_slice(&word_address(to));
    data.extend_from_slice(&word_uint(amount));
    data
}

pub fn erc20_approve(spender: &[u8; 20], amount: u128) -> Vec<u8> {
    let mut data = selector("approve(address,uint256)").to_vec();
    data.extend_from_slice(&word_address(spender));
    data.extend_from_slice(&word_uint(amount));
    data
}

pub fn erc20_allowance(owner: &[u8; 20], spender: &[u8; 20]) -> Vec<u8> {
    let mut data = selector("allowance(address,address)").to_vec();
    data.extend_from_slice(&word_address(owner));
    data.extend_from_slice(&word_address(spender));
    data
}

// ==================== V2 router ====================

pub fn router_get_amounts_out(amount_in: u128, path: &[[u8; 20]]) -> Vec<u8> {
    let mut data = selector("getAmountsOut(uint256,address[])").to_vec();
    data.extend_from_slice(&word_uint(amount_in));
    // two head words, so the path begins at 0x40
    data.extend_from_slice(&word_uint(0x40));
    append_address_array(&mut data, path);
    data
}

pub fn router_swap_exact_native_for_tokens(
    min_out: u128,
    path: &[[u8; 20]],
    recipient: &[u8; 20],
    deadline: u64,
) -> Vec<u8> {
    let mut data = selector("swapExactETHForTokens(uint256,address[],address,uint256)").to_vec();
    data.extend_from_slice(&word_uint(min_out));
    data.extend_from_slice(&word_uint(0x80));
    data.extend_from_slice(&word_address(recipient));
    data.extend_from_slice(&word_uint(deadline as u128));
    append_address_array(&mut data, path);
    data
}

pub fn router_swap_exact_tokens_for_native(
    amount_in: u128,
    min_out: u128,
    path: &[[u8; 20]],
    recipient: &[u8; 20],
    deadline: u64,
) -> Vec<u8> {
    let mut data =
        selector("swapExactTokensForETH(uint256,uint256,address[],address,uint256)").to_vec();
    data.extend_from_slice(&word_uint(amount_in));
    data.extend_from_slice(&word_uint(min_out));
    data.extend_from_slice(&word_uint(0xa0));
    data.extend_from_slice(&word_address(recipient));
    data.extend_from_slice(&word_uint(deadline as u128));
    append_address_array(&mut data, path);
    data
}

pub fn router_swap_exact_tokens_for_tokens(
    amount_in: u128,
    min_out: u128,
    path: &[[u8; 20]],
    recipient: &[u8; 20],
    deadline: u64,
) -> Vec<u8> {
    let mut data =
        selector("swapExactTokensForTokens(uint256,uint256,address[],address,uint256)").to_vec();
    data.extend_from_slice(&word_uint(amount_in));
    data.extend_from_slice(&word_uint(min_out));
    data.extend_from_slice(&word_uint(0xa0));
    data.extend_from_slice(&word_address(recipient));
    data.extend_from_slice(&word_uint(deadline as u128));
    append_address_array(&mut data, path);
    data
}

// ==================== decoding ====================

fn malformed(reason: impl Into<String>) -> ChainError {
    ChainError::InvalidResponse {
        reason: reason.into(),
    }
}

fn read_word(data: &[u8], index: usize) -> Result<&[u8], ChainError> {
    let start = index * 32;
    data.get(start..start + 32)
        .ok_or_else(|| malformed(format!("return data truncated at word {index}")))
}

fn word_to_u128(word: &[u8]) -> Result<u128, ChainError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(malformed("uint256 value exceeds supported range"));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

/// Decode a single uint256 return value.
pub fn decode_uint(data: &[u8]) -> Result<u128, ChainError> {
    word_to_u128(read_word(data, 0)?)
}

pub fn decode_u8(data: &[u8]) -> Result<u8, ChainError> {
    let value = decode_uint(data)?;
    u8::try_from(value).map_err(|_| malformed(format!("'{value}' does not fit in u8")))
}

/// Decode a `uint256[]` return value (`getAmountsOut` amounts).
pub fn decode_uint_array(data: &[u8]) -> Result<Vec<u128>, ChainError> {
    let offset = word_to_u128(read_word(data, 0)?)? as usize;
    if offset % 32 != 0 {
        return Err(malformed("array offset is not word-aligned"));
    }
    let len_index = offset / 32;
    let len = word_to_u128(read_word(data, len_index)?)? as usize;
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(word_to_u128(read_word(data, len_index + 1 + i)?)?);
    }
    Ok(out)
}

/// Decode a `string` return value.
///
/// Falls back to treating a bare 32-byte response as a null-padded
/// `bytes32`, which a few old tokens still return for `symbol()`.
pub fn decode_string(data: &[u8]) -> Result<String, ChainError> {
    if data.len() == 32 {
        let end = data.iter().position(|b| *b == 0).unwrap_or(32);
        return String::from_utf8(data[..end].to_vec())
            .map_err(|_| malformed("bytes32 string is not UTF-8"));
    }
    let offset = word_to_u128(read_word(data, 0)?)? as usize;
    let len_word = data
        .get(offset..offset + 32)
        .ok_or_else(|| malformed("string length out of bounds"))?;
    let len = word_to_u128(len_word)? as usize;
    let bytes = data
        .get(offset + 32..offset + 32 + len)
        .ok_or_else(|| malformed("string body out of bounds"))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| malformed("string is not UTF-8"))
}
