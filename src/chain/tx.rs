//! EIP-1559 typed-transaction assembly and signing.
//!
//! Payload shape: `0x02 || rlp([chain_id, nonce, max_priority_fee, max_fee,
//! gas, to, value, data, access_list])`, signed over the keccak of that
//! preimage, with `v, r, s` appended for the raw submission form.

use k256::ecdsa::SigningKey;

use crate::chain::abi::keccak256;
use crate::error::ChainError;

/// Fully resolved parameters for one transaction.
#[derive(Debug, Clone)]
pub struct TxParams {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: u128,
    pub data: Vec<u8>,
}

/// Sign a transaction, returning the raw bytes for `eth_sendRawTransaction`.
pub fn sign_transaction(key: &SigningKey, params: &TxParams) -> Result<Vec<u8>, ChainError> {
    let items = vec![
        rlp_bytes(&minimal_be(params.chain_id as u128)),
        rlp_bytes(&minimal_be(params.nonce as u128)),
        rlp_bytes(&minimal_be(params.max_priority_fee_per_gas)),
        rlp_bytes(&minimal_be(params.max_fee_per_gas)),
        rlp_bytes(&minimal_be(params.gas_limit as u128)),
        rlp_bytes(&params.to),
        rlp_bytes(&minimal_be(params.value)),
        rlp_bytes(&params.data),
        rlp_list(&[]),
    ];

    let unsigned = rlp_list(&items);
    let mut preimage = vec![0x02u8];
    preimage.extend_from_slice(&unsigned);
    let digest = keccak256(&preimage);

    let (signature, recovery_id) =
        key.sign_prehash_recoverable(&digest)
            .map_err(|e| ChainError::Submission {
                reason: format!("transaction signing failed: {e}"),
            })?;

    let sig_bytes = signature.to_bytes();
    let mut signed_items = items;
    signed_items.push(rlp_bytes(&minimal_be(recovery_id.to_byte() as u128)));
    signed_items.push(rlp_bytes(trim_leading_zeros(&sig_bytes[..32])));
    signed_items.push(rlp_bytes(trim_leading_zeros(&sig_bytes[32..])));

    let mut raw = vec![0x02u8];
    raw.extend_from_slice(&rlp_list(&signed_items));
    Ok(raw)
}

fn rlp_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    if data.is_empty() {
        return vec![0x80];
    }
    if data.len() <= 55 {
        let mut encoded = vec![0x80 + data.len() as u8];
        encoded.extend_from_slice(data);
        encoded
    } else {
        let len_bytes = minimal_be(data.len() as u128);
        let mut encoded = vec![0xb7 + len_bytes.len() as u8];
        encoded.extend_from_slice(&len_bytes);
        encoded.extend_from_slice(data);
        encoded
    }
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.iter().flatten().copied().collect();
    if payload.len() <= 55 {
        let mut encoded = vec![0xc0 + payload.len() as u8];
        encoded.extend_from_slice(&payload);
        encoded
    } else {
        let len_bytes = minimal_be(payload.len() as u128);
        let mut encoded = vec![0xf7 + len_bytes.len() as u8];
        encoded.extend_from_slice(&len_bytes);
        encoded.extend_from_slice(&payload);
        encoded
    }
}

/// Minimal big-endian representation; zero encodes as the empty string.
fn minimal_be(value: u128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}
