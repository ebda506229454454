//! Wallet address derivation from public keys.
//!
//! Address format: base58(public_key) using the Bitcoin alphabet, as wallets
//! display it. Leading zero bytes encode as leading `1` characters. A 32-byte
//! key encodes to 32..=44 characters.

use tokengate_types::{PublicKey, WalletAddress};

/// Base58 alphabet (no 0, O, I or l).
const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Reverse lookup table: ASCII byte → digit value (0xFF = invalid).
const BASE58_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let alpha = BASE58_ALPHABET;
    let mut i = 0;
    while i < 58 {
        table[alpha[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Longest possible encoding of 32 bytes.
const MAX_ENCODED_LEN: usize = 44;

/// Encode bytes as base58.
fn encode_base58(bytes: &[u8]) -> String {
    let zeros = bytes.iter().take_while(|&&b| b == 0).count();

    // Little-endian base-58 digits of the big-endian input number.
    let mut digits: Vec<u8> = Vec::with_capacity(bytes.len() * 138 / 100 + 1);
    for &byte in &bytes[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut result = String::with_capacity(zeros + digits.len());
    for _ in 0..zeros {
        result.push('1');
    }
    for &d in digits.iter().rev() {
        result.push(BASE58_ALPHABET[d as usize] as char);
    }
    result
}

/// Decode a base58 string into exactly `N` bytes. Returns `None` on invalid
/// characters or when the decoded value does not have length `N`.
fn decode_base58_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let zeros = s.bytes().take_while(|&c| c == b'1').count();

    // Little-endian base-256 bytes of the number.
    let mut bytes: Vec<u8> = Vec::with_capacity(N);
    for c in s.bytes().skip(zeros) {
        if c >= 128 {
            return None;
        }
        let val = BASE58_DECODE[c as usize];
        if val == 0xFF {
            return None;
        }
        let mut carry = val as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
        if zeros + bytes.len() > N {
            return None;
        }
    }

    if zeros + bytes.len() != N {
        return None;
    }
    let mut result = [0u8; N];
    for (i, b) in bytes.iter().rev().enumerate() {
        result[zeros + i] = *b;
    }
    Some(result)
}

/// Derive the wallet address for a public key.
pub fn derive_address(public_key: &PublicKey) -> WalletAddress {
    WalletAddress::new(encode_base58(public_key.as_bytes()))
}

/// Extract the public key bytes from a wallet address.
///
/// Returns `None` if the address is not base58 or does not decode to 32 bytes.
pub fn decode_address(address: &str) -> Option<[u8; 32]> {
    if address.is_empty() || address.len() > MAX_ENCODED_LEN {
        return None;
    }
    decode_base58_fixed(address)
}

/// Parse a base58 public key as submitted by a wallet.
pub fn parse_public_key(encoded: &str) -> Option<PublicKey> {
    decode_address(encoded).map(PublicKey)
}
