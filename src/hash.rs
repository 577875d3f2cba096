//! FNV-1a hash utilities for `MerkleTree` bucket routing.
//!
//! Provides a 32-bit FNV-1a hash over UTF-8 bytes. The offset basis
//! (`0x811c9dc5`) and prime (`0x01000193`) are part of the wire contract:
//! peers compare Merkle root/bucket hashes directly, so any implementation
//! computing a different hash for the same bytes cannot sync.

/// FNV-1a offset basis.
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
/// FNV-1a prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes the 32-bit FNV-1a hash of a string's UTF-8 bytes.
///
/// # Examples
///
/// ```
/// use lattice_kv::hash::fnv1a_hash;
///
/// let h1 = fnv1a_hash("hello");
/// let h2 = fnv1a_hash("hello");
/// assert_eq!(h1, h2);
/// ```
#[must_use]
pub fn fnv1a_hash(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Combines multiple hashes by summing them modulo 2^32 (wrapping addition).
///
/// Used to roll up child hashes into a parent Merkle node hash.
#[must_use]
pub fn combine_hashes(hashes: &[u32]) -> u32 {
    hashes.iter().fold(0u32, |acc, h| acc.wrapping_add(*h))
}

/// Encodes a `u32` hash as a zero-padded 8-character hex string.
///
/// Used to derive Merkle trie bucket paths from key hashes.
#[must_use]
pub fn hash_to_hex(hash: u32) -> String {
    format!("{hash:08x}")
}
