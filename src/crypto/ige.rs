//! AES-256 in IGE (Infinite Garble Extension) mode.
//!
//! IGE chains each block operation through both the previous ciphertext
//! and the previous plaintext block, so a single corrupted block
//! garbles everything after it. The RustCrypto cipher crates do not
//! ship this mode; the chaining is done here on top of the `aes` block
//! cipher. The 32-byte IV carries the two chaining seeds: the first
//! half is the ciphertext seed, the second half the plaintext seed.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

/// AES block size in bytes
pub(crate) const BLOCK_SIZE: usize = 16;

/// Decrypts `data`, which must be a whole number of blocks.
///
/// `P[i] = D(C[i] xor P[i-1]) xor C[i-1]`
pub(crate) fn decrypt(data: &[u8], key: &[u8; 32], iv: &[u8; 32]) -> Vec<u8> {
    debug_assert_eq!(data.len() % BLOCK_SIZE, 0);
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut out = Vec::with_capacity(data.len());

    let mut prev_cipher = [0u8; BLOCK_SIZE];
    let mut prev_plain = [0u8; BLOCK_SIZE];
    prev_cipher.copy_from_slice(&iv[..BLOCK_SIZE]);
    prev_plain.copy_from_slice(&iv[BLOCK_SIZE..]);

    for chunk in data.chunks_exact(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = chunk[i] ^ prev_plain[i];
        }
        let mut block = GenericArray::from(block);
        cipher.decrypt_block(&mut block);
        let mut plain: [u8; BLOCK_SIZE] = block.into();
        for (i, byte) in plain.iter_mut().enumerate() {
            *byte ^= prev_cipher[i];
        }
        out.extend_from_slice(&plain);
        prev_plain = plain;
        prev_cipher.copy_from_slice(chunk);
    }
    out
}

/// Encrypts `data`, which must be a whole number of blocks.
///
/// `C[i] = E(P[i] xor C[i-1]) xor P[i-1]`
pub(crate) fn encrypt(data: &[u8], key: &[u8; 32], iv: &[u8; 32]) -> Vec<u8> {
    debug_assert_eq!(data.len() % BLOCK_SIZE, 0);
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut out = Vec::with_capacity(data.len());

    let mut prev_cipher = [0u8; BLOCK_SIZE];
    let mut prev_plain = [0u8; BLOCK_SIZE];
    prev_cipher.copy_from_slice(&iv[..BLOCK_SIZE]);
    prev_plain.copy_from_slice(&iv[BLOCK_SIZE..]);

    for chunk in data.chunks_exact(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = chunk[i] ^ prev_cipher[i];
        }
        let mut block = GenericArray::from(block);
        cipher.encrypt_block(&mut block);
        let mut encrypted: [u8; BLOCK_SIZE] = block.into();
        for (i, byte) in encrypted.iter_mut().enumerate() {
            *byte ^= prev_plain[i];
        }
        out.extend_from_slice(&encrypted);
        prev_plain.copy_from_slice(chunk);
        prev_cipher = encrypted;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x11; 32];
    const IV: [u8; 32] = [0x22; 32];

    #[test]
    fn round_trip() {
        let plain: Vec<u8> = (0u8..64).collect();
        let encrypted = encrypt(&plain, &KEY, &IV);
        assert_ne!(encrypted, plain);
        assert_eq!(decrypt(&encrypted, &KEY, &IV), plain);
    }

    #[test]
    fn chaining_is_bidirectional() {
        // Identical plaintext blocks must not produce identical
        // ciphertext blocks, and corrupting block 0 must garble block 1.
        let plain = [0x5a_u8; 48];
        let mut encrypted = encrypt(&plain, &KEY, &IV);
        assert_ne!(encrypted[..16], encrypted[16..32]);

        encrypted[3] ^= 0x01;
        let garbled = decrypt(&encrypted, &KEY, &IV);
        assert_ne!(garbled[16..32], plain[16..32]);
    }

    #[test]
    fn iv_halves_seed_the_chains() {
        let plain = [0xc3_u8; 32];
        let mut other_iv = IV;
        other_iv[16] ^= 0xff;
        assert_ne!(encrypt(&plain, &KEY, &IV), encrypt(&plain, &KEY, &other_iv));
    }
}
