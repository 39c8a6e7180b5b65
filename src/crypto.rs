//! Key derivation and the at-rest encryption primitive.
//!
//! Everything in the store is protected by one scheme: a 16-byte
//! message key prefixed to the ciphertext both selects the AES key/IV
//! (through four SHA-1 digests over fixed windows of a 256-byte key)
//! and, after decryption, verifies the plaintext. The same primitive is
//! applied three times per conversion, with three different keys: the
//! password-derived key opens the key file's key blob, the recovered
//! local key opens the info blob and every account data file.

mod ige;

use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};
use sha2::Sha512;
use std::fmt;
use thiserror::Error;

/// Size in bytes of every symmetric key used by the store
pub const AUTH_KEY_SIZE: usize = 256;

/// Size of the message key prefixed to each encrypted blob
pub const MESSAGE_KEY_SIZE: usize = 16;

/// PBKDF2 iteration count of the legacy desktop format. A single
/// iteration is what the format actually uses; raising it produces keys
/// that fail the integrity check against real containers.
const KDF_ITERATIONS: u32 = 1;

/// Offset of the key windows used below. The store always derives with
/// the receiving-side offset of the original wire scheme.
const KEY_WINDOW_OFFSET: usize = 8;

#[derive(Debug, Error)]
/// Errors from the at-rest decryption primitive
pub enum DecryptError {
    /// Blob is not a message key followed by whole cipher blocks
    #[error("Encrypted blob has invalid size {0}")]
    CiphertextSize(usize),
    /// Recomputed plaintext hash does not match the message key.
    ///
    /// A wrong password and corrupted ciphertext are indistinguishable
    /// at this layer; callers must not present this as one or the other.
    #[error("Integrity check failed - wrong password or corrupt data")]
    IntegrityFailure,
    /// Packed length header of the plaintext is out of range
    #[error("Decrypted data has invalid packed length {0}")]
    PackedLengthInvalid(usize),
}

#[derive(Clone, PartialEq, Eq)]
/// A 256-byte symmetric key.
///
/// Used for the password-derived key, the recovered local key, and the
/// per-datacenter account keys alike.
pub struct AuthKey([u8; AUTH_KEY_SIZE]);

impl AuthKey {
    /// Builds a key from a slice, if it has exactly the right length
    pub fn from_slice(bytes: &[u8]) -> Option<AuthKey> {
        if bytes.len() != AUTH_KEY_SIZE {
            return None;
        }
        let mut key = [0u8; AUTH_KEY_SIZE];
        key.copy_from_slice(bytes);
        Some(AuthKey(key))
    }

    /// Raw key material
    pub fn as_bytes(&self) -> &[u8; AUTH_KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; AUTH_KEY_SIZE]> for AuthKey {
    fn from(bytes: [u8; AUTH_KEY_SIZE]) -> AuthKey {
        AuthKey(bytes)
    }
}

// Keys end up in debug logs; print a fingerprint, not the material.
impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthKey({}..)", hex::encode(&self.0[..4]))
    }
}

impl serde::Serialize for AuthKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> serde::Deserialize<'de> for AuthKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<AuthKey, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        AuthKey::from_slice(&bytes)
            .ok_or_else(|| serde::de::Error::custom(format!("key is {} bytes", bytes.len())))
    }
}

/// Derives the 256-byte key protecting the key file.
///
/// `SHA-512(salt || password || salt)` hashed once more through
/// PBKDF2-HMAC-SHA512 with the salt. The password may be empty; most
/// real containers are not passcode protected.
pub fn create_local_key(salt: &[u8], password: &str) -> AuthKey {
    let mut hasher = Sha512::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.update(salt);
    let digest = hasher.finalize();

    let mut key = [0u8; AUTH_KEY_SIZE];
    pbkdf2::<Hmac<Sha512>>(&digest, salt, KDF_ITERATIONS, &mut key)
        .expect("HMAC-SHA512 accepts any key length");
    AuthKey(key)
}

fn sha1_parts(parts: &[&[u8]]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Derives the AES key and IV from the key and a message key.
///
/// Four SHA-1 digests over fixed, non-overlapping windows of the key
/// mixed with the message key, sliced and concatenated in the fixed
/// pattern of the legacy at-rest scheme. Must match it bit for bit.
fn prepare_key_iv(key: &AuthKey, message_key: &[u8]) -> ([u8; 32], [u8; 32]) {
    let k = key.as_bytes();
    let x = KEY_WINDOW_OFFSET;

    let sha1_a = sha1_parts(&[message_key, &k[x..x + 32]]);
    let sha1_b = sha1_parts(&[&k[x + 32..x + 48], message_key, &k[x + 48..x + 64]]);
    let sha1_c = sha1_parts(&[&k[x + 64..x + 96], message_key]);
    let sha1_d = sha1_parts(&[message_key, &k[x + 96..x + 128]]);

    let mut aes_key = [0u8; 32];
    aes_key[..8].copy_from_slice(&sha1_a[..8]);
    aes_key[8..20].copy_from_slice(&sha1_b[8..20]);
    aes_key[20..].copy_from_slice(&sha1_c[4..16]);

    let mut aes_iv = [0u8; 32];
    aes_iv[..12].copy_from_slice(&sha1_a[8..20]);
    aes_iv[12..20].copy_from_slice(&sha1_b[..8]);
    aes_iv[20..24].copy_from_slice(&sha1_c[16..20]);
    aes_iv[24..].copy_from_slice(&sha1_d[..8]);

    (aes_key, aes_iv)
}

/// Decrypts one at-rest blob: `message_key(16) || ciphertext`.
///
/// Verifies that `SHA-1(plaintext)` starts with the message key, then
/// strips the little-endian packed length header (which counts itself)
/// and returns the payload inside it.
pub fn decrypt_local(encrypted: &[u8], key: &AuthKey) -> Result<Vec<u8>, DecryptError> {
    let payload_len = encrypted.len().saturating_sub(MESSAGE_KEY_SIZE);
    if payload_len == 0 || payload_len % ige::BLOCK_SIZE != 0 {
        return Err(DecryptError::CiphertextSize(encrypted.len()));
    }
    let (message_key, ciphertext) = encrypted.split_at(MESSAGE_KEY_SIZE);

    let (aes_key, aes_iv) = prepare_key_iv(key, message_key);
    let plain = ige::decrypt(ciphertext, &aes_key, &aes_iv);

    if sha1_parts(&[&plain])[..MESSAGE_KEY_SIZE] != *message_key {
        return Err(DecryptError::IntegrityFailure);
    }

    let packed_len = u32::from_le_bytes([plain[0], plain[1], plain[2], plain[3]]) as usize;
    if packed_len < 4 || packed_len > plain.len() {
        return Err(DecryptError::PackedLengthInvalid(packed_len));
    }
    Ok(plain[4..packed_len].to_vec())
}

/// Mirror image of [`decrypt_local`].
///
/// Prepends the packed length header, pads to a whole number of blocks
/// with OS randomness, and takes the message key from the SHA-1 of the
/// padded plaintext.
pub fn encrypt_local(data: &[u8], key: &AuthKey) -> Vec<u8> {
    let packed_len = 4 + data.len();
    let padded_len = (packed_len + ige::BLOCK_SIZE - 1) & !(ige::BLOCK_SIZE - 1);

    let mut plain = vec![0u8; padded_len];
    plain[..4].copy_from_slice(&(packed_len as u32).to_le_bytes());
    plain[4..packed_len].copy_from_slice(data);
    OsRng.fill_bytes(&mut plain[packed_len..]);

    let plain_digest = sha1_parts(&[&plain]);
    let message_key = &plain_digest[..MESSAGE_KEY_SIZE];
    let (aes_key, aes_iv) = prepare_key_iv(key, message_key);

    let mut out = Vec::with_capacity(MESSAGE_KEY_SIZE + plain.len());
    out.extend_from_slice(message_key);
    out.extend_from_slice(&ige::encrypt(&plain, &aes_key, &aes_iv));
    out
}
