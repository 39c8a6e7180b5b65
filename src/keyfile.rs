//! The key file: a stored salt plus the encrypted local key and the
//! encrypted account info block.
//!
//! Unlocking is a two-stage decryption. The password and salt derive a
//! passcode key which opens the key blob; its plaintext is the 256-byte
//! local key, which in turn opens the info blob (and later every
//! account data file). A wrong password surfaces as
//! [`DecryptError::IntegrityFailure`] on the first stage.

use crate::binary::errors::ReadError;
use crate::binary::{self, BytesReader, Container, StreamError};
use crate::crypto::{self, AuthKey, DecryptError, AUTH_KEY_SIZE};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Data name used by single-profile installations
pub const DEFAULT_DATA_NAME: &str = "data";

/// Required length of the stored salt
pub const SALT_SIZE: usize = 32;

/// Base file name of the key file for a given data name
pub fn key_file_name(data_name: &str) -> String {
    format!("key_{}", data_name)
}

#[derive(Debug, Error)]
/// Errors encountered recovering the local key from a key file
pub enum UnlockError {
    /// The key file container could not be loaded
    #[error("Could not read key file - {0}")]
    Read(#[from] ReadError),
    /// The container payload does not hold the three expected buffers
    #[error("Malformed key file - {0}")]
    Malformed(#[from] StreamError),
    /// Stored salt has the wrong length
    #[error("Stored salt is {0} bytes, expected exactly 32")]
    SaltLengthInvalid(usize),
    /// A decryption stage failed its integrity check
    #[error("Decryption failed - {0}")]
    Decrypt(#[from] DecryptError),
    /// The decrypted key blob is too short to hold a local key
    #[error("Decrypted key data is {0} bytes, too short for a local key")]
    KeyDataTooShort(usize),
}

#[derive(Debug)]
/// A parsed but still encrypted key file
pub struct KeyFile {
    /// Container format version the key file was read from
    pub version: u32,
    salt: Vec<u8>,
    encrypted_key: Vec<u8>,
    encrypted_info: Vec<u8>,
}

#[derive(Debug)]
/// Result of unlocking a key file
pub struct UnlockedKey {
    /// The 256-byte master key for all further decryption
    pub local_key: AuthKey,
    /// Number of accounts recorded in the info block
    pub account_count: u32,
}

impl KeyFile {
    /// Loads the key file for `data_name` from a tdata directory
    pub fn open(root: &Path, data_name: &str) -> Result<KeyFile, UnlockError> {
        let container = Container::open(&root.join(key_file_name(data_name)))?;
        KeyFile::from_container(&container)
    }

    /// Parses a key file out of an already loaded container
    pub fn from_container(container: &Container) -> Result<KeyFile, UnlockError> {
        let mut reader = BytesReader::new(&container.payload);
        let salt = reader.read_buffer()?.to_vec();
        if salt.len() != SALT_SIZE {
            return Err(UnlockError::SaltLengthInvalid(salt.len()));
        }
        let encrypted_key = reader.read_buffer()?.to_vec();
        let encrypted_info = reader.read_buffer()?.to_vec();
        Ok(KeyFile {
            version: container.version,
            salt,
            encrypted_key,
            encrypted_info,
        })
    }

    /// Recovers the local key and the account count.
    ///
    /// An incorrect password fails with an integrity error on the key
    /// blob - indistinguishable from corruption by design.
    pub fn unlock(&self, password: &str) -> Result<UnlockedKey, UnlockError> {
        let passcode_key = crypto::create_local_key(&self.salt, password);

        let key_plain = crypto::decrypt_local(&self.encrypted_key, &passcode_key)?;
        if key_plain.len() < AUTH_KEY_SIZE {
            return Err(UnlockError::KeyDataTooShort(key_plain.len()));
        }
        let mut local_key = [0u8; AUTH_KEY_SIZE];
        local_key.copy_from_slice(&key_plain[..AUTH_KEY_SIZE]);
        let local_key = AuthKey::from(local_key);

        let info_plain = crypto::decrypt_local(&self.encrypted_info, &local_key)?;
        let account_count = BytesReader::new(&info_plain).read_u32()?;
        tracing::debug!(account_count, "unlocked key file");

        Ok(UnlockedKey {
            local_key,
            account_count,
        })
    }

    /// Composes a key file protecting `local_key` with `password`.
    ///
    /// The info block stores the account count followed by the account
    /// indices, the way the original client writes it.
    pub fn compose(
        salt: [u8; SALT_SIZE],
        local_key: &AuthKey,
        account_indices: &[u32],
        password: &str,
    ) -> KeyFile {
        let passcode_key = crypto::create_local_key(&salt, password);
        let encrypted_key = crypto::encrypt_local(local_key.as_bytes(), &passcode_key);

        let mut info = Vec::with_capacity(4 + 4 * account_indices.len());
        binary::write_u32(&mut info, account_indices.len() as u32);
        for index in account_indices {
            binary::write_u32(&mut info, *index);
        }
        let encrypted_info = crypto::encrypt_local(&info, local_key);

        KeyFile {
            version: binary::COMPOSED_VERSION,
            salt: salt.to_vec(),
            encrypted_key,
            encrypted_info,
        }
    }

    /// Writes the key file under its `"s"` rotation variant
    pub fn write(&self, root: &Path, data_name: &str) -> io::Result<()> {
        let mut payload = Vec::new();
        binary::write_buffer(&mut payload, &self.salt);
        binary::write_buffer(&mut payload, &self.encrypted_key);
        binary::write_buffer(&mut payload, &self.encrypted_info);
        let container = Container::new(self.version, payload);
        let base = root.join(key_file_name(data_name));
        container.write_to(&binary::variant_path(&base, "s"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_local_key() -> AuthKey {
        let mut key = [0u8; AUTH_KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        AuthKey::from(key)
    }

    #[test]
    fn compose_then_unlock() {
        let key_file = KeyFile::compose([7; SALT_SIZE], &fixture_local_key(), &[0, 1], "pw1");
        let unlocked = key_file.unlock("pw1").unwrap();
        assert_eq!(unlocked.local_key, fixture_local_key());
        assert_eq!(unlocked.account_count, 2);
    }

    #[test]
    fn wrong_password_is_an_integrity_failure() {
        let key_file = KeyFile::compose([7; SALT_SIZE], &fixture_local_key(), &[0], "pw1");
        assert!(matches!(
            key_file.unlock("wrong"),
            Err(UnlockError::Decrypt(DecryptError::IntegrityFailure))
        ));
    }

    #[test]
    fn short_salt_is_rejected() {
        let mut payload = Vec::new();
        binary::write_buffer(&mut payload, &[0u8; 16]);
        binary::write_buffer(&mut payload, b"");
        binary::write_buffer(&mut payload, b"");
        let container = Container::new(1, payload);
        assert!(matches!(
            KeyFile::from_container(&container),
            Err(UnlockError::SaltLengthInvalid(16))
        ));
    }

    #[test]
    fn key_file_names() {
        assert_eq!(key_file_name(DEFAULT_DATA_NAME), "key_data");
        assert_eq!(key_file_name("other"), "key_other");
    }
}
