//! Per-account data records and where they live on disk.
//!
//! Each account's data file sits in the tdata directory under a
//! 16-character name derived from the MD5 of its data name. The file
//! decrypts with the local key into an authorization record: the
//! account's user id, its home datacenter, and one 256-byte auth key
//! per datacenter the client had a session with.

use crate::binary::errors::ReadError;
use crate::binary::{self, BytesReader, Container, StreamError};
use crate::crypto::{self, AuthKey, DecryptError, AUTH_KEY_SIZE};
use md5::{Digest, Md5};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Format version constant embedded in account data blocks
pub const ACCOUNT_DATA_VERSION: u32 = 75;

/// Reserved bytes preceding the user id. Their internal structure is
/// undocumented upstream; they are skipped verbatim, never parsed.
const RESERVED_PREFIX_SIZE: usize = 12;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Debug, Error)]
/// Errors encountered recovering one account's record
pub enum AccountError {
    /// Requested index is not below the discovered account count
    #[error("Account index {index} out of range - {count} accounts present")]
    AccountIndexOutOfRange {
        /// The requested zero-based index
        index: u32,
        /// Account count recovered from the key file
        count: u32,
    },
    /// The account data container could not be loaded
    #[error("Could not read account data - {0}")]
    Read(#[from] ReadError),
    /// Decryption with the local key failed its integrity check
    #[error("Decryption failed - {0}")]
    Decrypt(#[from] DecryptError),
    /// Embedded format version is not the supported constant
    #[error("Unsupported account data version {0}")]
    UnsupportedFormatVersion(u32),
    /// The decrypted record is structurally broken
    #[error("Malformed account data - {0}")]
    Malformed(#[from] StreamError),
    /// Declared key count cannot fit in the remaining record bytes
    #[error("Account data declares {0} keys, more than the record holds")]
    KeyCountInvalid(u32),
    /// No key entry matches the account's home datacenter
    #[error("No auth key stored for home datacenter {0}")]
    AuthKeyNotFoundForDc(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One account's decrypted authorization record
pub struct AccountRecord {
    /// Numeric user id of the account
    pub user_id: u32,
    /// Home datacenter the account is tied to
    pub main_dc: u32,
    /// Stored `(dc_id, auth_key)` entries, in file order
    pub auth_keys: Vec<(u32, AuthKey)>,
}

impl AccountRecord {
    /// The auth key for the account's home datacenter.
    ///
    /// Entries are scanned in file order and the first match wins.
    pub fn main_auth_key(&self) -> Result<&AuthKey, AccountError> {
        self.auth_keys
            .iter()
            .find(|(dc_id, _)| *dc_id == self.main_dc)
            .map(|(_, key)| key)
            .ok_or(AccountError::AuthKeyNotFoundForDc(self.main_dc))
    }
}

/// Data name for the account at `index`: the base name alone for the
/// first account, `name#<index+1>` for the rest
pub fn compose_data_name(data_name: &str, index: u32) -> String {
    if index == 0 {
        data_name.to_string()
    } else {
        format!("{}#{}", data_name, index + 1)
    }
}

/// On-disk name for a data name.
///
/// The first sixteen characters of the uppercase MD5 hex digest with
/// every adjacent pair of characters swapped. The swap is how the
/// source format spells its file names; a plain hex digest does not
/// locate any real file.
pub fn folder_hash(name: &str) -> String {
    let digest = Md5::digest(name.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in &digest[..8] {
        out.push(HEX_UPPER[(byte & 0x0F) as usize] as char);
        out.push(HEX_UPPER[(byte >> 4) as usize] as char);
    }
    out
}

/// Reads and decrypts the account record at `index`
pub fn read_account(
    root: &Path,
    data_name: &str,
    index: u32,
    local_key: &AuthKey,
    account_count: u32,
) -> Result<AccountRecord, AccountError> {
    if index >= account_count {
        return Err(AccountError::AccountIndexOutOfRange {
            index,
            count: account_count,
        });
    }
    let name = compose_data_name(data_name, index);
    let container = Container::open(&root.join(folder_hash(&name)))?;
    let plain = crypto::decrypt_local(&container.payload, local_key)?;
    let record = parse_account_data(&plain)?;
    tracing::debug!(
        user_id = record.user_id,
        main_dc = record.main_dc,
        keys = record.auth_keys.len(),
        "recovered account record"
    );
    Ok(record)
}

fn parse_account_data(data: &[u8]) -> Result<AccountRecord, AccountError> {
    let mut reader = BytesReader::new(data);
    let version = reader.read_u32()?;
    if version != ACCOUNT_DATA_VERSION {
        return Err(AccountError::UnsupportedFormatVersion(version));
    }

    let mut reader = BytesReader::new(reader.read_buffer()?);
    reader.skip(RESERVED_PREFIX_SIZE)?;
    let user_id = reader.read_u32()?;
    let main_dc = reader.read_u32()?;

    let key_count = reader.read_u32()?;
    if key_count as usize > reader.remaining() / (4 + AUTH_KEY_SIZE) {
        return Err(AccountError::KeyCountInvalid(key_count));
    }
    let mut auth_keys = Vec::with_capacity(key_count as usize);
    for _ in 0..key_count {
        let dc_id = reader.read_u32()?;
        let mut key = [0u8; AUTH_KEY_SIZE];
        key.copy_from_slice(reader.read_slice(AUTH_KEY_SIZE)?);
        auth_keys.push((dc_id, AuthKey::from(key)));
    }

    Ok(AccountRecord {
        user_id,
        main_dc,
        auth_keys,
    })
}

/// Serializes an account record to the layout [`parse_account_data`]
/// reads; the reserved prefix is zeroed
pub fn compose_account_data(record: &AccountRecord) -> Vec<u8> {
    let mut inner = Vec::new();
    inner.extend_from_slice(&[0u8; RESERVED_PREFIX_SIZE]);
    binary::write_u32(&mut inner, record.user_id);
    binary::write_u32(&mut inner, record.main_dc);
    binary::write_u32(&mut inner, record.auth_keys.len() as u32);
    for (dc_id, key) in &record.auth_keys {
        binary::write_u32(&mut inner, *dc_id);
        inner.extend_from_slice(key.as_bytes());
    }

    let mut out = Vec::with_capacity(8 + inner.len());
    binary::write_u32(&mut out, ACCOUNT_DATA_VERSION);
    binary::write_buffer(&mut out, &inner);
    out
}

/// Encrypts and writes the record for account `index` under its hashed
/// file name, `"s"` rotation variant
pub fn write_account(
    root: &Path,
    data_name: &str,
    index: u32,
    local_key: &AuthKey,
    record: &AccountRecord,
) -> io::Result<()> {
    let encrypted = crypto::encrypt_local(&compose_account_data(record), local_key);
    let container = Container::new(binary::COMPOSED_VERSION, encrypted);
    let base = root.join(folder_hash(&compose_data_name(data_name, index)));
    container.write_to(&binary::variant_path(&base, "s"))
}
