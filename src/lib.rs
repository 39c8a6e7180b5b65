#![deny(missing_docs)]

//! Module to read Telegram Desktop's encrypted `tdata` credential store
//! and recover usable authentication sessions from it.
//!
//! The store is a directory of container files in a proprietary at-rest
//! format: an MD5-checksummed outer layout around AES-256-IGE encrypted
//! payloads, keyed through a salt, an optional local passcode, and a
//! 256-byte local key. This crate reimplements that pipeline offline -
//! no network, nothing in the source directory is ever written to.
//!
//! # Discovering accounts
//!
//! [`discover()`] catalogs a directory without touching key material:
//!
//! ```no_run
//! # fn main() -> Result<(), tdata_session::Error> {
//! let catalog = tdata_session::discover(std::path::Path::new("/path/to/tdata"))?;
//! println!("about {} account(s)", catalog.account_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Recovering a session
//!
//! [`convert()`] runs the full pipeline for one account index and returns
//! the portable session descriptor:
//!
//! ```no_run
//! use tdata_session::{ConvertOptions, session};
//!
//! # fn main() -> Result<(), tdata_session::Error> {
//! let root = std::path::Path::new("/path/to/tdata");
//! let conversion = tdata_session::convert(root, &ConvertOptions::default())?;
//!
//! let metadata = session::SessionMetadata::new(
//!     &conversion.session,
//!     conversion.user_id,
//!     conversion.metadata.as_ref(),
//! );
//! session::export(std::path::Path::new("./sessions"), &conversion.session, &metadata)?;
//! # Ok(())
//! # }
//! ```
//!
//! A passcode-protected store takes the password through
//! [`ConvertOptions`]; a wrong one fails with an integrity error that
//! is deliberately indistinguishable from a corrupted container.

pub mod account;
pub mod binary;
pub mod crypto;
pub mod discover;
pub mod errors;
pub mod keyfile;
pub mod session;

use std::path::Path;

pub use account::AccountRecord;
pub use crypto::AuthKey;
pub use discover::{AccountMeta, Catalog};
pub use errors::Error;
pub use session::RecoveredSession;

#[doc(inline)]
pub use discover::discover;

#[derive(Debug, Clone)]
/// Options for one conversion request
pub struct ConvertOptions {
    /// Local passcode; empty for unprotected stores
    pub password: String,
    /// Zero-based index of the account to recover
    pub account_index: u32,
    /// Base data name of the profile, almost always `"data"`
    pub data_name: String,
}

impl Default for ConvertOptions {
    fn default() -> ConvertOptions {
        ConvertOptions {
            password: String::new(),
            account_index: 0,
            data_name: keyfile::DEFAULT_DATA_NAME.to_string(),
        }
    }
}

#[derive(Debug)]
/// Outcome of a successful conversion
pub struct Conversion {
    /// The recovered, externally usable session
    pub session: RecoveredSession,
    /// User id from the decrypted account record
    pub user_id: u32,
    /// Matching sidecar metadata, when any was found
    pub metadata: Option<AccountMeta>,
}

/// Recovers one account's session from a tdata directory.
///
/// Reads the key file, derives the passcode key, recovers the local
/// key, decrypts the requested account record and assembles the
/// session. Fails with exactly one typed error; no partial session is
/// ever returned.
pub fn convert(tdata_root: &Path, options: &ConvertOptions) -> Result<Conversion, Error> {
    let key_file = keyfile::KeyFile::open(tdata_root, &options.data_name)?;
    let unlocked = key_file.unlock(&options.password)?;

    let record = account::read_account(
        tdata_root,
        &options.data_name,
        options.account_index,
        &unlocked.local_key,
        unlocked.account_count,
    )?;
    let session = RecoveredSession::from_record(&record)?;
    let metadata = sidecar_metadata(tdata_root, &record, unlocked.account_count);

    Ok(Conversion {
        session,
        user_id: record.user_id,
        metadata,
    })
}

/// Sidecar files are advisory, so any failure here degrades to "no
/// metadata" instead of failing the conversion.
fn sidecar_metadata(
    root: &Path,
    record: &account::AccountRecord,
    account_count: u32,
) -> Option<AccountMeta> {
    let catalog = match discover::discover(root) {
        Ok(catalog) => catalog,
        Err(err) => {
            tracing::debug!(%err, "skipping sidecar metadata scan");
            return None;
        }
    };

    let by_user_id = catalog
        .metadata
        .iter()
        .find(|meta| meta.user_id == Some(record.user_id as u64));
    if let Some(meta) = by_user_id {
        return Some(meta.clone());
    }
    // A single-account root with a single sidecar file is unambiguous
    // even without a user id in it.
    if account_count == 1 && catalog.metadata.len() == 1 {
        return catalog.metadata.into_iter().next();
    }
    None
}
