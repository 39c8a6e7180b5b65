//! Password-free inspection of a tdata directory.
//!
//! Everything here is a plain filesystem scan: no key material is
//! touched and nothing is decrypted. The catalog is a discovery aid for
//! deciding whether a directory is worth converting, not an
//! authoritative account list.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

/// Folder names that look like account folders but never are
const RESERVED_FOLDERS: [&str; 3] = ["user_data", "temp", "emoji"];

/// The global settings container: hashed like account data, but not an
/// account. `folder_hash("settings")` plus the data file marker.
const SETTINGS_FILE_NAME: &str = "E2D5A83AFD8AFE43s";

/// Trailing marker on account data file names
const DATA_FILE_MARKER: char = 's';

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
/// Non-authoritative account hints from a sidecar JSON file.
///
/// These files travel next to the container but are written by other
/// tooling; nothing in them is proof of identity.
pub struct AccountMeta {
    /// Phone number, taken from the file name
    #[serde(skip)]
    pub phone_number: String,
    /// Claimed numeric user id
    pub user_id: Option<u64>,
    /// Claimed username
    pub username: Option<String>,
    /// API id the account was registered with
    pub app_id: Option<i32>,
    /// API hash matching `app_id`
    pub app_hash: Option<String>,
}

#[derive(Debug, Default)]
/// Catalog of everything in a tdata directory that looks account-shaped
pub struct Catalog {
    /// Lower-bound estimate of how many accounts exist.
    ///
    /// The maximum of the three candidate counts below: each method can
    /// undercount, so the methods vote and the largest answer wins.
    pub account_count: usize,
    /// Candidate account folder names
    pub folders: Vec<String>,
    /// Candidate account data file names
    pub data_files: Vec<String>,
    /// Parsed sidecar metadata records
    pub metadata: Vec<AccountMeta>,
}

/// Scans a tdata directory without touching any key material
pub fn discover(root: &Path) -> io::Result<Catalog> {
    let mut catalog = Catalog::default();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        let is_dir = entry.file_type()?.is_dir();

        if is_dir && is_account_folder(&name) {
            catalog.folders.push(name);
        } else if !is_dir && is_data_file(&name) {
            catalog.data_files.push(name);
        } else if !is_dir && is_metadata_file(&name) {
            if let Some(meta) = read_metadata(&entry.path(), &name) {
                catalog.metadata.push(meta);
            }
        }
    }

    catalog.folders.sort();
    catalog.data_files.sort();
    catalog.metadata.sort_by(|a, b| a.phone_number.cmp(&b.phone_number));
    catalog.account_count = catalog
        .folders
        .len()
        .max(catalog.data_files.len())
        .max(catalog.metadata.len());

    tracing::debug!(
        folders = catalog.folders.len(),
        data_files = catalog.data_files.len(),
        metadata = catalog.metadata.len(),
        "scanned tdata directory"
    );
    Ok(catalog)
}

fn is_hex_name(name: &str) -> bool {
    name.len() == 16
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

fn is_account_folder(name: &str) -> bool {
    is_hex_name(name) && !RESERVED_FOLDERS.contains(&name)
}

fn is_data_file(name: &str) -> bool {
    match name.strip_suffix(DATA_FILE_MARKER) {
        Some(stem) => is_hex_name(stem) && name != SETTINGS_FILE_NAME,
        None => false,
    }
}

fn is_metadata_file(name: &str) -> bool {
    match name.strip_suffix(".json") {
        Some(stem) => {
            !stem.is_empty()
                && stem.bytes().all(|b| b.is_ascii_digit())
                && !name.contains("shortcuts")
                && !name.contains("config")
        }
        None => false,
    }
}

/// Best effort by design: sidecar files are advisory, so a file that
/// fails to parse is skipped, not fatal.
fn read_metadata(path: &Path, name: &str) -> Option<AccountMeta> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "skipping unreadable metadata file");
            return None;
        }
    };
    match serde_json::from_slice::<AccountMeta>(&bytes) {
        Ok(mut meta) => {
            meta.phone_number = name.trim_end_matches(".json").to_string();
            Some(meta)
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "skipping unparseable metadata file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::folder_hash;

    #[test]
    fn settings_name_matches_the_hash_scheme() {
        assert_eq!(format!("{}s", folder_hash("settings")), SETTINGS_FILE_NAME);
    }

    #[test]
    fn folder_name_filter() {
        assert!(is_account_folder("D877F783D5D3EF8C"));
        assert!(!is_account_folder("user_data"));
        assert!(!is_account_folder("d877f783d5d3ef8c"));
        assert!(!is_account_folder("D877F783D5D3EF8"));
    }

    #[test]
    fn data_file_filter() {
        assert!(is_data_file("D877F783D5D3EF8Cs"));
        assert!(!is_data_file("D877F783D5D3EF8C"));
        assert!(!is_data_file(SETTINGS_FILE_NAME));
    }

    #[test]
    fn metadata_file_filter() {
        assert!(is_metadata_file("79001234567.json"));
        assert!(!is_metadata_file("config.json"));
        assert!(!is_metadata_file("shortcuts-custom.json"));
        assert!(!is_metadata_file("notes.json"));
        assert!(!is_metadata_file(".json"));
    }
}
