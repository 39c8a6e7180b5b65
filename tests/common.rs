//! Shared fixture helpers: builds complete synthetic tdata roots with
//! the crate's own write side, so the read pipeline is exercised
//! against real container layouts.

use std::path::Path;
use tdata_session::account::{self, AccountRecord};
use tdata_session::crypto::{AuthKey, AUTH_KEY_SIZE};
use tdata_session::keyfile::{KeyFile, SALT_SIZE};

/// Password used by every protected fixture root
#[allow(dead_code)] // Used across multiple test files
pub const FIXTURE_PASSWORD: &str = "pw1";

/// Deterministic 256-byte key: `seed`, `seed+1`, ... wrapping
#[allow(dead_code)]
pub fn patterned_key(seed: u8) -> AuthKey {
    let mut key = [0u8; AUTH_KEY_SIZE];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = seed.wrapping_add(i as u8);
    }
    AuthKey::from(key)
}

#[allow(dead_code)]
pub fn fixture_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    for (i, byte) in salt.iter_mut().enumerate() {
        *byte = i as u8;
    }
    salt
}

/// The local key every fixture root is written under
#[allow(dead_code)]
pub fn fixture_local_key() -> AuthKey {
    patterned_key(0x42)
}

/// A record whose home-datacenter key is `patterned_key(seed)`
#[allow(dead_code)]
pub fn fixture_record(user_id: u32, main_dc: u32, seed: u8) -> AccountRecord {
    AccountRecord {
        user_id,
        main_dc,
        auth_keys: vec![
            (1, patterned_key(seed.wrapping_add(100))),
            (main_dc, patterned_key(seed)),
        ],
    }
}

/// Writes a key file and one data file per record under `root`
#[allow(dead_code)]
pub fn write_fixture_root(root: &Path, records: &[AccountRecord], password: &str) {
    let local_key = fixture_local_key();
    let indices: Vec<u32> = (0..records.len() as u32).collect();
    KeyFile::compose(fixture_salt(), &local_key, &indices, password)
        .write(root, "data")
        .unwrap();
    for (index, record) in records.iter().enumerate() {
        account::write_account(root, "data", index as u32, &local_key, record).unwrap();
    }
}
