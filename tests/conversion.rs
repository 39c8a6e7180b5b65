mod common;

use common::*;
use std::fs;
use tdata_session::errors::{AccountError, DecryptError, ExportError, UnlockError};
use tdata_session::{convert, ConvertOptions, Error};

fn options(password: &str, account_index: u32) -> ConvertOptions {
    ConvertOptions {
        password: password.to_string(),
        account_index,
        ..Default::default()
    }
}

#[test]
fn end_to_end_two_account_root() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_root(
        dir.path(),
        &[
            fixture_record(111_111, 2, 0xA1),
            fixture_record(222_222, 4, 0xB2),
        ],
        FIXTURE_PASSWORD,
    );

    let first = convert(dir.path(), &options(FIXTURE_PASSWORD, 0)).unwrap();
    assert_eq!(first.user_id, 111_111);
    assert_eq!(first.session.dc_id, 2);
    assert_eq!(first.session.server_address, "149.154.167.51");
    assert_eq!(first.session.port, 443);
    assert_eq!(first.session.auth_key, patterned_key(0xA1));

    let second = convert(dir.path(), &options(FIXTURE_PASSWORD, 1)).unwrap();
    assert_eq!(second.user_id, 222_222);
    assert_eq!(second.session.dc_id, 4);
    assert_eq!(second.session.auth_key, patterned_key(0xB2));
}

#[test]
fn out_of_range_index_is_rejected_before_any_file_read() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_root(
        dir.path(),
        &[
            fixture_record(111_111, 2, 0xA1),
            fixture_record(222_222, 4, 0xB2),
        ],
        FIXTURE_PASSWORD,
    );

    assert!(matches!(
        convert(dir.path(), &options(FIXTURE_PASSWORD, 5)),
        Err(Error::Account(AccountError::AccountIndexOutOfRange {
            index: 5,
            count: 2
        }))
    ));
}

#[test]
fn wrong_password_is_an_integrity_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_root(dir.path(), &[fixture_record(111_111, 2, 0xA1)], FIXTURE_PASSWORD);

    // Deliberately ambiguous: the error must not claim to know whether
    // the password was wrong or the container corrupt.
    assert!(matches!(
        convert(dir.path(), &options("wrong", 0)),
        Err(Error::Unlock(UnlockError::Decrypt(
            DecryptError::IntegrityFailure
        )))
    ));
}

#[test]
fn unmapped_datacenter_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_root(dir.path(), &[fixture_record(111_111, 9, 0xA1)], "");

    assert!(matches!(
        convert(dir.path(), &options("", 0)),
        Err(Error::Export(ExportError::UnknownDatacenter(9)))
    ));
}

#[test]
fn export_uses_sidecar_phone_number_for_the_stem() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_root(dir.path(), &[fixture_record(111_111, 2, 0xA1)], "");
    fs::write(
        dir.path().join("79001234567.json"),
        br#"{"user_id": 111111, "username": "alice", "app_id": 4, "app_hash": "abcd"}"#,
    )
    .unwrap();

    let conversion = convert(dir.path(), &options("", 0)).unwrap();
    let meta = conversion.metadata.as_ref().expect("sidecar metadata");
    assert_eq!(meta.phone_number, "79001234567");
    assert_eq!(meta.username.as_deref(), Some("alice"));

    let out_dir = tempfile::tempdir().unwrap();
    let metadata = tdata_session::session::SessionMetadata::new(
        &conversion.session,
        conversion.user_id,
        conversion.metadata.as_ref(),
    );
    let written =
        tdata_session::session::export(out_dir.path(), &conversion.session, &metadata).unwrap();

    assert_eq!(
        written.file_name().unwrap().to_str().unwrap(),
        "79001234567.session"
    );
    assert!(out_dir.path().join("79001234567.json").is_file());

    // The descriptor must be readable back as the same session.
    let descriptor: tdata_session::RecoveredSession =
        serde_json::from_slice(&fs::read(&written).unwrap()).unwrap();
    assert_eq!(descriptor.auth_key, conversion.session.auth_key);
    assert_eq!(descriptor.dc_id, 2);
}
