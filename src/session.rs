//! Recovered sessions and their on-disk export format.
//!
//! A recovered session is the externally usable artifact of a
//! conversion: the home datacenter, its address, and the raw auth key.
//! Consumers treat the written descriptor as an opaque credential.

use crate::account::{AccountError, AccountRecord};
use crate::crypto::AuthKey;
use crate::discover::AccountMeta;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// TLS port used by every known datacenter
pub const SESSION_PORT: u16 = 443;

/// Bootstrap address table of the known datacenters
const DC_TABLE: [(u32, &str); 5] = [
    (1, "149.154.175.53"),
    (2, "149.154.167.51"),
    (3, "149.154.175.100"),
    (4, "149.154.167.91"),
    (5, "91.108.56.130"),
];

#[derive(Debug, Error)]
/// Errors encountered assembling or persisting a session
pub enum ExportError {
    /// Home datacenter id has no known address mapping
    #[error("No known address for datacenter {0}")]
    UnknownDatacenter(u32),
    /// The account record could not supply its home auth key
    #[error("Account record unusable - {0}")]
    Account(#[from] AccountError),
    /// Session or metadata failed to serialize
    #[error("Could not serialize session - {0}")]
    Serialize(#[from] serde_json::Error),
    /// Filesystem error writing the output
    #[error("IO error writing session - {0}")]
    Io(#[from] std::io::Error),
}

/// Address of a known datacenter
pub fn dc_address(dc_id: u32) -> Option<&'static str> {
    DC_TABLE
        .iter()
        .find(|(id, _)| *id == dc_id)
        .map(|(_, addr)| *addr)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A usable authentication session recovered from a container
pub struct RecoveredSession {
    /// Home datacenter id
    pub dc_id: u32,
    /// Literal address of the home datacenter
    pub server_address: String,
    /// Always [`SESSION_PORT`]
    pub port: u16,
    /// Raw 256-byte auth key, hex-encoded on disk
    pub auth_key: AuthKey,
}

impl RecoveredSession {
    /// Assembles a session from a decrypted account record
    pub fn from_record(record: &AccountRecord) -> Result<RecoveredSession, ExportError> {
        let server_address = dc_address(record.main_dc)
            .ok_or(ExportError::UnknownDatacenter(record.main_dc))?;
        Ok(RecoveredSession {
            dc_id: record.main_dc,
            server_address: server_address.to_string(),
            port: SESSION_PORT,
            auth_key: record.main_auth_key()?.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
/// Sidecar metadata written next to an exported session
pub struct SessionMetadata {
    /// Phone number, when sidecar metadata supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// User id recovered from the account record
    pub user_id: u32,
    /// Username, when sidecar metadata supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Home datacenter id
    pub dc_id: u32,
    /// RFC 3339 timestamp of the conversion
    pub converted_at: String,
    /// API id, when sidecar metadata supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i32>,
    /// API hash, when sidecar metadata supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_hash: Option<String>,
}

impl SessionMetadata {
    /// Combines recovered fields with optional sidecar hints
    pub fn new(
        session: &RecoveredSession,
        user_id: u32,
        hint: Option<&AccountMeta>,
    ) -> SessionMetadata {
        SessionMetadata {
            phone_number: hint.map(|h| h.phone_number.clone()).filter(|p| !p.is_empty()),
            user_id,
            username: hint.and_then(|h| h.username.clone()),
            dc_id: session.dc_id,
            converted_at: Utc::now().to_rfc3339(),
            app_id: hint.and_then(|h| h.app_id),
            app_hash: hint.and_then(|h| h.app_hash.clone()),
        }
    }
}

/// Writes the session descriptor and its metadata sidecar.
///
/// Creates `out_dir` if absent (idempotent, safe to race). The file
/// stem is the phone number when known, otherwise a UTC timestamp.
/// Returns the path of the written descriptor.
pub fn export(
    out_dir: &Path,
    session: &RecoveredSession,
    metadata: &SessionMetadata,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(out_dir)?;

    let stem = match &metadata.phone_number {
        Some(phone) => phone.clone(),
        None => Utc::now().format("%Y%m%d%H%M%S").to_string(),
    };

    let session_path = out_dir.join(format!("{}.session", stem));
    fs::write(&session_path, serde_json::to_vec_pretty(session)?)?;
    fs::write(
        out_dir.join(format!("{}.json", stem)),
        serde_json::to_vec_pretty(metadata)?,
    )?;

    tracing::info!(path = %session_path.display(), "exported session");
    Ok(session_path)
}
