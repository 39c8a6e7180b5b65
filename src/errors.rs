//! Error types for tdata-session

pub use crate::account::AccountError;
pub use crate::binary::errors::ReadError;
pub use crate::binary::StreamError;
pub use crate::crypto::DecryptError;
pub use crate::keyfile::UnlockError;
pub use crate::session::ExportError;
use thiserror::Error;

#[derive(Error, Debug)]
/// Wrapper error type for this library
pub enum Error {
    /// Failed loading a container file
    #[error("Could not read container: {0}")]
    Read(#[from] ReadError),
    /// Failed recovering the local key from the key file
    #[error("Could not unlock key file: {0}")]
    Unlock(#[from] UnlockError),
    /// Failed recovering an account record
    #[error("Could not read account data: {0}")]
    Account(#[from] AccountError),
    /// Failed assembling or persisting a session
    #[error("Could not export session: {0}")]
    Export(#[from] ExportError),
    /// Failed inspecting the source directory
    #[error("IO error inspecting tdata directory: {0}")]
    Io(#[from] std::io::Error),
}
