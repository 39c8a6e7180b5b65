use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors encountered loading a container file prior to decryption
pub enum ReadError {
    /// No physical variant of the container exists on disk
    #[error("No container variant found for {}", .0.display())]
    MissingFile(PathBuf),
    /// Container magic tag does not match the fixed constant
    #[error("Unsupported file type - container magic missing")]
    InvalidMagic,
    /// Trailing checksum did not match the recomputed one
    #[error("Corrupt container - {0}")]
    CorruptedContainer(String),
    /// File is shorter than the fixed magic/version/checksum layout
    #[error("Corrupt container - {0} bytes is too short for the fixed layout")]
    TruncatedContainer(usize),
}
