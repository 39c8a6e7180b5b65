use super::errors::ReadError;
use md5::{Digest, Md5};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Magic tag at the start of every container file
pub const CONTAINER_MAGIC: [u8; 4] = *b"TDF$";

/// Size of the trailing MD5 checksum
pub const CHECKSUM_SIZE: usize = 16;

/// Rotation suffixes of a container, in the priority order they are tried
pub const VARIANT_SUFFIXES: [&str; 4] = ["", "0", "1", "s"];

/// Format version stamped into containers composed by this crate
pub const COMPOSED_VERSION: u32 = 1;

const HEADER_SIZE: usize = CONTAINER_MAGIC.len() + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One physical file of the at-rest container format.
///
/// On disk the layout is fixed: the 4-byte magic tag, a 4-byte
/// little-endian version, the payload, and a trailing 16-byte MD5
/// checksum over `payload || LE32(payload length) || version || magic`.
pub struct Container {
    /// Format version recorded in the file header
    pub version: u32,
    /// Raw payload between the header and the checksum
    pub payload: Vec<u8>,
}

impl Container {
    /// Wraps a payload for writing
    pub fn new(version: u32, payload: Vec<u8>) -> Container {
        Container { version, payload }
    }

    /// Parses one physical container file
    pub fn from_bytes(data: &[u8]) -> Result<Container, ReadError> {
        if data.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(ReadError::TruncatedContainer(data.len()));
        }
        if data[..4] != CONTAINER_MAGIC {
            return Err(ReadError::InvalidMagic);
        }
        let version_bytes = [data[4], data[5], data[6], data[7]];
        let payload = &data[HEADER_SIZE..data.len() - CHECKSUM_SIZE];
        let stored = &data[data.len() - CHECKSUM_SIZE..];
        if checksum(payload, version_bytes) != stored {
            return Err(ReadError::CorruptedContainer("checksum mismatch".into()));
        }
        Ok(Container {
            version: u32::from_le_bytes(version_bytes),
            payload: payload.to_vec(),
        })
    }

    /// Loads the first on-disk variant of `base` that validates.
    ///
    /// Variants are tried in the fixed priority order of
    /// [`VARIANT_SUFFIXES`]. Failures are accumulated per variant; only
    /// when every variant fails does this return an error -
    /// [`ReadError::MissingFile`] if none existed at all,
    /// [`ReadError::CorruptedContainer`] with the accumulated detail
    /// otherwise.
    pub fn open(base: &Path) -> Result<Container, ReadError> {
        let mut failures = Vec::new();
        for suffix in VARIANT_SUFFIXES {
            let path = variant_path(base, suffix);
            if !path.is_file() {
                continue;
            }
            let parsed = fs::read(&path)
                .map_err(ReadError::from_io)
                .and_then(|bytes| Container::from_bytes(&bytes));
            match parsed {
                Ok(container) => {
                    tracing::debug!(path = %path.display(), version = container.version, "loaded container");
                    return Ok(container);
                }
                Err(err) => failures.push(format!("{}: {}", path.display(), err)),
            }
        }
        if failures.is_empty() {
            Err(ReadError::MissingFile(base.to_path_buf()))
        } else {
            Err(ReadError::CorruptedContainer(failures.join("; ")))
        }
    }

    /// Serializes the container to its on-disk layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let version_bytes = self.version.to_le_bytes();
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE);
        out.extend_from_slice(&CONTAINER_MAGIC);
        out.extend_from_slice(&version_bytes);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&checksum(&self.payload, version_bytes));
        out
    }

    /// Writes the container to the given path
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_bytes())
    }
}

impl ReadError {
    fn from_io(err: io::Error) -> ReadError {
        ReadError::CorruptedContainer(err.to_string())
    }
}

/// Path of one rotation variant: the suffix appends to the file name
pub(crate) fn variant_path(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn checksum(payload: &[u8], version_bytes: [u8; 4]) -> [u8; CHECKSUM_SIZE] {
    let mut hasher = Md5::new();
    hasher.update(payload);
    hasher.update((payload.len() as u32).to_le_bytes());
    hasher.update(version_bytes);
    hasher.update(CONTAINER_MAGIC);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_round_trip() {
        let container = Container::new(42, b"payload bytes".to_vec());
        let parsed = Container::from_bytes(&container.to_bytes()).unwrap();
        assert_eq!(parsed, container);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = Container::new(1, vec![0; 16]).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Container::from_bytes(&bytes),
            Err(ReadError::InvalidMagic)
        ));
    }

    #[test]
    fn rejects_short_file() {
        assert!(matches!(
            Container::from_bytes(b"TDF$"),
            Err(ReadError::TruncatedContainer(4))
        ));
    }

    #[test]
    fn version_bytes_are_checksummed() {
        let mut bytes = Container::new(7, b"data".to_vec()).to_bytes();
        bytes[4] ^= 1;
        assert!(matches!(
            Container::from_bytes(&bytes),
            Err(ReadError::CorruptedContainer(_))
        ));
    }

    #[test]
    fn variant_path_appends_to_file_name() {
        let path = variant_path(Path::new("/root/key_data"), "s");
        assert_eq!(path, Path::new("/root/key_datas"));
    }
}
