use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
/// Errors reading structured fields out of a decoded payload
pub enum StreamError {
    /// A field extended past the end of the available data
    #[error("Unexpected end of data - wanted {wanted} more bytes, {remaining} left")]
    UnexpectedEof {
        /// Bytes the field still needed
        wanted: usize,
        /// Bytes actually left in the payload
        remaining: usize,
    },
}

/// Length marker used by the source format for a null/empty buffer
const EMPTY_BUFFER_TAG: u32 = 0xFFFF_FFFF;

/// Cursor over a byte payload.
///
/// All multi-byte integers in the payloads are big-endian. The source
/// format reads four bytes, reverses them and interprets them
/// little-endian; that is the same thing, so a single big-endian read
/// is used everywhere.
pub(crate) struct BytesReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BytesReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> BytesReader<'a> {
        BytesReader { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        if len > self.remaining() {
            return Err(StreamError::UnexpectedEof {
                wanted: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), StreamError> {
        self.read_slice(len).map(|_| ())
    }

    /// Reads a big-endian unsigned 32 bit integer
    pub(crate) fn read_u32(&mut self) -> Result<u32, StreamError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a length-prefixed byte buffer: big-endian length, then raw bytes
    pub(crate) fn read_buffer(&mut self) -> Result<&'a [u8], StreamError> {
        let len = self.read_u32()?;
        if len == EMPTY_BUFFER_TAG {
            return Ok(&[]);
        }
        self.read_slice(len as usize)
    }
}

pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_buffer(out: &mut Vec<u8>, data: &[u8]) {
    write_u32(out, data.len() as u32);
    out.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_round_trip() {
        let mut out = Vec::new();
        write_buffer(&mut out, b"abc");
        write_u32(&mut out, 7);

        let mut reader = BytesReader::new(&out);
        assert_eq!(reader.read_buffer().unwrap(), b"abc");
        assert_eq!(reader.read_u32().unwrap(), 7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn eof_reports_sizes() {
        let mut reader = BytesReader::new(&[0, 0]);
        assert_eq!(
            reader.read_u32(),
            Err(StreamError::UnexpectedEof {
                wanted: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn empty_buffer_tag() {
        let mut reader = BytesReader::new(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(reader.read_buffer().unwrap(), b"");
    }
}
