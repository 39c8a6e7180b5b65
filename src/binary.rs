//! Container files and the outer binary format

mod container;
pub(crate) mod errors;
mod stream;

pub use container::{Container, CHECKSUM_SIZE, COMPOSED_VERSION, CONTAINER_MAGIC, VARIANT_SUFFIXES};
pub use stream::StreamError;

pub(crate) use container::variant_path;
pub(crate) use stream::{write_buffer, write_u32, BytesReader};
