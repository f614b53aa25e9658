pub mod error;
pub mod wire;

pub use error::{Error, Result};
pub use wire::{Frame, SchemaId, HEADER_LEN, MAGIC_BYTE};
