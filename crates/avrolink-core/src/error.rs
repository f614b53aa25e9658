//! Error Types for avrolink-core
//!
//! The core crate only parses and builds the framing header, so the error
//! surface is small.
//!
//! ## Error Categories
//!
//! ### Framing Errors
//! - `MalformedFrame`: input is shorter than the fixed 5-byte header
//!
//! A non-zero magic byte is *not* an error at this layer. The frame is
//! returned as-is and callers decide whether they understand that format.
//!
//! ## Example
//! ```ignore
//! use avrolink_core::{wire, Error};
//!
//! match wire::decode(&[0x00, 0x01]) {
//!     Err(Error::MalformedFrame { len }) => eprintln!("only {} bytes", len),
//!     Ok(frame) => println!("schema {}", frame.schema_id),
//! }
//! ```

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Malformed frame: expected at least 5 bytes, got {len}")]
    MalformedFrame { len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
