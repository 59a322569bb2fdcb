//! Core codec of the Serialized Tree Format (STF).
//!
//! STF writes tree-shaped object graphs as self-describing binary data. Every
//! composite object is prefixed with a header recording a folded SHA-256 of
//! its payload, the payload size, and an optional metadata block, so objects
//! nest inside one another without the outer type knowing the inner layout.
//!
//! # Key Types
//!
//! - [`ByteBuffer`]: byte sequence with a bounds-checked read cursor
//! - [`convert`] / [`deconvert`]: dispatch over the convertible kinds
//!   (boolean, integer, text, object)
//! - [`SerializableObject`]: the contract every composite type implements
//! - [`Header`]: hash, size and metadata written ahead of an object
//! - [`HomogeneousArray`]: generic array of one element kind
//!
//! # Wire Layout
//!
//! ```text
//! Object   := [Header] Data
//! Header   := ContentHash(8) ContentSize(4) [MetadataSize(3) Metadata]
//! Array    := Header{Metadata = ElementCount(2)} Element*
//! ```
//!
//! All integers are fixed width and big-endian unless a type chooses
//! otherwise. Decoding is driven entirely by the reader's types: the bytes
//! carry no type tags.

pub mod array;
pub mod buffer;
pub mod config;
pub mod convert;
pub mod error;
pub mod object;
pub mod util;

pub use array::{ArrayLayout, HomogeneousArray, StandardArray};
pub use buffer::{content_hash, ByteBuffer};
pub use config::{ByteOrder, ConvertOptions, HeaderLayout, IntFormat, TextFormat};
pub use convert::{convert, deconvert, Convertible, Decoded, Element, Kind, NoObject};
pub use error::{Severity, StfError, StfResult};
pub use object::{Header, SerializableObject};
