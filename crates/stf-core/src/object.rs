use std::fmt;

use tracing::warn;

use crate::buffer::{content_hash, ByteBuffer};
use crate::config::{HeaderLayout, HASH_WIDTH};
use crate::error::{StfError, StfResult};

/// Self-description written ahead of an object's data.
///
/// On disk:
/// ```text
/// [8 bytes: content hash]
/// [W1 bytes: content size]
/// [W2 bytes: metadata size]   (only when the layout has metadata)
/// [N bytes: metadata]
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Folded SHA-256 of the data that follows the header.
    pub content_hash: u64,
    /// Length of that data in bytes.
    pub content_size: u64,
    /// Side-channel information needed to decode the data.
    pub metadata: ByteBuffer,
}

impl Header {
    /// Describe `data`, attaching `metadata`.
    pub fn describe(data: &ByteBuffer, metadata: ByteBuffer) -> Self {
        Self {
            content_hash: data.hash(),
            content_size: data.len() as u64,
            metadata,
        }
    }

    /// Encode this header with the given field widths.
    pub fn encode(&self, layout: &HeaderLayout) -> StfResult<ByteBuffer> {
        let mut out = ByteBuffer::new();
        out.write_uint(self.content_hash, HASH_WIDTH)?;
        out.write_uint(self.content_size, layout.content_size_width)?;
        if layout.has_metadata {
            out.write_uint(self.metadata.len() as u64, layout.metadata_size_width)?;
            out.write(self.metadata.as_bytes());
        }
        Ok(out)
    }

    /// Read a header from the cursor.
    ///
    /// When the buffer has integrity checks enabled, the declared content is
    /// hashed in place before returning; the cursor stays at the start of
    /// the data either way.
    pub fn read(buffer: &mut ByteBuffer, layout: &HeaderLayout) -> StfResult<Self> {
        let content_hash = buffer.read_uint(HASH_WIDTH)?;
        let content_size = buffer.read_uint(layout.content_size_width)?;
        let metadata = if layout.has_metadata {
            let length = buffer.read_uint(layout.metadata_size_width)?;
            buffer.read(usize::try_from(length).unwrap_or(usize::MAX))?
        } else {
            ByteBuffer::new()
        };

        let header = Self {
            content_hash,
            content_size,
            metadata,
        };
        if buffer.verifies_integrity() {
            let size = usize::try_from(content_size).unwrap_or(usize::MAX);
            header.verify(buffer.peek(size)?)?;
        }
        Ok(header)
    }

    /// Check `payload` against the recorded hash.
    pub fn verify(&self, payload: &[u8]) -> StfResult<()> {
        let computed = content_hash(payload);
        if computed != self.content_hash {
            warn!(
                expected = self.content_hash,
                computed,
                size = payload.len(),
                "content hash mismatch"
            );
            return Err(StfError::HashMismatch {
                expected: self.content_hash,
                computed,
            });
        }
        Ok(())
    }

    /// Bytes this header occupies when encoded with `layout`.
    pub fn encoded_len(&self, layout: &HeaderLayout) -> usize {
        let mut len = HASH_WIDTH + layout.content_size_width;
        if layout.has_metadata {
            len += layout.metadata_size_width + self.metadata.len();
        }
        len
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hash={:016x} size={} metadata={}",
            self.content_hash,
            self.content_size,
            hex::encode(self.metadata.as_bytes())
        )
    }
}

/// A composite value with a self-describing binary form.
///
/// Implementors provide their canonical payload ([`data`](Self::data)) and
/// the inverse ([`deserialize`](Self::deserialize)), which must read back
/// whatever `data` and `metadata` wrote, in the same order. Headers, hashing
/// and nesting come for free: an object used inside another object is
/// encoded through its own [`serialize`](Self::serialize).
pub trait SerializableObject: Sized {
    /// Whether [`serialize`](Self::serialize) prefixes the data with a header.
    const REQUIRES_HEADER: bool = true;

    /// Field widths of this type's header.
    const LAYOUT: HeaderLayout = HeaderLayout::STANDARD;

    /// Canonical payload bytes.
    fn data(&self) -> StfResult<ByteBuffer>;

    /// Rebuild a value from the cursor.
    ///
    /// Types that require a header call [`read_header`](Self::read_header)
    /// first.
    fn deserialize(buffer: &mut ByteBuffer) -> StfResult<Self>;

    /// Side-channel bytes stored in the header. Empty by default.
    fn metadata(&self) -> StfResult<ByteBuffer> {
        Ok(ByteBuffer::new())
    }

    /// Full binary form: header (if required) followed by data.
    fn serialize(&self) -> StfResult<ByteBuffer> {
        let data = self.data()?;
        let mut out = if Self::REQUIRES_HEADER {
            encode_header(self, &data)?
        } else {
            ByteBuffer::new()
        };
        out.write(data.as_bytes());
        Ok(out)
    }

    /// The encoded header for the current data.
    fn header(&self) -> StfResult<ByteBuffer> {
        encode_header(self, &self.data()?)
    }

    /// Read a header laid out for this type.
    fn read_header(buffer: &mut ByteBuffer) -> StfResult<Header> {
        Header::read(buffer, &Self::LAYOUT)
    }
}

fn encode_header<O: SerializableObject>(object: &O, data: &ByteBuffer) -> StfResult<ByteBuffer> {
    let metadata = if O::LAYOUT.has_metadata {
        object.metadata()?
    } else {
        ByteBuffer::new()
    };
    Header::describe(data, metadata).encode(&O::LAYOUT)
}
