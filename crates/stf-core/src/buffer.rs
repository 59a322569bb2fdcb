use std::fmt;

use sha2::{Digest, Sha256};

use crate::config::{ByteOrder, IntFormat, TextFormat, BOOL_WIDTH, HASH_WIDTH};
use crate::error::{StfError, StfResult};
use crate::util::mask_bits;

/// Widest integer field the codec accepts, in bytes.
pub const MAX_INT_WIDTH: usize = 8;

/// Growable byte sequence with a read cursor.
///
/// Writes append to the end and never move the cursor. Reads consume bytes
/// from the cursor forward and fail with [`StfError::OverRead`] rather than
/// returning fewer bytes than requested; a failed read leaves the cursor
/// where it was.
///
/// A single buffer is passed by `&mut` through a whole decode so that nested
/// objects advance one shared cursor.
#[derive(Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
    verify: bool,
}

impl ByteBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable content-hash verification in headers read from this buffer.
    pub fn with_integrity_checks(mut self) -> Self {
        self.verify = true;
        self
    }

    pub fn set_integrity_checks(&mut self, enabled: bool) {
        self.verify = enabled;
    }

    /// Whether headers read from this buffer have their hash verified.
    pub fn verifies_integrity(&self) -> bool {
        self.verify
    }

    /// Current cursor offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total number of bytes held, read or not.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes past the cursor.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.position
    }

    /// Unread bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.position..]
    }

    /// All bytes, regardless of the cursor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Move the cursor back to the first byte.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Read the next `length` bytes into a new buffer.
    ///
    /// `read(0)` returns an empty buffer.
    pub fn read(&mut self, length: usize) -> StfResult<ByteBuffer> {
        let verify = self.verify;
        let bytes = self.take(length)?;
        Ok(ByteBuffer {
            data: bytes.to_vec(),
            position: 0,
            verify,
        })
    }

    /// Borrow the next `length` bytes without moving the cursor.
    pub fn peek(&self, length: usize) -> StfResult<&[u8]> {
        let end = self.checked_end(length)?;
        Ok(&self.data[self.position..end])
    }

    /// Read a fixed-width integer.
    pub fn read_int(&mut self, format: IntFormat) -> StfResult<i128> {
        check_width(format.width)?;
        let bytes = self.take(format.width)?;
        let fold = |acc: u64, byte: &u8| (acc << 8) | u64::from(*byte);
        let raw = match format.order {
            ByteOrder::Big => bytes.iter().fold(0, fold),
            ByteOrder::Little => bytes.iter().rev().fold(0, fold),
        };

        let bits = (format.width * 8) as u32;
        if format.signed && bits > 0 {
            let shift = u64::BITS - bits;
            Ok((((raw << shift) as i64) >> shift) as i128)
        } else {
            Ok(raw as i128)
        }
    }

    /// Read an unsigned big-endian integer of the given width.
    pub fn read_uint(&mut self, width: usize) -> StfResult<u64> {
        // An unsigned field of at most 8 bytes always fits in a u64.
        self.read_int(IntFormat::unsigned(width)).map(|v| v as u64)
    }

    /// Read UTF-8 text, either of a fixed length or up to a zero byte.
    pub fn read_text(&mut self, format: TextFormat) -> StfResult<String> {
        let (text, consumed) = match format {
            TextFormat::Fixed(length) if length > 0 => (decode_utf8(self.peek(length)?)?, length),
            _ => {
                let start = self.position;
                let terminator = self.data[start..]
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(StfError::UnboundString { position: start })?;
                (decode_utf8(self.peek(terminator)?)?, terminator + 1)
            }
        };
        self.take(consumed)?;
        Ok(text)
    }

    /// Read a one-byte boolean. Any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> StfResult<bool> {
        Ok(self.take(BOOL_WIDTH)?.iter().any(|&b| b != 0))
    }

    /// Append raw bytes.
    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append a fixed-width integer.
    ///
    /// Fails if `value` is not representable in the requested width and
    /// signedness; values are never truncated.
    pub fn write_int(&mut self, value: i128, format: IntFormat) -> StfResult<()> {
        check_width(format.width)?;
        let bits = (format.width * 8) as u32;
        let fits = if format.signed {
            bits == 0 && value == 0 || bits > 0 && {
                let half = 1i128 << (bits - 1);
                (-half..half).contains(&value)
            }
        } else {
            value >= 0 && value <= mask_bits(bits) as i128
        };
        if !fits {
            return Err(StfError::IntegerOverflow {
                value,
                width: format.width,
                signed: format.signed,
            });
        }

        let full = (value as u64).to_be_bytes();
        let field = &full[full.len() - format.width..];
        match format.order {
            ByteOrder::Big => self.write(field),
            ByteOrder::Little => self.data.extend(field.iter().rev()),
        }
        Ok(())
    }

    /// Append an unsigned big-endian integer of the given width.
    pub fn write_uint(&mut self, value: u64, width: usize) -> StfResult<()> {
        self.write_int(i128::from(value), IntFormat::unsigned(width))
    }

    /// Append UTF-8 text.
    ///
    /// `Fixed(n)` with `n > 0` requires the encoded text to be exactly `n`
    /// bytes long. `Fixed(0)` is written zero-terminated, matching how it
    /// is read.
    pub fn write_text(&mut self, value: &str, format: TextFormat) -> StfResult<()> {
        match format {
            TextFormat::Fixed(length) if length > 0 => {
                if value.len() != length {
                    return Err(StfError::InvalidText(format!(
                        "fixed-length field of {length} bytes given {} bytes",
                        value.len()
                    )));
                }
                self.write(value.as_bytes());
            }
            _ => {
                self.write(value.as_bytes());
                self.data.push(0);
            }
        }
        Ok(())
    }

    /// Append a one-byte boolean.
    pub fn write_bool(&mut self, value: bool) -> StfResult<()> {
        self.write_int(i128::from(value), IntFormat::unsigned(BOOL_WIDTH))
    }

    /// Content hash of the full contents, cursor ignored.
    pub fn hash(&self) -> u64 {
        content_hash(&self.data)
    }

    /// Hex dump from `start`, `width` bytes per line.
    pub fn display(&self, width: usize, start: usize) -> String {
        let mut out = String::new();
        for (index, byte) in self.data.iter().skip(start).enumerate() {
            out.push_str(&format!("{byte:02x} "));
            if width > 0 && index % width == width - 1 {
                out.push('\n');
            }
        }
        out
    }

    fn checked_end(&self, length: usize) -> StfResult<usize> {
        self.position
            .checked_add(length)
            .filter(|&end| end <= self.data.len())
            .ok_or(StfError::OverRead {
                requested: length,
                position: self.position,
                length: self.data.len(),
            })
    }

    fn take(&mut self, length: usize) -> StfResult<&[u8]> {
        let start = self.position;
        let end = self.checked_end(length)?;
        self.position = end;
        Ok(&self.data[start..end])
    }
}

/// SHA-256 of `bytes`, read big-endian and masked to its low 64 bits.
pub fn content_hash(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut tail = [0u8; 16];
    tail.copy_from_slice(&digest[digest.len() - 16..]);
    (u128::from_be_bytes(tail) & mask_bits((HASH_WIDTH * 8) as u32)) as u64
}

fn check_width(width: usize) -> StfResult<()> {
    if width > MAX_INT_WIDTH {
        return Err(StfError::UnsupportedWidth {
            width,
            max: MAX_INT_WIDTH,
        });
    }
    Ok(())
}

fn decode_utf8(bytes: &[u8]) -> StfResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| StfError::InvalidText(e.to_string()))
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for ByteBuffer {}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ByteBuffer({} @ {})",
            hex::encode(&self.data),
            self.position
        )
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            verify: false,
        }
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from(data.to_vec())
    }
}

impl From<ByteBuffer> for Vec<u8> {
    fn from(buffer: ByteBuffer) -> Self {
        buffer.data
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
