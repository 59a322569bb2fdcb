use serde::{Deserialize, Serialize};

/// Width of an encoded boolean, in bytes.
pub const BOOL_WIDTH: usize = 1;
/// Default width of an encoded integer, in bytes.
pub const INT_WIDTH: usize = 8;
/// Width of the content hash written into every header, in bytes.
pub const HASH_WIDTH: usize = 8;
/// Default width of the header's content-size field, in bytes.
pub const CONTENT_SIZE_WIDTH: usize = 4;
/// Default width of the header's metadata-size field, in bytes.
pub const METADATA_SIZE_WIDTH: usize = 3;
/// Default width of an array's element-count field, in bytes.
pub const COUNT_WIDTH: usize = 2;
/// Byte order shared by every multi-byte field of a file.
pub const ENDIANNESS: ByteOrder = ByteOrder::Big;
/// Whether text is zero-terminated unless a fixed length is given.
pub const ZERO_TERMINATE: bool = true;
/// Magic number opening every tree file.
pub const MAGIC: u32 = 0xDEAD_BEEF;
/// Current format version. Files must match it exactly.
pub const VERSION: u32 = 0x0000_0004;

/// Byte order of a fixed-width integer field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Encoding of a fixed-width integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntFormat {
    /// Field width in bytes (at most 8).
    pub width: usize,
    pub order: ByteOrder,
    pub signed: bool,
}

impl IntFormat {
    /// 8-byte unsigned, file byte order.
    pub const DEFAULT: Self = Self {
        width: INT_WIDTH,
        order: ENDIANNESS,
        signed: false,
    };

    /// Unsigned integer of the given width in file byte order.
    pub const fn unsigned(width: usize) -> Self {
        Self {
            width,
            order: ENDIANNESS,
            signed: false,
        }
    }

    /// Two's-complement integer of the given width in file byte order.
    pub const fn signed(width: usize) -> Self {
        Self {
            width,
            order: ENDIANNESS,
            signed: true,
        }
    }

    pub const fn with_order(self, order: ByteOrder) -> Self {
        Self { order, ..self }
    }
}

impl Default for IntFormat {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Framing of an encoded string. Text is always UTF-8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextFormat {
    /// Bytes followed by a single `0x00`.
    ZeroTerminated,
    /// Exactly `n` raw bytes with no terminator.
    ///
    /// `Fixed(0)` has no length to go by and is framed like
    /// [`ZeroTerminated`](Self::ZeroTerminated) in both directions.
    Fixed(usize),
}

impl TextFormat {
    pub const DEFAULT: Self = if ZERO_TERMINATE {
        Self::ZeroTerminated
    } else {
        Self::Fixed(0)
    };
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Field widths of an object header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderLayout {
    /// Width of the content-size field.
    pub content_size_width: usize,
    /// Width of the metadata-size field.
    pub metadata_size_width: usize,
    /// When `false` the metadata-size field and metadata block are omitted.
    pub has_metadata: bool,
}

impl HeaderLayout {
    pub const STANDARD: Self = Self {
        content_size_width: CONTENT_SIZE_WIDTH,
        metadata_size_width: METADATA_SIZE_WIDTH,
        has_metadata: true,
    };

    /// Standard widths with the metadata block omitted.
    pub const WITHOUT_METADATA: Self = Self {
        has_metadata: false,
        ..Self::STANDARD
    };

    /// Every size field shrunk to the given width.
    pub const fn narrow(width: usize) -> Self {
        Self {
            content_size_width: width,
            metadata_size_width: width,
            has_metadata: true,
        }
    }
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Encoding options forwarded verbatim by the convert dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub int: IntFormat,
    pub text: TextFormat,
}

impl ConvertOptions {
    pub const DEFAULT: Self = Self {
        int: IntFormat::DEFAULT,
        text: TextFormat::DEFAULT,
    };

    /// Default options with integers of the given unsigned width.
    pub const fn int_width(width: usize) -> Self {
        Self {
            int: IntFormat::unsigned(width),
            text: TextFormat::DEFAULT,
        }
    }
}
