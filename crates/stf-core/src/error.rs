use thiserror::Error;

/// How an error affects the operation that raised it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The current read, write or deserialize cannot continue.
    Critical,
    /// Recoverable. No check currently reports at this level.
    NonCritical,
}

/// Errors produced while encoding or decoding STF data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StfError {
    #[error("invalid magic number: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    #[error("incompatible format version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },

    #[error("read beyond end of data: {requested} bytes requested at position {position}, length {length}")]
    OverRead {
        requested: usize,
        position: usize,
        length: usize,
    },

    #[error("unterminated string starting at position {position}")]
    UnboundString { position: usize },

    #[error("invalid type for conversion: {0}")]
    InvalidType(String),

    #[error("integer {value} does not fit in {width} {} bytes", signedness(.signed))]
    IntegerOverflow {
        value: i128,
        width: usize,
        signed: bool,
    },

    #[error("invalid text: {0}")]
    InvalidText(String),

    #[error("unsupported integer width {width}: at most {max} bytes")]
    UnsupportedWidth { width: usize, max: usize },

    #[error("content hash mismatch: header records {expected:#018x}, payload hashes to {computed:#018x}")]
    HashMismatch { expected: u64, computed: u64 },
}

impl StfError {
    /// Severity tier of this error.
    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidMagic { .. }
            | Self::UnsupportedVersion { .. }
            | Self::OverRead { .. }
            | Self::UnboundString { .. }
            | Self::InvalidType(_)
            | Self::IntegerOverflow { .. }
            | Self::InvalidText(_)
            | Self::UnsupportedWidth { .. }
            | Self::HashMismatch { .. } => Severity::Critical,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == Severity::Critical
    }
}

fn signedness(signed: &bool) -> &'static str {
    if *signed {
        "signed"
    } else {
        "unsigned"
    }
}

/// Result alias for STF operations.
pub type StfResult<T> = Result<T, StfError>;
