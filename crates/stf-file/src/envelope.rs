use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use stf_core::config::{MAGIC, VERSION};
use stf_core::{ByteBuffer, SerializableObject, StfError, StfResult};

use crate::error::FileResult;

/// Width of each envelope field.
const FIELD_WIDTH: usize = 4;

/// Bytes preceding the root object: magic + version.
pub const PREFIX_LEN: usize = 2 * FIELD_WIDTH;

/// Envelope constants and read policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Magic number opening the file.
    pub magic: u32,
    /// Format version written, and the only version accepted on read.
    pub version: u32,
    /// Re-hash each header's content on read and reject mismatches.
    ///
    /// Off by default: files are read exactly as written, hash unchecked.
    pub verify_integrity: bool,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            verify_integrity: false,
        }
    }
}

impl EnvelopeConfig {
    /// Default constants with integrity verification enabled.
    pub fn verified() -> Self {
        Self {
            verify_integrity: true,
            ..Default::default()
        }
    }

    /// Whether a file of `version` can be read. Only an exact match is.
    pub fn is_compatible(&self, version: u32) -> bool {
        version == self.version
    }
}

/// Codec for the file envelope wrapping a root object.
///
/// ```text
/// [4 bytes: magic (big-endian)]
/// [4 bytes: version (big-endian)]
/// [N bytes: root object serialization]
/// ```
pub struct Envelope;

impl Envelope {
    /// Encode `root` behind the envelope prefix as one contiguous buffer.
    pub fn encode<O: SerializableObject>(root: &O, config: &EnvelopeConfig) -> StfResult<Vec<u8>> {
        let mut out = ByteBuffer::new();
        out.write_uint(u64::from(config.magic), FIELD_WIDTH)?;
        out.write_uint(u64::from(config.version), FIELD_WIDTH)?;
        out.write(root.serialize()?.as_bytes());
        Ok(out.into_vec())
    }

    /// Validate the envelope and decode the root object.
    ///
    /// The magic number is checked before the version is read.
    pub fn decode<O: SerializableObject>(bytes: Vec<u8>, config: &EnvelopeConfig) -> StfResult<O> {
        Self::decode_from(&mut ByteBuffer::from(bytes), config)
    }

    /// [`decode`](Self::decode) from the cursor of an existing buffer.
    ///
    /// The buffer's integrity flag is set from `config`.
    pub fn decode_from<O: SerializableObject>(
        buffer: &mut ByteBuffer,
        config: &EnvelopeConfig,
    ) -> StfResult<O> {
        buffer.set_integrity_checks(config.verify_integrity);

        let magic = read_field(buffer)?;
        if magic != config.magic {
            warn!(expected = config.magic, actual = magic, "rejecting tree file: bad magic");
            return Err(StfError::InvalidMagic {
                expected: config.magic,
                actual: magic,
            });
        }

        let version = read_field(buffer)?;
        if !config.is_compatible(version) {
            warn!(expected = config.version, actual = version, "rejecting tree file: version");
            return Err(StfError::UnsupportedVersion {
                expected: config.version,
                actual: version,
            });
        }

        debug!(
            version,
            payload = buffer.remaining_len(),
            verify = config.verify_integrity,
            "envelope accepted"
        );
        O::deserialize(buffer)
    }

    /// Encode `root` and write it to `writer` in a single call.
    pub fn write_to<W: Write, O: SerializableObject>(
        writer: &mut W,
        root: &O,
        config: &EnvelopeConfig,
    ) -> FileResult<usize> {
        let bytes = Self::encode(root, config)?;
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Read everything from `reader` and decode it.
    pub fn read_from<R: Read, O: SerializableObject>(
        reader: &mut R,
        config: &EnvelopeConfig,
    ) -> FileResult<O> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::decode(data, config)?)
    }
}

fn read_field(buffer: &mut ByteBuffer) -> StfResult<u32> {
    // A 4-byte unsigned field always fits in a u32.
    Ok(buffer.read_uint(FIELD_WIDTH)? as u32)
}
