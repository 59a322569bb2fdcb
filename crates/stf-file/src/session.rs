use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use stf_core::{ByteBuffer, SerializableObject};

use crate::envelope::{Envelope, EnvelopeConfig};
use crate::error::{FileError, FileResult};

/// Direction of a [`TreeFile`] session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    Read,
    Write,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "reading"),
            Self::Write => write!(f, "writing"),
        }
    }
}

/// A file holding one root object behind the envelope.
///
/// The handle is released when the session is dropped, on every exit path;
/// [`close`](Self::close) additionally flushes and syncs a written file and
/// reports failures.
#[derive(Debug)]
pub struct TreeFile {
    path: PathBuf,
    mode: OpenMode,
    config: EnvelopeConfig,
    file: File,
    written: bool,
    loaded: Option<ByteBuffer>,
}

impl TreeFile {
    /// Open `path` with the default envelope.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> FileResult<Self> {
        Self::open_with(path, mode, EnvelopeConfig::default())
    }

    /// Open `path` for `mode` with a custom envelope.
    ///
    /// Write mode creates the file or truncates an existing one.
    pub fn open_with(
        path: impl AsRef<Path>,
        mode: OpenMode,
        config: EnvelopeConfig,
    ) -> FileResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match mode {
            OpenMode::Read => File::open(&path)?,
            OpenMode::Write => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?,
        };
        debug!(path = %path.display(), %mode, "opened tree file");
        Ok(Self {
            path,
            mode,
            config,
            file,
            written: false,
            loaded: None,
        })
    }

    pub fn create(path: impl AsRef<Path>) -> FileResult<Self> {
        Self::open(path, OpenMode::Write)
    }

    pub fn open_read(path: impl AsRef<Path>) -> FileResult<Self> {
        Self::open(path, OpenMode::Read)
    }

    /// Run `f` inside a session, closing it afterwards.
    ///
    /// If `f` fails the handle is still released and its error is returned.
    pub fn scoped<T>(
        path: impl AsRef<Path>,
        mode: OpenMode,
        f: impl FnOnce(&mut Self) -> FileResult<T>,
    ) -> FileResult<T> {
        Self::scoped_with(path, mode, EnvelopeConfig::default(), f)
    }

    /// [`scoped`](Self::scoped) with a custom envelope.
    pub fn scoped_with<T>(
        path: impl AsRef<Path>,
        mode: OpenMode,
        config: EnvelopeConfig,
        f: impl FnOnce(&mut Self) -> FileResult<T>,
    ) -> FileResult<T> {
        let mut session = Self::open_with(path, mode, config)?;
        let value = f(&mut session)?;
        session.close()?;
        Ok(value)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Write `root` behind the envelope in one contiguous write.
    ///
    /// A session accepts a single root; a second call fails.
    pub fn write<O: SerializableObject>(&mut self, root: &O) -> FileResult<()> {
        self.expect_mode(OpenMode::Write, "write")?;
        if self.written {
            return Err(FileError::AlreadyWritten);
        }
        let bytes = Envelope::write_to(&mut self.file, root, &self.config)?;
        self.written = true;
        debug!(path = %self.path.display(), bytes, "wrote tree file");
        Ok(())
    }

    /// Validate the envelope and decode the root.
    ///
    /// The file is loaded on the first call; later reads decode the same
    /// bytes again from the start.
    pub fn read<O: SerializableObject>(&mut self) -> FileResult<O> {
        self.expect_mode(OpenMode::Read, "read")?;
        let buffer = match self.loaded.take() {
            Some(mut buffer) => {
                buffer.rewind();
                buffer
            }
            None => {
                let mut data = Vec::new();
                self.file.read_to_end(&mut data)?;
                debug!(path = %self.path.display(), bytes = data.len(), "read tree file");
                ByteBuffer::from(data)
            }
        };
        let buffer = self.loaded.insert(buffer);
        Ok(Envelope::decode_from(buffer, &self.config)?)
    }

    /// End the session, flushing a written file to disk.
    pub fn close(mut self) -> FileResult<()> {
        if self.mode == OpenMode::Write {
            self.file.flush()?;
            self.file.sync_all()?;
        }
        debug!(path = %self.path.display(), "closed tree file");
        Ok(())
    }

    fn expect_mode(&self, mode: OpenMode, operation: &'static str) -> FileResult<()> {
        if self.mode != mode {
            return Err(FileError::ModeMismatch {
                mode: self.mode,
                operation,
            });
        }
        Ok(())
    }
}

/// Write `root` to a new file at `path`.
pub fn write_tree<O: SerializableObject>(path: impl AsRef<Path>, root: &O) -> FileResult<()> {
    TreeFile::scoped(path, OpenMode::Write, |file| file.write(root))
}

/// Read the root object stored at `path`.
pub fn read_tree<O: SerializableObject>(path: impl AsRef<Path>) -> FileResult<O> {
    TreeFile::scoped(path, OpenMode::Read, |file| file.read())
}

/// [`read_tree`] with a custom envelope.
pub fn read_tree_with<O: SerializableObject>(
    path: impl AsRef<Path>,
    config: EnvelopeConfig,
) -> FileResult<O> {
    TreeFile::scoped_with(path, OpenMode::Read, config, |file| file.read())
}
