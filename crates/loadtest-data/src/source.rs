//! Where raw logger dumps come from.
//!
//! The store re-reads its [`Source`] on every refresh. [`FileSource`] reads a
//! dump the logger keeps appending to; [`TextSource`] wraps text handed over by
//! an upload or a test.

use std::path::{Path, PathBuf};

use loadtest_core::error::{MonitorError, Result};

/// Supplier of raw dump text.
pub trait Source: Send + Sync {
    /// Short human-readable name used in logs and errors.
    fn label(&self) -> String;

    /// Read the full current contents of the dump.
    fn read_text(&self) -> Result<String>;
}

/// A dump file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileSource {
    fn label(&self) -> String {
        self.path.display().to_string()
    }

    fn read_text(&self) -> Result<String> {
        read_growing_file(&self.path)
    }
}

/// Read a file the logger may be appending to while we read it.
///
/// The file is read in one pass to whatever length it has at that moment and
/// decoded lossily, so a half-written multi-byte sequence at the tail degrades
/// to a malformed last line instead of failing the read.
pub fn read_growing_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| MonitorError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Dump text already held in memory.
#[derive(Debug, Clone)]
pub struct TextSource {
    label: String,
    text: String,
}

impl TextSource {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

impl Source for TextSource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn read_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}
