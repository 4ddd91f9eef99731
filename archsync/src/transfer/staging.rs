//! Staged writes for downloaded files.
//!
//! Bytes land in `<dest>.part` next to the destination and are renamed over
//! it only after verification. An uncommitted staging file is removed on
//! drop, so failed or rejected transfers leave the previous local copy alone.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::{TransferError, TransferResult};

/// Suffix appended to the destination file name while downloading.
pub const STAGING_SUFFIX: &str = ".part";

/// Buffer size for writes to disk (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// A download in progress, backed by a temporary file.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    dest: PathBuf,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl StagedFile {
    /// Create the staging file for `dest`, creating parent directories.
    pub fn create(dest: &Path) -> TransferResult<Self> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| TransferError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = staging_path(dest);
        let file = File::create(&temp_path).map_err(|source| TransferError::WriteFailed {
            path: temp_path.clone(),
            source,
        })?;

        Ok(Self {
            temp_path,
            dest: dest.to_path_buf(),
            writer: Some(BufWriter::with_capacity(BUFFER_SIZE, file)),
            committed: false,
        })
    }

    /// Path of the staging file.
    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush and close the staging file. Further writes fail.
    pub fn finish(&mut self) -> TransferResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|source| TransferError::WriteFailed {
                path: self.temp_path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Move the staged bytes over the destination.
    pub fn commit(mut self) -> TransferResult<()> {
        self.finish()?;
        fs::rename(&self.temp_path, &self.dest).map_err(|source| TransferError::WriteFailed {
            path: self.dest.clone(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::other("staging file already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.writer.take();
        if let Err(e) = fs::remove_file(&self.temp_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    path = %self.temp_path.display(),
                    error = %e,
                    "Could not remove staging file"
                );
            }
        }
    }
}

/// `<dest>.part` in the same directory as `dest`.
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(STAGING_SUFFIX);
    dest.with_file_name(name)
}
