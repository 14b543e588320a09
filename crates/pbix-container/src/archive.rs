//! Report archive access.
//!
//! A `.pbix` file is a zip container. Rewriting only ever touches the
//! `Report/Layout` entry: every other entry is streamed through as a raw
//! copy (no recompression), except `SecurityBindings`, which is dropped —
//! it signs the layout, and a modified layout invalidates it.
//!
//! Acquisition is scoped: the archive is opened per operation, and in-place
//! updates go through a sibling temp file persisted over the original only
//! after the whole archive has been written. A failed rewrite never leaves
//! a half-written report.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ContainerError, Result};

/// The layout entry inside a report archive.
pub const LAYOUT_ENTRY: &str = "Report/Layout";

/// The signature entry invalidated by layout edits.
const SECURITY_BINDINGS_ENTRY: &str = "SecurityBindings";

/// A report archive on disk.
#[derive(Debug, Clone)]
pub struct ReportArchive {
    path: PathBuf,
}

impl ReportArchive {
    /// Open a report archive, verifying it is a readable container with a
    /// layout entry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let archive = Self { path: path.into() };
        let mut zip = archive.open_zip()?;
        if let Err(error) = zip.by_name(LAYOUT_ENTRY) {
            return Err(match error {
                ZipError::FileNotFound => ContainerError::LayoutMissing {
                    path: archive.path.clone(),
                },
                other => archive.format_error(&other),
            });
        }
        Ok(archive)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw bytes of the layout entry.
    pub fn read_layout(&self) -> Result<Vec<u8>> {
        let mut zip = self.open_zip()?;
        let mut entry = zip.by_name(LAYOUT_ENTRY).map_err(|error| match error {
            ZipError::FileNotFound => ContainerError::LayoutMissing {
                path: self.path.clone(),
            },
            other => self.format_error(&other),
        })?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "layout entry read");
        Ok(bytes)
    }

    /// Write a copy of the archive to `output` with the layout entry
    /// replaced by `layout`.
    pub fn write_with_layout(&self, layout: &[u8], output: &Path) -> Result<()> {
        let file = File::create(output).map_err(|source| ContainerError::ArchiveOpen {
            path: output.to_path_buf(),
            source,
        })?;
        let mut writer = ZipWriter::new(file);
        self.copy_into(&mut writer, layout, output)?;
        writer
            .finish()
            .map_err(|error| ContainerError::ArchiveWrite {
                path: output.to_path_buf(),
                message: error.to_string(),
            })?;
        info!(
            source = %self.path.display(),
            output = %output.display(),
            "report archive written"
        );
        Ok(())
    }

    /// Replace the layout entry in place, atomically: the new archive is
    /// written to a sibling temp file and persisted over the original only
    /// once complete.
    pub fn replace_layout(&self, layout: &[u8]) -> Result<()> {
        let directory = self.path.parent().unwrap_or_else(|| Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(".pbix-repoint-")
            .tempfile_in(directory)?;
        {
            let mut writer = ZipWriter::new(temp.as_file());
            self.copy_into(&mut writer, layout, self.path.as_path())?;
            writer
                .finish()
                .map_err(|error| ContainerError::ArchiveWrite {
                    path: self.path.clone(),
                    message: error.to_string(),
                })?;
        }
        temp.persist(&self.path)
            .map_err(|error| ContainerError::ArchiveWrite {
                path: self.path.clone(),
                message: error.to_string(),
            })?;
        info!(path = %self.path.display(), "report archive updated in place");
        Ok(())
    }

    fn copy_into<W: Write + Seek>(
        &self,
        writer: &mut ZipWriter<W>,
        layout: &[u8],
        output: &Path,
    ) -> Result<()> {
        let mut zip = self.open_zip()?;
        let write_error = |error: &dyn std::fmt::Display| ContainerError::ArchiveWrite {
            path: output.to_path_buf(),
            message: error.to_string(),
        };
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for index in 0..zip.len() {
            let entry = zip
                .by_index_raw(index)
                .map_err(|error| self.format_error(&error))?;
            let name = entry.name().to_string();
            if name == SECURITY_BINDINGS_ENTRY {
                debug!("dropping {SECURITY_BINDINGS_ENTRY} entry");
                continue;
            }
            if name == LAYOUT_ENTRY {
                drop(entry);
                writer
                    .start_file(LAYOUT_ENTRY, options)
                    .map_err(|error| write_error(&error))?;
                writer.write_all(layout)?;
                continue;
            }
            writer
                .raw_copy_file(entry)
                .map_err(|error| write_error(&error))?;
        }
        Ok(())
    }

    fn open_zip(&self) -> Result<ZipArchive<File>> {
        let file = File::open(&self.path).map_err(|source| ContainerError::ArchiveOpen {
            path: self.path.clone(),
            source,
        })?;
        ZipArchive::new(file).map_err(|error| self.format_error(&error))
    }

    fn format_error(&self, error: &dyn std::fmt::Display) -> ContainerError {
        ContainerError::ArchiveFormat {
            path: self.path.clone(),
            message: error.to_string(),
        }
    }
}
