//! Zip decompression into a scratch directory.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use zip::ZipArchive;

use qtiex_core::error::ExtractError;
use qtiex_core::traits::Decompressor;

/// Default cap on the number of entries in one archive.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Default cap on the total uncompressed size of one archive.
pub const DEFAULT_MAX_UNCOMPRESSED_BYTES: u64 = 512 * 1024 * 1024;

/// Unpacks zip archives, refusing entries that would land outside the
/// destination and archives that exceed the configured limits.
#[derive(Debug, Clone)]
pub struct ZipDecompressor {
    max_entries: usize,
    max_uncompressed_bytes: u64,
}

impl Default for ZipDecompressor {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_uncompressed_bytes: DEFAULT_MAX_UNCOMPRESSED_BYTES,
        }
    }
}

impl ZipDecompressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_uncompressed_bytes(mut self, max_bytes: u64) -> Self {
        self.max_uncompressed_bytes = max_bytes;
        self
    }
}

impl Decompressor for ZipDecompressor {
    fn decompress(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
        let invalid = |reason: String| ExtractError::InvalidArchive {
            path: archive.to_path_buf(),
            reason,
        };

        let file = File::open(archive).map_err(|e| invalid(e.to_string()))?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| invalid(e.to_string()))?;

        if zip.len() > self.max_entries {
            return Err(invalid(format!(
                "{} entries exceeds the limit of {}",
                zip.len(),
                self.max_entries
            )));
        }

        let mut written: u64 = 0;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(|e| invalid(e.to_string()))?;

            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!(entry = entry.name(), "skipping archive entry with unsafe path");
                continue;
            };
            let target = destination.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&target).map_err(|e| ExtractError::io(&target, e))?;
                continue;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
            }

            let name = entry.name().to_string();
            let mut out = File::create(&target).map_err(|e| ExtractError::io(&target, e))?;
            let budget = self.max_uncompressed_bytes.saturating_sub(written);
            let mut limited = (&mut entry).take(budget.saturating_add(1));
            let copied =
                io::copy(&mut limited, &mut out).map_err(|e| invalid(format!("{name}: {e}")))?;

            written += copied;
            if written > self.max_uncompressed_bytes {
                return Err(invalid(format!(
                    "uncompressed size exceeds the limit of {} bytes",
                    self.max_uncompressed_bytes
                )));
            }
        }

        tracing::debug!(
            archive = %archive.display(),
            entries = zip.len(),
            bytes = written,
            "archive unpacked"
        );
        Ok(())
    }
}
