//! Collaborator traits for staging an uploaded package.
//!
//! The core never unpacks archives or manages temporary directories itself.
//! `qtiex-archive` provides the zip and tempfile implementations; tests are
//! free to plug in their own.

use std::path::Path;

use crate::error::ExtractError;

/// Unpacks an archive into a directory.
pub trait Decompressor: Send + Sync {
    /// Materialize every entry of `archive` under `destination` before
    /// returning. Directory entries are created without content.
    ///
    /// An archive that cannot be opened must be reported as
    /// [`ExtractError::InvalidArchive`].
    fn decompress(&self, archive: &Path, destination: &Path) -> Result<(), ExtractError>;
}

/// Hands out empty, uniquely named scratch directories.
pub trait ScratchProvider: Send + Sync {
    /// Guard for an allocated directory. Dropping it removes the directory
    /// and everything below it.
    type Dir: AsRef<Path>;

    fn allocate(&self) -> Result<Self::Dir, ExtractError>;
}
