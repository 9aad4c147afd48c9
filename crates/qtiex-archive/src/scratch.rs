//! Temporary scratch directories for unpacking uploads.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use qtiex_core::error::ExtractError;
use qtiex_core::traits::ScratchProvider;

const PREFIX: &str = "qtiex-";

/// Allocates uniquely named directories under the system temp dir, or under
/// a configured root.
///
/// On drop, each allocated [`TempDir`] is removed together with its contents.
#[derive(Debug, Clone, Default)]
pub struct TempScratch {
    root: Option<PathBuf>,
}

impl TempScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate under `root` instead of the system temp directory. The root
    /// is created on first use.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// The configured root, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl ScratchProvider for TempScratch {
    type Dir = TempDir;

    fn allocate(&self) -> Result<TempDir, ExtractError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);

        let dir = match &self.root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(ExtractError::Scratch)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(ExtractError::Scratch)?;

        tracing::debug!(path = %dir.path().display(), "created temp directory");
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_distinct_and_empty() {
        let root = tempfile::tempdir().unwrap();
        let scratch = TempScratch::in_dir(root.path());

        let a = scratch.allocate().unwrap();
        let b = scratch.allocate().unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
        assert_eq!(std::fs::read_dir(a.path()).unwrap().count(), 0);
    }

    #[test]
    fn dropping_the_guard_removes_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let scratch = TempScratch::in_dir(root.path());

        let dir = scratch.allocate().unwrap();
        let path = dir.path().to_path_buf();
        std::fs::write(path.join("file.txt"), "contents").unwrap();
        assert!(path.exists());

        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn missing_root_is_created() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("nested").join("scratch");
        let scratch = TempScratch::in_dir(&root);

        let dir = scratch.allocate().unwrap();
        assert!(root.is_dir());
        assert!(dir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(PREFIX));
    }

    #[test]
    fn unusable_root_is_a_scratch_error() {
        let parent = tempfile::tempdir().unwrap();
        let blocker = parent.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let scratch = TempScratch::in_dir(&blocker);
        let err = scratch.allocate().unwrap_err();
        assert!(matches!(err, ExtractError::Scratch(_)));
    }

    #[test]
    fn default_uses_system_temp() {
        let scratch = TempScratch::new();
        assert!(scratch.root().is_none());
        let dir = scratch.allocate().unwrap();
        assert!(dir.path().is_dir());
    }
}
