//! Extraction error types.
//!
//! Only [`ExtractError`] aborts a request. Per-resource problems are reported
//! as [`ResourceSkip`] values and per-field problems never surface at all:
//! they resolve to documented defaults inside the classifier.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning XML text into an element tree.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The reader hit a lexical error it cannot recover from.
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// The input contained no element at all.
    #[error("document has no root element")]
    NoRootElement,
}

/// Errors that fail a whole extraction request.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No archive was supplied with the request.
    #[error("no archive supplied")]
    MissingArchive,

    /// The archive could not be opened or unpacked as a zip file.
    #[error("invalid archive {path}: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    /// `imsmanifest.xml` is not present at the package root.
    #[error("manifest not found: {0}")]
    ManifestMissing(PathBuf),

    /// `imsmanifest.xml` exists but could not be parsed.
    #[error("failed to parse manifest {path}: {source}")]
    ManifestMalformed {
        path: PathBuf,
        #[source]
        source: XmlError,
    },

    /// The scratch area could not be allocated.
    #[error("failed to allocate scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    /// An I/O failure while staging the package.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Returns `true` if the caller supplied bad input (no archive, or not a zip).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExtractError::MissingArchive | ExtractError::InvalidArchive { .. }
        )
    }

    /// Returns `true` if the package manifest was missing or unreadable.
    pub fn is_manifest_error(&self) -> bool {
        matches!(
            self,
            ExtractError::ManifestMissing(_) | ExtractError::ManifestMalformed { .. }
        )
    }

    /// Wrap an I/O failure at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why an assessment resource was left out of the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("file not found")]
    MissingFile,

    #[error("path escapes the package root")]
    OutsidePackage,

    #[error("file could not be read: {0}")]
    Unreadable(String),

    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("no questestinterop container")]
    NotAnAssessment,
}

/// An assessment resource that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSkip {
    /// Manifest identifier of the resource.
    pub identifier: String,
    /// Path of the referenced file, relative to the package root.
    pub relative_path: String,
    pub reason: SkipReason,
}
