//! qtiex-core: Quiz extraction from IMS Common Cartridge packages.
//!
//! This crate holds the extraction pipeline: a lenient XML tree, manifest
//! navigation, QTI assessment parsing and item classification. Archive
//! handling and scratch directories are supplied by callers through the
//! traits in [`traits`].

pub mod assessment;
pub mod classify;
pub mod error;
pub mod manifest;
pub mod model;
pub mod pipeline;
pub mod sanitize;
pub mod traits;
pub mod xml;

pub use error::{ExtractError, ResourceSkip, SkipReason, XmlError};
pub use model::{Choice, CorrectAnswer, PackageExtraction, Question, Quiz, ResponseType};
pub use pipeline::{extract_package, process_upload};
