//! Normalized quiz model.
//!
//! These types are what the extraction pipeline produces. Their serde
//! representation is the public JSON contract, so field names are camelCase
//! and nothing else is emitted.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ResourceSkip;

/// Placeholder used for every field that could not be found.
pub const NOT_AVAILABLE: &str = "N/A";

/// The interaction kind of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseType {
    MultipleChoice,
    FillInBlank,
    Essay,
    Unknown,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseType::MultipleChoice => write!(f, "MultipleChoice"),
            ResponseType::FillInBlank => write!(f, "FillInBlank"),
            ResponseType::Essay => write!(f, "Essay"),
            ResponseType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub identifier: String,
    pub text: String,
}

/// The expected answer of a question.
///
/// Multiple-choice answers serialize as `{"id", "text"}`; every other kind
/// serializes as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Choice { id: String, text: String },
    Text(String),
}

impl CorrectAnswer {
    /// The answer used when no response condition names a correct choice.
    pub fn unresolved_choice() -> Self {
        CorrectAnswer::Choice {
            id: NOT_AVAILABLE.to_string(),
            text: NOT_AVAILABLE.to_string(),
        }
    }
}

/// A single normalized question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub item_identifier: String,
    pub question_text: String,
    pub response_type: ResponseType,
    pub options: Vec<Choice>,
    /// `None` for [`ResponseType::Unknown`]; serialized as `null`.
    pub correct_answer: Option<CorrectAnswer>,
    pub score: String,
}

/// One assessment document's worth of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    pub items: Vec<Question>,
}

/// The result of extracting one package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageExtraction {
    pub subject: String,
    pub quizzes: Vec<Quiz>,
    /// Resources left out of `quizzes`. Diagnostic only, never serialized.
    #[serde(skip)]
    pub skipped: Vec<ResourceSkip>,
}

impl PackageExtraction {
    /// Total number of questions across all quizzes.
    pub fn item_count(&self) -> usize {
        self.quizzes.iter().map(|q| q.items.len()).sum()
    }

    /// Render the result as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.context("failed to serialize extraction result")
    }

    /// Write the result as JSON to a file, creating parent directories.
    pub fn save_json(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = self.to_json(pretty)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }
}
