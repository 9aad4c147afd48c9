//! QTI assessment document parsing.

use crate::classify::classify;
use crate::error::XmlError;
use crate::model::Quiz;
use crate::xml::{parse_document, Element};

/// Root container of every QTI 1.2 document.
pub const CONTAINER: &str = "questestinterop";

/// Title used when an `assessment` element has no `title` attribute.
pub const UNTITLED: &str = "N/A (Title not found)";

/// Title used for documents that hold bare items without an `assessment`.
pub const SINGLE_ITEM_TITLE: &str = "Single Item Quiz (No Assessment Tag)";

/// Parse one assessment document into a [`Quiz`].
///
/// Returns `Ok(None)` when the document parses but is not an extractable
/// assessment, and `Err` only when the XML itself cannot be read.
pub fn parse_assessment(xml: &str) -> Result<Option<Quiz>, XmlError> {
    let root = parse_document(xml)?;
    Ok(quiz_from_root(&root))
}

/// Build a quiz from an already parsed document root.
pub fn quiz_from_root(root: &Element) -> Option<Quiz> {
    if root.name() != CONTAINER {
        tracing::debug!(root = root.name(), "document root is not {CONTAINER}");
        return None;
    }

    let (title, items) = if let Some(assessment) = root.child("assessment") {
        let title = assessment
            .attr("title")
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();
        let mut items = Vec::new();
        for section in assessment.children("section") {
            collect_section_items(section, &mut items);
        }
        (title, items)
    } else if root.get("item").is_some() {
        (SINGLE_ITEM_TITLE.to_string(), root.children("item"))
    } else {
        tracing::debug!("{CONTAINER} has neither an assessment nor items");
        return None;
    };

    Some(Quiz {
        title,
        items: items.into_iter().map(classify).collect(),
    })
}

/// Items of a section and of any nested sections, in document order.
fn collect_section_items<'a>(section: &'a Element, items: &mut Vec<&'a Element>) {
    for child in section.elements() {
        match child.name() {
            "item" => items.push(child),
            "section" => collect_section_items(child, items),
            _ => {}
        }
    }
}
