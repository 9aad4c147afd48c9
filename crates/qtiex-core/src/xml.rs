//! Lenient XML element tree.
//!
//! Documents are read with `quick-xml` into a small generic tree: every element
//! keeps its local name, its attributes and its content in document order.
//! Unbalanced markup is repaired instead of rejected: an end tag closes back to
//! the nearest open element of the same name, stray end tags are ignored and
//! anything still open at end of input is closed implicitly. Only lexical
//! errors from the reader, or input without any element, fail the parse.
//!
//! Repeated children are looked up through [`OneOrMany`], so callers never
//! have to care whether the markup had one node or several.


use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::XmlError;

/// A value that was either a single node or a repeated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Normalize to a list, preserving document order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }

    /// The first value.
    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(value) => Some(value),
            OneOrMany::Many(values) => values.first(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalize an optional one-or-many value: absent becomes an empty list.
pub fn one_or_many<T>(value: Option<OneOrMany<T>>) -> Vec<T> {
    value.map(OneOrMany::into_vec).unwrap_or_default()
}

/// Content of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// One XML element with attributes folded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    content: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            content: Vec::new(),
        }
    }

    /// Local name of the element (namespace prefix removed).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.content.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Children with the given name: `None` when there are none, `One` for a
    /// single match and `Many` for repeated ones.
    pub fn get(&self, name: &str) -> Option<OneOrMany<&Element>> {
        let mut matches: Vec<&Element> = self.elements().filter(|e| e.name == name).collect();
        match matches.len() {
            0 => None,
            1 => matches.pop().map(OneOrMany::One),
            _ => Some(OneOrMany::Many(matches)),
        }
    }

    /// All children with the given name, list-normalized.
    pub fn children(&self, name: &str) -> Vec<&Element> {
        one_or_many(self.get(name))
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Follow a chain of child names, taking the first match at every step.
    pub fn path(&self, segments: &[&str]) -> Option<&Element> {
        segments
            .iter()
            .try_fold(self, |element, segment| element.child(segment))
    }

    /// First descendant with the given name, depth-first in document order.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for element in self.elements() {
            if element.name == name {
                return Some(element);
            }
            if let Some(found) = element.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// The element's own text (not its descendants'), trimmed.
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        for node in &self.content {
            if let Node::Text(t) = node {
                text.push_str(t);
            }
        }
        non_empty(text)
    }

    /// All text under this element in document order, trimmed.
    pub fn inner_text(&self) -> Option<String> {
        let mut text = String::new();
        self.collect_text(&mut text);
        non_empty(text)
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.content {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse an XML document into its root element.
pub fn parse_document(xml: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;

    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = element_from(&e);
                note_unnamed(&element, reader.buffer_position() as u64);
                builder.open(element);
            }
            Ok(Event::Empty(e)) => {
                let element = element_from(&e);
                note_unnamed(&element, reader.buffer_position() as u64);
                builder.attach(element);
            }
            Ok(Event::End(e)) => {
                builder.close(&String::from_utf8_lossy(e.local_name().as_ref()))
            }
            Ok(Event::Text(e)) => {
                let text = match e.unescape_with(resolve_entity) {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                builder.text(text);
            }
            Ok(Event::CData(e)) => builder.text(String::from_utf8_lossy(&e).into_owned()),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                let position = reader.error_position() as u64;
                if !builder.has_content() {
                    return Err(XmlError::Syntax {
                        position,
                        message: err.to_string(),
                    });
                }
                tracing::warn!(
                    position,
                    "stopping at malformed XML, keeping what was read: {err}"
                );
                break;
            }
        }
    }

    builder.finish()
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes().with_checks(false) {
        let Ok(attr) = attr else {
            tracing::debug!(element = %element.name, "dropping malformed attribute");
            continue;
        };
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = match attr.unescape_value_with(resolve_entity) {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        element.attributes.push((key, value));
    }
    element
}

/// A `<` followed by whitespace in text reads as a start tag with no name;
/// the text after it is lost.
fn note_unnamed(element: &Element, position: u64) {
    if element.name.is_empty() {
        tracing::debug!(position, "start tag without a name, text likely holds a raw '<'");
    }
}

/// XML's predefined entities plus the HTML ones LMS exporters leak most often.
fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        "nbsp" => Some("\u{a0}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "hellip" => Some("\u{2026}"),
        _ => None,
    }
}

#[derive(Default)]
struct TreeBuilder {
    open: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn open(&mut self, element: Element) {
        self.open.push(element);
    }

    fn attach(&mut self, element: Element) {
        if let Some(parent) = self.open.last_mut() {
            parent.content.push(Node::Element(element));
        } else if self.root.is_none() {
            self.root = Some(element);
        } else {
            tracing::debug!(element = %element.name, "ignoring element after document root");
        }
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self.open.iter().rposition(|e| e.name == name) else {
            tracing::debug!(name, "ignoring unmatched end tag");
            return;
        };
        while self.open.len() > depth {
            if let Some(element) = self.open.pop() {
                self.attach(element);
            }
        }
    }

    fn text(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        if let Some(parent) = self.open.last_mut() {
            parent.content.push(Node::Text(text));
        }
    }

    fn has_content(&self) -> bool {
        !self.open.is_empty() || self.root.is_some()
    }

    fn finish(mut self) -> Result<Element, XmlError> {
        while let Some(element) = self.open.pop() {
            self.attach(element);
        }
        self.root.ok_or(XmlError::NoRootElement)
    }
}
