//! Package manifest (`imsmanifest.xml`) navigation.

use std::path::Path;

use crate::error::{ExtractError, XmlError};
use crate::model::NOT_AVAILABLE;
use crate::sanitize::sanitize_or_default;
use crate::xml::{parse_document, Element};

/// File name of the manifest at the package root.
pub const MANIFEST_FILE: &str = "imsmanifest.xml";

/// Resource type tag selecting QTI assessments in a Common Cartridge.
pub const ASSESSMENT_TYPE: &str = "imsqti_xmlv1p2/imscc_xmlv1p3/assessment";

/// Where the package title lives under the manifest root.
const SUBJECT_PATH: [&str; 5] = ["metadata", "lom", "general", "title", "string"];

/// One assessment document referenced by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentResource {
    /// Manifest `identifier` of the resource, `"N/A"` when absent.
    pub identifier: String,
    pub type_tag: String,
    /// `href` of the first `file` entry, relative to the package root.
    pub relative_file_path: String,
}

/// Parse manifest text into its element tree.
pub fn parse_manifest(xml: &str) -> Result<Element, XmlError> {
    parse_document(xml)
}

/// Read and parse `imsmanifest.xml` from an unpacked package.
pub fn load_manifest(package_root: &Path) -> Result<Element, ExtractError> {
    let path = package_root.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(ExtractError::ManifestMissing(path));
    }
    let bytes = std::fs::read(&path).map_err(|e| ExtractError::io(&path, e))?;
    parse_manifest(&String::from_utf8_lossy(&bytes))
        .map_err(|source| ExtractError::ManifestMalformed { path, source })
}

/// List the assessment resources of a manifest, in manifest order.
///
/// Resources of other types, and assessments without a `file` reference, are
/// left out.
pub fn resolve_assessments(manifest: &Element) -> Vec<AssessmentResource> {
    let Some(resources) = manifest.child("resources") else {
        tracing::debug!("manifest has no resources element");
        return Vec::new();
    };

    resources
        .children("resource")
        .into_iter()
        .filter(|resource| resource.attr("type") == Some(ASSESSMENT_TYPE))
        .filter_map(|resource| {
            let identifier = resource.attr("identifier").unwrap_or(NOT_AVAILABLE);
            let href = resource
                .children("file")
                .into_iter()
                .next()
                .and_then(|file| file.attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty());
            match href {
                Some(href) => Some(AssessmentResource {
                    identifier: identifier.to_string(),
                    type_tag: ASSESSMENT_TYPE.to_string(),
                    relative_file_path: href.to_string(),
                }),
                None => {
                    tracing::debug!(identifier, "assessment resource has no file reference");
                    None
                }
            }
        })
        .collect()
}

/// The package title from the manifest's LOM metadata, or `"N/A"`.
pub fn resolve_subject(manifest: &Element) -> String {
    let text = manifest
        .path(&SUBJECT_PATH)
        .and_then(|string| string.inner_text());
    sanitize_or_default(text.as_deref())
}
