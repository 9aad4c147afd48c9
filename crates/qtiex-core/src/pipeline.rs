//! Package extraction pipeline.
//!
//! Resources are processed one after another in manifest order. A resource
//! that cannot be turned into a quiz is logged and skipped; only a missing
//! archive, a broken archive or a broken manifest fails the request.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::assessment::parse_assessment;
use crate::error::{ExtractError, ResourceSkip, SkipReason};
use crate::manifest::{load_manifest, resolve_assessments, resolve_subject, AssessmentResource};
use crate::model::{PackageExtraction, Quiz};
use crate::traits::{Decompressor, ScratchProvider};
use crate::xml::Element;

/// Extract every assessment of an unpacked package.
pub fn extract_package(package_root: &Path, manifest: &Element) -> PackageExtraction {
    let subject = resolve_subject(manifest);
    let resources = resolve_assessments(manifest);
    tracing::info!(
        subject = %subject,
        resources = resources.len(),
        "extracting assessments"
    );

    let mut extraction = PackageExtraction {
        subject,
        quizzes: Vec::with_capacity(resources.len()),
        skipped: Vec::new(),
    };

    for resource in resources {
        match extract_resource(package_root, &resource) {
            Ok(quiz) => {
                tracing::debug!(
                    resource = %resource.identifier,
                    title = %quiz.title,
                    items = quiz.items.len(),
                    "extracted quiz"
                );
                extraction.quizzes.push(quiz);
            }
            Err(reason) => {
                if reason == SkipReason::NotAnAssessment {
                    tracing::info!(
                        resource = %resource.identifier,
                        path = %resource.relative_file_path,
                        "skipping resource: {reason}"
                    );
                } else {
                    tracing::warn!(
                        resource = %resource.identifier,
                        path = %resource.relative_file_path,
                        "skipping resource: {reason}"
                    );
                }
                extraction.skipped.push(ResourceSkip {
                    identifier: resource.identifier,
                    relative_path: resource.relative_file_path,
                    reason,
                });
            }
        }
    }

    extraction
}

fn extract_resource(package_root: &Path, resource: &AssessmentResource) -> Result<Quiz, SkipReason> {
    let path = locate(package_root, &resource.relative_file_path)?;
    let bytes = std::fs::read(&path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    let xml = String::from_utf8_lossy(&bytes);
    match parse_assessment(&xml) {
        Ok(Some(quiz)) => Ok(quiz),
        Ok(None) => Err(SkipReason::NotAnAssessment),
        Err(e) => Err(SkipReason::Malformed(e.to_string())),
    }
}

/// Find the file an `href` points at, refusing anything outside the package.
///
/// Hrefs are tried verbatim first and percent-decoded second, since exporters
/// disagree on whether manifest paths are URL-encoded.
fn locate(package_root: &Path, href: &str) -> Result<PathBuf, SkipReason> {
    let verbatim = join_inside(package_root, href)?;
    if verbatim.is_file() {
        return Ok(verbatim);
    }
    if let Ok(Cow::Owned(decoded)) = urlencoding::decode(href) {
        let candidate = join_inside(package_root, &decoded)?;
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(SkipReason::MissingFile)
}

fn join_inside(root: &Path, relative: &str) -> Result<PathBuf, SkipReason> {
    let normalized = relative.replace('\\', "/");
    let mut path = root.to_path_buf();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SkipReason::OutsidePackage)
            }
        }
    }
    Ok(path)
}

/// Stage an uploaded archive, extract it, and release the scratch area.
///
/// The scratch directory is dropped, and so removed, on every return path.
pub fn process_upload<D, S>(
    archive: Option<&Path>,
    decompressor: &D,
    scratch: &S,
) -> Result<PackageExtraction, ExtractError>
where
    D: Decompressor + ?Sized,
    S: ScratchProvider + ?Sized,
{
    let archive = archive.ok_or(ExtractError::MissingArchive)?;
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("process_upload", %request_id, archive = %archive.display());
    let _entered = span.enter();

    let workspace = scratch.allocate()?;
    let package_root = workspace.as_ref();
    tracing::debug!(scratch = %package_root.display(), "allocated scratch directory");

    decompressor.decompress(archive, package_root)?;
    let manifest = load_manifest(package_root)?;
    let extraction = extract_package(package_root, &manifest);

    tracing::info!(
        quizzes = extraction.quizzes.len(),
        items = extraction.item_count(),
        skipped = extraction.skipped.len(),
        "package extracted"
    );
    Ok(extraction)
}
