//! The `qtiex batch` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use qtiex_archive::{extract_archive, load_config_from, QtiexConfig};

const ARCHIVE_EXTENSIONS: &[&str] = &["imscc", "zip"];

/// Result of one archive in the batch.
struct Outcome {
    archive: PathBuf,
    result: Result<Summary>,
}

struct Summary {
    quizzes: usize,
    items: usize,
    output: PathBuf,
}

pub async fn execute(
    input: PathBuf,
    output: PathBuf,
    parallelism: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let archives = collect_archives(&input)?;
    anyhow::ensure!(
        !archives.is_empty(),
        "no .imscc or .zip archives found in {}",
        input.display()
    );
    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output directory: {}", output.display()))?;

    eprintln!(
        "qtiex v{}: extracting {} archives ({} at a time)",
        env!("CARGO_PKG_VERSION"),
        archives.len(),
        parallelism
    );

    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(parallelism));
    let config = Arc::new(config);
    let mut futures = FuturesUnordered::new();

    for archive in archives {
        let semaphore = Arc::clone(&semaphore);
        let config = Arc::clone(&config);
        let output = output.clone();

        futures.push(async move {
            let inner = async {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                let archive = archive.clone();
                tokio::task::spawn_blocking(move || extract_one(&archive, &output, &config))
                    .await
                    .context("extraction task panicked")?
            };
            let result = inner.await;
            Outcome { archive, result }
        });
    }

    let total = futures.len();
    let mut failed = 0usize;

    while let Some(outcome) = futures.next().await {
        match outcome.result {
            Ok(summary) => eprintln!(
                "  Done: {} ({} quizzes, {} items) -> {}",
                outcome.archive.display(),
                summary.quizzes,
                summary.items,
                summary.output.display()
            ),
            Err(e) => {
                tracing::error!("extraction failed for {}: {e:#}", outcome.archive.display());
                eprintln!("  ERROR: {}: {e:#}", outcome.archive.display());
                failed += 1;
            }
        }
    }

    eprintln!(
        "\nComplete: {}/{total} succeeded, {failed} failed ({:.1}s)",
        total - failed,
        start.elapsed().as_secs_f64()
    );

    anyhow::ensure!(failed == 0, "{failed} of {total} archives failed");
    Ok(())
}

fn extract_one(archive: &Path, output_dir: &Path, config: &QtiexConfig) -> Result<Summary> {
    let extraction = extract_archive(Some(archive), config)?;
    let output = output_dir.join(output_name(archive));
    extraction.save_json(&output, config.pretty)?;
    Ok(Summary {
        quizzes: extraction.quizzes.len(),
        items: extraction.item_count(),
        output,
    })
}

/// `course.imscc` becomes `course.imscc.json`, so archives that differ only
/// by extension do not overwrite each other.
fn output_name(archive: &Path) -> String {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    format!("{name}.json")
}

/// Archives directly inside `dir`, sorted by path.
fn collect_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read input directory: {}", dir.display()))?;

    let mut archives = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_archive = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ARCHIVE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if path.is_file() && is_archive {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}
