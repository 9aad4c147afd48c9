//! The `qtiex extract` command.

use std::path::PathBuf;

use anyhow::Result;

use qtiex_archive::{extract_archive, load_config_from};

pub fn execute(
    archive: Option<PathBuf>,
    output: Option<PathBuf>,
    compact: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let pretty = config.pretty && !compact;

    let extraction = extract_archive(archive.as_deref(), &config)?;

    match output {
        Some(path) => {
            extraction.save_json(&path, pretty)?;
            eprintln!(
                "Extracted {} quizzes ({} items) to: {}",
                extraction.quizzes.len(),
                extraction.item_count(),
                path.display()
            );
        }
        None => println!("{}", extraction.to_json(pretty)?),
    }

    if !extraction.skipped.is_empty() {
        eprintln!("Skipped {} resource(s)", extraction.skipped.len());
    }

    Ok(())
}
