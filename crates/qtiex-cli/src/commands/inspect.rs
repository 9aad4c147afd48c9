//! The `qtiex inspect` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use qtiex_archive::{extract_archive, load_config_from};
use qtiex_core::{PackageExtraction, Quiz, ResponseType};

pub fn execute(archive: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let extraction = extract_archive(archive.as_deref(), &config)?;

    println!("Subject: {}", extraction.subject);
    println!("{}", quiz_table(&extraction));

    if !extraction.skipped.is_empty() {
        println!("\nSkipped resources:");
        println!("{}", skipped_table(&extraction));
    }

    Ok(())
}

fn quiz_table(extraction: &PackageExtraction) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Quiz",
        "Items",
        "Multiple Choice",
        "Fill in Blank",
        "Essay",
        "Unknown",
    ]);

    for quiz in &extraction.quizzes {
        table.add_row(vec![
            Cell::new(&quiz.title),
            Cell::new(quiz.items.len()),
            Cell::new(count(quiz, ResponseType::MultipleChoice)),
            Cell::new(count(quiz, ResponseType::FillInBlank)),
            Cell::new(count(quiz, ResponseType::Essay)),
            Cell::new(count(quiz, ResponseType::Unknown)),
        ]);
    }

    table
}

fn skipped_table(extraction: &PackageExtraction) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Resource", "Path", "Reason"]);
    for skip in &extraction.skipped {
        table.add_row(vec![
            Cell::new(&skip.identifier),
            Cell::new(&skip.relative_path),
            Cell::new(skip.reason.to_string()),
        ]);
    }
    table
}

fn count(quiz: &Quiz, response_type: ResponseType) -> usize {
    quiz.items
        .iter()
        .filter(|item| item.response_type == response_type)
        .count()
}
