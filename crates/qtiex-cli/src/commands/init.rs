//! The `qtiex init` command.

use std::path::Path;

use anyhow::{Context, Result};

use qtiex_archive::config::LOCAL_CONFIG_FILE;

pub fn execute() -> Result<()> {
    let path = Path::new(LOCAL_CONFIG_FILE);
    if path.exists() {
        println!("{LOCAL_CONFIG_FILE} already exists, skipping.");
    } else {
        std::fs::write(path, SAMPLE_CONFIG)
            .with_context(|| format!("failed to write {LOCAL_CONFIG_FILE}"))?;
        println!("Created {LOCAL_CONFIG_FILE}");
    }

    println!("\nNext steps:");
    println!("  1. Adjust the limits in {LOCAL_CONFIG_FILE} if your cartridges are large");
    println!("  2. Run: qtiex inspect --archive course.imscc");
    println!("  3. Run: qtiex extract --archive course.imscc --output course.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# qtiex configuration

# Root for scratch directories. Defaults to the system temp directory.
# Environment references such as ${TMPDIR} are expanded.
# scratch_dir = "${TMPDIR}/qtiex"

# Archives with more entries than this are rejected.
max_entries = 10000

# Archives that expand beyond this many bytes are rejected (512 MiB).
max_uncompressed_bytes = 536870912

# Archives processed concurrently by `qtiex batch`.
parallelism = 4

# Pretty-print JSON output.
pretty = true
"#;
