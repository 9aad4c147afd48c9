//! qtiex-archive: Zip unpacking and scratch space for cartridge uploads.
//!
//! Provides the [`Decompressor`](qtiex_core::traits::Decompressor) and
//! [`ScratchProvider`](qtiex_core::traits::ScratchProvider) implementations
//! used by the CLI, plus the TOML configuration that tunes them.

pub mod config;
pub mod scratch;
pub mod unzip;

use std::path::Path;

use qtiex_core::{ExtractError, PackageExtraction};

pub use config::{load_config, load_config_from, QtiexConfig};
pub use scratch::TempScratch;
pub use unzip::ZipDecompressor;

impl From<&QtiexConfig> for ZipDecompressor {
    fn from(config: &QtiexConfig) -> Self {
        ZipDecompressor::new()
            .with_max_entries(config.max_entries)
            .with_max_uncompressed_bytes(config.max_uncompressed_bytes)
    }
}

impl From<&QtiexConfig> for TempScratch {
    fn from(config: &QtiexConfig) -> Self {
        match &config.scratch_dir {
            Some(dir) => TempScratch::in_dir(dir),
            None => TempScratch::new(),
        }
    }
}

/// Extract quizzes from a cartridge on disk using the zip decompressor and
/// temporary scratch directories described by `config`.
pub fn extract_archive(
    archive: Option<&Path>,
    config: &QtiexConfig,
) -> Result<PackageExtraction, ExtractError> {
    let decompressor = ZipDecompressor::from(config);
    let scratch = TempScratch::from(config);
    qtiex_core::process_upload(archive, &decompressor, &scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest identifier="m1" xmlns="http://www.imsglobal.org/xsd/imsccv1p1/imscp_v1p1">
  <metadata><lom><general><title><string>Geography 101</string></title></general></lom></metadata>
  <resources>
    <resource identifier="r1" type="imsqti_xmlv1p2/imscc_xmlv1p3/assessment">
      <file href="quiz/assessment.xml"/>
    </resource>
  </resources>
</manifest>"#;

    const ASSESSMENT: &str = r#"<questestinterop>
  <assessment title="Capitals">
    <section>
      <item ident="q1">
        <itemmetadata><qtimetadata>
          <qtimetadatafield><fieldlabel>cc_profile</fieldlabel><fieldentry>cc.essay.v0p1</fieldentry></qtimetadatafield>
        </qtimetadata></itemmetadata>
        <presentation><material><mattext>Describe Paris.</mattext></material></presentation>
      </item>
    </section>
  </assessment>
</questestinterop>"#;

    fn write_cartridge(path: &Path) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, contents) in [
            ("imsmanifest.xml", MANIFEST),
            ("quiz/assessment.xml", ASSESSMENT),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_a_zipped_cartridge() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("geo.imscc");
        write_cartridge(&archive);

        let config = QtiexConfig {
            scratch_dir: Some(work.path().join("scratch")),
            ..QtiexConfig::default()
        };
        let extraction = extract_archive(Some(&archive), &config).unwrap();

        assert_eq!(extraction.subject, "Geography 101");
        assert_eq!(extraction.quizzes.len(), 1);
        assert_eq!(extraction.quizzes[0].title, "Capitals");
        assert_eq!(extraction.item_count(), 1);

        // scratch space is released once the request completes
        let leftovers = std::fs::read_dir(work.path().join("scratch")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn config_limits_reach_the_decompressor() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("geo.imscc");
        write_cartridge(&archive);

        let config = QtiexConfig {
            max_entries: 1,
            ..QtiexConfig::default()
        };
        let err = extract_archive(Some(&archive), &config).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn missing_archive_is_reported() {
        let err = extract_archive(None, &QtiexConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::MissingArchive));
    }
}
