use std::ffi::OsString;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use crate::converter::{EbookConverter, LogicalDocument};
use crate::metadata::ResolvedMetadata;

/// Pandoc-backed implementation of the converter collaborator.
///
/// The logical document's body is staged to a temporary markdown file and
/// pandoc is invoked as an external process. A non-zero exit comes back as
/// the failure reason (pandoc's stderr), attributed to that one job only.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    pub toc_depth: u8,
    pub chapter_level: u8,
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self {
            toc_depth: 3,
            chapter_level: 2,
        }
    }
}

impl PandocConverter {
    fn build_args(&self, input: &Path, output: &Path, document: &LogicalDocument) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.as_os_str().to_os_string(),
            "-o".into(),
            output.as_os_str().to_os_string(),
            "--toc".into(),
            format!("--toc-depth={}", self.toc_depth).into(),
            format!("--epub-chapter-level={}", self.chapter_level).into(),
        ];

        if let Some(css) = &document.stylesheet {
            args.push("--css".into());
            args.push(css.as_os_str().to_os_string());
        }

        for (key, value) in metadata_pairs(&document.metadata) {
            args.push("--metadata".into());
            args.push(format!("{key}={value}").into());
        }

        args
    }
}

impl EbookConverter for PandocConverter {
    async fn convert(&self, document: &LogicalDocument, output: &Path) -> Result<(), String> {
        let staged = tempfile::Builder::new()
            .prefix("md2epub-")
            .suffix(".md")
            .tempfile()
            .map_err(|e| format!("failed to stage input: {e}"))?;

        fs::write(staged.path(), &document.body)
            .await
            .map_err(|e| format!("failed to stage input: {e}"))?;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
            }
        }

        let args = self.build_args(staged.path(), output, document);
        debug!("pandoc {:?}", args);

        let result = Command::new("pandoc")
            .args(&args)
            .output()
            .await
            .map_err(|e| format!("failed to run pandoc: {e}"))?;

        if result.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                Err(format!("pandoc exited with {}", result.status))
            } else {
                Err(stderr.to_string())
            }
        }
    }
}

/// Probe for a pandoc installation, returning its version banner.
pub async fn pandoc_version() -> Option<String> {
    let output = Command::new("pandoc").arg("--version").output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.to_string())
}

fn metadata_pairs(metadata: &ResolvedMetadata) -> Vec<(&'static str, &str)> {
    let mut pairs = vec![
        ("title", metadata.title.as_str()),
        ("author", metadata.author.as_str()),
        ("lang", metadata.language.as_str()),
    ];
    if let Some(description) = &metadata.description {
        pairs.push(("description", description));
    }
    if let Some(publisher) = &metadata.publisher {
        pairs.push(("publisher", publisher));
    }
    if let Some(date) = &metadata.date {
        pairs.push(("date", date));
    }
    pairs
}
