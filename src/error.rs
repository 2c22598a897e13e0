use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the conversion pipeline.
///
/// Unit-local errors (`MetadataParse`, `Conversion`, `Filesystem`, and
/// `MissingAuthor` in batch mode) never abort sibling units; they end up in
/// the run summary instead. `NoInputFiles` and `MissingAuthor` for a merged
/// book are fatal for the whole run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no markdown files found under the given inputs")]
    NoInputFiles,

    #[error("malformed frontmatter in {}: {reason}", path.display())]
    MetadataParse { path: PathBuf, reason: String },

    #[error("no author for \"{unit}\": pass --author or add one to the frontmatter")]
    MissingAuthor { unit: String },

    #[error("conversion of \"{unit}\" failed: {reason}")]
    Conversion { unit: String, reason: String },

    #[error("{}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
