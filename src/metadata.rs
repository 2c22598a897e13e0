use serde_json::Value;
use std::path::Path;

use crate::error::ConvertError;
use crate::frontmatter::FrontmatterMap;
use crate::request::ConversionRequest;

/// Final metadata for one conversion unit. Resolution is atomic: either
/// every field resolves (author included) or the unit fails with
/// `MissingAuthor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub author: String,
    pub language: String,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
}

/// Merge metadata for one unit. Precedence, highest first: explicit request
/// fields, then the consulted document's frontmatter, then built-in defaults
/// (language `en`, title derived from `fallback`'s filename). Exactly one
/// document's frontmatter feeds a unit; fields are never mixed across files.
///
/// There is no default author. A unit that resolves without one is rejected
/// here, before any job is built.
pub fn resolve(
    request: &ConversionRequest,
    frontmatter: &FrontmatterMap,
    fallback: &Path,
) -> Result<ResolvedMetadata, ConvertError> {
    let title = request
        .title
        .clone()
        .or_else(|| scalar_field(frontmatter, "title"))
        .unwrap_or_else(|| title_from_filename(fallback));

    let author = request
        .author
        .clone()
        .or_else(|| scalar_field(frontmatter, "author"))
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ConvertError::MissingAuthor {
            unit: title.clone(),
        })?;

    let language = request
        .language
        .clone()
        .or_else(|| scalar_field(frontmatter, "lang"))
        .unwrap_or_else(|| "en".to_string());

    Ok(ResolvedMetadata {
        title,
        author,
        language,
        description: request
            .description
            .clone()
            .or_else(|| scalar_field(frontmatter, "description")),
        publisher: request
            .publisher
            .clone()
            .or_else(|| scalar_field(frontmatter, "publisher")),
        date: request
            .date
            .clone()
            .or_else(|| scalar_field(frontmatter, "date")),
    })
}

/// Title for a document inside a merged book: its own frontmatter title if
/// declared, otherwise one derived from its filename.
pub fn chapter_title(frontmatter: &FrontmatterMap, path: &Path) -> String {
    scalar_field(frontmatter, "title").unwrap_or_else(|| title_from_filename(path))
}

/// Derive a presentable title from a filename: extension stripped,
/// `_` and `-` turned into spaces, each word capitalized.
pub fn title_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn scalar_field(frontmatter: &FrontmatterMap, key: &str) -> Option<String> {
    match frontmatter.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::OutputMode;
    use std::path::PathBuf;

    fn request() -> ConversionRequest {
        ConversionRequest::new(vec![PathBuf::from("notes.md")], OutputMode::Single)
    }

    fn frontmatter(pairs: &[(&str, &str)]) -> FrontmatterMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn request_fields_win_over_frontmatter() {
        let mut req = request();
        req.author = Some("A".to_string());
        req.title = Some("Override".to_string());

        let fm = frontmatter(&[("author", "B"), ("title", "Original")]);
        let resolved = resolve(&req, &fm, Path::new("notes.md")).unwrap();
        assert_eq!(resolved.author, "A");
        assert_eq!(resolved.title, "Override");
    }

    #[test]
    fn frontmatter_wins_over_defaults() {
        let mut req = request();
        req.author = Some("A".to_string());

        let fm = frontmatter(&[("lang", "fr"), ("title", "Carnet")]);
        let resolved = resolve(&req, &fm, Path::new("notes.md")).unwrap();
        assert_eq!(resolved.language, "fr");
        assert_eq!(resolved.title, "Carnet");
    }

    #[test]
    fn defaults_fill_the_rest() {
        let fm = frontmatter(&[("author", "B")]);
        let resolved = resolve(&request(), &fm, Path::new("my_great-book.md")).unwrap();
        assert_eq!(resolved.author, "B");
        assert_eq!(resolved.language, "en");
        assert_eq!(resolved.title, "My Great Book");
        assert_eq!(resolved.description, None);
    }

    #[test]
    fn missing_author_is_rejected() {
        let err = resolve(&request(), &FrontmatterMap::new(), Path::new("notes.md")).unwrap_err();
        assert!(matches!(err, ConvertError::MissingAuthor { .. }));
    }

    #[test]
    fn blank_author_is_rejected() {
        let mut req = request();
        req.author = Some("   ".to_string());

        let err = resolve(&req, &FrontmatterMap::new(), Path::new("notes.md")).unwrap_err();
        assert!(matches!(err, ConvertError::MissingAuthor { .. }));
    }

    #[test]
    fn numeric_scalars_are_stringified() {
        let mut fm = frontmatter(&[("author", "B")]);
        fm.insert("date".to_string(), Value::Number(2024.into()));

        let resolved = resolve(&request(), &fm, Path::new("notes.md")).unwrap();
        assert_eq!(resolved.date.as_deref(), Some("2024"));
    }

    #[test]
    fn chapter_title_prefers_frontmatter() {
        let fm = frontmatter(&[("title", "Declared")]);
        assert_eq!(chapter_title(&fm, Path::new("01_intro.md")), "Declared");
        assert_eq!(
            chapter_title(&FrontmatterMap::new(), Path::new("01_intro.md")),
            "01 Intro"
        );
    }
}
