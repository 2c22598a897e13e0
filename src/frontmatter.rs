use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::ConvertError;

/// Frontmatter fields as parsed from a document, keyed by field name.
///
/// Values are kept as JSON values so scalars (strings, numbers, booleans)
/// and structured values survive uniformly; resolution only ever consumes
/// the scalar ones.
pub type FrontmatterMap = BTreeMap<String, Value>;

/// One loaded input file: its path, extracted frontmatter, and the body
/// with the frontmatter block stripped. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub frontmatter: FrontmatterMap,
    pub body: String,
}

impl SourceDocument {
    pub async fn load(path: &Path) -> Result<Self, ConvertError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| ConvertError::filesystem(path, e))?;

        let (frontmatter, body) = extract(path, &raw)?;
        debug!(
            "Loaded {} ({} frontmatter fields, {} body bytes)",
            path.display(),
            frontmatter.len(),
            body.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            frontmatter,
            body: body.to_string(),
        })
    }
}

/// Split a document into its YAML frontmatter and the remaining body.
///
/// A frontmatter block is a leading `---` line (optional BOM before it)
/// closed by a `---` or `...` line. Without one, the text comes back
/// unchanged with an empty mapping. A detected block that fails to parse is
/// a hard error naming the file, so a half-written block never ends up
/// rendered as visible text in a published book.
pub fn extract<'a>(path: &Path, raw: &'a str) -> Result<(FrontmatterMap, &'a str), ConvertError> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((FrontmatterMap::new(), raw));
    };
    if first.trim_end() != "---" {
        return Ok((FrontmatterMap::new(), raw));
    }

    let mut consumed = first.len();
    let mut yaml = String::new();
    let mut closed = false;

    for line in lines {
        consumed += line.len();
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            closed = true;
            break;
        }
        yaml.push_str(line);
    }

    if !closed {
        return Err(ConvertError::MetadataParse {
            path: path.to_path_buf(),
            reason: "missing closing delimiter".to_string(),
        });
    }

    let body = &text[consumed..];

    if yaml.trim().is_empty() {
        return Ok((FrontmatterMap::new(), body));
    }

    let fields = parse_yaml_fields(&yaml).map_err(|reason| ConvertError::MetadataParse {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok((fields, body))
}

/// Parse the YAML payload into a JSON-compatible map. The block must be a
/// key/value mapping at the top level.
fn parse_yaml_fields(yaml: &str) -> Result<FrontmatterMap, String> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    let json: Value =
        serde_json::to_value(value).map_err(|e| format!("unsupported frontmatter value: {e}"))?;

    match json {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err("frontmatter is not a key/value mapping".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> PathBuf {
        PathBuf::from("test.md")
    }

    #[test]
    fn no_frontmatter_passes_body_through() {
        let input = "# Title\n\nBody text.\n";
        let (fm, body) = extract(&path(), input).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn basic_block() {
        let input = "---\ntitle: My Book\nauthor: Jane Doe\n---\n# Chapter\n";
        let (fm, body) = extract(&path(), input).unwrap();
        assert_eq!(fm.len(), 2);
        assert_eq!(fm["title"], Value::String("My Book".into()));
        assert_eq!(fm["author"], Value::String("Jane Doe".into()));
        assert_eq!(body, "# Chapter\n");
    }

    #[test]
    fn scalar_values() {
        let input = "---\ntitle: Notes\ndate: 2024-03-01\nedition: 2\ndraft: true\n---\nBody";
        let (fm, _) = extract(&path(), input).unwrap();
        assert_eq!(fm["date"], Value::String("2024-03-01".into()));
        assert_eq!(fm["edition"], Value::Number(2.into()));
        assert_eq!(fm["draft"], Value::Bool(true));
    }

    #[test]
    fn dots_close_the_block() {
        let input = "---\ntitle: A\n...\nBody";
        let (fm, body) = extract(&path(), input).unwrap();
        assert_eq!(fm["title"], Value::String("A".into()));
        assert_eq!(body, "Body");
    }

    #[test]
    fn bom_is_tolerated() {
        let input = "\u{feff}---\ntitle: A\n---\nBody";
        let (fm, _) = extract(&path(), input).unwrap();
        assert_eq!(fm["title"], Value::String("A".into()));
    }

    #[test]
    fn empty_block_is_empty_mapping() {
        let input = "---\n---\nBody";
        let (fm, body) = extract(&path(), input).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, "Body");
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let input = "---\ntitle: A\nBody keeps going";
        let err = extract(&path(), input).unwrap_err();
        assert!(matches!(err, ConvertError::MetadataParse { .. }));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let input = "---\ntitle: [unclosed\n---\nBody";
        let err = extract(&path(), input).unwrap_err();
        assert!(matches!(err, ConvertError::MetadataParse { .. }));
    }

    #[test]
    fn non_mapping_block_is_an_error() {
        let input = "---\n- just\n- a list\n---\nBody";
        let err = extract(&path(), input).unwrap_err();
        assert!(matches!(err, ConvertError::MetadataParse { .. }));
    }
}
