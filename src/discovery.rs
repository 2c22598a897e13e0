use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::ConvertError;

/// Expand the given files and directories into an ordered list of markdown
/// sources.
///
/// Non-markdown files are filtered out before ordering. The final order is
/// strict and reproducible: filename first, full path as tiebreak, so runs
/// over an unchanged tree always see the same sequence regardless of how the
/// filesystem enumerates entries.
pub async fn discover(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>, ConvertError> {
    let mut found = Vec::new();

    for input in inputs {
        let meta = fs::metadata(input)
            .await
            .map_err(|e| ConvertError::filesystem(input, e))?;

        if meta.is_dir() {
            scan_dir(input, recursive, &mut found).await?;
        } else if is_markdown(input) {
            found.push(input.clone());
        } else {
            debug!("Skipping non-markdown input {}", input.display());
        }
    }

    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    found.dedup();

    if found.is_empty() {
        return Err(ConvertError::NoInputFiles);
    }

    debug!("Discovered {} markdown file(s)", found.len());
    Ok(found)
}

async fn scan_dir(
    dir: &Path,
    recursive: bool,
    found: &mut Vec<PathBuf>,
) -> Result<(), ConvertError> {
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current)
            .await
            .map_err(|e| ConvertError::filesystem(&current, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ConvertError::filesystem(&current, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ConvertError::filesystem(&path, e))?;

            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if is_markdown(&path) {
                found.push(path);
            }
        }
    }

    Ok(())
}

fn is_markdown(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "md")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            stdfs::create_dir_all(parent).unwrap();
        }
        stdfs::write(path, "content\n").unwrap();
    }

    #[tokio::test]
    async fn orders_by_filename() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("02_middle.md"));
        touch(&dir.path().join("01_intro.md"));
        touch(&dir.path().join("03_end.md"));

        let found = discover(&[dir.path().to_path_buf()], false).await.unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["01_intro.md", "02_middle.md", "03_end.md"]);
    }

    #[tokio::test]
    async fn repeated_discovery_is_deterministic() {
        let dir = tempdir().unwrap();
        for name in ["b.md", "a.md", "c.md", "d.md"] {
            touch(&dir.path().join(name));
        }

        let inputs = [dir.path().to_path_buf()];
        let first = discover(&inputs, false).await.unwrap();
        let second = discover(&inputs, false).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn recursion_is_opt_in() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("top.md"));
        touch(&dir.path().join("nested/deep.md"));

        let inputs = [dir.path().to_path_buf()];
        let flat = discover(&inputs, false).await.unwrap();
        assert_eq!(flat.len(), 1);

        let deep = discover(&inputs, true).await.unwrap();
        assert_eq!(deep.len(), 2);
        // Filename comparison puts deep.md before top.md despite nesting.
        assert_eq!(deep[0].file_name().unwrap(), "deep.md");
    }

    #[tokio::test]
    async fn non_markdown_files_are_filtered_before_ordering() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("keep.md"));
        touch(&dir.path().join("skip.txt"));
        touch(&dir.path().join("skip.markdown"));

        let found = discover(&[dir.path().to_path_buf()], false).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_name().unwrap(), "keep.md");
    }

    #[tokio::test]
    async fn empty_result_is_an_error() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("readme.txt"));

        let err = discover(&[dir.path().to_path_buf()], false)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::NoInputFiles));
    }

    #[tokio::test]
    async fn explicit_files_and_directories_mix() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("books/one.md"));
        let standalone = dir.path().join("zz_standalone.md");
        touch(&standalone);

        let inputs = [dir.path().join("books"), standalone.clone()];
        let found = discover(&inputs, false).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].file_name().unwrap(), "one.md");
        assert_eq!(found[1], standalone);
    }
}
