use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::error::ConvertError;

/// Filename probed in the working directory when no stylesheet is given.
pub const DEFAULT_STYLESHEET_NAME: &str = "style.css";

/// Pick the stylesheet for a run.
///
/// An explicit path wins when it exists. Otherwise `style.css` in the
/// working directory is used when present. With `create_default` set, the
/// bundled stylesheet is written there and used; without it the run proceeds
/// unstyled.
pub async fn resolve(
    explicit: Option<&Path>,
    create_default: bool,
) -> Result<Option<PathBuf>, ConvertError> {
    if let Some(path) = explicit {
        if fs::try_exists(path)
            .await
            .map_err(|e| ConvertError::filesystem(path, e))?
        {
            return Ok(Some(path.to_path_buf()));
        }
        warn!("Stylesheet {} not found, ignoring", path.display());
    }

    let default = PathBuf::from(DEFAULT_STYLESHEET_NAME);
    if fs::try_exists(&default)
        .await
        .map_err(|e| ConvertError::filesystem(&default, e))?
    {
        return Ok(Some(default));
    }

    if create_default {
        write_default(&default).await?;
        return Ok(Some(default));
    }

    Ok(None)
}

/// Write the bundled e-book stylesheet to `path`.
pub async fn write_default(path: &Path) -> Result<(), ConvertError> {
    fs::write(path, DEFAULT_STYLESHEET)
        .await
        .map_err(|e| ConvertError::filesystem(path, e))?;
    info!("Stylesheet written to {}", path.display());
    Ok(())
}

const DEFAULT_STYLESHEET: &str = r#"/* Default e-book stylesheet bundled with md2epub */

* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: "Georgia", "Palatino", "Times New Roman", serif;
    font-size: 1em;
    line-height: 1.7;
    text-align: justify;
    word-wrap: break-word;
    hyphens: auto;
}

h1, h2, h3, h4, h5, h6 {
    font-family: "Helvetica Neue", "Arial", sans-serif;
    font-weight: bold;
    line-height: 1.3;
    margin-top: 1.5em;
    margin-bottom: 0.5em;
    page-break-after: avoid;
    page-break-inside: avoid;
    text-align: left;
}

h1 {
    font-size: 2em;
    margin-top: 0;
    margin-bottom: 1em;
    padding-bottom: 0.3em;
    border-bottom: 2px solid #333;
    page-break-before: always;
}

h1:first-of-type {
    page-break-before: auto;
}

h2 {
    font-size: 1.6em;
    color: #2c3e50;
    margin-top: 2em;
}

h3 {
    font-size: 1.3em;
    color: #34495e;
}

p {
    margin: 0.8em 0;
    text-indent: 1.5em;
    orphans: 2;
    widows: 2;
}

p:first-child,
h1 + p, h2 + p, h3 + p, h4 + p, h5 + p, h6 + p,
blockquote + p, ul + p, ol + p, pre + p {
    text-indent: 0;
}

a {
    color: #0066cc;
    text-decoration: none;
}

ul, ol {
    margin: 1em 0;
    padding-left: 2em;
}

li {
    margin: 0.5em 0;
    line-height: 1.6;
}

li > p {
    text-indent: 0;
}

code {
    font-family: "Courier New", "Consolas", "Monaco", monospace;
    font-size: 0.9em;
    background-color: #f5f5f5;
    padding: 0.2em 0.4em;
    border-radius: 3px;
    word-wrap: break-word;
}

pre {
    background-color: #f8f8f8;
    border: 1px solid #ddd;
    border-radius: 4px;
    padding: 1em;
    margin: 1em 0;
    overflow-x: auto;
    line-height: 1.4;
    page-break-inside: avoid;
}

pre code {
    background-color: transparent;
    padding: 0;
    border: none;
}

blockquote {
    margin: 1.5em 1em;
    padding: 0.5em 1em;
    border-left: 4px solid #2196f3;
    background-color: #f9f9f9;
    font-style: italic;
    color: #555;
    page-break-inside: avoid;
}

blockquote p {
    text-indent: 0;
}

img {
    max-width: 100%;
    height: auto;
    display: block;
    margin: 1.5em auto;
    page-break-inside: avoid;
}

table {
    border-collapse: collapse;
    width: 100%;
    margin: 1.5em 0;
    font-size: 0.9em;
    page-break-inside: avoid;
}

th, td {
    border: 1px solid #ddd;
    padding: 0.6em 0.8em;
    text-align: left;
    text-indent: 0;
}

th {
    background-color: #f5f5f5;
    font-weight: bold;
    color: #333;
}

hr {
    border: none;
    border-top: 1px solid #ccc;
    margin: 2em 0;
    page-break-after: avoid;
}

@page {
    margin: 1em;
}
"#;
