/// One document's contribution to a merged book, in final order.
#[derive(Debug, Clone)]
pub struct MergeSection<'a> {
    /// Title used if a chapter heading has to be synthesized.
    pub title: String,
    /// Body text, frontmatter already stripped.
    pub body: &'a str,
}

/// Result of assembling ordered sections into one body.
///
/// The boundary counts feed table-of-contents depth decisions downstream:
/// `native_chapters` counts level-1 headings the sources brought themselves,
/// `synthesized_chapters` counts the headings inserted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedBody {
    pub body: String,
    pub synthesized_chapters: usize,
    pub native_chapters: usize,
}

/// Concatenate ordered sections into one merged body.
///
/// A section without a level-1 heading gets `# {title}` synthesized
/// immediately before its content so every document starts a chapter. A
/// thematic break separates adjacent sections so two documents are never
/// visually contiguous. Heading levels are left exactly as written: level-1
/// is the chapter marker across all sources, and deeper levels are never
/// shifted to compensate.
///
/// Pure function of its input; identical sections produce a byte-identical
/// body.
pub fn assemble(sections: &[MergeSection<'_>]) -> MergedBody {
    let mut body = String::new();
    let mut synthesized_chapters = 0;
    let mut native_chapters = 0;

    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            body.push_str("\n\n---\n\n");
        }

        let native = count_level1_headings(section.body);
        if native == 0 {
            body.push_str("# ");
            body.push_str(&section.title);
            body.push_str("\n\n");
            synthesized_chapters += 1;
        } else {
            native_chapters += native;
        }

        body.push_str(section.body.trim_end());
    }

    body.push('\n');

    MergedBody {
        body,
        synthesized_chapters,
        native_chapters,
    }
}

/// Count level-1 ATX headings, ignoring anything inside fenced code blocks.
fn count_level1_headings(body: &str) -> usize {
    let mut count = 0;
    let mut fence: Option<char> = None;

    for line in body.lines() {
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if is_fence(trimmed, marker) {
                fence = None;
            }
            continue;
        }
        if is_fence(trimmed, '`') {
            fence = Some('`');
            continue;
        }
        if is_fence(trimmed, '~') {
            fence = Some('~');
            continue;
        }

        if is_level1_heading(line) {
            count += 1;
        }
    }

    count
}

fn is_fence(line: &str, marker: char) -> bool {
    line.chars().take_while(|&c| c == marker).count() >= 3
}

fn is_level1_heading(line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return false;
    }
    let rest = line.trim_start_matches(' ');
    rest == "#" || (rest.starts_with('#') && !rest.starts_with("##") && rest[1..].starts_with(' '))
}
