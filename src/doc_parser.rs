//! Minimal reader for `/** ... */` doc comments of controller methods.

/// A `@tag type $name description` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    pub name: String,
    pub type_name: Option<String>,
    pub description: Option<String>,
}

/// Comment text without delimiters and leading `*`, one entry per line.
fn content_lines(doc: &str) -> Vec<&str> {
    doc.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("/**").unwrap_or(line);
            let line = line.strip_suffix("*/").unwrap_or(line);
            let line = line.trim_start();
            line.strip_prefix('*').unwrap_or(line).trim()
        })
        .collect()
}

/// First paragraph of the comment, tags excluded, lines joined by spaces.
pub fn doc_summary(doc: &str) -> String {
    let mut summary: Vec<&str> = Vec::new();
    for line in content_lines(doc) {
        if line.starts_with('@') {
            break;
        }
        if line.is_empty() {
            if summary.is_empty() {
                continue;
            }
            break;
        }
        summary.push(line);
    }
    summary.join(" ")
}

/// All `@tag` lines of the comment.
///
/// The type is optional (`@param $id` is accepted); the name loses its `$`.
pub fn doc_tags(doc: &str, tag: &str) -> Vec<DocTag> {
    let marker = format!("@{}", tag.trim_start_matches('@'));
    content_lines(doc)
        .into_iter()
        .filter_map(|line| {
            let rest = line.strip_prefix(&marker)?;
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                return None;
            }
            parse_tag_body(rest.trim())
        })
        .collect()
}

fn parse_tag_body(body: &str) -> Option<DocTag> {
    let mut parts = body.splitn(2, char::is_whitespace);
    let first = parts.next().filter(|part| !part.is_empty())?;
    let rest = parts.next().unwrap_or("").trim();

    let (type_name, name, rest) = if first.starts_with('$') {
        (None, first, rest)
    } else {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().filter(|part| part.starts_with('$'))?;
        (Some(first.to_string()), name, parts.next().unwrap_or("").trim())
    };

    Some(DocTag {
        name: name.trim_start_matches('$').to_string(),
        type_name,
        description: (!rest.is_empty()).then(|| rest.to_string()),
    })
}
