//! Structured document headers (YAML frontmatter)
//!
//! Work item and collection documents carry a YAML frontmatter block
//! followed by free-form markdown. Reads deserialize the block; updates
//! rewrite individual keys in place, preserving unknown keys, key order,
//! and the body byte-for-byte. Only the header block ever changes.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;

/// Parse a type from markdown content with YAML frontmatter
///
/// Generic function that extracts YAML frontmatter and deserializes it
/// into the target type.
///
/// # Errors
///
/// Returns an error if frontmatter extraction fails or YAML
/// deserialization fails.
pub fn parse_from_markdown<T: DeserializeOwned>(content: &str, type_name: &str) -> Result<T> {
    let frontmatter = extract_yaml_frontmatter(content)?;
    serde_yaml::from_value(frontmatter)
        .with_context(|| format!("Failed to parse {type_name} from frontmatter"))
}

/// Extract a single field value from YAML frontmatter
///
/// Convenience for reading scalar values without deserializing the whole
/// structure. Returns `None` if the field is absent, `null`, or empty.
pub fn extract_frontmatter_field(content: &str, field: &str) -> Result<Option<String>> {
    let yaml = extract_yaml_frontmatter(content)?;

    let value = match &yaml[field] {
        serde_yaml::Value::Null => return Ok(None),
        serde_yaml::Value::String(s) if s.is_empty() => return Ok(None),
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => return Ok(None),
    };

    Ok(Some(value))
}

/// Extract YAML frontmatter from markdown content
///
/// Expects frontmatter delimited by `---` at the start and end.
/// Returns the parsed YAML as a `serde_yaml::Value`.
pub fn extract_yaml_frontmatter(content: &str) -> Result<serde_yaml::Value> {
    let (header_lines, _) = split_document(content)?;
    let yaml_content = header_lines.join("\n");
    serde_yaml::from_str(&yaml_content).context("Failed to parse YAML frontmatter")
}

/// Update header keys in place, returning the rewritten document.
///
/// Existing keys are replaced on their original line; missing keys are
/// appended at the end of the header block. All other header lines and the
/// entire body are carried over unchanged, so unknown fields round-trip
/// exactly. Pass `Value::Null` to set a key to `null`.
pub fn update_frontmatter(content: &str, updates: &[(&str, serde_yaml::Value)]) -> Result<String> {
    let (header_lines, body) = split_document(content)?;

    let mut lines: Vec<String> = header_lines.iter().map(|l| l.to_string()).collect();
    let mut pending: Vec<&(&str, serde_yaml::Value)> = updates.iter().collect();

    for line in lines.iter_mut() {
        // Top-level keys only; indented lines belong to nested values.
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let Some(colon) = line.find(':') else { continue };
        let key = line[..colon].trim();
        if let Some(pos) = pending.iter().position(|(k, _)| *k == key) {
            let (_, value) = pending.remove(pos);
            *line = format!("{key}: {}", render_scalar(value)?);
        }
    }

    for (key, value) in pending {
        lines.push(format!("{key}: {}", render_scalar(value)?));
    }

    Ok(format!("---\n{}\n---\n{body}", lines.join("\n")))
}

/// Render a scalar value the way it appears on a `key: value` line.
///
/// Plain strings (timestamps, statuses, slugs) are written bare; anything
/// that YAML would misread falls back to the serializer for quoting.
fn render_scalar(value: &serde_yaml::Value) -> Result<String> {
    match value {
        serde_yaml::Value::Null => Ok("null".to_string()),
        serde_yaml::Value::String(s) if is_plain_scalar(s) => Ok(s.clone()),
        other => {
            let rendered = serde_yaml::to_string(other).context("Failed to render header value")?;
            Ok(rendered.trim_end().to_string())
        }
    }
}

fn is_plain_scalar(s: &str) -> bool {
    !s.is_empty()
        && !s.contains('\n')
        && !s.contains(": ")
        && !s.contains(" #")
        && !s.ends_with(':')
        && !s.starts_with([
            '#', '-', '?', ':', '[', ']', '{', '}', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
            '`', ' ',
        ])
        && !matches!(s, "null" | "true" | "false" | "~")
}

/// Split a document into header lines (between the `---` delimiters) and
/// the raw body text that follows the closing delimiter.
fn split_document(content: &str) -> Result<(Vec<&str>, &str)> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.is_empty() || !lines[0].trim().starts_with("---") {
        bail!("No frontmatter delimiter found at start of content");
    }

    // Track indentation of opening delimiter to match closing delimiter at
    // the same level, so embedded `---` in indented block scalars is not
    // mistaken for the closing delimiter.
    let opening_indent = lines[0].len() - lines[0].trim_start().len();

    let mut end_idx = None;
    for (idx, line) in lines.iter().enumerate().skip(1) {
        let trimmed = line.trim_start();
        if trimmed.starts_with("---") {
            let line_indent = line.len() - trimmed.len();
            if line_indent == opening_indent {
                end_idx = Some(idx);
                break;
            }
        }
    }

    let end_idx =
        end_idx.ok_or_else(|| anyhow::anyhow!("Frontmatter not properly closed with ---"))?;

    // Body is everything after the closing delimiter line, byte-exact.
    let mut offset = 0;
    for line in lines.iter().take(end_idx + 1) {
        offset += line.len() + 1; // +1 for the newline
    }
    let body = if offset >= content.len() {
        ""
    } else {
        &content[offset..]
    };

    Ok((lines[1..end_idx].to_vec(), body))
}
