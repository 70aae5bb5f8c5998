use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Reads one class label per line.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read labels {}", path.display()))?;
    Ok(parse_labels(&text))
}

/// Parses label text, dropping WordNet synset prefixes such as
/// `n01440764 tench, Tinca tinca`. Blank lines are skipped.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_synset(line).to_string())
        .collect()
}

fn strip_synset(line: &str) -> &str {
    match line.split_once(' ') {
        Some((head, rest)) if is_synset(head) => rest.trim_start(),
        _ => line,
    }
}

fn is_synset(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some('n') && token.len() == 9 && chars.all(|c| c.is_ascii_digit())
}

/// Placeholder labels for networks shipped without a labels file.
pub fn synthesize_labels(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("class {i:04}")).collect()
}
