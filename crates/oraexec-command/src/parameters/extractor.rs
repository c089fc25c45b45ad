//! Bind placeholder extraction
//!
//! Finds Oracle bind placeholders (`:name`, `:1`) in command text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// A bind placeholder found in command text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// A named placeholder like `:name`
    Named(String),
    /// A numeric placeholder like `:1`
    Positional(usize),
}

impl Placeholder {
    /// The name a parameter must carry to bind to this placeholder by name
    pub fn bind_name(&self) -> String {
        match self {
            Placeholder::Named(name) => name.clone(),
            Placeholder::Positional(pos) => pos.to_string(),
        }
    }
}

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z][A-Za-z0-9_$#]*|[0-9]+)").expect("valid regex")
});

// String literals (with '' escapes), quoted identifiers and comments
static SKIP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"[^"]*"|--[^\n]*|/\*[\s\S]*?\*/"#).expect("valid regex")
});

/// Extracts the distinct placeholders of `sql`, in order of first
/// occurrence.
///
/// Placeholders inside string literals, quoted identifiers and comments are
/// ignored, as is the PL/SQL assignment operator `:=`. Names are compared
/// case-insensitively.
pub fn extract_placeholders(sql: &str) -> Vec<Placeholder> {
    let masked = mask_literals_and_comments(sql);

    let mut seen: HashSet<String> = HashSet::new();
    let mut placeholders = Vec::new();

    for cap in PLACEHOLDER_REGEX.captures_iter(&masked) {
        let Some(token) = cap.get(1) else {
            continue;
        };
        // `a::b` and `x:y` are not binds; a placeholder follows a non-word char
        let start = token.start() - 1;
        if masked[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == ':')
        {
            continue;
        }

        let text = token.as_str();
        if !seen.insert(text.to_ascii_lowercase()) {
            continue;
        }
        let placeholder = match text.parse::<usize>() {
            Ok(pos) => Placeholder::Positional(pos),
            Err(_) => Placeholder::Named(text.to_string()),
        };
        placeholders.push(placeholder);
    }

    placeholders
}

fn mask_literals_and_comments(sql: &str) -> String {
    SKIP_REGEX
        .replace_all(sql, |caps: &regex::Captures| " ".repeat(caps[0].len()))
        .into_owned()
}
