//! Directive argument parsing.
//!
//! Both directive syntaxes reduce to the same shape once the header line is
//! matched: a name, a title, and a body whose leading `:key: value` lines are
//! options and whose remainder is markdown content.

use std::sync::LazyLock;

use regex::Regex;

static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A:(?P<key>[a-zA-Z0-9_-]+):[ \t]*(?P<value>[^\n]*?)[ \t]*\n?\z").unwrap());

/// Parsed directive call.
///
/// ```text
/// .. note:: Title
///    :class: wide
///
///    Body text.
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectiveArgs {
    /// Directive name (`note`).
    pub name: String,
    /// Text after the name on the header line (`Title`).
    pub title: String,
    /// Options in source order (`class` → `wide`).
    pub options: Vec<(String, String)>,
    /// Markdown content after the options.
    pub content: String,
    /// Block rule that matched the directive, removed from the content's
    /// rules once the nesting limit is reached.
    pub rule: String,
}

impl DirectiveArgs {
    /// Split a dedented directive body into options and content.
    #[must_use]
    pub fn parse_body(name: &str, title: &str, body: &str, rule: &str) -> Self {
        let mut options = Vec::new();
        let mut consumed = 0;
        for line in body.split_inclusive('\n') {
            let Some(caps) = OPTION_LINE.captures(line) else {
                break;
            };
            options.push((caps["key"].to_owned(), caps["value"].to_owned()));
            consumed += line.len();
        }

        let mut content = &body[consumed..];
        while let Some(end) = content.find('\n') {
            if !content[..end].trim().is_empty() {
                break;
            }
            content = &content[end + 1..];
        }
        if content.trim().is_empty() {
            content = "";
        }

        let mut content = content.to_owned();
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }

        Self {
            name: name.to_owned(),
            title: title.trim().to_owned(),
            options,
            content,
            rule: rule.to_owned(),
        }
    }

    /// Get an option value by key. The first occurrence wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether an option is present (`:collapse:` with no value counts).
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.options.iter().any(|(k, _)| k == key)
    }

    /// Parse an integer option.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }
}

/// Remove the common leading spaces of all non-blank lines. Blank lines
/// become empty.
#[must_use]
pub(crate) fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                if line.ends_with('\n') { "\n" } else { "" }
            } else {
                &line[indent..]
            }
        })
        .collect()
}
