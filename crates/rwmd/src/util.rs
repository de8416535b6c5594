//! Shared text utilities: escaping, URL quoting, label normalization and tabs.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};

/// Characters left untouched by [`escape_url`]: unreserved plus `:/?#@!$&()*+,;=%`.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'%');

static ESCAPED_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([!-/:-@\[-`{-~])").unwrap());

static LEADING_TAB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^( {0,3})\t").unwrap());

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").unwrap());

/// Escape `&`, `<`, `>` and, when `quote` is set, `"`.
#[must_use]
pub fn escape(s: &str, quote: bool) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if quote => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Decode character references, then escape: `&copy;` stays a single `©`,
/// a bare `&` becomes `&amp;`.
#[must_use]
pub fn safe_entity(s: &str) -> String {
    escape(&html_escape::decode_html_entities(s), true)
}

/// Remove the backslash in front of escaped ASCII punctuation.
#[must_use]
pub fn unescape_char(s: &str) -> Cow<'_, str> {
    ESCAPED_PUNCT.replace_all(s, "$1")
}

/// Percent-encode a URL, keeping already-encoded triplets.
///
/// Character references are decoded first. The result is stable under
/// repeated application.
#[must_use]
pub fn escape_url(url: &str) -> String {
    let decoded = html_escape::decode_html_entities(url);
    utf8_percent_encode(&decoded, URL_SAFE).to_string()
}

/// Normalize a reference label: collapse whitespace, trim, case-fold.
///
/// Case folding is lower-then-upper so that `ß` and `SS` compare equal.
#[must_use]
pub fn normalize_label(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .to_uppercase()
}

/// Expand the first tab of each line (after up to three spaces) to the next
/// multiple of `width`.
#[must_use]
pub fn expand_leading_tab(text: &str, width: usize) -> Cow<'_, str> {
    LEADING_TAB.replace_all(text, |caps: &Captures<'_>| {
        let spaces = &caps[1];
        format!("{spaces}{}", " ".repeat(width.saturating_sub(spaces.len())))
    })
}

/// Replace the first tab of each line (after up to three spaces) with four spaces.
#[must_use]
pub fn expand_tab(text: &str) -> Cow<'_, str> {
    LEADING_TAB.replace_all(text, "$1    ")
}

/// Remove HTML tags and comments.
#[must_use]
pub fn striptags(s: &str) -> Cow<'_, str> {
    TAGS.replace_all(s, "")
}

/// Convert text to a URL-safe slug.
///
/// ASCII alphanumerics are lowercased, runs of whitespace, `-` and `_` become
/// a single dash, everything else is dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true; // Prevents leading dash

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}
