//! Link syntax parsers and HTML patterns shared by the block and inline phases.

use std::sync::LazyLock;

use regex::Regex;

use crate::token::Attrs;
use crate::util::{escape_url, safe_entity, unescape_char};

/// ASCII punctuation character class.
pub const PUNCTUATION: &str = r"[!-/:-@\[-`{-~]";

/// HTML tag name.
pub const HTML_TAGNAME: &str = r"[A-Za-z][A-Za-z0-9-]*";

/// Sequence of HTML attributes (possibly empty).
pub const HTML_ATTRIBUTES: &str = r#"(?:\s+[A-Za-z_:][A-Za-z0-9_.:-]*(?:\s*=\s*(?:[^ !"'=<>`]+|'[^']*'|"[^"]*"))?)*"#;

/// Tags that start an HTML block of kind 6.
pub const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "base",
    "basefont",
    "blockquote",
    "body",
    "caption",
    "center",
    "col",
    "colgroup",
    "dd",
    "details",
    "dialog",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "frame",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "header",
    "hr",
    "html",
    "iframe",
    "legend",
    "li",
    "link",
    "main",
    "menu",
    "menuitem",
    "meta",
    "nav",
    "noframes",
    "ol",
    "optgroup",
    "option",
    "p",
    "param",
    "search",
    "section",
    "source",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "title",
    "tr",
    "track",
    "ul",
];

/// Tags whose HTML block (kind 1) runs to the matching close tag.
pub const PRE_TAGS: &[&str] = &["pre", "script", "style", "textarea"];

/// Maximum length of a link label.
const MAX_LABEL_LEN: usize = 500;

static LINK_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t]*\n?[ \t]*<((?:[^<>\n\\]|\\.)*)>").unwrap());

static LINK_BRACKET_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t]*\n?[ \t]*<").unwrap());

static LINK_HREF_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t]*\n?[ \t]*(\S+)").unwrap());

static LINK_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"\A[ \t\n]+("(?:\\{PUNCTUATION}|[^"\x00])*"|'(?:\\{PUNCTUATION}|[^'\x00])*'|\((?:\\{PUNCTUATION}|[^()\x00])*\))"#
    ))
    .unwrap()
});

static PAREN_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A\s*\)").unwrap());

/// Parse a link label (no nested brackets) starting just after `[`.
///
/// Returns the label and the position after the closing `]`.
#[must_use]
pub fn parse_link_label(src: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = src.get(pos..)?;
    let mut chars = rest.char_indices();
    let mut units = 0;
    while let Some((i, c)) = chars.next() {
        match c {
            ']' => return Some((&rest[..i], pos + i + 1)),
            '[' => return None,
            '\\' => {
                // An escape counts as one unit; a trailing newline cannot be escaped.
                match chars.next() {
                    Some((_, '\n')) | None => return None,
                    Some(_) => {}
                }
            }
            _ => {}
        }
        units += 1;
        if units > MAX_LABEL_LEN {
            return None;
        }
    }
    None
}

/// Parse link text with balanced nested brackets, starting just after `[`.
///
/// Returns the text and the position after the matching `]`.
#[must_use]
pub fn parse_link_text(src: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = src.get(pos..)?;
    let mut level = 1usize;
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => level += 1,
            ']' => {
                level -= 1;
                if level == 0 {
                    return Some((&rest[..i], pos + i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a link destination starting at `pos`.
///
/// Accepts `<...>` or a raw destination. Inline destinations end at
/// whitespace or an unescaped `)`; block destinations (reference
/// definitions) end at whitespace. Returns the destination and the position
/// just after it.
#[must_use]
pub fn parse_link_href(src: &str, pos: usize, block: bool) -> Option<(&str, usize)> {
    let rest = src.get(pos..)?;
    if LINK_BRACKET_START.is_match(rest) {
        let caps = LINK_BRACKET.captures(rest)?;
        let href = caps.get(1)?;
        return Some((href.as_str(), pos + caps.get(0)?.end()));
    }

    if block {
        let caps = LINK_HREF_BLOCK.captures(rest)?;
        let href = caps.get(1)?;
        return Some((href.as_str(), pos + href.end()));
    }

    // Skip leading blanks with at most one newline.
    let mut start = 0;
    let bytes = rest.as_bytes();
    while start < bytes.len() && matches!(bytes[start], b' ' | b'\t') {
        start += 1;
    }
    if start < bytes.len() && bytes[start] == b'\n' {
        start += 1;
        while start < bytes.len() && matches!(bytes[start], b' ' | b'\t') {
            start += 1;
        }
    }

    let mut escaped = false;
    for (i, c) in rest[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ' ' | '\t' | '\n' | ')' => {
                return Some((&rest[start..start + i], pos + start + i));
            }
            _ => {}
        }
    }
    None
}

/// Parse a link title (`"..."`, `'...'` or `(...)`) preceded by whitespace.
///
/// The title must end before `max`. Returns the unescaped title and the
/// position after its closing delimiter.
#[must_use]
pub fn parse_link_title(src: &str, pos: usize, max: usize) -> Option<(String, usize)> {
    let window = src.get(pos..max.min(src.len()))?;
    let caps = LINK_TITLE.captures(window)?;
    let quoted = caps.get(1)?.as_str();
    let inner = &quoted[1..quoted.len() - 1];
    Some((unescape_char(inner).into_owned(), pos + caps.get(0)?.end()))
}

/// Parse the `(url "title")` part of an inline link, starting just after `(`.
///
/// Returns attributes (`url`, optional `title`) and the position after `)`.
#[must_use]
pub fn parse_link(src: &str, pos: usize) -> Option<(Attrs, usize)> {
    let (href, href_pos) = parse_link_href(src, pos, false)?;
    let title = parse_link_title(src, href_pos, src.len());
    let next = title.as_ref().map_or(href_pos, |(_, p)| *p);
    let close = PAREN_END.find(src.get(next..)?)?;

    let mut attrs = Attrs::new();
    attrs.insert("url".to_owned(), escape_url(&unescape_char(href)).into());
    if let Some((title, _)) = title {
        attrs.insert("title".to_owned(), safe_entity(&title).into());
    }
    Some((attrs, next + close.end()))
}

/// Find the end of a closing run of exactly `len` `marker` characters.
///
/// The run must follow a non-whitespace character that is not itself the
/// marker (or an escaped marker), must not be followed by another marker,
/// and when `word_boundary` is set must be followed by a non-word character.
/// Returns the position just after the run.
#[must_use]
pub fn find_closing_run(
    src: &str,
    pos: usize,
    marker: char,
    len: usize,
    word_boundary: bool,
) -> Option<usize> {
    let rest = src.get(pos..)?;
    let width = marker.len_utf8();
    let mut prev: Option<char> = None;
    let mut backslashes = 0usize;
    let mut escaped_marker_before = false;

    for (i, c) in rest.char_indices() {
        if c == marker && i > 0 {
            let run_start = pos + i;
            let run = src[run_start..].chars().take_while(|&ch| ch == marker).count();
            let prev_ok = match prev {
                Some(p) if p == marker => escaped_marker_before,
                Some(p) => !p.is_whitespace(),
                None => false,
            };
            if prev_ok && run >= len {
                let end = run_start + len * width;
                let next = src[end..].chars().next();
                let run_exact = next != Some(marker);
                let boundary_ok = !word_boundary || next.is_none_or(|n| !is_word_char(n));
                if run_exact && boundary_ok {
                    return Some(end);
                }
            }
        }

        escaped_marker_before = c == marker && prev == Some('\\') && backslashes % 2 == 1;
        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
        prev = Some(c);
    }
    None
}

/// Unicode word character as used by `\w`.
#[must_use]
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
