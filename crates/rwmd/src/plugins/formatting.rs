//! Span formatting: `~~del~~`, `==mark==`, `^^ins^^`, `^sup^` and `~sub~`.

use super::register_render;
use crate::error::Error;
use crate::inline::InlineParser;
use crate::markdown::Markdown;
use crate::scanner::ScanMatch;
use crate::state::InlineState;
use crate::token::Token;

const SUPERSCRIPT: &str = r"\^(?:\\\^|\\ |[^\s^])+\^";
const SUBSCRIPT: &str = r"~(?:\\~|\\ |[^\s~])+~";

/// Parse a double-marker span up to its closing run.
fn parse_to_end(
    parser: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
    kind: &'static str,
    marker: char,
) -> Option<usize> {
    let pos = m.end();
    let next = state.src[pos..].chars().next()?;
    if next.is_whitespace() || next == marker {
        return None;
    }
    let end = state.find_closer(pos, marker, 2, false)?;
    let text = state.src[pos..end - 2].to_owned();
    let children = parser.parse_child(state, text, |_| {});
    state.append_token(Token::children(kind, children));
    Some(end)
}

/// Parse a single-marker script span; `\ ` inside it is a space.
fn parse_script(
    parser: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
    kind: &'static str,
) -> Option<usize> {
    let matched = m.as_str(&state.src);
    let text = matched[1..matched.len() - 1].replace("\\ ", " ");
    let children = parser.parse_child(state, text, |_| {});
    state.append_token(Token::children(kind, children));
    Some(m.end())
}

/// `~~text~~` → `<del>`.
pub fn strikethrough(md: &mut Markdown) -> Result<(), Error> {
    md.inline.register(
        "strikethrough",
        "~~",
        |p, m, s| parse_to_end(p, m, s, "strikethrough", '~'),
        Some("link"),
    )?;
    register_render(md, "strikethrough", |_, text, _| format!("<del>{text}</del>"));
    Ok(())
}

/// `==text==` → `<mark>`.
pub fn mark(md: &mut Markdown) -> Result<(), Error> {
    md.inline.register(
        "mark",
        "==",
        |p, m, s| parse_to_end(p, m, s, "mark", '='),
        Some("link"),
    )?;
    register_render(md, "mark", |_, text, _| format!("<mark>{text}</mark>"));
    Ok(())
}

/// `^^text^^` → `<ins>`.
pub fn insert(md: &mut Markdown) -> Result<(), Error> {
    md.inline.register(
        "insert",
        r"\^\^",
        |p, m, s| parse_to_end(p, m, s, "insert", '^'),
        Some("link"),
    )?;
    register_render(md, "insert", |_, text, _| format!("<ins>{text}</ins>"));
    Ok(())
}

/// `^text^` → `<sup>`.
pub fn superscript(md: &mut Markdown) -> Result<(), Error> {
    md.inline.register(
        "superscript",
        SUPERSCRIPT,
        |p, m, s| parse_script(p, m, s, "superscript"),
        Some("linebreak"),
    )?;
    register_render(md, "superscript", |_, text, _| format!("<sup>{text}</sup>"));
    Ok(())
}

/// `~text~` → `<sub>`.
pub fn subscript(md: &mut Markdown) -> Result<(), Error> {
    md.inline.register(
        "subscript",
        SUBSCRIPT,
        |p, m, s| parse_script(p, m, s, "subscript"),
        Some("linebreak"),
    )?;
    register_render(md, "subscript", |_, text, _| format!("<sub>{text}</sub>"));
    Ok(())
}
