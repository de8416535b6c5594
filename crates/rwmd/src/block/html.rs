//! Raw HTML blocks.
//!
//! Comments, processing instructions, declarations and CDATA run to their end
//! marker. `pre`, `script`, `style` and `textarea` run to the matching close
//! tag. Block-level tags and any other complete tag on its own line run to
//! the next blank line; the latter cannot interrupt a paragraph.

use std::sync::LazyLock;

use regex::Regex;

use super::{BLANK_LINE, BlockParser};
use crate::helpers::{BLOCK_TAGS, HTML_ATTRIBUTES, PRE_TAGS};
use crate::scanner::ScanMatch;
use crate::state::BlockState;
use crate::token::Token;

static OPEN_TAG_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\A{HTML_ATTRIBUTES}[ \t]*/?>[ \t]*(?:\n|\z)")).unwrap()
});

static CLOSE_TAG_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t]*>[ \t]*(?:\n|\z)").unwrap());

pub(super) fn parse_raw_html(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let marker = m.as_str(&state.src).trim().to_owned();

    match marker.as_str() {
        "<!--" => return Some(html_to_end(state, "-->", m.end())),
        "<?" => return Some(html_to_end(state, "?>", m.end())),
        "<![CDATA[" => return Some(html_to_end(state, "]]>", m.end())),
        _ if marker.starts_with("<!") => return Some(html_to_end(state, ">", m.end())),
        _ => {}
    }

    let closing = marker.starts_with("</");
    let name = marker.trim_start_matches('<').trim_start_matches('/');
    let tag: String = name
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase();
    let tag_end = m.start() + m.as_str(&state.src).find(name)? + tag.len();

    if !closing && PRE_TAGS.contains(&tag.as_str()) {
        return Some(html_to_end_ignore_case(state, &format!("</{tag}>"), tag_end));
    }
    if BLOCK_TAGS.contains(&tag.as_str()) {
        return Some(html_to_blank_line(state));
    }

    // Any other complete tag, alone on its line.
    if let Some(end) = state.append_paragraph() {
        return Some(end);
    }
    let line_end = state.find_line_end();
    let rest = state.src.get(tag_end..line_end)?;
    let complete = if closing {
        CLOSE_TAG_END.is_match(rest)
    } else {
        OPEN_TAG_END.is_match(rest)
    };
    complete.then(|| html_to_blank_line(state))
}

/// Consume through the line containing `end_marker` (searched from `from`),
/// or to the end of the source.
fn html_to_end(state: &mut BlockState<'_>, end_marker: &str, from: usize) -> usize {
    let found = state.src.get(from..).and_then(|rest| rest.find(end_marker));
    let end = found.map_or(state.cursor_max, |i| state.line_end_from(from + i));
    append_html(state, end)
}

fn html_to_end_ignore_case(state: &mut BlockState<'_>, end_marker: &str, from: usize) -> usize {
    let found = state
        .src
        .get(from..)
        .and_then(|rest| rest.to_ascii_lowercase().find(end_marker));
    let end = found.map_or(state.cursor_max, |i| state.line_end_from(from + i));
    append_html(state, end)
}

fn html_to_blank_line(state: &mut BlockState<'_>) -> usize {
    let end = BLANK_LINE
        .find_at(&state.src, state.cursor)
        .map_or(state.cursor_max, |b| b.start());
    append_html(state, end)
}

fn append_html(state: &mut BlockState<'_>, end: usize) -> usize {
    let html = state.get_text(end).trim_end_matches('\n').to_owned();
    state.append_token(Token::raw("block_html", html));
    end
}
