//! Leaf blocks: blank lines, headings, thematic breaks and code blocks.

use std::sync::LazyLock;

use regex::Regex;

use super::{BlockParser, after_line};
use crate::scanner::ScanMatch;
use crate::state::BlockState;
use crate::token::Token;
use crate::util::{expand_leading_tab, unescape_char};

static AXT_HEADING_TRIM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s+|^)#+\s*$").unwrap());

static INDENT_CODE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ {1,4}").unwrap());

pub(super) fn parse_blank_line(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    state.append_token(Token::new("blank_line"));
    Some(m.end())
}

pub(super) fn parse_thematic_break(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    state.append_token(Token::new("thematic_break"));
    Some(after_line(state, m.end()))
}

pub(super) fn parse_axt_heading(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let (level, text) = {
        let level = m.group(&state.src, "axt_1")?.len();
        let text = m.group(&state.src, "axt_2").unwrap_or_default().trim();
        (level, AXT_HEADING_TRIM.replace(text, "").into_owned())
    };
    state.append_token(Token::text("heading", text).with_attr("level", level));
    Some(after_line(state, m.end()))
}

/// A `===` or `---` underline turns a preceding paragraph into a heading.
/// Without one, the line may still be a thematic break or a list item.
pub(super) fn parse_setex_heading(
    parser: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let level: usize = if m
        .group(&state.src, "setext_1")
        .is_some_and(|s| s.starts_with('='))
    {
        1
    } else {
        2
    };
    let end = after_line(state, m.end());
    if let Some(last) = state.last_token_mut()
        && last.kind == "paragraph"
    {
        last.kind = "heading";
        last.set_attr("level", level);
        return Some(end);
    }

    let sc = parser.compile_sc(&["thematic_break", "list"]);
    let m = sc.match_at(&state.src, state.cursor)?;
    parser.parse_method(&m, state)
}

pub(super) fn parse_indent_code(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    // Indented code cannot interrupt a paragraph.
    if let Some(end) = state.append_paragraph() {
        return Some(end);
    }

    let code = {
        let code = expand_leading_tab(m.as_str(&state.src), 4);
        let code = INDENT_CODE_TRIM.replace_all(&code, "");
        format!("{}\n", code.trim_matches('\n'))
    };
    state.append_token(Token::raw("block_code", code).with_attr("style", "indent"));
    Some(m.end())
}

pub(super) fn parse_fenced_code(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let src = state.src.as_str();
    let indent = m.group(src, "fenced_1").unwrap_or_default().len();
    let marker = m.group(src, "fenced_2")?;
    let info = m.group(src, "fenced_3").unwrap_or_default();
    let fence = marker.chars().next()?;
    if fence == '`' && info.contains('`') {
        return None;
    }

    let code_start = after_line(state, m.end());
    let (code_end, end) = find_closing_fence(src, code_start, fence, marker.len())
        .unwrap_or((state.cursor_max, state.cursor_max));
    let code = src.get(code_start..code_end).unwrap_or_default();
    let code = if indent > 0 {
        trim_leading_spaces(code, indent)
    } else {
        code.to_owned()
    };
    let info = unescape_char(info).trim().to_owned();

    let mut token = Token::raw("block_code", code).with_attr("style", "fenced");
    if !info.is_empty() {
        token.set_attr("info", info);
    }
    state.append_token(token);
    Some(end)
}

/// Find a closing fence of at least `min_len` `fence` characters, starting
/// the line scan at `from`.
///
/// Returns the start of the closing line and the position after it.
pub(crate) fn find_closing_fence(
    src: &str,
    from: usize,
    fence: char,
    min_len: usize,
) -> Option<(usize, usize)> {
    let mut pos = from;
    while pos < src.len() {
        let line_end = src[pos..].find('\n').map_or(src.len(), |i| pos + i);
        let line = &src[pos..line_end];
        let trimmed = line.trim_start_matches(' ');
        if line.len() - trimmed.len() <= 3 {
            let run = trimmed.chars().take_while(|&c| c == fence).count();
            let rest = &trimmed[run * fence.len_utf8()..];
            if run >= min_len && rest.chars().all(|c| c == ' ' || c == '\t') {
                let end = if line_end < src.len() { line_end + 1 } else { line_end };
                return Some((pos, end));
            }
        }
        pos = line_end + 1;
    }
    None
}

/// Remove up to `max` leading spaces from every line.
fn trim_leading_spaces(text: &str, max: usize) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            let n = line.bytes().take(max).take_while(|&b| b == b' ').count();
            &line[n..]
        })
        .collect()
}
