//! Block quotes, including lazy continuation lines.

use std::sync::LazyLock;

use regex::Regex;

use super::BlockParser;
use crate::scanner::ScanMatch;
use crate::state::{BlockState, Container};
use crate::token::Token;
use crate::util::{expand_leading_tab, expand_tab};

static STRICT_BLOCK_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(?: {0,3}>[^\n]*(?:\n|\z))+").unwrap());

static QUOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ *>").unwrap());

static QUOTE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ ").unwrap());

static ENDS_WITH_BLANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n\z").unwrap());

/// Rules that end a lazy continuation.
const BREAK_RULES: &[&str] = &[
    "blank_line",
    "thematic_break",
    "fenced_code",
    "list",
    "block_html",
];

pub(super) fn parse_block_quote(
    parser: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let (text, end_pos) = extract_block_quote(parser, m, state);

    let rules = parser.nested_rules(parser.block_quote_rules(), "block_quote", state.depth());
    let children = {
        let mut child = state.child_state(text, Some(Container::BlockQuote));
        parser.parse(&mut child, &rules);
        child.tokens
    };

    let token = Token::children("block_quote", children);
    match end_pos {
        // A block that ended the quote has already been appended.
        Some(end) => {
            state.prepend_token(token);
            Some(end)
        }
        None => {
            state.append_token(token);
            Some(state.cursor)
        }
    }
}

/// Collect the quote's content with markers removed.
///
/// Returns the text and, when a following block interrupted the quote, the
/// position where that block ends.
fn extract_block_quote(
    parser: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> (String, Option<usize>) {
    let mut text = {
        let first = format!("{}\n", m.group(&state.src, "quote_1").unwrap_or_default());
        let first = expand_leading_tab(&first, 3);
        QUOTE_SPACE.replace_all(&first, "").into_owned()
    };
    state.cursor = (m.end() + 1).min(state.cursor_max);

    // Content that would swallow following lines stops at the first line
    // without a marker.
    let require_marker = parser
        .compile_sc(&["blank_line", "indent_code", "fenced_code"])
        .match_at(&text, 0)
        .is_some();
    if require_marker {
        if let Some(quote) = strict_quote(state) {
            text.push_str(&quote);
        }
        return (expand_tab(&text).into_owned(), None);
    }

    let break_sc = parser.compile_sc(BREAK_RULES);
    let mut prev_blank = false;
    let mut end_pos = None;
    while state.cursor < state.cursor_max {
        if let Some(quote) = strict_quote(state) {
            prev_blank = quote.trim().is_empty() || ENDS_WITH_BLANK.is_match(&quote);
            text.push_str(&quote);
            continue;
        }
        if prev_blank {
            break;
        }

        if let Some(m) = break_sc.match_at(&state.src, state.cursor)
            && let Some(end) = parser.parse_method(&m, state)
        {
            end_pos = Some(end);
            break;
        }

        // Lazy continuation.
        let end = state.find_line_end();
        let line = expand_leading_tab(state.get_text(end), 3).into_owned();
        text.push_str(&line);
        state.cursor = end;
    }

    (expand_tab(&text).into_owned(), end_pos)
}

/// Consume consecutive `>` lines at the cursor, returning them without markers.
fn strict_quote(state: &mut BlockState<'_>) -> Option<String> {
    let (quote, len) = {
        let rest = state.src.get(state.cursor..)?;
        let m = STRICT_BLOCK_QUOTE.find(rest)?;
        let quote = QUOTE_MARKER.replace_all(m.as_str(), "");
        let quote = expand_leading_tab(&quote, 3);
        (QUOTE_SPACE.replace_all(&quote, "").into_owned(), m.end())
    };
    state.cursor += len;
    Some(quote)
}
