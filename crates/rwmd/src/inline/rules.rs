//! Core inline rules other than links.

use super::{EMPHASIS_PRECEDENCE, InlineParser};
use crate::scanner::ScanMatch;
use crate::state::InlineState;
use crate::token::Token;
use crate::util::{escape_url, unescape_char};

pub(super) fn parse_escape(
    _: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let text = unescape_char(m.as_str(&state.src)).into_owned();
    state.append_text(&text);
    Some(m.end())
}

pub(super) fn parse_linebreak(
    _: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    state.append_token(Token::new("linebreak"));
    Some(m.end())
}

pub(super) fn parse_softbreak(
    _: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    state.append_token(Token::new("softbreak"));
    Some(m.end())
}

pub(super) fn parse_codespan(
    _: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let len = m.end() - m.start();
    let pos = m.end();
    let Some((close, end)) = find_backtick_run(&state.src, pos, len) else {
        let marker = m.as_str(&state.src).to_owned();
        state.append_text(&marker);
        return Some(pos);
    };

    let mut code = state.src[pos..close].replace('\n', " ");
    if !code.trim().is_empty() && code.starts_with(' ') && code.ends_with(' ') && code.len() > 1 {
        code = code[1..code.len() - 1].to_owned();
    }
    state.append_token(Token::raw("codespan", code));
    Some(end)
}

/// Find a backtick run of exactly `len` after non-empty content.
fn find_backtick_run(src: &str, pos: usize, len: usize) -> Option<(usize, usize)> {
    let bytes = src.as_bytes();
    let mut i = pos;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
            if run == len && i > pos {
                return Some((i, i + run));
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

pub(super) fn parse_emphasis(
    parser: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let pos = m.end();
    let marker = m.as_str(&state.src).to_owned();
    let len = marker.len();
    let ch = marker.chars().next()?;

    // The opening run must be followed by a non-space character.
    let next = state.src[pos..].chars().next()?;
    if next.is_whitespace() || next == ch {
        return None;
    }

    if (len == 1 && state.in_emphasis) || (len == 2 && state.in_strong) {
        state.append_text(&marker);
        return Some(pos);
    }

    let Some(end) = state.find_closer(pos, ch, len, ch == '_') else {
        state.append_text(&marker);
        return Some(pos);
    };
    let text = state.src[pos..end - len].to_owned();

    if let Some(prec) = parser.precedence_scan(m, state, end, EMPHASIS_PRECEDENCE) {
        return Some(prec);
    }

    let token = match len {
        1 => Token::children(
            "emphasis",
            parser.parse_child(state, text, |s| s.in_emphasis = true),
        ),
        2 => Token::children(
            "strong",
            parser.parse_child(state, text, |s| s.in_strong = true),
        ),
        _ => {
            let children = parser.parse_child(state, text, |s| {
                s.in_emphasis = true;
                s.in_strong = true;
            });
            Token::children("emphasis", vec![Token::children("strong", children)])
        }
    };
    state.append_token(token);
    Some(end)
}

pub(super) fn parse_auto_link(
    parser: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let text = m.as_str(&state.src).to_owned();
    if state.in_link {
        parser.process_text(&text, state);
        return Some(m.end());
    }
    let inner = &text[1..text.len() - 1];
    state.append_token(auto_link_token(inner, escape_url(inner)));
    Some(m.end())
}

pub(super) fn parse_auto_email(
    parser: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let text = m.as_str(&state.src).to_owned();
    if state.in_link {
        parser.process_text(&text, state);
        return Some(m.end());
    }
    let inner = &text[1..text.len() - 1];
    state.append_token(auto_link_token(inner, format!("mailto:{}", escape_url(inner))));
    Some(m.end())
}

fn auto_link_token(text: &str, url: String) -> Token {
    Token::children("link", vec![Token::raw("text", text)]).with_attr("url", url)
}

pub(super) fn parse_inline_html(
    _: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let html = m.as_str(&state.src).to_owned();
    let lower = html.to_ascii_lowercase();
    if lower.starts_with("<a ") || lower.starts_with("<a>") {
        state.in_link = true;
    } else if lower.starts_with("</a ") || lower.starts_with("</a>") {
        state.in_link = false;
    }
    state.append_token(Token::raw("inline_html", html));
    Some(m.end())
}
