//! Links and images: inline, full reference, collapsed and shortcut forms.

use super::{InlineParser, LINK_PRECEDENCE};
use crate::helpers::{parse_link as parse_link_dest, parse_link_label, parse_link_text};
use crate::scanner::ScanMatch;
use crate::state::InlineState;
use crate::token::{Attrs, Token};
use crate::util::normalize_label;

pub(super) fn parse_link(
    parser: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let pos = m.end();
    let is_image = m.as_str(&state.src).starts_with('!');
    if (is_image && state.in_image) || (!is_image && state.in_link) {
        let marker = m.as_str(&state.src).to_owned();
        state.append_text(&marker);
        return Some(pos);
    }

    let (mut label, text, mut end_pos) = match parse_link_label(&state.src, pos) {
        Some((label, end)) => (Some(label.to_owned()), label.to_owned(), end),
        None => {
            let (text, end) = parse_link_text(&state.src, pos)?;
            (None, text.to_owned(), end)
        }
    };

    if let Some(prec) = parser.precedence_scan(m, state, end_pos, LINK_PRECEDENCE) {
        return Some(prec);
    }

    match state.src[end_pos..].chars().next() {
        Some('(') if !state.href_unterminated(end_pos + 1) => {
            if let Some((attrs, link_end)) = parse_link_dest(&state.src, end_pos + 1) {
                if !is_image && contains_link(parser, state, &text) {
                    return None;
                }
                let token = link_token(parser, state, is_image, text, attrs);
                state.append_token(token);
                return Some(link_end);
            }
            state.note_href_miss(end_pos + 1);
        }
        Some('[') => {
            if let Some((second, second_end)) = parse_link_label(&state.src, end_pos + 1) {
                if !second.is_empty() {
                    label = Some(second.to_owned());
                }
                end_pos = second_end;
            }
        }
        _ => {}
    }

    let label = label?;
    if !is_image && contains_link(parser, state, &text) {
        return None;
    }
    let link = state.env.ref_links.get(&normalize_label(&label))?;
    let mut attrs = Attrs::new();
    attrs.insert("url".to_owned(), link.url.clone().into());
    if let Some(title) = &link.title {
        attrs.insert("title".to_owned(), title.clone().into());
    }
    let token = link_token(parser, state, is_image, text, attrs).with_attr("label", label);
    state.append_token(token);
    Some(end_pos)
}

/// Links may not contain other links; the inner one wins.
fn contains_link(parser: &InlineParser, state: &mut InlineState<'_>, text: &str) -> bool {
    if !text.contains('[') && !text.contains('<') {
        return false;
    }
    let tokens = parser.parse_child(state, text.to_owned(), |_| {});
    has_link(&tokens)
}

fn has_link(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| match t.kind {
        "link" => true,
        "image" => false,
        _ => has_link(t.child_tokens()),
    })
}

fn link_token(
    parser: &InlineParser,
    state: &mut InlineState<'_>,
    is_image: bool,
    text: String,
    attrs: Attrs,
) -> Token {
    let (kind, children) = if is_image {
        ("image", parser.parse_child(state, text, |s| s.in_image = true))
    } else {
        ("link", parser.parse_child(state, text, |s| s.in_link = true))
    };
    Token {
        attrs,
        ..Token::children(kind, children)
    }
}
