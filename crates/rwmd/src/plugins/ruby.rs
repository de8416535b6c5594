//! Ruby annotations: `[漢字(かんじ)]`, optionally followed by a link target.

use std::sync::LazyLock;

use regex::Regex;

use super::register_render;
use crate::error::Error;
use crate::helpers::{parse_link, parse_link_label};
use crate::inline::InlineParser;
use crate::markdown::Markdown;
use crate::renderer::attr_str;
use crate::scanner::ScanMatch;
use crate::state::InlineState;
use crate::token::{Attrs, Token};
use crate::util::{escape, normalize_label};

const RUBY: &str = r"\[(?:\w+\(\w+\))+\]";

static RUBY_AT: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"\A{RUBY}")).unwrap());

/// `漢(かん)字(じ)` → `[("漢", "かん"), ("字", "じ")]`.
fn ruby_tokens(matched: &str) -> Vec<Token> {
    matched[1..matched.len() - 1]
        .split_terminator(')')
        .filter_map(|item| item.split_once('('))
        .map(|(rb, rt)| Token::raw("ruby", rb).with_attr("rt", rt))
        .collect()
}

fn parse_ruby(_: &InlineParser, m: &ScanMatch, state: &mut InlineState<'_>) -> Option<usize> {
    let mut tokens = ruby_tokens(m.as_str(&state.src));
    let mut end = m.end();
    while let Some(next) = RUBY_AT.find(&state.src[end..]) {
        tokens.extend(ruby_tokens(next.as_str()));
        end += next.end();
    }

    match state.src[end..].chars().next() {
        Some('(') => {
            if let Some((attrs, link_end)) = parse_link(&state.src, end + 1) {
                state.append_token(link_token(tokens, attrs));
                return Some(link_end);
            }
        }
        Some('[') => {
            if let Some((label, label_end)) = parse_link_label(&state.src, end + 1)
                && !label.is_empty()
            {
                let label = label.to_owned();
                match state.env.ref_links.get(&normalize_label(&label)) {
                    Some(link) => {
                        let mut attrs = Attrs::new();
                        attrs.insert("url".to_owned(), link.url.clone().into());
                        if let Some(title) = &link.title {
                            attrs.insert("title".to_owned(), title.clone().into());
                        }
                        state.append_token(link_token(tokens, attrs));
                    }
                    None => {
                        state.tokens.extend(tokens);
                        state.append_text(&format!("[{label}]"));
                    }
                }
                return Some(label_end);
            }
        }
        _ => {}
    }

    state.tokens.extend(tokens);
    Some(end)
}

fn link_token(children: Vec<Token>, attrs: Attrs) -> Token {
    Token {
        attrs,
        ..Token::children("link", children)
    }
}

/// Ruby annotations.
pub fn ruby(md: &mut Markdown) -> Result<(), Error> {
    md.inline.register("ruby", RUBY, parse_ruby, Some("link"))?;
    register_render(md, "ruby", |_, text, attrs| {
        format!(
            "<ruby><rb>{}</rb><rt>{}</rt></ruby>",
            escape(text, true),
            escape(attr_str(attrs, "rt").unwrap_or_default(), true)
        )
    });
    Ok(())
}
