//! Footnotes: `[^key]` references and `[^key]: text` definitions.
//!
//! Definitions are collected during the block phase. References to defined
//! keys are numbered in order of first use, and a before-render hook appends
//! a `footnotes` section holding one `footnote_item` per referenced key.

use super::register_render;
use crate::block::BlockParser;
use crate::error::Error;
use crate::inline::InlineParser;
use crate::markdown::Markdown;
use crate::renderer::attr_int;
use crate::scanner::ScanMatch;
use crate::state::{BlockState, Env, InlineState};
use crate::token::Token;
use crate::util::normalize_label;

const INLINE_FOOTNOTE: &str = r"\[\^(?P<footnote_key>(?:[^\\\[\]\n]|\\.){1,500})\]";
const REF_FOOTNOTE: &str =
    r"^ {0,3}\[\^(?P<ref_footnote_key>(?:[^\\\[\]\n]|\\.){1,500})\]:[ \t]*(?P<ref_footnote_text>[^\n]*)$";

fn parse_inline_footnote(
    _: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let key = normalize_label(m.group(&state.src, "footnote_key")?);
    if !state.env.ref_footnotes.contains_key(&key) {
        let raw = m.as_str(&state.src).to_owned();
        state.append_text(&raw);
        return Some(m.end());
    }

    let notes = &mut state.env.footnotes;
    let index = match notes.iter().position(|k| *k == key) {
        Some(i) => i + 1,
        None => {
            notes.push(key.clone());
            notes.len()
        }
    };
    state.append_token(Token::raw("footnote_ref", key).with_attr("index", index));
    Some(m.end())
}

/// A definition continues over following lines indented by at least one
/// space, blank lines included when more indented text follows.
fn parse_ref_footnote(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let (key, text, end) = {
        let src = &state.src;
        let key = normalize_label(m.group(src, "ref_footnote_key")?);
        let mut text = m.group(src, "ref_footnote_text").unwrap_or_default().to_owned();
        text.push('\n');

        let mut end = state.line_end_from(m.start());
        let mut pos = end;
        let mut pending_blank = String::new();
        while pos < state.cursor_max {
            let line_end = state.line_end_from(pos);
            let line = &src[pos..line_end];
            if line.trim().is_empty() {
                pending_blank.push('\n');
            } else if line.starts_with(' ') {
                text.push_str(&pending_blank);
                pending_blank.clear();
                text.push_str(line.trim_start_matches(' '));
                if !line.ends_with('\n') {
                    text.push('\n');
                }
                end = line_end;
            } else {
                break;
            }
            pos = line_end;
        }
        (key, text, end)
    };

    state.env.ref_footnotes.entry(key).or_insert(text);
    Some(end)
}

/// Parse and append the footnotes section for every referenced key.
fn append_footnotes(md: &Markdown, tokens: &mut Vec<Token>, env: &mut Env) {
    if env.footnotes.is_empty() {
        return;
    }
    let keys = env.footnotes.clone();
    let mut items = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        let text = env.ref_footnotes.get(key).cloned().unwrap_or_default();
        let mut children = md.parse_blocks(&text, env);
        md.expand_inline(&mut children, env);
        items.push(
            Token::children("footnote_item", children)
                .with_attr("key", key.as_str())
                .with_attr("index", i + 1),
        );
    }
    tokens.push(Token::children("footnotes", items));
}

fn render_footnote_item(text: &str, index: i64) -> String {
    let back = format!("<a href=\"#fnref-{index}\" class=\"footnote\">&#8617;</a>");
    let text = text.trim_end();
    let text = match text.strip_suffix("</p>") {
        Some(body) => format!("{body}{back}</p>"),
        None => format!("{text}{back}"),
    };
    format!("<li id=\"fn-{index}\">{text}</li>\n")
}

/// Footnote references, definitions and the trailing footnotes section.
pub fn footnotes(md: &mut Markdown) -> Result<(), Error> {
    md.inline
        .register("footnote", INLINE_FOOTNOTE, parse_inline_footnote, Some("link"))?;
    md.block
        .register("ref_footnote", REF_FOOTNOTE, parse_ref_footnote, Some("ref_link"))?;
    md.before_render(append_footnotes);

    register_render(md, "footnote_ref", |_, _, attrs| {
        let i = attr_int(attrs, "index").unwrap_or_default();
        format!("<sup class=\"footnote-ref\" id=\"fnref-{i}\"><a href=\"#fn-{i}\">{i}</a></sup>")
    });
    register_render(md, "footnotes", |_, text, _| {
        format!("<section class=\"footnotes\">\n<ol>\n{text}</ol>\n</section>\n")
    });
    register_render(md, "footnote_item", |_, text, attrs| {
        render_footnote_item(text, attr_int(attrs, "index").unwrap_or_default())
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn markdown() -> Markdown {
        Markdown::builder()
            .escape(false)
            .plugin(footnotes)
            .build()
            .unwrap()
    }

    #[test]
    fn test_references_numbered_by_first_use() {
        let html = markdown()
            .parse("b[^b] a[^a] b[^B]\n\n[^a]: Alpha.\n[^b]: Beta\n  continued.\n")
            .unwrap();
        assert_eq!(
            html,
            "<p>b<sup class=\"footnote-ref\" id=\"fnref-1\"><a href=\"#fn-1\">1</a></sup> \
             a<sup class=\"footnote-ref\" id=\"fnref-2\"><a href=\"#fn-2\">2</a></sup> \
             b<sup class=\"footnote-ref\" id=\"fnref-1\"><a href=\"#fn-1\">1</a></sup></p>\n\
             <section class=\"footnotes\">\n<ol>\n\
             <li id=\"fn-1\"><p>Beta\ncontinued.<a href=\"#fnref-1\" class=\"footnote\">&#8617;</a></p></li>\n\
             <li id=\"fn-2\"><p>Alpha.<a href=\"#fnref-2\" class=\"footnote\">&#8617;</a></p></li>\n\
             </ol>\n</section>\n"
        );
    }

    #[test]
    fn test_undefined_reference_is_text() {
        assert_eq!(markdown().parse("x[^nope]\n").unwrap(), "<p>x[^nope]</p>\n");
    }

    #[test]
    fn test_unreferenced_definitions_render_nothing() {
        assert_eq!(markdown().parse("[^a]: Alpha.\n").unwrap(), "");
    }

    #[test]
    fn test_footnote_item_without_paragraph() {
        assert_eq!(
            render_footnote_item("<pre>x</pre>\n", 3),
            "<li id=\"fn-3\"><pre>x</pre><a href=\"#fnref-3\" class=\"footnote\">&#8617;</a></li>\n"
        );
    }
}
