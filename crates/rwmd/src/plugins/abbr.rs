//! Abbreviations: `*[HTML]: Hyper Text Markup Language`.
//!
//! Definitions are collected in the block phase; in the inline phase every
//! whole-word occurrence in plain text becomes an `abbr` token.

use super::register_render;
use crate::block::BlockParser;
use crate::error::Error;
use crate::helpers::is_word_char;
use crate::inline::InlineParser;
use crate::markdown::Markdown;
use crate::renderer::attr_str;
use crate::scanner::ScanMatch;
use crate::state::{BlockState, InlineState};
use crate::token::Token;
use crate::util::escape;

const REF_ABBR: &str = r"^ {0,3}\*\[(?P<abbr_key>[^\]\n]+)\]:(?P<abbr_text>[^\n]*)$";

fn parse_ref_abbr(_: &BlockParser, m: &ScanMatch, state: &mut BlockState<'_>) -> Option<usize> {
    let key = m.group(&state.src, "abbr_key")?.to_owned();
    let text = m
        .group(&state.src, "abbr_text")
        .unwrap_or_default()
        .trim()
        .to_owned();
    state.env.abbreviations.entry(key).or_insert(text);
    Some(state.line_end_from(m.end()))
}

fn process_text(_: &InlineParser, text: &str, state: &mut InlineState<'_>) {
    let Some(re) = state.env.abbr_regex().cloned() else {
        state.append_text(text);
        return;
    };

    let mut pos = 0;
    for m in re.find_iter(text) {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
            continue;
        }
        state.append_text(&text[pos..m.start()]);
        let title = state
            .env
            .abbreviations
            .get(m.as_str())
            .cloned()
            .unwrap_or_default();
        state.append_token(
            Token::children("abbr", vec![Token::raw("text", m.as_str())]).with_attr("title", title),
        );
        pos = m.end();
    }
    state.append_text(&text[pos..]);
}

/// Abbreviation definitions and their expansion in text.
pub fn abbr(md: &mut Markdown) -> Result<(), Error> {
    md.block
        .register("ref_abbr", REF_ABBR, parse_ref_abbr, Some("ref_link"))?;
    md.inline.set_text_hook(process_text);
    register_render(md, "abbr", |_, text, attrs| match attr_str(attrs, "title") {
        Some(title) if !title.is_empty() => {
            format!("<abbr title=\"{}\">{text}</abbr>", escape(title, true))
        }
        _ => format!("<abbr>{text}</abbr>"),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn render(src: &str) -> String {
        Markdown::builder()
            .escape(false)
            .plugin(abbr)
            .build()
            .unwrap()
            .parse(src)
            .unwrap()
    }

    #[test]
    fn test_abbreviations_in_text() {
        assert_eq!(
            render("The HTML and *W3C* specs, not HTMLX.\n\n*[HTML]: Hyper Text \"Markup\"\n*[W3C]:\n"),
            "<p>The <abbr title=\"Hyper Text &quot;Markup&quot;\">HTML</abbr> and \
             <em><abbr>W3C</abbr></em> specs, not HTMLX.</p>\n"
        );
    }

    #[test]
    fn test_without_definitions() {
        assert_eq!(render("HTML\n"), "<p>HTML</p>\n");
    }
}
