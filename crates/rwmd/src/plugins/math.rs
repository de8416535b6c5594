//! Math: `$$ ... $$` blocks and `$...$` spans, emitted verbatim for a client-side renderer.

use super::register_render;
use crate::block::BlockParser;
use crate::error::Error;
use crate::inline::InlineParser;
use crate::markdown::Markdown;
use crate::scanner::ScanMatch;
use crate::state::{BlockState, InlineState};
use crate::token::Token;
use crate::util::escape;

const BLOCK_MATH: &str =
    r"^ {0,3}\$\$[ \t]*\n(?P<block_math_text>[\s\S]+?)\n\$\$[ \t]*$";
const INLINE_MATH: &str = r"\$(?P<inline_math_text>[^\s$][^$\n]*?)\$";

fn parse_block_math(_: &BlockParser, m: &ScanMatch, state: &mut BlockState<'_>) -> Option<usize> {
    let text = m.group(&state.src, "block_math_text")?.to_owned();
    state.append_token(Token::raw("block_math", text));
    Some(state.line_end_from(m.end()))
}

fn parse_inline_math(
    _: &InlineParser,
    m: &ScanMatch,
    state: &mut InlineState<'_>,
) -> Option<usize> {
    let text = m.group(&state.src, "inline_math_text")?;
    if text.ends_with(char::is_whitespace) {
        return None;
    }
    let token = Token::raw("inline_math", text);
    state.append_token(token);
    Some(m.end())
}

/// Math blocks and spans.
pub fn math(md: &mut Markdown) -> Result<(), Error> {
    md.block
        .register("block_math", BLOCK_MATH, parse_block_math, Some("list"))?;
    md.inline
        .register("inline_math", INLINE_MATH, parse_inline_math, Some("link"))?;
    register_render(md, "block_math", |_, text, _| {
        format!("<div class=\"math\">$$\n{}\n$$</div>\n", escape(text, true))
    });
    register_render(md, "inline_math", |_, text, _| {
        format!("<span class=\"math\">\\({}\\)</span>", escape(text, true))
    });
    Ok(())
}
