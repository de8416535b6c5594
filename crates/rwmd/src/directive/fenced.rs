//! Fenced directive syntax: ```` ```{name} title ````.

use std::sync::Arc;

use super::args::DirectiveArgs;
use super::{Directive, DirectiveSet, install};
use crate::block::{BlockParser, find_closing_fence};
use crate::error::Error;
use crate::markdown::Markdown;
use crate::plugins::Plugin;
use crate::scanner::ScanMatch;
use crate::state::BlockState;

const RULE: &str = "fenced_directive";

/// Fence characters accepted by default.
const DEFAULT_MARKERS: &str = "`~";

/// Fenced directives. The body runs to a closing fence of the same character
/// at least as long as the opening one, or to the end of the document.
#[derive(Clone)]
pub struct FencedDirective {
    directives: Vec<Arc<dyn Directive>>,
    markers: String,
}

impl Default for FencedDirective {
    fn default() -> Self {
        Self {
            directives: Vec::new(),
            markers: DEFAULT_MARKERS.to_owned(),
        }
    }
}

impl FencedDirective {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept `:::` fences.
    #[must_use]
    pub fn with_colons(mut self) -> Self {
        if !self.markers.contains(':') {
            self.markers.push(':');
        }
        self
    }

    /// Add a directive.
    #[must_use]
    pub fn with<D: Directive + 'static>(mut self, directive: D) -> Self {
        self.directives.push(Arc::new(directive));
        self
    }

    /// Add a shared directive.
    #[must_use]
    pub fn with_shared(mut self, directive: Arc<dyn Directive>) -> Self {
        self.directives.push(directive);
        self
    }

    fn pattern(&self) -> String {
        let fences = self
            .markers
            .chars()
            .map(|c| format!("{}{{3,}}", regex::escape(&c.to_string())))
            .collect::<Vec<_>>()
            .join("|");
        format!(
            r"^ {{0,3}}(?P<fdirective_1>{fences})\{{(?P<fdirective_2>[a-zA-Z0-9_-]+)\}}[ \t]*(?P<fdirective_3>[^\n]*?)[ \t]*$"
        )
    }
}

impl Plugin for FencedDirective {
    fn apply(&self, md: &mut Markdown) -> Result<(), Error> {
        let pattern = self.pattern();
        install(
            md,
            &self.directives,
            RULE,
            &pattern,
            Some("fenced_code"),
            parse_fenced,
        )
    }
}

fn parse_fenced(
    set: &DirectiveSet,
    block: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let (args, end) = {
        let src = &state.src;
        let mark = m.group(src, "fdirective_1")?;
        let name = m.group(src, "fdirective_2")?;
        let title = m.group(src, "fdirective_3").unwrap_or_default();
        let fence = mark.chars().next()?;

        let body_start = state.line_end_from(m.start());
        let (body_end, end) = find_closing_fence(src, body_start, fence, mark.len())
            .unwrap_or((state.cursor_max, state.cursor_max));
        let body = &src[body_start..body_end.max(body_start)];
        (DirectiveArgs::parse_body(name, title, body, RULE), end)
    };

    set.dispatch(block, &args, state);
    Some(end)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::directive::DirectiveError;
    use crate::state::Env;
    use crate::token::Token;

    /// Emits the title, options and parsed content.
    struct Boxed;

    impl Directive for Boxed {
        fn names(&self) -> Vec<&'static str> {
            vec!["box"]
        }

        fn parse(
            &self,
            block: &BlockParser,
            args: &DirectiveArgs,
            state: &mut BlockState<'_>,
        ) -> Result<Vec<Token>, DirectiveError> {
            let children = super::super::parse_content(block, args, state);
            let mut token = Token::children("box", children).with_attr("title", args.title.clone());
            if let Some(kind) = args.get("kind") {
                token.set_attr("kind", kind);
            }
            Ok(vec![token])
        }
    }

    fn parse_with(plugin: FencedDirective, src: &str) -> Vec<Token> {
        let mut md = Markdown::builder().build().unwrap();
        plugin.with(Boxed).apply(&mut md).unwrap();
        let mut env = Env::default();
        let mut state = BlockState::new(src, &mut env);
        md.block.parse(&mut state, md.block.rules());
        state.tokens
    }

    #[test]
    fn test_backtick_fence_with_options() {
        let tokens = parse_with(
            FencedDirective::new(),
            "```{box} Title\n:kind: warn\n\n# Inside\n```\nafter\n",
        );
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, "box");
        assert_eq!(tokens[0].attr_str("title"), Some("Title"));
        assert_eq!(tokens[0].attr_str("kind"), Some("warn"));
        assert_eq!(tokens[0].child_tokens()[0].kind, "heading");
        assert_eq!(tokens[1], Token::text("paragraph", "after\n"));
    }

    #[test]
    fn test_longer_outer_fence_contains_code() {
        let tokens = parse_with(
            FencedDirective::new(),
            "````{box}\n```py\nx\n```\n````\n",
        );
        assert_eq!(tokens.len(), 1);
        let children = tokens[0].child_tokens();
        assert_eq!(children[0].kind, "block_code");
        assert_eq!(children[0].raw_text(), Some("x\n"));
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let tokens = parse_with(FencedDirective::new(), "~~~{box}\ntext\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].child_tokens()[0].kind, "paragraph");
    }

    #[test]
    fn test_colon_fences_are_opt_in() {
        let tokens = parse_with(FencedDirective::new(), ":::{box}\nx\n:::\n");
        assert_eq!(tokens[0].kind, "paragraph");

        let tokens = parse_with(FencedDirective::new().with_colons(), ":::{box}\nx\n:::\n");
        assert_eq!(tokens[0].kind, "box");
    }

    #[test]
    fn test_plain_fenced_code_unaffected() {
        let tokens = parse_with(FencedDirective::new(), "```py\nx\n```\n");
        assert_eq!(tokens[0].kind, "block_code");
    }
}
