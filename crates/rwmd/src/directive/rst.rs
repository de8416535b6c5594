//! reStructuredText directive syntax.

use std::sync::Arc;

use super::args::{DirectiveArgs, dedent};
use super::{Directive, DirectiveSet, install};
use crate::block::BlockParser;
use crate::error::Error;
use crate::markdown::Markdown;
use crate::plugins::Plugin;
use crate::scanner::ScanMatch;
use crate::state::BlockState;

const RULE: &str = "rst_directive";

const PATTERN: &str =
    r"^ {0,3}\.\.[ \t]+(?P<rst_name>[a-zA-Z0-9_-]+)::(?:[ \t]+(?P<rst_title>[^\n]*?))?[ \t]*$";

/// `.. name:: title` directives with a body indented by at least two spaces.
#[derive(Clone, Default)]
pub struct RstDirective {
    directives: Vec<Arc<dyn Directive>>,
}

impl RstDirective {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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
}

impl Plugin for RstDirective {
    fn apply(&self, md: &mut Markdown) -> Result<(), Error> {
        install(md, &self.directives, RULE, PATTERN, None, parse_rst)
    }
}

fn parse_rst(
    set: &DirectiveSet,
    block: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let (args, end) = {
        let src = &state.src;
        let name = m.group(src, "rst_name")?;
        let title = m.group(src, "rst_title").unwrap_or_default();

        let body_start = state.line_end_from(m.start());
        let mut pos = body_start;
        let mut body_end = body_start;
        while pos < state.cursor_max {
            let line_end = state.line_end_from(pos);
            let line = &src[pos..line_end];
            if line.trim().is_empty() {
                pos = line_end;
            } else if line.starts_with("  ") {
                pos = line_end;
                body_end = line_end;
            } else {
                break;
            }
        }

        let body = dedent(&src[body_start..body_end]);
        (DirectiveArgs::parse_body(name, title, &body, RULE), body_end)
    };

    set.dispatch(block, &args, state);
    Some(end)
}
