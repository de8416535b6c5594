//! Pluggable block directives.
//!
//! A directive is a named block extension invoked with one of two syntaxes:
//!
//! - **reStructuredText** ([`RstDirective`]):
//!
//!   ```text
//!   .. note:: Title
//!      :class: wide
//!
//!      Body
//!   ```
//!
//! - **Fenced** ([`FencedDirective`]):
//!
//!   ````text
//!   ```{note} Title
//!   :class: wide
//!
//!   Body
//!   ```
//!   ````
//!
//! Both syntaxes reduce a match to [`DirectiveArgs`] and dispatch by name to a
//! [`Directive`]. Failures never abort parsing: they become `block_error`
//! tokens carrying the [`DirectiveError`] message.
//!
//! # Example
//!
//! ```
//! use rwmd::Markdown;
//! use rwmd::directive::{Admonition, RstDirective};
//!
//! let md = Markdown::builder()
//!     .escape(false)
//!     .plugin(RstDirective::new().with(Admonition::default()))
//!     .build()
//!     .unwrap();
//!
//! let html = md.parse(".. note:: Heads up\n\n   Body text.\n").unwrap();
//! assert!(html.contains(r#"<section class="admonition note">"#));
//! ```

mod admonition;
mod args;
mod fenced;
mod include;
mod rst;
mod toc;

use std::collections::HashMap;
use std::sync::Arc;

pub use admonition::Admonition;
pub use args::DirectiveArgs;
pub use fenced::FencedDirective;
pub use include::{Include, ReadFile};
pub use rst::RstDirective;
pub use toc::{HeadingId, TableOfContents};

use crate::block::BlockParser;
use crate::error::Error;
use crate::markdown::Markdown;
use crate::state::BlockState;
use crate::token::Token;

/// Directive failure, rendered as a `block_error` token.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    /// No directive registered under the name.
    #[error("Unknown directive: {0}")]
    Unknown(String),
    /// `include` used in a document without a source path.
    #[error("Missing source file")]
    MissingSource,
    /// `include` pointing at the including document.
    #[error("Could not include self: {0}")]
    SelfInclude(String),
    /// `include` target does not exist.
    #[error("Could not find file: {0}")]
    NotFound(String),
    /// `include` nesting deeper than the configured limit.
    #[error("Include depth limit of {0} exceeded")]
    DepthExceeded(usize),
    /// Invalid directive arguments.
    #[error("{0}")]
    Invalid(String),
}

/// A named block directive.
pub trait Directive: Send + Sync {
    /// Names this directive answers to.
    fn names(&self) -> Vec<&'static str>;

    /// Produce tokens for one directive call.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError`] for calls that cannot be honored; the
    /// caller emits a `block_error` token instead.
    fn parse(
        &self,
        block: &BlockParser,
        args: &DirectiveArgs,
        state: &mut BlockState<'_>,
    ) -> Result<Vec<Token>, DirectiveError>;

    /// Install renderer methods and hooks.
    ///
    /// # Errors
    ///
    /// Propagates registration failures.
    fn setup(&self, _md: &mut Markdown) -> Result<(), Error> {
        Ok(())
    }
}

/// Directives keyed by name.
#[derive(Clone, Default)]
pub(crate) struct DirectiveSet {
    directives: HashMap<&'static str, Arc<dyn Directive>>,
}

impl DirectiveSet {
    pub(crate) fn new(directives: &[Arc<dyn Directive>]) -> Self {
        let mut set = Self::default();
        for directive in directives {
            for name in directive.names() {
                set.directives.insert(name, Arc::clone(directive));
            }
        }
        set
    }

    /// Run the named directive and append its tokens, or a `block_error`.
    pub(crate) fn dispatch(
        &self,
        block: &BlockParser,
        args: &DirectiveArgs,
        state: &mut BlockState<'_>,
    ) {
        tracing::debug!(directive = %args.name, title = %args.title, "Dispatching directive");
        let result = match self.directives.get(args.name.as_str()) {
            Some(directive) => directive.parse(block, args, state),
            None => Err(DirectiveError::Unknown(args.name.clone())),
        };
        match result {
            Ok(tokens) => state.tokens.extend(tokens),
            Err(e) => {
                tracing::warn!(directive = %args.name, error = %e, "Directive failed");
                state.append_token(Token::raw("block_error", e.to_string()));
            }
        }
    }
}

/// Install a directive syntax: its block rule plus every directive's setup.
pub(crate) fn install<F>(
    md: &mut Markdown,
    directives: &[Arc<dyn Directive>],
    rule: &str,
    pattern: &str,
    before: Option<&str>,
    parse: F,
) -> Result<(), Error>
where
    F: Fn(&DirectiveSet, &BlockParser, &crate::scanner::ScanMatch, &mut BlockState<'_>) -> Option<usize>
        + Send
        + Sync
        + 'static,
{
    let set = DirectiveSet::new(directives);
    md.block
        .register(rule, pattern, move |block, m, state| parse(&set, block, m, state), before)?;
    for directive in directives {
        directive.setup(md)?;
    }
    Ok(())
}

/// Parse directive content as blocks in a child state.
///
/// Container rules, the directive's own included, are dropped once the
/// nesting limit is reached.
pub fn parse_content(
    block: &BlockParser,
    args: &DirectiveArgs,
    state: &mut BlockState<'_>,
) -> Vec<Token> {
    if args.content.is_empty() {
        return Vec::new();
    }
    let rules = block.nested_rules(block.rules(), &args.rule, state.depth());
    let mut child = state.child_state(args.content.clone(), None);
    block.parse(&mut child, &rules);
    child.tokens
}
