//! Two-phase markdown parser with pluggable rules, directives and renderers.
//!
//! This crate turns a markdown document into a token tree and renders it
//! through a [`Renderer`] dispatch table.
//!
//! # Architecture
//!
//! Parsing runs in two phases:
//! - [`BlockParser`]: drives a cursor over the document, recognizing
//!   containers (block quotes, lists), fences, HTML blocks and reference
//!   definitions. Leaves keep their markdown text pending.
//! - [`InlineParser`]: expands every pending text leaf into emphasis, code
//!   spans, links, images and raw HTML, resolving references collected by
//!   the block phase.
//!
//! Both parsers hold an ordered rule table. [`Plugin`]s insert rules at a
//! precise priority, add renderer methods and register hooks on the
//! [`Markdown`] facade. Directives (`.. name::` or ```` ```{name} ````) are
//! plugins that dispatch to [`directive::Directive`] implementations.
//!
//! # Example
//!
//! ```
//! use rwmd::create_markdown;
//!
//! let md = create_markdown(false, false, "html", &["strikethrough"]).unwrap();
//! let html = md.parse("*a* ~~b~~").unwrap();
//! assert_eq!(html, "<p><em>a</em> <del>b</del></p>\n");
//! ```

pub mod block;
pub mod directive;
mod error;
mod helpers;
pub mod inline;
mod markdown;
pub mod plugins;
pub mod renderer;
pub mod scanner;
mod state;
mod token;
pub mod util;

pub use block::BlockParser;
pub use error::Error;
pub use inline::InlineParser;
pub use markdown::{
    AfterRenderHook, BeforeParseHook, BeforeRenderHook, Markdown, MarkdownBuilder,
    create_markdown,
};
pub use plugins::Plugin;
pub use renderer::{HtmlOptions, Renderer};
pub use state::{BlockState, Container, Env, InlineState, LinkRef};
pub use token::{AttrValue, Attrs, Content, Token, TocEntry};
