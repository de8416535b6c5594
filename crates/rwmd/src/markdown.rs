//! The `Markdown` facade: preprocessing, both parse phases, hooks and rendering.
//!
//! ```
//! use rwmd::Markdown;
//!
//! let md = Markdown::builder().build().unwrap();
//! assert_eq!(md.parse("# hello").unwrap(), "<h1>hello</h1>\n");
//! ```

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::block::BlockParser;
use crate::error::Error;
use crate::inline::InlineParser;
use crate::plugins::{Plugin, builtin};
use crate::renderer::Renderer;
use crate::state::{BlockState, Env, InlineState};
use crate::token::{Content, Token};
use crate::util::expand_leading_tab;

/// Source rewrite run before block parsing.
pub type BeforeParseHook = Arc<dyn Fn(&Markdown, String, &mut Env) -> String + Send + Sync>;

/// Token tree rewrite run after inline expansion, before rendering.
pub type BeforeRenderHook = Arc<dyn Fn(&Markdown, &mut Vec<Token>, &mut Env) + Send + Sync>;

/// Output rewrite run after rendering.
pub type AfterRenderHook = Arc<dyn Fn(&Markdown, String, &mut Env) -> String + Send + Sync>;

static WHITESPACE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]+$").unwrap());

/// Characters trimmed from block text before inline parsing.
const INLINE_TRIM: &[char] = &[' ', '\r', '\n', '\t', '\x0c'];

/// Normalize a document for the block phase: unify line endings, empty
/// whitespace-only lines, expand leading tabs to 4 columns and end with `\n`.
pub(crate) fn preprocess(src: &str) -> String {
    let src = src.replace("\r\n", "\n").replace('\r', "\n");
    let src = WHITESPACE_LINE.replace_all(&src, "");
    let mut src = expand_leading_tab(&src, 4).into_owned();
    if !src.ends_with('\n') {
        src.push('\n');
    }
    src
}

/// A configured markdown engine.
///
/// Plugins mutate the parsers, renderer and hook lists at construction time;
/// afterwards the instance is only read and can be shared across threads.
pub struct Markdown {
    /// Block-level parser.
    pub block: BlockParser,
    /// Inline-level parser.
    pub inline: InlineParser,
    /// Renderer, `None` in AST mode.
    pub renderer: Option<Renderer>,
    before_parse_hooks: Vec<BeforeParseHook>,
    before_render_hooks: Vec<BeforeRenderHook>,
    after_render_hooks: Vec<AfterRenderHook>,
}

impl std::fmt::Debug for Markdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Markdown")
            .field("block", &self.block)
            .field("inline", &self.inline)
            .field("renderer", &self.renderer)
            .field("before_parse_hooks", &self.before_parse_hooks.len())
            .field("before_render_hooks", &self.before_render_hooks.len())
            .field("after_render_hooks", &self.after_render_hooks.len())
            .finish()
    }
}

impl Markdown {
    /// Engine over default parsers.
    #[must_use]
    pub fn new(renderer: Option<Renderer>, hard_wrap: bool) -> Self {
        Self {
            block: BlockParser::new(),
            inline: InlineParser::new(hard_wrap),
            renderer,
            before_parse_hooks: Vec::new(),
            before_render_hooks: Vec::new(),
            after_render_hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn builder() -> MarkdownBuilder {
        MarkdownBuilder::default()
    }

    /// Apply a plugin.
    ///
    /// # Errors
    ///
    /// Propagates the plugin's registration error.
    pub fn use_plugin(&mut self, plugin: &dyn Plugin) -> Result<(), Error> {
        plugin.apply(self)?;
        tracing::debug!(
            block_rules = self.block.rules().len(),
            inline_rules = self.inline.rules().len(),
            "Applied plugin"
        );
        Ok(())
    }

    /// Add a hook rewriting the preprocessed source.
    pub fn before_parse<F>(&mut self, hook: F)
    where
        F: Fn(&Markdown, String, &mut Env) -> String + Send + Sync + 'static,
    {
        self.before_parse_hooks.push(Arc::new(hook));
    }

    /// Add a hook rewriting the token tree before rendering.
    pub fn before_render<F>(&mut self, hook: F)
    where
        F: Fn(&Markdown, &mut Vec<Token>, &mut Env) + Send + Sync + 'static,
    {
        self.before_render_hooks.push(Arc::new(hook));
    }

    /// Add a hook rewriting the rendered output.
    pub fn after_render<F>(&mut self, hook: F)
    where
        F: Fn(&Markdown, String, &mut Env) -> String + Send + Sync + 'static,
    {
        self.after_render_hooks.push(Arc::new(hook));
    }

    /// Render `src`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRenderer`] in AST mode, [`Error::MissingRenderMethod`]
    /// for tokens the renderer cannot handle and the first I/O error recorded
    /// by an `include` directive.
    pub fn parse(&self, src: &str) -> Result<String, Error> {
        self.parse_with_env(src, &mut Env::default())
    }

    /// Render `src` with a caller-provided environment.
    ///
    /// # Errors
    ///
    /// See [`Markdown::parse`].
    pub fn parse_with_env(&self, src: &str, env: &mut Env) -> Result<String, Error> {
        let renderer = self.renderer.as_ref().ok_or(Error::NoRenderer)?;
        let tokens = self.tokens_with_env(src, env)?;
        let mut output = renderer.render_tokens(&tokens)?;
        for hook in &self.after_render_hooks {
            output = hook(self, output, env);
        }
        Ok(output)
    }

    /// Token tree of `src` after both phases and the before-render hooks.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error recorded by an `include` directive.
    pub fn tokens(&self, src: &str) -> Result<Vec<Token>, Error> {
        self.tokens_with_env(src, &mut Env::default())
    }

    /// Token tree of `src` with a caller-provided environment.
    ///
    /// # Errors
    ///
    /// See [`Markdown::tokens`].
    pub fn tokens_with_env(&self, src: &str, env: &mut Env) -> Result<Vec<Token>, Error> {
        let mut src = preprocess(src);
        for hook in &self.before_parse_hooks {
            src = hook(self, src, env);
        }

        let mut tokens = self.parse_blocks(&src, env);
        self.expand_inline(&mut tokens, env);
        for hook in &self.before_render_hooks {
            hook(self, &mut tokens, env);
        }

        if !env.errors.is_empty() {
            return Err(env.errors.remove(0));
        }
        Ok(tokens)
    }

    /// Read and render a file. Includes resolve relative to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise see
    /// [`Markdown::parse`].
    pub fn read(&self, path: impl AsRef<Path>) -> Result<String, Error> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)?;
        self.parse_with_env(&src, &mut Env::with_file(path))
    }

    /// Run the block phase over already preprocessed `src`.
    pub fn parse_blocks(&self, src: &str, env: &mut Env) -> Vec<Token> {
        let mut state = BlockState::new(src, env);
        self.block.parse(&mut state, self.block.rules());
        state.tokens
    }

    /// Replace every pending text payload in the tree with inline tokens.
    pub fn expand_inline(&self, tokens: &mut [Token], env: &mut Env) {
        for token in tokens {
            match &mut token.content {
                Content::Text(text) => {
                    let children = self.parse_inline(text.trim_matches(INLINE_TRIM), env);
                    token.content = Content::Children(children);
                }
                Content::Children(children) => self.expand_inline(children, env),
                Content::Raw(_) | Content::Empty => {}
            }
        }
    }

    /// Run the inline phase over `src`.
    pub fn parse_inline(&self, src: &str, env: &mut Env) -> Vec<Token> {
        let mut state = InlineState::new(src, env);
        self.inline.parse(&mut state);
        state.tokens
    }
}

#[derive(Debug, Default)]
enum RendererChoice {
    #[default]
    Html,
    Custom(Renderer),
    Ast,
}

/// Builder for [`Markdown`].
#[derive(Default)]
pub struct MarkdownBuilder {
    escape: Option<bool>,
    hard_wrap: bool,
    renderer: RendererChoice,
    max_nested_level: Option<usize>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl std::fmt::Debug for MarkdownBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownBuilder")
            .field("escape", &self.escape)
            .field("hard_wrap", &self.hard_wrap)
            .field("renderer", &self.renderer)
            .field("max_nested_level", &self.max_nested_level)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

impl MarkdownBuilder {
    /// Escape raw HTML in the HTML renderer (default `true`).
    #[must_use]
    pub fn escape(mut self, escape: bool) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Treat every newline in a paragraph as a hard break.
    #[must_use]
    pub fn hard_wrap(mut self, hard_wrap: bool) -> Self {
        self.hard_wrap = hard_wrap;
        self
    }

    /// Use a custom renderer instead of HTML.
    #[must_use]
    pub fn renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = RendererChoice::Custom(renderer);
        self
    }

    /// Produce token trees only ([`Markdown::tokens`]).
    #[must_use]
    pub fn ast(mut self) -> Self {
        self.renderer = RendererChoice::Ast;
        self
    }

    /// Container nesting limit.
    #[must_use]
    pub fn max_nested_level(mut self, level: usize) -> Self {
        self.max_nested_level = Some(level);
        self
    }

    /// Add a plugin; plugins are applied in order.
    #[must_use]
    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Add several plugins.
    #[must_use]
    pub fn plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Plugin>>,
    {
        self.plugins.extend(plugins);
        self
    }

    /// Build the engine, applying the plugins.
    ///
    /// # Errors
    ///
    /// Returns the first plugin registration error.
    pub fn build(self) -> Result<Markdown, Error> {
        let renderer = match self.renderer {
            RendererChoice::Html => Some(Renderer::html(self.escape.unwrap_or(true))),
            RendererChoice::Custom(renderer) => Some(renderer),
            RendererChoice::Ast => None,
        };
        let mut md = Markdown::new(renderer, self.hard_wrap);
        if let Some(level) = self.max_nested_level {
            md.block.set_max_nested_level(level);
        }
        for plugin in &self.plugins {
            md.use_plugin(plugin.as_ref())?;
        }
        Ok(md)
    }
}

/// Create an engine from names: renderer `"html"` or `"ast"` and built-in
/// plugin names.
///
/// # Errors
///
/// Returns [`Error::UnknownRenderer`] or [`Error::UnknownPlugin`] for names
/// that are not known.
pub fn create_markdown(
    escape: bool,
    hard_wrap: bool,
    renderer: &str,
    plugins: &[&str],
) -> Result<Markdown, Error> {
    let mut builder = Markdown::builder().escape(escape).hard_wrap(hard_wrap);
    builder = match renderer {
        "html" => builder,
        "ast" => builder.ast(),
        other => return Err(Error::UnknownRenderer(other.to_owned())),
    };
    for name in plugins {
        builder = builder.plugin(builtin(name)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn html(src: &str) -> String {
        Markdown::builder().escape(false).build().unwrap().parse(src).unwrap()
    }

    #[test]
    fn test_preprocess() {
        assert_eq!(preprocess("a\r\nb\rc"), "a\nb\nc\n");
        assert_eq!(preprocess("a\n  \t\nb\n"), "a\n\nb\n");
        assert_eq!(preprocess("\tcode\n"), "    code\n");
        assert_eq!(preprocess(""), "\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(html(""), "");
        assert_eq!(html("\n\n"), "");
    }

    #[test]
    fn test_missing_trailing_newline() {
        assert_eq!(html("a *b*"), html("a *b*\n"));
    }

    #[test]
    fn test_escape_default() {
        let md = Markdown::builder().build().unwrap();
        assert_eq!(md.parse("<div>x</div>\n").unwrap(), "<p>&lt;div&gt;x&lt;/div&gt;</p>\n");
        assert_eq!(html("<div>x</div>\n"), "<div>x</div>\n");
    }

    #[test]
    fn test_hard_wrap() {
        let md = Markdown::builder().hard_wrap(true).build().unwrap();
        assert_eq!(md.parse("a\nb").unwrap(), "<p>a<br />\nb</p>\n");
        assert_eq!(html("a\nb"), "<p>a\nb</p>\n");
    }

    #[test]
    fn test_ast_mode() {
        let md = Markdown::builder().ast().build().unwrap();
        assert!(matches!(md.parse("x"), Err(Error::NoRenderer)));
        let tokens = md.tokens("# Hi *there*\n").unwrap();
        assert_eq!(tokens[0].kind, "heading");
        assert_eq!(tokens[0].child_tokens()[1].kind, "emphasis");
    }

    #[test]
    fn test_hooks_run_in_order() {
        let mut md = Markdown::builder().escape(false).build().unwrap();
        md.before_parse(|_, src, _| src.replace("TODAY", "Monday"));
        md.before_render(|_, tokens, _| tokens.push(Token::new("thematic_break")));
        md.after_render(|_, html, _| format!("<main>{html}</main>"));
        assert_eq!(md.parse("TODAY").unwrap(), "<main><p>Monday</p>\n<hr />\n</main>");
    }

    #[test]
    fn test_missing_render_method() {
        let mut md = Markdown::builder().escape(false).build().unwrap();
        md.before_render(|_, tokens, _| tokens.push(Token::new("widget")));
        assert!(matches!(md.parse("x"), Err(Error::MissingRenderMethod(kind)) if kind == "widget"));
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "> quoted\n").unwrap();
        let md = Markdown::builder().build().unwrap();
        assert_eq!(md.read(&path).unwrap(), "<blockquote>\n<p>quoted</p>\n</blockquote>\n");
        assert!(matches!(md.read(dir.path().join("nope.md")), Err(Error::Io(_))));
    }

    #[test]
    fn test_create_markdown() {
        let md = create_markdown(false, false, "html", &["strikethrough", "math"]).unwrap();
        assert_eq!(md.parse("~~x~~").unwrap(), "<p><del>x</del></p>\n");
        assert!(matches!(
            create_markdown(false, false, "html", &["nope"]),
            Err(Error::UnknownPlugin(_))
        ));
        assert!(matches!(
            create_markdown(false, false, "latex", &[]),
            Err(Error::UnknownRenderer(_))
        ));
        assert!(create_markdown(true, false, "ast", &[]).unwrap().renderer.is_none());
    }

    #[test]
    fn test_max_nested_level() {
        let md = Markdown::builder().escape(false).max_nested_level(1).build().unwrap();
        assert_eq!(md.block.max_nested_level(), 1);
        assert_eq!(md.parse("> > a").unwrap(), "<blockquote>\n<p>&gt; a</p>\n</blockquote>\n");
    }
}
