//! Token tree renderer.
//!
//! A [`Renderer`] maps token types to render functions. Rendering walks the
//! tree depth-first: children are rendered first and their concatenated
//! output is passed to the parent's function together with its attributes.
//! Leaves pass their raw payload instead.

mod html;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::token::{Attrs, Content, Token};
use crate::util::{escape, safe_entity};

pub use html::render_toc_list;

/// Render function: `(renderer, rendered children or raw payload, attributes)`.
pub type RenderFn = Arc<dyn Fn(&Renderer, &str, &Attrs) -> String + Send + Sync>;

/// URL prefixes rewritten to `#harmful-link`.
const HARMFUL_PROTOCOLS: &[&str] = &["javascript:", "vbscript:", "file:", "data:"];

/// `data:` URLs that remain allowed.
const GOOD_DATA_PROTOCOLS: &[&str] = &[
    "data:image/gif;",
    "data:image/png;",
    "data:image/jpeg;",
    "data:image/webp;",
];

/// Options of the HTML render methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Escape raw HTML and text instead of passing it through.
    pub escape: bool,
    /// Escape `"` in text.
    pub escape_quotes: bool,
    /// URL prefixes exempt from the harmful protocol filter.
    pub allow_harmful_protocols: Vec<String>,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            escape: true,
            escape_quotes: true,
            allow_harmful_protocols: Vec::new(),
        }
    }
}

/// Token renderer.
#[derive(Clone)]
pub struct Renderer {
    name: String,
    methods: HashMap<String, RenderFn>,
    options: HtmlOptions,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("Renderer")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("options", &self.options)
            .finish()
    }
}

impl Renderer {
    /// Renderer without any methods.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
            options: HtmlOptions::default(),
        }
    }

    /// HTML renderer.
    #[must_use]
    pub fn html(escape: bool) -> Self {
        let mut renderer = Self::new("html").with_options(HtmlOptions {
            escape,
            ..HtmlOptions::default()
        });
        html::install(&mut renderer);
        renderer
    }

    /// Replace the HTML options.
    #[must_use]
    pub fn with_options(mut self, options: HtmlOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn options(&self) -> &HtmlOptions {
        &self.options
    }

    /// Register (or replace) the render function for `kind`.
    pub fn register<F>(&mut self, kind: &str, method: F)
    where
        F: Fn(&Renderer, &str, &Attrs) -> String + Send + Sync + 'static,
    {
        self.methods.insert(kind.to_owned(), Arc::new(method));
    }

    /// Whether `kind` has a render function.
    #[must_use]
    pub fn has_method(&self, kind: &str) -> bool {
        self.methods.contains_key(kind)
    }

    /// Render a token list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRenderMethod`] for a token type without a
    /// render function.
    pub fn render_tokens(&self, tokens: &[Token]) -> Result<String, Error> {
        let mut out = String::new();
        for token in tokens {
            out.push_str(&self.render_token(token)?);
        }
        Ok(out)
    }

    /// Render one token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRenderMethod`] for a token type without a
    /// render function, here or among its descendants.
    pub fn render_token(&self, token: &Token) -> Result<String, Error> {
        let method = self
            .methods
            .get(token.kind)
            .ok_or_else(|| Error::MissingRenderMethod(token.kind.to_owned()))?;
        let text = match &token.content {
            Content::Children(children) => self.render_tokens(children)?,
            Content::Raw(s) | Content::Text(s) => s.clone(),
            Content::Empty => String::new(),
        };
        Ok(method(self, &text, &token.attrs))
    }

    /// Escape text according to the options: full escaping when `escape` is
    /// set, otherwise entity-safe normalization.
    #[must_use]
    pub fn escape_text(&self, text: &str) -> String {
        if self.options.escape {
            escape(text, self.options.escape_quotes)
        } else {
            safe_entity(text)
        }
    }

    /// Filter a URL for use in an attribute.
    ///
    /// `javascript:`, `vbscript:`, `file:` and `data:` (other than common
    /// image types) become `#harmful-link`.
    #[must_use]
    pub fn safe_url(&self, url: &str) -> String {
        if self
            .options
            .allow_harmful_protocols
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
        {
            return escape(url, true);
        }

        let lower = url.trim().to_ascii_lowercase();
        if GOOD_DATA_PROTOCOLS.iter().any(|p| lower.starts_with(p)) {
            return escape(url, true);
        }
        if HARMFUL_PROTOCOLS.iter().any(|p| lower.starts_with(p)) {
            return "#harmful-link".to_owned();
        }
        escape(url, true)
    }
}

/// String attribute lookup for render functions.
#[must_use]
pub fn attr_str<'a>(attrs: &'a Attrs, key: &str) -> Option<&'a str> {
    attrs.get(key).and_then(|v| v.as_str())
}

/// Integer attribute lookup for render functions.
#[must_use]
pub fn attr_int(attrs: &Attrs, key: &str) -> Option<i64> {
    attrs.get(key).and_then(|v| v.as_int())
}

/// Boolean attribute lookup for render functions.
#[must_use]
pub fn attr_bool(attrs: &Attrs, key: &str) -> bool {
    attrs.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}
