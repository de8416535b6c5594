//! Token tree produced by the block and inline phases.
//!
//! A [`Token`] carries exactly one content payload at a time (see [`Content`]):
//! block-phase leaves hold [`Content::Text`] until the inline phase replaces
//! it with [`Content::Children`].

use std::collections::BTreeMap;

/// Token attributes keyed by option name.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Attribute value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
    /// Table of contents entries (filled in by the `toc` directive hook).
    Toc(Vec<TocEntry>),
}

impl AttrValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_toc(&self) -> Option<&[TocEntry]> {
        match self {
            Self::Toc(entries) => Some(entries),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<usize> for AttrValue {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<u8> for AttrValue {
    fn from(n: u8) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<TocEntry>> for AttrValue {
    fn from(entries: Vec<TocEntry>) -> Self {
        Self::Toc(entries)
    }
}

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Anchor ID for linking.
    pub id: String,
}

/// Content carried by a token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Content {
    /// No payload (`thematic_break`, `linebreak`, ...).
    #[default]
    Empty,
    /// Literal payload, already final.
    Raw(String),
    /// Markdown text awaiting inline parsing.
    Text(String),
    /// Nested tokens.
    Children(Vec<Token>),
}

/// A node of the token tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Token type, e.g. `paragraph` or `link`.
    pub kind: &'static str,
    /// Payload.
    pub content: Content,
    /// Attributes.
    pub attrs: Attrs,
}

impl Token {
    /// Token without payload.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            content: Content::Empty,
            attrs: Attrs::new(),
        }
    }

    /// Token with a literal payload.
    #[must_use]
    pub fn raw(kind: &'static str, raw: impl Into<String>) -> Self {
        Self {
            content: Content::Raw(raw.into()),
            ..Self::new(kind)
        }
    }

    /// Token with markdown text pending inline parsing.
    #[must_use]
    pub fn text(kind: &'static str, text: impl Into<String>) -> Self {
        Self {
            content: Content::Text(text.into()),
            ..Self::new(kind)
        }
    }

    /// Token with children.
    #[must_use]
    pub fn children(kind: &'static str, children: Vec<Token>) -> Self {
        Self {
            content: Content::Children(children),
            ..Self::new(kind)
        }
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }

    /// Set an attribute in place.
    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_owned(), value.into());
    }

    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(AttrValue::as_str)
    }

    #[must_use]
    pub fn attr_int(&self, key: &str) -> Option<i64> {
        self.attr(key).and_then(AttrValue::as_int)
    }

    #[must_use]
    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attr(key).and_then(AttrValue::as_bool)
    }

    /// Literal payload, if any.
    #[must_use]
    pub fn raw_text(&self) -> Option<&str> {
        match &self.content {
            Content::Raw(s) => Some(s),
            _ => None,
        }
    }

    /// Pending markdown text, if any.
    #[must_use]
    pub fn pending_text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Child tokens (empty slice for leaves).
    #[must_use]
    pub fn child_tokens(&self) -> &[Token] {
        match &self.content {
            Content::Children(children) => children,
            _ => &[],
        }
    }

    /// Mutable child tokens, `None` for leaves.
    pub fn child_tokens_mut(&mut self) -> Option<&mut Vec<Token>> {
        match &mut self.content {
            Content::Children(children) => Some(children),
            _ => None,
        }
    }

    /// Plain text of the subtree: raw payloads of `text`-like leaves joined.
    ///
    /// Used for heading titles and image alt text where markup is dropped.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_plain_text(&mut out);
        out
    }

    fn collect_plain_text(&self, out: &mut String) {
        match &self.content {
            Content::Raw(s) | Content::Text(s) => {
                if !matches!(self.kind, "inline_html" | "block_html") {
                    out.push_str(s);
                }
            }
            Content::Children(children) => {
                for child in children {
                    child.collect_plain_text(out);
                }
            }
            Content::Empty => {
                if matches!(self.kind, "softbreak" | "linebreak") {
                    out.push(' ');
                }
            }
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Token {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind)?;
        match &self.content {
            Content::Empty => {}
            Content::Raw(raw) => map.serialize_entry("raw", raw)?,
            Content::Text(text) => map.serialize_entry("text", text)?,
            Content::Children(children) => map.serialize_entry("children", children)?,
        }
        if !self.attrs.is_empty() {
            map.serialize_entry("attrs", &self.attrs)?;
        }
        map.end()
    }
}
