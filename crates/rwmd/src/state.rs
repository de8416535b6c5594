//! Parsing state: the per-document environment plus block and inline states.
//!
//! [`Env`] is created once per parse and shared by reference with every child
//! [`BlockState`] and [`InlineState`]. Child states reborrow it, so nesting is
//! plain stack recursion.

use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;

use crate::error::Error;
use crate::helpers::find_closing_run;
use crate::token::{Content, TocEntry, Token};

/// A resolved link reference definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRef {
    /// Escaped URL.
    pub url: String,
    /// Entity-safe title.
    pub title: Option<String>,
    /// Label as written in the definition.
    pub label: String,
}

/// Per-parse environment shared by all states.
#[derive(Debug, Default)]
pub struct Env {
    /// Link reference definitions keyed by normalized label. First definition wins.
    pub ref_links: HashMap<String, LinkRef>,
    /// Footnote definitions keyed by normalized key.
    pub ref_footnotes: HashMap<String, String>,
    /// Referenced footnote keys in order of first use.
    pub footnotes: Vec<String>,
    /// Abbreviation definitions (`*[HTML]: Hyper Text Markup Language`).
    pub abbreviations: HashMap<String, String>,
    /// Path of the document being parsed, used to resolve includes.
    pub file: Option<PathBuf>,
    /// Headings collected by the table of contents hook.
    pub toc_items: Vec<TocEntry>,
    /// Current include nesting depth.
    pub include_depth: usize,
    /// I/O errors recorded during parsing, surfaced by the facade.
    pub errors: Vec<Error>,
    abbr_regex: Option<Regex>,
}

impl Env {
    /// Environment for a document read from `file`.
    #[must_use]
    pub fn with_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /// Alternation over every abbreviation, longest first. Built once per parse.
    pub(crate) fn abbr_regex(&mut self) -> Option<&Regex> {
        if self.abbreviations.is_empty() {
            return None;
        }
        if self.abbr_regex.is_none() {
            let mut keys: Vec<&String> = self.abbreviations.keys().collect();
            keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let pattern = keys
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&pattern) {
                Ok(re) => self.abbr_regex = Some(re),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to compile abbreviation pattern");
                    return None;
                }
            }
        }
        self.abbr_regex.as_ref()
    }

    /// Copy definitions from a nested document's environment. Existing entries win.
    pub(crate) fn merge_definitions(&mut self, other: &mut Env) {
        for (key, link) in other.ref_links.drain() {
            self.ref_links.entry(key).or_insert(link);
        }
        for (key, text) in other.ref_footnotes.drain() {
            self.ref_footnotes.entry(key).or_insert(text);
        }
        for (key, text) in other.abbreviations.drain() {
            self.abbreviations.entry(key).or_insert(text);
        }
        self.errors.append(&mut other.errors);
    }
}

/// The container a child block state was opened for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    BlockQuote,
    List,
}

/// Mutable block-level parsing state.
#[derive(Debug)]
pub struct BlockState<'e> {
    /// Source being parsed.
    pub src: String,
    /// Current position in `src`.
    pub cursor: usize,
    /// End of `src`.
    pub cursor_max: usize,
    /// Emitted tokens.
    pub tokens: Vec<Token>,
    /// Container this state parses the content of.
    pub in_block: Option<Container>,
    /// Shared environment.
    pub env: &'e mut Env,
    depth: usize,
}

impl<'e> BlockState<'e> {
    /// Root state over `src`.
    pub fn new(src: impl Into<String>, env: &'e mut Env) -> Self {
        let src = src.into();
        Self {
            cursor_max: src.len(),
            src,
            cursor: 0,
            tokens: Vec::new(),
            in_block: None,
            env,
            depth: 0,
        }
    }

    /// Child state for the content of a nested container.
    pub fn child_state(
        &mut self,
        src: impl Into<String>,
        in_block: Option<Container>,
    ) -> BlockState<'_> {
        let src = src.into();
        BlockState {
            cursor_max: src.len(),
            src,
            cursor: 0,
            tokens: Vec::new(),
            in_block,
            env: &mut *self.env,
            depth: self.depth + 1,
        }
    }

    /// Number of enclosing states.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position just past the end of the current line (or end of source).
    #[must_use]
    pub fn find_line_end(&self) -> usize {
        self.line_end_from(self.cursor)
    }

    /// Position just past the end of the line containing `pos`.
    #[must_use]
    pub fn line_end_from(&self, pos: usize) -> usize {
        match self.src.get(pos..).and_then(|rest| rest.find('\n')) {
            Some(i) => pos + i + 1,
            None => self.cursor_max,
        }
    }

    /// Source text from the cursor to `end`.
    #[must_use]
    pub fn get_text(&self, end: usize) -> &str {
        self.src.get(self.cursor..end).unwrap_or_default()
    }

    #[must_use]
    pub fn last_token(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn last_token_mut(&mut self) -> Option<&mut Token> {
        self.tokens.last_mut()
    }

    pub fn append_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Insert `token` before the last token.
    pub fn prepend_token(&mut self, token: Token) {
        let index = self.tokens.len().saturating_sub(1);
        self.tokens.insert(index, token);
    }

    /// Append `text` to a trailing paragraph, or start a new one.
    pub fn add_paragraph(&mut self, text: &str) {
        merge_paragraph(&mut self.tokens, text);
    }

    /// Add the source between the cursor and `end` to the paragraph, then
    /// move the cursor to `end`.
    pub fn consume_paragraph(&mut self, end: usize) {
        let end = end.min(self.cursor_max);
        if let Some(text) = self.src.get(self.cursor..end) {
            merge_paragraph(&mut self.tokens, text);
        }
        self.cursor = end;
    }

    /// Append the current line to a trailing paragraph.
    ///
    /// Returns the end of the line when a paragraph was continued, `None` when
    /// the last token is not a paragraph. Rules that may not interrupt a
    /// paragraph call this first.
    pub fn append_paragraph(&mut self) -> Option<usize> {
        let end = self.find_line_end();
        let line = self.src.get(self.cursor..end)?;
        match self.tokens.last_mut() {
            Some(Token {
                kind: "paragraph",
                content: Content::Text(existing),
                ..
            }) => {
                existing.push_str(line);
                Some(end)
            }
            _ => None,
        }
    }

    /// Whether the last token is a paragraph.
    #[must_use]
    pub fn in_paragraph(&self) -> bool {
        self.last_token().is_some_and(|t| t.kind == "paragraph")
    }
}

fn merge_paragraph(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token {
        kind: "paragraph",
        content: Content::Text(existing),
        ..
    }) = tokens.last_mut()
    {
        existing.push_str(text);
    } else {
        tokens.push(Token::text("paragraph", text));
    }
}

/// Inline parsing state for one text span.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct InlineState<'e> {
    /// Text being parsed.
    pub src: String,
    /// Emitted tokens.
    pub tokens: Vec<Token>,
    /// Inside image alt text.
    pub in_image: bool,
    /// Inside link text.
    pub in_link: bool,
    /// Inside `<em>`.
    pub in_emphasis: bool,
    /// Inside `<strong>`.
    pub in_strong: bool,
    /// Shared environment.
    pub env: &'e mut Env,
    /// Earliest start of a failed closing-run search, keyed by marker, run
    /// length and word boundary. Any later start fails as well.
    closer_misses: HashMap<(char, usize, bool), usize>,
    /// Earliest start of a link destination with no terminator left in `src`.
    href_miss: Option<usize>,
}

impl<'e> InlineState<'e> {
    pub fn new(src: impl Into<String>, env: &'e mut Env) -> Self {
        Self {
            src: src.into(),
            tokens: Vec::new(),
            in_image: false,
            in_link: false,
            in_emphasis: false,
            in_strong: false,
            env,
            closer_misses: HashMap::new(),
            href_miss: None,
        }
    }

    /// Child state over `src` carrying the current context flags.
    pub fn child_state(&mut self, src: impl Into<String>) -> InlineState<'_> {
        InlineState {
            src: src.into(),
            tokens: Vec::new(),
            in_image: self.in_image,
            in_link: self.in_link,
            in_emphasis: self.in_emphasis,
            in_strong: self.in_strong,
            env: &mut *self.env,
            closer_misses: HashMap::new(),
            href_miss: None,
        }
    }

    pub fn append_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Closing-run search over `src` that remembers misses.
    ///
    /// Openers start right after a run of `marker`, so a search that found
    /// no closer from `pos` finds none from any later opener either.
    pub fn find_closer(
        &mut self,
        pos: usize,
        marker: char,
        len: usize,
        word_boundary: bool,
    ) -> Option<usize> {
        let key = (marker, len, word_boundary);
        if self.closer_misses.get(&key).is_some_and(|&miss| pos >= miss) {
            return None;
        }
        let end = find_closing_run(&self.src, pos, marker, len, word_boundary);
        if end.is_none() {
            let miss = self.closer_misses.entry(key).or_insert(pos);
            *miss = (*miss).min(pos);
        }
        end
    }

    /// Whether a link destination starting at `pos` is known to run off the
    /// end of `src`.
    #[must_use]
    pub fn href_unterminated(&self, pos: usize) -> bool {
        self.href_miss.is_some_and(|miss| pos >= miss)
    }

    /// Record a failed destination at `pos` if nothing after it can end one.
    pub fn note_href_miss(&mut self, pos: usize) {
        if self.href_unterminated(pos) {
            return;
        }
        let rest = self.src.get(pos..).unwrap_or_default();
        if !rest.contains([' ', '\t', '\n', ')']) {
            self.href_miss = Some(self.href_miss.map_or(pos, |miss| miss.min(pos)));
        }
    }

    /// Append literal text, merging with a trailing `text` token.
    pub fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Token {
            kind: "text",
            content: Content::Raw(existing),
            ..
        }) = self.tokens.last_mut()
        {
            existing.push_str(text);
        } else {
            self.tokens.push(Token::raw("text", text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_paragraph_merges() {
        let mut env = Env::default();
        let mut state = BlockState::new("", &mut env);
        state.add_paragraph("a\n");
        state.add_paragraph("b\n");
        assert_eq!(state.tokens, vec![Token::text("paragraph", "a\nb\n")]);

        state.append_token(Token::new("blank_line"));
        state.add_paragraph("c\n");
        assert_eq!(state.tokens.len(), 3);
    }

    #[test]
    fn test_append_paragraph_requires_paragraph() {
        let mut env = Env::default();
        let mut state = BlockState::new("x\n    y\n", &mut env);
        assert_eq!(state.append_paragraph(), None);

        state.add_paragraph("x\n");
        state.cursor = 2;
        assert_eq!(state.append_paragraph(), Some(8));
        assert_eq!(state.tokens[0].pending_text(), Some("x\n    y\n"));
    }

    #[test]
    fn test_prepend_token() {
        let mut env = Env::default();
        let mut state = BlockState::new("", &mut env);
        state.prepend_token(Token::new("a"));
        state.append_token(Token::new("c"));
        state.prepend_token(Token::new("b"));
        let kinds: Vec<_> = state.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, ["a", "b", "c"]);
    }

    #[test]
    fn test_child_state_depth_and_shared_env() {
        let mut env = Env::default();
        let mut root = BlockState::new("", &mut env);
        {
            let mut child = root.child_state("x", Some(Container::BlockQuote));
            assert_eq!(child.depth(), 1);
            let mut grandchild = child.child_state("y", Some(Container::List));
            assert_eq!(grandchild.depth(), 2);
            grandchild.env.footnotes.push("k".to_owned());
        }
        assert_eq!(root.env.footnotes, ["k"]);
    }

    #[test]
    fn test_append_text_merges() {
        let mut env = Env::default();
        let mut state = InlineState::new("", &mut env);
        state.append_text("a");
        state.append_text("");
        state.append_text("b");
        state.append_token(Token::new("softbreak"));
        state.append_text("c");
        assert_eq!(
            state.tokens,
            vec![
                Token::raw("text", "ab"),
                Token::new("softbreak"),
                Token::raw("text", "c"),
            ]
        );
    }

    #[test]
    fn test_find_line_end() {
        let mut env = Env::default();
        let mut state = BlockState::new("ab\ncd", &mut env);
        assert_eq!(state.find_line_end(), 3);
        state.cursor = 3;
        assert_eq!(state.find_line_end(), 5);
    }

    #[test]
    fn test_abbr_regex_prefers_longest() {
        let mut env = Env::default();
        env.abbreviations.insert("HT".to_owned(), "x".to_owned());
        env.abbreviations.insert("HTML".to_owned(), "y".to_owned());
        let re = env.abbr_regex().unwrap();
        assert_eq!(re.find("HTML").unwrap().as_str(), "HTML");
    }

    #[test]
    fn test_find_closer_remembers_misses_per_marker() {
        let mut env = Env::default();
        let mut state = InlineState::new("*a **b** c", &mut env);
        assert_eq!(state.find_closer(1, '*', 1, false), None);
        assert_eq!(state.find_closer(6, '*', 1, false), None);
        assert_eq!(state.find_closer(5, '*', 2, false), Some(8));
    }

    #[test]
    fn test_href_miss() {
        let mut env = Env::default();
        let mut state = InlineState::new("[a](b[c](d", &mut env);
        assert!(!state.href_unterminated(4));
        state.note_href_miss(4);
        assert!(state.href_unterminated(4));
        assert!(state.href_unterminated(9));
        assert!(!state.href_unterminated(3));

        let mut env = Env::default();
        let mut state = InlineState::new("[a](b c", &mut env);
        state.note_href_miss(4);
        assert!(!state.href_unterminated(4));
    }
}
