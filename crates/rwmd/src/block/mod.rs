//! Block-level parser.
//!
//! Rules are named regex patterns joined into one [`Scanner`] per rule list.
//! The drive loop searches for the earliest rule match; text between matches
//! is paragraph text. A handler returns the position where the block ends, or
//! `None` to reject the match, in which case the current line becomes
//! paragraph text.

mod block_quote;
mod html;
mod leaf;
mod list;
mod reference;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;

pub(crate) use leaf::find_closing_fence;

use crate::error::Error;
use crate::helpers::{BLOCK_TAGS, HTML_TAGNAME, PRE_TAGS};
use crate::scanner::{ScanMatch, Scanner, ScannerCache};
use crate::state::BlockState;

/// Block rule handler.
pub type BlockHandler =
    Arc<dyn Fn(&BlockParser, &ScanMatch, &mut BlockState<'_>) -> Option<usize> + Send + Sync>;

/// Default container nesting limit.
pub const DEFAULT_MAX_NESTED_LEVEL: usize = 6;

/// Rules tried at the top level, in priority order.
const DEFAULT_RULES: &[&str] = &[
    "blank_line",
    "fenced_code",
    "indent_code",
    "axt_heading",
    "setex_heading",
    "thematic_break",
    "block_quote",
    "list",
    "ref_link",
    "raw_html",
];

/// Rules that open a nested block state.
const NESTING_RULES: &[&str] = &["block_quote", "list", "rst_directive", "fenced_directive"];

/// Rules tried inside block quotes and list items.
const CONTAINER_RULES: &[&str] = &[
    "blank_line",
    "fenced_code",
    "indent_code",
    "axt_heading",
    "setex_heading",
    "thematic_break",
    "block_quote",
    "list",
    "raw_html",
];

/// One or more blank lines.
pub(crate) static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^[ \t\v\f]*\n)+").unwrap());

fn default_specification() -> HashMap<String, String> {
    let block_tags = BLOCK_TAGS
        .iter()
        .chain(PRE_TAGS)
        .copied()
        .collect::<Vec<_>>()
        .join("|");
    [
        ("blank_line", r"(?:^[ \t\v\f]*\n)+".to_owned()),
        (
            "axt_heading",
            r"^ {0,3}(?P<axt_1>#{1,6})(?P<axt_2>[ \t]*|[ \t]+.*?)$".to_owned(),
        ),
        (
            "setex_heading",
            r"^ {0,3}(?P<setext_1>=+|-+)[ \t]*$".to_owned(),
        ),
        (
            "fenced_code",
            r"^(?P<fenced_1> {0,3})(?P<fenced_2>`{3,}|~{3,})[ \t]*(?P<fenced_3>.*?)$".to_owned(),
        ),
        (
            "indent_code",
            r"^(?: {4}| *\t)[^\n]+(?:\n+|$)(?:(?: {4}| *\t)[^\n]+(?:\n+|$))*".to_owned(),
        ),
        (
            "thematic_break",
            r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:_[ \t]*){3,}|(?:\*[ \t]*){3,})$".to_owned(),
        ),
        (
            "ref_link",
            r"^ {0,3}\[(?P<reflink_1>(?:[^\\\[\]]|\\.){0,500})\]:".to_owned(),
        ),
        ("block_quote", r"^ {0,3}>(?P<quote_1>.*?)$".to_owned()),
        (
            "list",
            r"^(?P<list_1> {0,3})(?P<list_2>[\*\+-]|\d{1,9}[.)])(?P<list_3>[ \t]*|[ \t].+)$"
                .to_owned(),
        ),
        (
            "raw_html",
            format!(r"^ {{0,3}}(?:</?{HTML_TAGNAME}|<!--|<\?|<![A-Z]|<!\[CDATA\[)"),
        ),
        (
            "block_html",
            format!(
                r"^ {{0,3}}(?:</?(?i:{block_tags})(?:[ \t]+|\n|$|/?>)|<!--|<\?|<![A-Z]|<!\[CDATA\[)"
            ),
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| (name.to_owned(), pattern))
    .collect()
}

fn handler<F>(f: F) -> BlockHandler
where
    F: Fn(&BlockParser, &ScanMatch, &mut BlockState<'_>) -> Option<usize> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Block parser: the rule table plus the drive loop.
pub struct BlockParser {
    specification: HashMap<String, String>,
    methods: HashMap<String, BlockHandler>,
    rules: Vec<String>,
    block_quote_rules: Vec<String>,
    list_rules: Vec<String>,
    max_nested_level: usize,
    scanners: ScannerCache,
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlockParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockParser")
            .field("rules", &self.rules)
            .field("max_nested_level", &self.max_nested_level)
            .finish_non_exhaustive()
    }
}

impl BlockParser {
    /// Parser with the core block rules.
    #[must_use]
    pub fn new() -> Self {
        let methods: HashMap<String, BlockHandler> = [
            ("blank_line", handler(leaf::parse_blank_line)),
            ("axt_heading", handler(leaf::parse_axt_heading)),
            ("setex_heading", handler(leaf::parse_setex_heading)),
            ("fenced_code", handler(leaf::parse_fenced_code)),
            ("indent_code", handler(leaf::parse_indent_code)),
            ("thematic_break", handler(leaf::parse_thematic_break)),
            ("ref_link", handler(reference::parse_ref_link)),
            ("block_quote", handler(block_quote::parse_block_quote)),
            ("list", handler(list::parse_list)),
            ("raw_html", handler(html::parse_raw_html)),
            ("block_html", handler(html::parse_raw_html)),
        ]
        .into_iter()
        .map(|(name, f)| (name.to_owned(), f))
        .collect();

        let owned = |rules: &[&str]| rules.iter().map(|r| (*r).to_owned()).collect::<Vec<_>>();
        Self {
            specification: default_specification(),
            methods,
            rules: owned(DEFAULT_RULES),
            block_quote_rules: owned(CONTAINER_RULES),
            list_rules: owned(CONTAINER_RULES),
            max_nested_level: DEFAULT_MAX_NESTED_LEVEL,
            scanners: ScannerCache::new(true),
        }
    }

    /// Set the container nesting limit.
    #[must_use]
    pub fn with_max_nested_level(mut self, level: usize) -> Self {
        self.max_nested_level = level.max(1);
        self
    }

    /// Set the container nesting limit in place.
    pub fn set_max_nested_level(&mut self, level: usize) {
        self.max_nested_level = level.max(1);
    }

    #[must_use]
    pub fn max_nested_level(&self) -> usize {
        self.max_nested_level
    }

    /// Top-level rule names in priority order.
    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Rule names used inside block quotes.
    #[must_use]
    pub fn block_quote_rules(&self) -> &[String] {
        &self.block_quote_rules
    }

    /// Rule names used inside list items.
    #[must_use]
    pub fn list_rules(&self) -> &[String] {
        &self.list_rules
    }

    /// Pattern registered for `name`.
    #[must_use]
    pub fn pattern(&self, name: &str) -> Option<&str> {
        self.specification.get(name).map(String::as_str)
    }

    /// `rules` without `name`, used to stop recursion at the nesting limit.
    #[must_use]
    pub fn rules_without(rules: &[String], name: &str) -> Vec<String> {
        rules.iter().filter(|r| *r != name).cloned().collect()
    }

    /// Rules for a container child state at `depth`.
    ///
    /// Once the nesting limit is reached every container rule is dropped,
    /// not just `container`, so alternating block quotes, lists and
    /// directives stop nesting too.
    pub(crate) fn nested_rules(&self, rules: &[String], container: &str, depth: usize) -> Vec<String> {
        if depth + 1 >= self.max_nested_level {
            rules
                .iter()
                .filter(|r| *r != container && !NESTING_RULES.contains(&r.as_str()))
                .cloned()
                .collect()
        } else {
            rules.to_vec()
        }
    }

    /// Register a block rule.
    ///
    /// The rule is inserted before `before` in the top-level, block quote and
    /// list rule lists (appended where `before` is absent from a container
    /// list). Registering invalidates cached scanners.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRule`] if `name` is taken,
    /// [`Error::UnknownRule`] if `before` is not a top-level rule, and
    /// [`Error::Pattern`] if the pattern does not compile alongside the
    /// existing rules.
    pub fn register<F>(
        &mut self,
        name: &str,
        pattern: &str,
        method: F,
        before: Option<&str>,
    ) -> Result<(), Error>
    where
        F: Fn(&BlockParser, &ScanMatch, &mut BlockState<'_>) -> Option<usize>
            + Send
            + Sync
            + 'static,
    {
        if self.methods.contains_key(name) {
            return Err(Error::DuplicateRule(name.to_owned()));
        }
        if let Some(before) = before
            && !self.rules.iter().any(|r| r == before)
        {
            return Err(Error::UnknownRule {
                rule: name.to_owned(),
                before: before.to_owned(),
            });
        }

        let mut pairs: Vec<(&str, &str)> = self
            .specification
            .iter()
            .map(|(n, p)| (n.as_str(), p.as_str()))
            .collect();
        pairs.sort_unstable();
        pairs.push((name, pattern));
        Scanner::new(&pairs, self.scanners.multiline())?;

        self.specification.insert(name.to_owned(), pattern.to_owned());
        self.methods.insert(name.to_owned(), Arc::new(method));
        for rules in [
            &mut self.rules,
            &mut self.block_quote_rules,
            &mut self.list_rules,
        ] {
            insert_rule(rules, name, before);
        }
        self.scanners.clear();
        tracing::debug!(rule = name, before = ?before, "Registered block rule");
        Ok(())
    }

    /// Scanner over `rules`, skipping names without a pattern.
    pub fn compile_sc<S: AsRef<str>>(&self, rules: &[S]) -> Arc<Scanner> {
        let pairs: Vec<(&str, &str)> = rules
            .iter()
            .filter_map(|rule| {
                let name = rule.as_ref();
                self.specification
                    .get(name)
                    .map(|pattern| (name, pattern.as_str()))
            })
            .collect();
        self.scanners.get_or_compile(&pairs)
    }

    /// Scanner over ad-hoc `(name, pattern)` pairs.
    pub fn compile_pairs(&self, pairs: &[(&str, &str)]) -> Arc<Scanner> {
        self.scanners.get_or_compile(pairs)
    }

    /// Dispatch a match to its rule handler.
    pub fn parse_method(&self, m: &ScanMatch, state: &mut BlockState<'_>) -> Option<usize> {
        let method = self.methods.get(m.rule())?;
        method(self, m, state)
    }

    /// Parse `state.src` from the cursor with `rules`.
    pub fn parse<S: AsRef<str>>(&self, state: &mut BlockState<'_>, rules: &[S]) {
        let sc = self.compile_sc(rules);
        while state.cursor < state.cursor_max {
            let Some(m) = sc.search(&state.src, state.cursor) else {
                break;
            };

            let start = m.start();
            if start > state.cursor {
                state.consume_paragraph(start);
            }

            match self.parse_method(&m, state) {
                Some(end) if end > start => state.cursor = end.min(state.cursor_max),
                _ => {
                    state.cursor = start;
                    let end = state.find_line_end();
                    state.consume_paragraph(end);
                }
            }
        }

        if state.cursor < state.cursor_max {
            state.consume_paragraph(state.cursor_max);
        }
    }
}

fn insert_rule(rules: &mut Vec<String>, name: &str, before: Option<&str>) {
    match before.and_then(|b| rules.iter().position(|r| r == b)) {
        Some(index) => rules.insert(index, name.to_owned()),
        None => rules.push(name.to_owned()),
    }
}

/// Position after the newline that ends a single-line match.
fn after_line(state: &BlockState<'_>, end: usize) -> usize {
    (end + 1).min(state.cursor_max)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::Env;
    use crate::token::Token;

    pub(super) fn parse(src: &str) -> Vec<Token> {
        let parser = BlockParser::new();
        let mut env = Env::default();
        let mut state = BlockState::new(src, &mut env);
        parser.parse(&mut state, parser.rules());
        state.tokens
    }

    pub(super) fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens.iter().map(|t| t.kind).collect()
    }

    pub(super) fn parse_nested(src: &str, level: usize) -> Vec<Token> {
        let parser = BlockParser::new().with_max_nested_level(level);
        let mut env = Env::default();
        let mut state = BlockState::new(src, &mut env);
        parser.parse(&mut state, parser.rules());
        state.tokens
    }

    /// Deepest run of nested block quotes and lists.
    pub(super) fn nesting(tokens: &[Token]) -> usize {
        tokens
            .iter()
            .map(|t| {
                let own = usize::from(NESTING_RULES.contains(&t.kind));
                own + nesting(t.child_tokens())
            })
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_paragraphs_and_blank_lines() {
        let tokens = parse("a\nb\n\nc\n");
        assert_eq!(kinds(&tokens), ["paragraph", "blank_line", "paragraph"]);
        assert_eq!(tokens[0].pending_text(), Some("a\nb\n"));
        assert_eq!(tokens[2].pending_text(), Some("c\n"));
    }

    #[test]
    fn test_text_without_trailing_newline() {
        let tokens = parse("just text");
        assert_eq!(tokens, vec![Token::text("paragraph", "just text")]);
    }

    #[test]
    fn test_register_before_existing_rule() {
        let mut parser = BlockParser::new();
        parser
            .register(
                "bang",
                r"^!!(?P<bang_text>.*)$",
                |_, m, state| {
                    let text = m.group(&state.src, "bang_text")?.to_owned();
                    state.append_token(Token::raw("bang", text));
                    Some(after_line(state, m.end()))
                },
                Some("list"),
            )
            .unwrap();

        let index = parser.rules().iter().position(|r| r == "bang").unwrap();
        assert_eq!(parser.rules()[index + 1], "list");
        assert!(parser.block_quote_rules().iter().any(|r| r == "bang"));
        assert!(parser.list_rules().iter().any(|r| r == "bang"));

        let mut env = Env::default();
        let mut state = BlockState::new("!!hi\n", &mut env);
        parser.parse(&mut state, parser.rules());
        assert_eq!(state.tokens, vec![Token::raw("bang", "hi")]);
    }

    #[test]
    fn test_register_unknown_before_fails() {
        let mut parser = BlockParser::new();
        let err = parser
            .register("x", "^x$", |_, _, _| None, Some("nope"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRule { .. }));
        assert!(parser.pattern("x").is_none());
    }

    #[test]
    fn test_register_duplicate_and_bad_pattern() {
        let mut parser = BlockParser::new();
        let err = parser
            .register("list", "^x$", |_, _, _| None, None)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRule(_)));

        let err = parser.register("x", "(", |_, _, _| None, None).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));

        let err = parser
            .register("y", "(?P<list_1>y)", |_, _, _| None, None)
            .unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn test_rejected_match_becomes_paragraph() {
        // An info string with a backtick cannot open a backtick fence.
        let tokens = parse("``` a`b\ntext\n");
        assert_eq!(tokens, vec![Token::text("paragraph", "``` a`b\ntext\n")]);
    }

    #[test]
    fn test_max_nested_level_stops_recursion() {
        let tokens = parse_nested("> > > deep\n", 2);

        let outer = &tokens[0];
        assert_eq!(outer.kind, "block_quote");
        let inner = &outer.child_tokens()[0];
        assert_eq!(inner.kind, "block_quote");
        assert_eq!(kinds(inner.child_tokens()), ["paragraph"]);
        assert_eq!(inner.child_tokens()[0].pending_text(), Some("> deep\n"));
    }

    #[test]
    fn test_alternating_containers_stop_at_limit() {
        let src = format!("{}a\n", "> - ".repeat(500));
        let tokens = parse(&src);
        assert_eq!(nesting(&tokens), DEFAULT_MAX_NESTED_LEVEL);

        let tokens = parse_nested(&src, 3);
        assert_eq!(nesting(&tokens), 3);
    }
}
