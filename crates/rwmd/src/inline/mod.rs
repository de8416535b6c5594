//! Inline parser.
//!
//! Works like the block parser over a single text span: the earliest rule
//! match wins, text between matches goes through [`InlineParser::process_text`],
//! and a rejected match emits one character of text before scanning resumes.

mod link;
mod rules;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::helpers::{HTML_ATTRIBUTES, HTML_TAGNAME, PUNCTUATION};
use crate::scanner::{ScanMatch, Scanner, ScannerCache};
use crate::state::InlineState;
use crate::token::Token;

/// Inline rule handler.
pub type InlineHandler =
    Arc<dyn Fn(&InlineParser, &ScanMatch, &mut InlineState<'_>) -> Option<usize> + Send + Sync>;

/// Replacement for plain text emission, used to post-process text runs.
pub type TextHook = Arc<dyn Fn(&InlineParser, &str, &mut InlineState<'_>) + Send + Sync>;

/// Rules scanned for inside emphasis before committing to it.
pub const EMPHASIS_PRECEDENCE: &[&str] = &["codespan", "link", "prec_auto_link", "prec_inline_html"];

/// Rules scanned for inside link text before committing to a link.
pub const LINK_PRECEDENCE: &[&str] = &["codespan", "prec_auto_link", "prec_inline_html"];

const SCHEME: &str = r"[A-Za-z][A-Za-z\d.+-]{1,31}";

const AUTO_EMAIL: &str = r"<[A-Za-z\d.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z\d](?:[A-Za-z\d-]{0,61}[A-Za-z\d])?(?:\.[A-Za-z\d](?:[A-Za-z\d-]{0,61}[A-Za-z\d])?)*>";

fn default_specification(hard_wrap: bool) -> HashMap<String, String> {
    let linebreak = if hard_wrap {
        r"(?:\\|[ \t]*)\n\s*"
    } else {
        r"(?:\\| {2,})\n\s*"
    };
    [
        ("escape", format!(r"(?:\\{PUNCTUATION})+")),
        ("codespan", "`+".to_owned()),
        ("emphasis", r"\*{1,3}|\b_{1,3}".to_owned()),
        ("link", r"!?\[".to_owned()),
        ("auto_link", format!(r"<{SCHEME}:[^<>\s]*>")),
        ("auto_email", AUTO_EMAIL.to_owned()),
        (
            "inline_html",
            format!(
                r"<{HTML_TAGNAME}{HTML_ATTRIBUTES}\s*/?>|</{HTML_TAGNAME}\s*>|<!-->|<!--->|<!--[\s\S]*?-->|<\?[\s\S]+?\?>|<![A-Z][\s\S]+?>|<!\[CDATA\[[\s\S]+?\]\]>"
            ),
        ),
        ("linebreak", linebreak.to_owned()),
        ("softbreak", r"[ \t]*\n\s*".to_owned()),
        ("prec_auto_link", format!("<{SCHEME}:")),
        ("prec_inline_html", format!(r"</?{HTML_TAGNAME}|<!|<\?")),
    ]
    .into_iter()
    .map(|(name, pattern)| (name.to_owned(), pattern))
    .collect()
}

fn handler<F>(f: F) -> InlineHandler
where
    F: Fn(&InlineParser, &ScanMatch, &mut InlineState<'_>) -> Option<usize> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Inline parser: rule table, text hook and the scan loop.
pub struct InlineParser {
    specification: HashMap<String, String>,
    methods: HashMap<String, InlineHandler>,
    rules: Vec<String>,
    hard_wrap: bool,
    text_hook: Option<TextHook>,
    scanners: ScannerCache,
}

impl Default for InlineParser {
    fn default() -> Self {
        Self::new(false)
    }
}

impl std::fmt::Debug for InlineParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineParser")
            .field("rules", &self.rules)
            .field("hard_wrap", &self.hard_wrap)
            .finish_non_exhaustive()
    }
}

impl InlineParser {
    /// Parser with the core inline rules.
    ///
    /// With `hard_wrap`, every newline is a hard line break.
    #[must_use]
    pub fn new(hard_wrap: bool) -> Self {
        let mut methods: HashMap<String, InlineHandler> = [
            ("escape", handler(rules::parse_escape)),
            ("codespan", handler(rules::parse_codespan)),
            ("emphasis", handler(rules::parse_emphasis)),
            ("link", handler(link::parse_link)),
            ("auto_link", handler(rules::parse_auto_link)),
            ("auto_email", handler(rules::parse_auto_email)),
            ("inline_html", handler(rules::parse_inline_html)),
            ("linebreak", handler(rules::parse_linebreak)),
        ]
        .into_iter()
        .map(|(name, f)| (name.to_owned(), f))
        .collect();

        let mut rule_names: Vec<String> = [
            "escape",
            "codespan",
            "emphasis",
            "link",
            "auto_link",
            "auto_email",
            "inline_html",
            "linebreak",
        ]
        .iter()
        .map(|r| (*r).to_owned())
        .collect();
        if !hard_wrap {
            methods.insert("softbreak".to_owned(), handler(rules::parse_softbreak));
            rule_names.push("softbreak".to_owned());
        }

        Self {
            specification: default_specification(hard_wrap),
            methods,
            rules: rule_names,
            hard_wrap,
            text_hook: None,
            scanners: ScannerCache::new(false),
        }
    }

    /// Whether newlines are hard breaks.
    #[must_use]
    pub fn hard_wrap(&self) -> bool {
        self.hard_wrap
    }

    /// Rule names in priority order.
    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Pattern registered for `name`.
    #[must_use]
    pub fn pattern(&self, name: &str) -> Option<&str> {
        self.specification.get(name).map(String::as_str)
    }

    /// Register an inline rule before `before` (appended when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRule`] if `name` is taken,
    /// [`Error::UnknownRule`] if `before` is not a rule, and
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
        F: Fn(&InlineParser, &ScanMatch, &mut InlineState<'_>) -> Option<usize>
            + Send
            + Sync
            + 'static,
    {
        if self.methods.contains_key(name) {
            return Err(Error::DuplicateRule(name.to_owned()));
        }
        let index = match before {
            Some(before) => Some(self.rules.iter().position(|r| r == before).ok_or_else(|| {
                Error::UnknownRule {
                    rule: name.to_owned(),
                    before: before.to_owned(),
                }
            })?),
            None => None,
        };

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
        match index {
            Some(index) => self.rules.insert(index, name.to_owned()),
            None => self.rules.push(name.to_owned()),
        }
        self.scanners.clear();
        tracing::debug!(rule = name, before = ?before, "Registered inline rule");
        Ok(())
    }

    /// Route plain text through `hook` instead of emitting it directly.
    pub fn set_text_hook<F>(&mut self, hook: F)
    where
        F: Fn(&InlineParser, &str, &mut InlineState<'_>) + Send + Sync + 'static,
    {
        self.text_hook = Some(Arc::new(hook));
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

    /// Dispatch a match to its rule handler.
    pub fn parse_method(&self, m: &ScanMatch, state: &mut InlineState<'_>) -> Option<usize> {
        let method = self.methods.get(m.rule())?;
        method(self, m, state)
    }

    /// Emit plain text, through the text hook when one is set.
    pub fn process_text(&self, text: &str, state: &mut InlineState<'_>) {
        match &self.text_hook {
            Some(hook) => hook(self, text, state),
            None => state.append_text(text),
        }
    }

    /// Parse `state.src` into `state.tokens`.
    pub fn parse(&self, state: &mut InlineState<'_>) {
        let sc = self.compile_sc(self.rules.as_slice());
        let len = state.src.len();
        let mut pos = 0;
        while pos < len {
            let Some(m) = sc.search(&state.src, pos) else {
                break;
            };
            let start = m.start();
            if start > pos {
                let hole = state.src[pos..start].to_owned();
                self.process_text(&hole, state);
            }

            match self.parse_method(&m, state) {
                Some(end) if end > start => pos = end,
                _ => {
                    let width = state.src[start..].chars().next().map_or(1, char::len_utf8);
                    pos = start + width;
                    let hole = state.src[start..pos].to_owned();
                    self.process_text(&hole, state);
                }
            }
        }

        if pos < len {
            let rest = state.src[pos..].to_owned();
            self.process_text(&rest, state);
        }
    }

    /// Parse `src` in a child of `state`, after `configure` adjusts its flags.
    pub fn parse_child<F>(&self, state: &mut InlineState<'_>, src: String, configure: F) -> Vec<Token>
    where
        F: FnOnce(&mut InlineState<'_>),
    {
        let mut child = state.child_state(src);
        configure(&mut child);
        self.parse(&mut child);
        child.tokens
    }

    /// Check whether a construct starting at `m` is cut short by a
    /// higher-precedence one (code span, autolink, raw HTML, link) that
    /// begins inside it and extends past `end_pos`.
    ///
    /// When it is, the text up to that construct and the construct's tokens
    /// are emitted and the construct's end is returned.
    pub fn precedence_scan(
        &self,
        m: &ScanMatch,
        state: &mut InlineState<'_>,
        end_pos: usize,
        rules: &[&str],
    ) -> Option<usize> {
        let hit = self
            .compile_sc(rules)
            .search_range(&state.src, m.end(), end_pos)?;
        let rule = hit.rule().strip_prefix("prec_").unwrap_or(hit.rule());
        let m2 = self.compile_sc(&[rule]).match_at(&state.src, hit.start())?;

        let (result, tokens) = {
            let src = state.src.clone();
            let mut child = state.child_state(src);
            let result = self.parse_method(&m2, &mut child);
            (result, child.tokens)
        };
        let result = result.filter(|&p| p >= end_pos)?;

        let raw = state.src[m.start()..m2.start()].to_owned();
        state.append_text(&raw);
        state.tokens.extend(tokens);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::{Env, LinkRef};

    pub(super) fn parse_with(parser: &InlineParser, env: &mut Env, src: &str) -> Vec<Token> {
        let mut state = InlineState::new(src, env);
        parser.parse(&mut state);
        state.tokens
    }

    pub(super) fn parse(src: &str) -> Vec<Token> {
        parse_with(&InlineParser::default(), &mut Env::default(), src)
    }

    pub(super) fn text(s: &str) -> Token {
        Token::raw("text", s)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("hello world"), vec![text("hello world")]);
        assert_eq!(parse(""), vec![]);
    }

    #[test]
    fn test_softbreak_and_linebreak() {
        assert_eq!(
            parse("a \nb  \nc\\\nd"),
            vec![
                text("a"),
                Token::new("softbreak"),
                text("b"),
                Token::new("linebreak"),
                text("c"),
                Token::new("linebreak"),
                text("d"),
            ]
        );
    }

    #[test]
    fn test_hard_wrap() {
        let parser = InlineParser::new(true);
        let tokens = parse_with(&parser, &mut Env::default(), "a\nb");
        assert_eq!(tokens, vec![text("a"), Token::new("linebreak"), text("b")]);
    }

    #[test]
    fn test_link_beats_emphasis() {
        let tokens = parse("*a [b*](/u)");
        assert_eq!(
            tokens,
            vec![
                text("*a "),
                Token::children("link", vec![text("b*")]).with_attr("url", "/u"),
            ]
        );
    }

    #[test]
    fn test_codespan_beats_emphasis() {
        let tokens = parse("*a `b*` c");
        assert_eq!(
            tokens,
            vec![text("*a "), Token::raw("codespan", "b*"), text(" c")]
        );
    }

    #[test]
    fn test_register_and_text_hook() {
        let mut parser = InlineParser::default();
        parser
            .register(
                "at",
                r"@(?P<at_name>\w+)",
                |_, m, state| {
                    let name = m.group(&state.src, "at_name")?.to_owned();
                    state.append_token(Token::raw("mention", name));
                    Some(m.end())
                },
                Some("link"),
            )
            .unwrap();
        parser.set_text_hook(|_, text, state| state.append_text(&text.to_uppercase()));

        let tokens = parse_with(&parser, &mut Env::default(), "hi @bob!");
        assert_eq!(
            tokens,
            vec![text("HI "), Token::raw("mention", "bob"), text("!")]
        );
        let index = parser.rules().iter().position(|r| r == "at").unwrap();
        assert_eq!(parser.rules()[index + 1], "link");
    }

    #[test]
    fn test_register_errors() {
        let mut parser = InlineParser::default();
        assert!(matches!(
            parser.register("link", "x", |_, _, _| None, None),
            Err(Error::DuplicateRule(_))
        ));
        assert!(matches!(
            parser.register("x", "x", |_, _, _| None, Some("nope")),
            Err(Error::UnknownRule { .. })
        ));
        assert!(matches!(
            parser.register("x", "[", |_, _, _| None, None),
            Err(Error::Pattern { .. })
        ));
    }

    #[test]
    fn test_reference_link_uses_env() {
        let mut env = Env::default();
        env.ref_links.insert(
            "FOO".to_owned(),
            LinkRef {
                url: "/f".to_owned(),
                title: None,
                label: "foo".to_owned(),
            },
        );
        let tokens = parse_with(&InlineParser::default(), &mut env, "[Foo]");
        assert_eq!(
            tokens,
            vec![
                Token::children("link", vec![text("Foo")])
                    .with_attr("url", "/f")
                    .with_attr("label", "Foo")
            ]
        );
    }

    #[test]
    fn test_unclosed_markers_stay_literal() {
        let src = "*a **b ".repeat(2000);
        assert_eq!(parse(&src), vec![text(&src)]);

        let src = "[a](".repeat(2000);
        assert_eq!(parse(&src), vec![text(&src)]);
    }

    #[test]
    fn test_closer_after_failed_opener() {
        let tokens = parse("**a *b* c");
        assert_eq!(tokens[0], text("**a "));
        assert_eq!(tokens[1], Token::children("emphasis", vec![text("b")]));

        let tokens = parse("[a](b [c](/d)");
        assert_eq!(tokens[0], text("[a](b "));
        assert_eq!(tokens[1], Token::children("link", vec![text("c")]).with_attr("url", "/d"));
    }
}
