//! Table of contents directive.
//!
//! The directive only emits a `toc` placeholder. Headings are numbered and
//! collected by a before-render hook once the whole document is parsed,
//! which then fills every placeholder with the entries in its level range.

use std::collections::HashSet;
use std::sync::Arc;

use super::{Directive, DirectiveArgs, DirectiveError};
use crate::block::BlockParser;
use crate::error::Error;
use crate::markdown::Markdown;
use crate::state::{BlockState, Env};
use crate::token::{TocEntry, Token};
use crate::util::slugify;

/// Heading ID generator: `(heading token, heading index)` to ID.
pub type HeadingId = Arc<dyn Fn(&Token, usize) -> String + Send + Sync>;

/// `toc` directive.
#[derive(Clone)]
pub struct TableOfContents {
    min_level: u8,
    max_level: u8,
    heading_id: Option<HeadingId>,
}

impl std::fmt::Debug for TableOfContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableOfContents")
            .field("min_level", &self.min_level)
            .field("max_level", &self.max_level)
            .field("heading_id", &self.heading_id.is_some())
            .finish()
    }
}

impl Default for TableOfContents {
    fn default() -> Self {
        Self {
            min_level: 1,
            max_level: 3,
            heading_id: None,
        }
    }
}

impl TableOfContents {
    /// Directive listing headings from `min_level` to `max_level`.
    ///
    /// Levels are clamped to `1..=6`.
    #[must_use]
    pub fn new(min_level: u8, max_level: u8) -> Self {
        let min_level = min_level.clamp(1, 6);
        Self {
            min_level,
            max_level: max_level.clamp(min_level, 6),
            heading_id: None,
        }
    }

    /// Replace the heading ID generator.
    #[must_use]
    pub fn with_heading_id<F>(mut self, f: F) -> Self
    where
        F: Fn(&Token, usize) -> String + Send + Sync + 'static,
    {
        self.heading_id = Some(Arc::new(f));
        self
    }

    fn level_option(&self, args: &DirectiveArgs, key: &str, default: u8) -> Result<u8, DirectiveError> {
        match args.get(key) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=6).contains(n))
                .ok_or_else(|| {
                    DirectiveError::Invalid(format!("\"{key}\" option MUST be a heading level (1-6)"))
                }),
        }
    }
}

impl Directive for TableOfContents {
    fn names(&self) -> Vec<&'static str> {
        vec!["toc"]
    }

    fn parse(
        &self,
        _: &BlockParser,
        args: &DirectiveArgs,
        _: &mut BlockState<'_>,
    ) -> Result<Vec<Token>, DirectiveError> {
        let min_level = self.level_option(args, "min-level", self.min_level)?;
        let mut max_level = self.level_option(args, "max-level", self.max_level)?;
        if let Some(depth) = args.get("depth") {
            let depth = depth
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=6).contains(n))
                .ok_or_else(|| DirectiveError::Invalid("\"depth\" option MUST be 1-6".to_owned()))?;
            max_level = max_level.min(min_level.saturating_add(depth - 1));
        }

        if min_level < self.min_level {
            return Err(DirectiveError::Invalid(format!(
                "\"min-level\" option MUST be >= {}",
                self.min_level
            )));
        }
        if max_level > self.max_level {
            return Err(DirectiveError::Invalid(format!(
                "\"max-level\" option MUST be <= {}",
                self.max_level
            )));
        }
        if min_level > max_level {
            return Err(DirectiveError::Invalid(
                "\"min-level\" option MUST be less than \"max-level\" option".to_owned(),
            ));
        }

        Ok(vec![
            Token::new("toc")
                .with_attr("title", args.title.as_str())
                .with_attr("min_level", min_level)
                .with_attr("max_level", max_level)
                .with_attr("collapse", args.has("collapse")),
        ])
    }

    fn setup(&self, md: &mut Markdown) -> Result<(), Error> {
        let heading_id = self.heading_id.clone();
        let (min_level, max_level) = (self.min_level, self.max_level);
        md.before_render(move |_, tokens, env| {
            collect_headings(tokens, env, heading_id.as_ref(), min_level, max_level);
            let entries = env.toc_items.clone();
            fill_placeholders(tokens, &entries);
        });
        Ok(())
    }
}

/// Default heading ID: the slug of the heading text, `toc_N` when empty.
fn default_heading_id(token: &Token, index: usize) -> String {
    let slug = slugify(&token.plain_text());
    if slug.is_empty() {
        format!("toc_{}", index + 1)
    } else {
        slug
    }
}

/// Assign IDs to top-level headings and record those within the level range
/// in `env.toc_items`. Generated IDs are made unique with a numeric suffix;
/// IDs already set are kept.
fn collect_headings(
    tokens: &mut [Token],
    env: &mut Env,
    heading_id: Option<&HeadingId>,
    min_level: u8,
    max_level: u8,
) {
    let mut seen: HashSet<String> = tokens
        .iter()
        .filter_map(|t| t.attr_str("id"))
        .map(str::to_owned)
        .collect();

    let mut entries = Vec::new();
    for (index, token) in tokens.iter_mut().filter(|t| t.kind == "heading").enumerate() {
        let id = if let Some(id) = token.attr_str("id") {
            id.to_owned()
        } else {
            let base = match heading_id {
                Some(f) => f(token, index),
                None => default_heading_id(token, index),
            };
            let id = unique_id(base, &mut seen);
            token.set_attr("id", id.as_str());
            id
        };

        let level = token
            .attr_int("level")
            .and_then(|n| u8::try_from(n).ok())
            .unwrap_or(1);
        if (min_level..=max_level).contains(&level) {
            entries.push(TocEntry {
                level,
                title: token.plain_text().trim().to_owned(),
                id,
            });
        }
    }
    tracing::debug!(headings = entries.len(), "Collected table of contents");
    env.toc_items = entries;
}

fn unique_id(base: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.clone()) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn fill_placeholders(tokens: &mut [Token], entries: &[TocEntry]) {
    for token in tokens {
        if token.kind == "toc" {
            let min = token.attr_int("min_level").unwrap_or(1);
            let max = token.attr_int("max_level").unwrap_or(6);
            let selected: Vec<TocEntry> = entries
                .iter()
                .filter(|e| (min..=max).contains(&i64::from(e.level)))
                .cloned()
                .collect();
            token.set_attr("toc", selected);
        } else if let Some(children) = token.child_tokens_mut() {
            fill_placeholders(children, entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn heading(level: usize, text: &str) -> Token {
        Token::children("heading", vec![Token::raw("text", text)]).with_attr("level", level)
    }

    fn run_parse(toc: &TableOfContents, options: &str) -> Result<Token, DirectiveError> {
        let block = BlockParser::new();
        let mut env = Env::default();
        let mut state = BlockState::new("", &mut env);
        let args = DirectiveArgs::parse_body("toc", "Contents", options, "rst_directive");
        toc.parse(&block, &args, &mut state).map(|mut t| t.remove(0))
    }

    #[test]
    fn test_placeholder_attrs() {
        let token = run_parse(&TableOfContents::default(), ":collapse:\n:depth: 2\n").unwrap();
        assert_eq!(token.attr_str("title"), Some("Contents"));
        assert_eq!(token.attr_int("min_level"), Some(1));
        assert_eq!(token.attr_int("max_level"), Some(2));
        assert_eq!(token.attr_bool("collapse"), Some(true));
    }

    #[test]
    fn test_invalid_levels() {
        let toc = TableOfContents::new(2, 4);
        let err = run_parse(&toc, ":min-level: 1\n").unwrap_err();
        assert_eq!(err.to_string(), "\"min-level\" option MUST be >= 2");
        let err = run_parse(&toc, ":max-level: 5\n").unwrap_err();
        assert_eq!(err.to_string(), "\"max-level\" option MUST be <= 4");
        let err = run_parse(&toc, ":min-level: 4\n:max-level: 3\n").unwrap_err();
        assert!(err.to_string().contains("less than"));
        assert!(run_parse(&toc, ":max-level: x\n").is_err());
    }

    #[test]
    fn test_collect_headings_assigns_unique_ids() {
        let mut tokens = vec![
            heading(1, "Intro"),
            heading(2, "Intro"),
            heading(4, "Deep"),
            heading(2, "!!!"),
        ];
        let mut env = Env::default();
        collect_headings(&mut tokens, &mut env, None, 1, 3);

        let ids: Vec<_> = tokens.iter().map(|t| t.attr_str("id").unwrap()).collect();
        assert_eq!(ids, ["intro", "intro-1", "deep", "toc_4"]);
        let levels: Vec<_> = env.toc_items.iter().map(|e| e.level).collect();
        assert_eq!(levels, [1, 2, 2]);
        assert_eq!(env.toc_items[0].title, "Intro");
    }

    #[test]
    fn test_custom_heading_id() {
        let toc = TableOfContents::default().with_heading_id(|_, i| format!("h{i}"));
        let mut tokens = vec![heading(1, "A"), heading(1, "B")];
        let mut env = Env::default();
        collect_headings(&mut tokens, &mut env, toc.heading_id.as_ref(), 1, 3);
        assert_eq!(tokens[1].attr_str("id"), Some("h1"));
    }

    #[test]
    fn test_fill_placeholders_by_range() {
        let entries = vec![
            TocEntry { level: 1, title: "A".to_owned(), id: "a".to_owned() },
            TocEntry { level: 2, title: "B".to_owned(), id: "b".to_owned() },
        ];
        let mut tokens = vec![
            Token::new("toc").with_attr("min_level", 2u8).with_attr("max_level", 3u8),
            Token::children("admonition", vec![Token::new("toc")]),
        ];
        fill_placeholders(&mut tokens, &entries);
        assert_eq!(tokens[0].attr("toc").and_then(|v| v.as_toc()).unwrap().len(), 1);
        let nested = &tokens[1].child_tokens()[0];
        assert_eq!(nested.attr("toc").and_then(|v| v.as_toc()).unwrap().len(), 2);
    }
}
