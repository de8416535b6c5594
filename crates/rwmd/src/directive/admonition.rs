//! Admonition directives (`note`, `warning`, ...).

use super::{Directive, DirectiveArgs, DirectiveError, parse_content};
use crate::block::BlockParser;
use crate::state::BlockState;
use crate::token::Token;

/// Names handled by [`Admonition::default`].
pub const ADMONITION_NAMES: &[&str] = &[
    "attention",
    "caution",
    "danger",
    "error",
    "hint",
    "important",
    "note",
    "tip",
    "warning",
];

/// Callout box with a title and markdown body.
///
/// Emits `admonition` with an `admonition_title` child (the directive title,
/// or the capitalized name when empty) and an `admonition_content` child
/// holding the parsed body.
#[derive(Clone, Debug)]
pub struct Admonition {
    names: Vec<&'static str>,
}

impl Default for Admonition {
    fn default() -> Self {
        Self {
            names: ADMONITION_NAMES.to_vec(),
        }
    }
}

impl Admonition {
    /// Admonition answering to `names` only.
    #[must_use]
    pub fn with_names(names: &[&'static str]) -> Self {
        Self {
            names: names.to_vec(),
        }
    }
}

impl Directive for Admonition {
    fn names(&self) -> Vec<&'static str> {
        self.names.clone()
    }

    fn parse(
        &self,
        block: &BlockParser,
        args: &DirectiveArgs,
        state: &mut BlockState<'_>,
    ) -> Result<Vec<Token>, DirectiveError> {
        let title = if args.title.is_empty() {
            capitalize(&args.name)
        } else {
            args.title.clone()
        };
        let content = parse_content(block, args, state);

        let mut token = Token::children(
            "admonition",
            vec![
                Token::text("admonition_title", title),
                Token::children("admonition_content", content),
            ],
        )
        .with_attr("name", args.name.as_str());
        if let Some(class) = args.get("class") {
            token.set_attr("class", class);
        }
        Ok(vec![token])
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::state::Env;

    fn run(name: &str, title: &str, body: &str) -> Token {
        let block = BlockParser::new();
        let mut env = Env::default();
        let mut state = BlockState::new("", &mut env);
        let args = DirectiveArgs::parse_body(name, title, body, "rst_directive");
        Admonition::default()
            .parse(&block, &args, &mut state)
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_default_title_is_capitalized_name() {
        let token = run("warning", "", "Careful.\n");
        assert_eq!(token.attr_str("name"), Some("warning"));
        let children = token.child_tokens();
        assert_eq!(children[0], Token::text("admonition_title", "Warning"));
        assert_eq!(
            children[1],
            Token::children(
                "admonition_content",
                vec![Token::text("paragraph", "Careful.\n")]
            )
        );
    }

    #[test]
    fn test_custom_title_and_class() {
        let token = run("tip", "Pro *tip*", ":class: wide\n");
        assert_eq!(token.attr_str("class"), Some("wide"));
        assert_eq!(
            token.child_tokens()[0],
            Token::text("admonition_title", "Pro *tip*")
        );
        assert!(token.child_tokens()[1].child_tokens().is_empty());
    }

    #[test]
    fn test_names() {
        assert!(Admonition::default().names().contains(&"danger"));
        assert_eq!(Admonition::with_names(&["aside"]).names(), ["aside"]);
    }
}
