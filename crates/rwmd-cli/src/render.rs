//! Render markdown from a message, a file or stdin.

use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use rwmd::directive::{
    Admonition, Directive, FencedDirective, Include, RstDirective, TableOfContents,
};
use rwmd::{Env, Markdown};
use rwmd_config::{CliSettings, Config, DirectiveKind, DirectiveStyle, RendererKind};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for rendering.
#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Markdown text to render.
    #[arg(short, long, conflicts_with = "file")]
    message: Option<String>,

    /// Markdown file to render.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Write output to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Renderer: html or ast (overrides config).
    #[arg(short, long, value_parser = ["html", "ast"])]
    renderer: Option<String>,

    /// Built-in plugin to enable, repeatable (replaces config plugins).
    #[arg(short, long = "plugin")]
    plugins: Vec<String>,

    /// Escape raw HTML.
    #[arg(long)]
    escape: bool,

    /// Treat every newline as a hard break.
    #[arg(long)]
    hardwrap: bool,

    /// Path to configuration file (default: auto-discover rwmd.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Source document and the path it was read from.
struct Input {
    text: String,
    path: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, there is no input, or
    /// reading, rendering or writing fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), Some(&self.cli_settings()))?;
        tracing::debug!(config_path = ?config.config_path, "Loaded configuration");

        let input = self.read_input()?.ok_or(CliError::MissingInput)?;
        let md = build_markdown(&config)?;
        let rendered = render(&md, &input)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, &rendered)?;
                output.written(path, config.markdown.renderer.as_str(), rendered.len());
            }
            None => std::io::stdout().lock().write_all(rendered.as_bytes())?,
        }
        Ok(())
    }

    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            escape: self.escape.then_some(true),
            hard_wrap: self.hardwrap.then_some(true),
            renderer: self.renderer.as_deref().map(|name| match name {
                "ast" => RendererKind::Ast,
                _ => RendererKind::Html,
            }),
            plugins: (!self.plugins.is_empty()).then(|| self.plugins.clone()),
        }
    }

    /// Message first, then file, then stdin when it is not a terminal.
    fn read_input(&self) -> Result<Option<Input>, CliError> {
        if let Some(message) = &self.message {
            return Ok(Some(Input {
                text: message.clone(),
                path: None,
            }));
        }
        if let Some(path) = &self.file {
            return Ok(Some(Input {
                text: std::fs::read_to_string(path)?,
                path: Some(path.clone()),
            }));
        }
        let mut stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Ok(None);
        }
        let mut text = String::new();
        stdin.read_to_string(&mut text)?;
        Ok(Some(Input { text, path: None }))
    }
}

/// Build the engine described by `config`.
fn build_markdown(config: &Config) -> Result<Markdown, CliError> {
    let mut builder = Markdown::builder()
        .escape(config.markdown.escape)
        .hard_wrap(config.markdown.hard_wrap)
        .max_nested_level(config.markdown.max_nested_level);
    if config.markdown.renderer == RendererKind::Ast {
        builder = builder.ast();
    }
    for name in &config.markdown.plugins {
        builder = builder.plugin(rwmd::plugins::builtin(name)?);
    }

    let directives = enabled_directives(config);
    if !directives.is_empty() {
        builder = match config.directives.style {
            DirectiveStyle::Rst => builder.plugin(
                directives
                    .into_iter()
                    .fold(RstDirective::new(), RstDirective::with_shared),
            ),
            DirectiveStyle::Fenced => builder.plugin(
                directives
                    .into_iter()
                    .fold(FencedDirective::new(), FencedDirective::with_shared),
            ),
        };
    }

    Ok(builder.build()?)
}

fn enabled_directives(config: &Config) -> Vec<Arc<dyn Directive>> {
    config
        .directives
        .enabled
        .iter()
        .map(|kind| -> Arc<dyn Directive> {
            match kind {
                DirectiveKind::Admonition => Arc::new(Admonition::default()),
                DirectiveKind::Toc => Arc::new(TableOfContents::new(
                    config.toc.min_level,
                    config.toc.max_level,
                )),
                DirectiveKind::Include => {
                    Arc::new(Include::new().with_max_depth(config.directives.max_include_depth))
                }
            }
        })
        .collect()
}

/// Render `input` as HTML, or as pretty JSON tokens in AST mode.
fn render(md: &Markdown, input: &Input) -> Result<String, CliError> {
    let mut env = match &input.path {
        Some(path) => Env::with_file(path),
        None => Env::default(),
    };
    if md.renderer.is_none() {
        let tokens = md.tokens_with_env(&input.text, &mut env)?;
        let mut json = serde_json::to_string_pretty(&tokens)?;
        json.push('\n');
        return Ok(json);
    }
    Ok(md.parse_with_env(&input.text, &mut env)?)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RenderArgs,
    }

    fn args(argv: &[&str]) -> RenderArgs {
        TestCli::try_parse_from(std::iter::once("rwmd").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    fn input(text: &str) -> Input {
        Input {
            text: text.to_owned(),
            path: None,
        }
    }

    #[test]
    fn test_cli_settings_from_flags() {
        let settings = args(&["-m", "x", "--escape", "-r", "ast", "-p", "math", "-p", "abbr"])
            .cli_settings();
        assert_eq!(settings.escape, Some(true));
        assert_eq!(settings.hard_wrap, None);
        assert_eq!(settings.renderer, Some(RendererKind::Ast));
        assert_eq!(settings.plugins, Some(vec!["math".to_owned(), "abbr".to_owned()]));

        let settings = args(&["-m", "x"]).cli_settings();
        assert_eq!(settings.escape, None);
        assert_eq!(settings.plugins, None);
    }

    #[test]
    fn test_unknown_renderer_rejected() {
        assert!(TestCli::try_parse_from(["rwmd", "-r", "latex"]).is_err());
    }

    #[test]
    fn test_message_before_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# file\n").unwrap();

        let read = args(&["-f", path.to_str().unwrap()]).read_input().unwrap().unwrap();
        assert_eq!(read.text, "# file\n");
        assert_eq!(read.path, Some(path));

        let read = args(&["-m", "# msg"]).read_input().unwrap().unwrap();
        assert_eq!(read.text, "# msg");
        assert_eq!(read.path, None);
    }

    #[test]
    fn test_render_html_with_plugins_and_directives() {
        let mut config = Config::default();
        config.markdown.plugins = vec!["strikethrough".to_owned()];
        config.directives.enabled = vec![DirectiveKind::Admonition];
        let md = build_markdown(&config).unwrap();

        let html = render(&md, &input(".. tip::\n\n   ~~no~~\n")).unwrap();
        assert_eq!(
            html,
            "<section class=\"admonition tip\">\n\
             <p class=\"admonition-title\">Tip</p>\n\
             <p><del>no</del></p>\n\
             </section>\n"
        );
    }

    #[test]
    fn test_fenced_style() {
        let mut config = Config::default();
        config.directives.style = DirectiveStyle::Fenced;
        config.directives.enabled = vec![DirectiveKind::Admonition];
        let md = build_markdown(&config).unwrap();

        let html = render(&md, &input("```{note} Hi\nbody\n```\n")).unwrap();
        assert_eq!(
            html,
            "<section class=\"admonition note\">\n\
             <p class=\"admonition-title\">Hi</p>\n\
             <p>body</p>\n\
             </section>\n"
        );
    }

    #[test]
    fn test_render_ast() {
        let mut config = Config::default();
        config.markdown.renderer = RendererKind::Ast;
        let md = build_markdown(&config).unwrap();

        let json = render(&md, &input("# Hi")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["type"], "heading");
    }

    #[test]
    fn test_unknown_plugin() {
        let mut config = Config::default();
        config.markdown.plugins = vec!["tables".to_owned()];
        assert!(matches!(
            build_markdown(&config),
            Err(CliError::Markdown(rwmd::Error::UnknownPlugin(_)))
        ));
    }
}
