//! Configuration management for rwmd.
//!
//! Parses `rwmd.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [markdown]
//! escape = false
//! hard_wrap = false
//! renderer = "html"
//! plugins = ["strikethrough", "footnotes"]
//! max_nested_level = 6
//!
//! [directives]
//! style = "rst"
//! enabled = ["admonition", "toc", "include"]
//! max_include_depth = 10
//!
//! [toc]
//! min_level = 1
//! max_level = 3
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override raw HTML escaping.
    pub escape: Option<bool>,
    /// Override hard line wrapping.
    pub hard_wrap: Option<bool>,
    /// Override the output renderer.
    pub renderer: Option<RendererKind>,
    /// Replace the plugin list.
    pub plugins: Option<Vec<String>>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rwmd.toml";

/// Container nesting limit bounds.
const MAX_NESTED_LEVEL: usize = 32;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Parser and renderer settings.
    pub markdown: MarkdownConfig,
    /// Directive settings.
    pub directives: DirectivesConfig,
    /// Table of contents settings.
    pub toc: TocConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Output renderer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// HTML output.
    #[default]
    Html,
    /// Token tree output.
    Ast,
}

impl RendererKind {
    /// Renderer name as accepted by `rwmd::create_markdown`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Ast => "ast",
        }
    }
}

/// `[markdown]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Escape raw HTML.
    pub escape: bool,
    /// Treat every newline as a hard break.
    pub hard_wrap: bool,
    /// Output renderer.
    pub renderer: RendererKind,
    /// Built-in plugin names, applied in order.
    pub plugins: Vec<String>,
    /// Container nesting limit.
    pub max_nested_level: usize,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            escape: false,
            hard_wrap: false,
            renderer: RendererKind::Html,
            plugins: Vec::new(),
            max_nested_level: 6,
        }
    }
}

/// Directive block syntax.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveStyle {
    /// `.. name:: title`
    #[default]
    Rst,
    /// ```` ```{name} title ````
    Fenced,
}

/// Built-in directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Admonition,
    Toc,
    Include,
}

/// `[directives]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectivesConfig {
    /// Block syntax for directives.
    pub style: DirectiveStyle,
    /// Enabled directives. Empty disables directive parsing.
    pub enabled: Vec<DirectiveKind>,
    /// Nesting limit for `include`.
    pub max_include_depth: usize,
}

impl Default for DirectivesConfig {
    fn default() -> Self {
        Self {
            style: DirectiveStyle::Rst,
            enabled: Vec::new(),
            max_include_depth: 10,
        }
    }
}

impl DirectivesConfig {
    #[must_use]
    pub fn is_enabled(&self, kind: DirectiveKind) -> bool {
        self.enabled.contains(&kind)
    }
}

/// `[toc]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TocConfig {
    /// Shallowest heading level listed.
    pub min_level: u8,
    /// Deepest heading level listed.
    pub max_level: u8,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            min_level: 1,
            max_level: 3,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a value to lie in `range`.
fn require_range<T>(value: T, range: std::ops::RangeInclusive<T>, field: &str) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if !range.contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rwmd.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or a value is out of range.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let discovered = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => std::env::current_dir()
                .ok()
                .and_then(|cwd| Self::discover_from(&cwd)),
        };
        let mut config = match discovered {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(escape) = settings.escape {
            self.markdown.escape = escape;
        }
        if let Some(hard_wrap) = settings.hard_wrap {
            self.markdown.hard_wrap = hard_wrap;
        }
        if let Some(renderer) = settings.renderer {
            self.markdown.renderer = renderer;
        }
        if let Some(plugins) = &settings.plugins {
            self.markdown.plugins.clone_from(plugins);
        }
    }

    /// Search for config file in `start` and its parents.
    #[must_use]
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_markdown()?;
        self.validate_directives()?;
        self.validate_toc()?;
        Ok(())
    }

    fn validate_markdown(&self) -> Result<(), ConfigError> {
        require_range(
            self.markdown.max_nested_level,
            1..=MAX_NESTED_LEVEL,
            "markdown.max_nested_level",
        )?;
        if let Some(name) = self.markdown.plugins.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "markdown.plugins contains an empty name: {name:?}"
            )));
        }
        Ok(())
    }

    fn validate_directives(&self) -> Result<(), ConfigError> {
        if self.directives.max_include_depth == 0 {
            return Err(ConfigError::Validation(
                "directives.max_include_depth must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_toc(&self) -> Result<(), ConfigError> {
        require_range(self.toc.min_level, 1..=6, "toc.min_level")?;
        require_range(self.toc.max_level, 1..=6, "toc.max_level")?;
        if self.toc.min_level > self.toc.max_level {
            return Err(ConfigError::Validation(
                "toc.min_level cannot exceed toc.max_level".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.markdown.escape);
        assert!(!config.markdown.hard_wrap);
        assert_eq!(config.markdown.renderer, RendererKind::Html);
        assert!(config.markdown.plugins.is_empty());
        assert_eq!(config.markdown.max_nested_level, 6);
        assert_eq!(config.directives.style, DirectiveStyle::Rst);
        assert_eq!(config.directives.max_include_depth, 10);
        assert_eq!((config.toc.min_level, config.toc.max_level), (1, 3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.markdown.max_nested_level, 6);
        assert!(config.directives.enabled.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[markdown]
escape = true
hard_wrap = true
renderer = "ast"
plugins = ["math", "footnotes"]
max_nested_level = 4

[directives]
style = "fenced"
enabled = ["admonition", "toc"]
max_include_depth = 3

[toc]
min_level = 2
max_level = 4
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.markdown.escape);
        assert!(config.markdown.hard_wrap);
        assert_eq!(config.markdown.renderer, RendererKind::Ast);
        assert_eq!(config.markdown.plugins, ["math", "footnotes"]);
        assert_eq!(config.markdown.max_nested_level, 4);
        assert_eq!(config.directives.style, DirectiveStyle::Fenced);
        assert!(config.directives.is_enabled(DirectiveKind::Toc));
        assert!(!config.directives.is_enabled(DirectiveKind::Include));
        assert_eq!(config.directives.max_include_depth, 3);
        assert_eq!((config.toc.min_level, config.toc.max_level), (2, 4));
    }

    #[test]
    fn test_unknown_values_are_parse_errors() {
        assert!(toml::from_str::<Config>("[markdown]\nrenderer = \"latex\"\n").is_err());
        assert!(toml::from_str::<Config>("[directives]\nenabled = [\"tabs\"]\n").is_err());
        assert!(toml::from_str::<Config>("[server]\nport = 1\n").is_err());
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        config.markdown.plugins = vec!["math".to_owned()];
        config.apply_cli_settings(&CliSettings {
            escape: Some(true),
            hard_wrap: None,
            renderer: Some(RendererKind::Ast),
            plugins: Some(vec!["abbr".to_owned()]),
        });
        assert!(config.markdown.escape);
        assert!(!config.markdown.hard_wrap);
        assert_eq!(config.markdown.renderer, RendererKind::Ast);
        assert_eq!(config.markdown.plugins, ["abbr"]);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.markdown.plugins = vec!["math".to_owned()];
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.markdown.plugins, ["math"]);
        assert_eq!(config.markdown.renderer, RendererKind::Html);
    }

    #[test]
    fn test_validate_max_nested_level() {
        let mut config = Config::default();
        config.markdown.max_nested_level = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.markdown.max_nested_level = 33;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.markdown.max_nested_level = 32;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_toc_levels() {
        let mut config = Config::default();
        config.toc.max_level = 7;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: toc.max_level must be between 1 and 6, got 7"
        );

        config.toc = TocConfig {
            min_level: 4,
            max_level: 2,
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_include_depth_and_plugins() {
        let mut config = Config::default();
        config.directives.max_include_depth = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.markdown.plugins = vec![" ".to_owned()];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[markdown]\nplugins = [\"mark\"]\n").unwrap();

        let settings = CliSettings {
            hard_wrap: Some(true),
            ..CliSettings::default()
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(config.markdown.plugins, ["mark"]);
        assert!(config.markdown.hard_wrap);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load(Some(&path), None),
            Err(ConfigError::NotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rwmd.toml");
        std::fs::write(&path, "[toc]\nmin_level = 0\n").unwrap();
        assert!(matches!(
            Config::load(Some(&path), None),
            Err(ConfigError::Validation(_))
        ));

        std::fs::write(&path, "[markdown\n").unwrap();
        assert!(matches!(Config::load(Some(&path), None), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_discover_from_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(
            Config::discover_from(&nested),
            Some(dir.path().join(CONFIG_FILENAME))
        );
    }
}
