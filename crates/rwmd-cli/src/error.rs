//! CLI error types.

use rwmd_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Markdown(#[from] rwmd::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("No input: pass --message, --file or pipe markdown on stdin")]
    MissingInput,
}
