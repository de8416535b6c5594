//! rwmd CLI - render markdown to HTML or a token tree.
//!
//! Input comes from `--message`, `--file` or stdin, in that order. Settings
//! come from `rwmd.toml` (auto-discovered) with flags taking precedence.

mod error;
mod output;
mod render;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use output::Output;
use render::RenderArgs;

/// rwmd - Markdown renderer.
#[derive(Parser)]
#[command(name = "rwmd", version, about)]
struct Cli {
    #[command(flatten)]
    args: RenderArgs,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli.args.execute() {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
