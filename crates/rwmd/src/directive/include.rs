//! `include` directive: splice another file into the document.

use std::path::Path;
use std::sync::Arc;

use super::{Directive, DirectiveArgs, DirectiveError};
use crate::block::BlockParser;
use crate::error::Error;
use crate::markdown::preprocess;
use crate::state::{BlockState, Env};
use crate::token::Token;

/// Default limit for nested includes.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 10;

/// File reading callback.
pub type ReadFile = Arc<dyn Fn(&Path) -> std::io::Result<String> + Send + Sync>;

/// Include a file relative to the current document.
///
/// Markdown files (`.md`, `.markdown`, `.mkd`) are parsed as blocks in their
/// own environment and their definitions merged into the current one. HTML
/// files become `block_html`; anything else an `include` token carrying the
/// raw text.
#[derive(Clone)]
pub struct Include {
    max_depth: usize,
    read_file: ReadFile,
}

impl std::fmt::Debug for Include {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Include")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Default for Include {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            read_file: Arc::new(|path: &Path| std::fs::read_to_string(path)),
        }
    }
}

impl Include {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace the file reading callback.
    #[must_use]
    pub fn with_read_file<F>(mut self, read_file: F) -> Self
    where
        F: Fn(&Path) -> std::io::Result<String> + Send + Sync + 'static,
    {
        self.read_file = Arc::new(read_file);
        self
    }
}

impl Directive for Include {
    fn names(&self) -> Vec<&'static str> {
        vec!["include"]
    }

    fn parse(
        &self,
        block: &BlockParser,
        args: &DirectiveArgs,
        state: &mut BlockState<'_>,
    ) -> Result<Vec<Token>, DirectiveError> {
        let relpath = args.title.trim();
        if relpath.is_empty() {
            return Err(DirectiveError::Invalid("Missing include path".to_owned()));
        }
        let Some(source) = state.env.file.clone() else {
            return Err(DirectiveError::MissingSource);
        };
        if state.env.include_depth >= self.max_depth {
            return Err(DirectiveError::DepthExceeded(self.max_depth));
        }

        let path = source.parent().unwrap_or(Path::new("")).join(relpath);
        if is_same_file(&path, &source) {
            return Err(DirectiveError::SelfInclude(relpath.to_owned()));
        }

        let text = match (self.read_file)(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DirectiveError::NotFound(relpath.to_owned()));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read included file");
                state.env.errors.push(Error::Include { path, source: e });
                return Ok(Vec::new());
            }
        };
        tracing::debug!(path = %path.display(), depth = state.env.include_depth + 1, "Including file");

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let token = match extension.as_deref() {
            Some("md" | "markdown" | "mkd") => {
                let mut env = Env::with_file(path);
                env.include_depth = state.env.include_depth + 1;
                let tokens = {
                    let mut child = BlockState::new(preprocess(&text), &mut env);
                    block.parse(&mut child, block.rules());
                    child.tokens
                };
                state.env.merge_definitions(&mut env);
                return Ok(tokens);
            }
            Some("html" | "xhtml" | "htm") => {
                Token::raw("block_html", text.trim_end_matches('\n'))
            }
            _ => Token::raw("include", text).with_attr("filepath", path.display().to_string()),
        };
        Ok(vec![token])
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
