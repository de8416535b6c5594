//! Colored terminal output utilities.

use std::path::Path;

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    red: Style,
    dim: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            red: Style::new().red(),
            dim: Style::new().dim(),
        }
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Report a rendered document written to `path`.
    pub(crate) fn written(&self, path: &Path, renderer: &str, bytes: usize) {
        let line = format!(
            "{} {}",
            self.green.apply_to(format!("Wrote {}", path.display())),
            self.dim.apply_to(written_detail(renderer, bytes)),
        );
        let _ = self.term.write_line(&line);
    }
}

fn written_detail(renderer: &str, bytes: usize) -> String {
    let unit = if bytes == 1 { "byte" } else { "bytes" };
    format!("({renderer}, {bytes} {unit})")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_written_detail() {
        assert_eq!(written_detail("html", 42), "(html, 42 bytes)");
        assert_eq!(written_detail("ast", 1), "(ast, 1 byte)");
    }
}
