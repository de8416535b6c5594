//! Built-in syntax plugins.
//!
//! A plugin is anything implementing [`Plugin`]: it registers parser rules,
//! render methods and hooks on a [`Markdown`] instance. Plain functions
//! `fn(&mut Markdown) -> Result<(), Error>` are plugins too.

mod abbr;
mod footnotes;
mod formatting;
mod math;
mod ruby;

pub use abbr::abbr;
pub use footnotes::footnotes;
pub use formatting::{insert, mark, strikethrough, subscript, superscript};
pub use math::math;
pub use ruby::ruby;

use crate::error::Error;
use crate::markdown::Markdown;

/// Extension applied to a [`Markdown`] instance at construction time.
pub trait Plugin {
    /// Register rules, render methods and hooks.
    ///
    /// # Errors
    ///
    /// Returns an error when a rule cannot be registered.
    fn apply(&self, md: &mut Markdown) -> Result<(), Error>;
}

impl<F> Plugin for F
where
    F: Fn(&mut Markdown) -> Result<(), Error>,
{
    fn apply(&self, md: &mut Markdown) -> Result<(), Error> {
        self(md)
    }
}

/// Plugin function type of the built-ins.
pub type PluginFn = fn(&mut Markdown) -> Result<(), Error>;

/// Names accepted by [`builtin`].
pub const BUILTIN_PLUGINS: &[&str] = &[
    "strikethrough",
    "mark",
    "insert",
    "superscript",
    "subscript",
    "footnotes",
    "abbr",
    "ruby",
    "math",
];

/// Look up a built-in plugin by name.
///
/// # Errors
///
/// Returns [`Error::UnknownPlugin`] for names not in [`BUILTIN_PLUGINS`].
pub fn builtin(name: &str) -> Result<PluginFn, Error> {
    let plugin: PluginFn = match name {
        "strikethrough" => strikethrough,
        "mark" => mark,
        "insert" => insert,
        "superscript" => superscript,
        "subscript" => subscript,
        "footnotes" => footnotes,
        "abbr" => abbr,
        "ruby" => ruby,
        "math" => math,
        _ => return Err(Error::UnknownPlugin(name.to_owned())),
    };
    Ok(plugin)
}

/// Register a render method when the instance has a renderer.
pub(crate) fn register_render<F>(md: &mut Markdown, kind: &str, method: F)
where
    F: Fn(&crate::renderer::Renderer, &str, &crate::token::Attrs) -> String + Send + Sync + 'static,
{
    if let Some(renderer) = md.renderer.as_mut() {
        renderer.register(kind, method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        for name in BUILTIN_PLUGINS {
            assert!(builtin(name).is_ok(), "{name}");
        }
        assert!(matches!(builtin("tables"), Err(Error::UnknownPlugin(name)) if name == "tables"));
    }

    #[test]
    fn test_every_builtin_applies_together() {
        let mut md = Markdown::builder().build().unwrap();
        for name in BUILTIN_PLUGINS {
            builtin(name).unwrap().apply(&mut md).unwrap();
        }
        assert!(md.inline.rules().iter().any(|r| r == "footnote"));
        assert!(md.block.rules().iter().any(|r| r == "block_math"));
    }
}
