//! HTML render methods.

use super::{Renderer, attr_bool, attr_int, attr_str};
use crate::token::{Attrs, TocEntry};
use crate::util::{escape, safe_entity, striptags};

/// Install the HTML methods for every core, directive and error token.
pub(super) fn install(r: &mut Renderer) {
    // Inline level
    r.register("text", |r, text, _| r.escape_text(text));
    r.register("emphasis", |_, text, _| format!("<em>{text}</em>"));
    r.register("strong", |_, text, _| format!("<strong>{text}</strong>"));
    r.register("codespan", |r, text, _| {
        format!("<code>{}</code>", escape(text, r.options().escape_quotes))
    });
    r.register("linebreak", |_, _, _| "<br />\n".to_owned());
    r.register("softbreak", |_, _, _| "\n".to_owned());
    r.register("inline_html", |r, text, _| {
        if r.options().escape {
            escape(text, true)
        } else {
            text.to_owned()
        }
    });
    r.register("link", render_link);
    r.register("image", render_image);

    // Block level
    r.register("paragraph", |_, text, _| format!("<p>{text}</p>\n"));
    r.register("block_text", |_, text, _| text.to_owned());
    r.register("blank_line", |_, _, _| String::new());
    r.register("heading", render_heading);
    r.register("thematic_break", |_, _, _| "<hr />\n".to_owned());
    r.register("block_code", render_block_code);
    r.register("block_quote", |_, text, _| {
        format!("<blockquote>\n{text}</blockquote>\n")
    });
    r.register("block_html", |r, text, _| {
        if r.options().escape {
            format!("<p>{}</p>\n", escape(text.trim(), true))
        } else {
            format!("{text}\n")
        }
    });
    r.register("block_error", |_, text, _| {
        format!("<div class=\"error\"><pre>{}</pre></div>\n", escape(text, true))
    });
    r.register("list", render_list);
    r.register("list_item", |_, text, _| format!("<li>{text}</li>\n"));

    // Directives
    r.register("admonition", |_, text, attrs| {
        let name = attr_str(attrs, "name").unwrap_or("note");
        let class = match attr_str(attrs, "class") {
            Some(extra) => format!("{name} {}", escape(extra, true)),
            None => name.to_owned(),
        };
        format!("<section class=\"admonition {class}\">\n{text}</section>\n")
    });
    r.register("admonition_title", |_, text, _| {
        format!("<p class=\"admonition-title\">{text}</p>\n")
    });
    r.register("admonition_content", |_, text, _| text.to_owned());
    r.register("toc", render_toc);
    r.register("include", |_, text, _| {
        format!("<pre class=\"directive-include\">\n{}</pre>\n", escape(text, true))
    });
}

fn title_attr(attrs: &Attrs) -> String {
    match attr_str(attrs, "title") {
        Some(title) => format!(" title=\"{}\"", safe_entity(title)),
        None => String::new(),
    }
}

fn render_link(r: &Renderer, text: &str, attrs: &Attrs) -> String {
    let href = r.safe_url(attr_str(attrs, "url").unwrap_or_default());
    format!("<a href=\"{href}\"{}>{text}</a>", title_attr(attrs))
}

fn render_image(r: &Renderer, text: &str, attrs: &Attrs) -> String {
    let src = r.safe_url(attr_str(attrs, "url").unwrap_or_default());
    let alt = safe_entity(&striptags(text));
    format!("<img src=\"{src}\" alt=\"{alt}\"{} />", title_attr(attrs))
}

fn render_heading(_: &Renderer, text: &str, attrs: &Attrs) -> String {
    let level = attr_int(attrs, "level").unwrap_or(1).clamp(1, 6);
    let id = match attr_str(attrs, "id") {
        Some(id) => format!(" id=\"{}\"", escape(id, true)),
        None => String::new(),
    };
    format!("<h{level}{id}>{text}</h{level}>\n")
}

fn render_block_code(_: &Renderer, code: &str, attrs: &Attrs) -> String {
    let class = attr_str(attrs, "info")
        .and_then(|info| info.split_whitespace().next())
        .map(|lang| format!(" class=\"language-{}\"", escape(lang, true)))
        .unwrap_or_default();
    format!("<pre><code{class}>{}</code></pre>\n", escape(code, true))
}

fn render_list(_: &Renderer, text: &str, attrs: &Attrs) -> String {
    if attr_bool(attrs, "ordered") {
        let start = match attr_int(attrs, "start") {
            Some(n) if n != 1 => format!(" start=\"{n}\""),
            _ => String::new(),
        };
        format!("<ol{start}>\n{text}</ol>\n")
    } else {
        format!("<ul>\n{text}</ul>\n")
    }
}

fn render_toc(_: &Renderer, _: &str, attrs: &Attrs) -> String {
    let title = match attr_str(attrs, "title") {
        Some(title) if !title.trim().is_empty() => escape(title.trim(), true),
        _ => "Table of Contents".to_owned(),
    };
    let entries = attrs
        .get("toc")
        .and_then(|v| v.as_toc())
        .unwrap_or_default();
    let open = if attr_bool(attrs, "collapse") { "" } else { " open" };
    format!(
        "<details class=\"toc\"{open}>\n<summary>{title}</summary>\n{}</details>\n",
        render_toc_list(entries)
    )
}

/// Render table of contents entries as nested `<ul>` lists.
///
/// A deeper entry opens a list inside the current item; a shallower one
/// closes lists until a level at or above it is reached.
#[must_use]
pub fn render_toc_list(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut out = String::from("<ul>\n");
    let mut levels: Vec<u8> = Vec::new();
    for entry in entries {
        let item = format!(
            "<a href=\"#{}\">{}</a>",
            escape(&entry.id, true),
            escape(&entry.title, true)
        );
        let Some(&last) = levels.last() else {
            out.push_str("<li>");
            out.push_str(&item);
            levels.push(entry.level);
            continue;
        };

        if entry.level == last {
            out.push_str("</li>\n<li>");
        } else if entry.level > last {
            out.push_str("\n<ul>\n<li>");
            levels.push(entry.level);
        } else {
            levels.pop();
            loop {
                match levels.pop() {
                    Some(outer) if entry.level == outer => {
                        out.push_str("</li>\n</ul>\n</li>\n<li>");
                        levels.push(outer);
                        break;
                    }
                    Some(outer) if entry.level > outer => {
                        out.push_str("</li>\n<li>");
                        levels.push(outer);
                        levels.push(entry.level);
                        break;
                    }
                    Some(_) => out.push_str("</li>\n</ul>\n"),
                    None => {
                        out.push_str("</li>\n<li>");
                        levels.push(entry.level);
                        break;
                    }
                }
            }
        }
        out.push_str(&item);
    }

    while levels.len() > 1 {
        out.push_str("</li>\n</ul>\n");
        levels.pop();
    }
    out.push_str("</li>\n</ul>\n");
    out
}
