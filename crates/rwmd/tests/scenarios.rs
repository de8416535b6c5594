//! End-to-end rendering scenarios through the public API.

use pretty_assertions::assert_eq;
use rwmd::directive::{Admonition, RstDirective, TableOfContents};
use rwmd::util::{escape_url, normalize_label};
use rwmd::{Markdown, create_markdown};

fn render(src: &str) -> String {
    Markdown::builder().build().unwrap().parse(src).unwrap()
}

#[test]
fn test_heading() {
    assert_eq!(render("# hello"), "<h1>hello</h1>\n");
}

#[test]
fn test_emphasis_levels() {
    assert_eq!(
        render("*a* **b** ***c***"),
        "<p><em>a</em> <strong>b</strong> <em><strong>c</strong></em></p>\n"
    );
}

#[test]
fn test_fenced_code_with_info() {
    assert_eq!(
        render("```py\nx=1\n```\n"),
        "<pre><code class=\"language-py\">x=1\n</code></pre>\n"
    );
}

#[test]
fn test_shortcut_reference() {
    assert_eq!(render("[x]: /u\n[x]\n"), "<p><a href=\"/u\">x</a></p>\n");
}

#[test]
fn test_block_quote() {
    assert_eq!(
        render("> a\n> b\n"),
        "<blockquote>\n<p>a\nb</p>\n</blockquote>\n"
    );
}

#[test]
fn test_tight_list() {
    assert_eq!(
        render("- a\n- b\n"),
        "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"
    );
}

#[test]
fn test_harmful_link() {
    assert_eq!(
        render("[x](javascript:alert)"),
        "<p><a href=\"#harmful-link\">x</a></p>\n"
    );
    assert_eq!(
        render("![i](data:image/png;base64,AA)"),
        "<p><img src=\"data:image/png;base64,AA\" alt=\"i\" /></p>\n"
    );
}

#[test]
fn test_empty_input() {
    assert_eq!(render(""), "");
}

#[test]
fn test_missing_trailing_newline() {
    for src in ["> a", "- a\n- b", "```\ncode\n```", "para *x*"] {
        assert_eq!(render(src), render(&format!("{src}\n")), "{src:?}");
    }
}

#[test]
fn test_unterminated_fence_runs_to_end() {
    assert_eq!(
        render("```\na\n\nb"),
        "<pre><code>a\n\nb\n</code></pre>\n"
    );
}

#[test]
fn test_empty_item_does_not_interrupt_paragraph() {
    assert_eq!(render("text\n*\n"), "<p>text\n*</p>\n");
}

#[test]
fn test_label_and_url_normalization_are_idempotent() {
    for label in ["  Foo   Bar ", "ẞ straße", "İ"] {
        let once = normalize_label(label);
        assert_eq!(normalize_label(&once), once);
    }
    for url in ["/a b", "/%20x", "/ü?q=a&b"] {
        let once = escape_url(url);
        assert_eq!(escape_url(&once), once);
    }
}

#[test]
fn test_trailing_blank_line_keeps_list_tight() {
    assert_eq!(
        render("- a\n- b\n\nafter\n"),
        "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<p>after</p>\n"
    );
}

#[test]
fn test_loose_list() {
    assert_eq!(
        render("- a\n\n- b\n"),
        "<ul>\n<li><p>a</p>\n</li>\n<li><p>b</p>\n</li>\n</ul>\n"
    );
}

#[test]
fn test_ordered_list_starting_at_zero() {
    assert_eq!(render("0. a\n"), "<ol start=\"0\">\n<li>a</li>\n</ol>\n");
}

#[test]
fn test_link_wins_over_open_emphasis() {
    assert_eq!(render("*a [b*](/u)"), "<p>*a <a href=\"/u\">b*</a></p>\n");
}

#[test]
fn test_inner_link_wins() {
    assert_eq!(
        render("[a [b](/x)](/y)"),
        "<p>[a <a href=\"/x\">b</a>](/y)</p>\n"
    );
}

#[test]
fn test_plugins_and_directives_together() {
    let md = Markdown::builder()
        .escape(false)
        .plugin(rwmd::plugins::footnotes)
        .plugin(rwmd::plugins::strikethrough)
        .plugin(
            RstDirective::new()
                .with(Admonition::default())
                .with(TableOfContents::default()),
        )
        .build()
        .unwrap();

    let html = md
        .parse("# Intro\n\n.. note:: Heads up\n\n   ~~old~~ text[^1]\n\n[^1]: Source.\n")
        .unwrap();
    assert_eq!(
        html,
        "<h1 id=\"intro\">Intro</h1>\n\
         <section class=\"admonition note\">\n\
         <p class=\"admonition-title\">Heads up</p>\n\
         <p><del>old</del> text<sup class=\"footnote-ref\" id=\"fnref-1\"><a href=\"#fn-1\">1</a></sup></p>\n\
         </section>\n\
         <section class=\"footnotes\">\n<ol>\n\
         <li id=\"fn-1\"><p>Source.<a href=\"#fnref-1\" class=\"footnote\">&#8617;</a></p></li>\n\
         </ol>\n</section>\n"
    );
}

#[test]
fn test_create_markdown_by_name() {
    let md = create_markdown(false, true, "html", &["mark", "insert"]).unwrap();
    assert_eq!(
        md.parse("==a==\n^^b^^").unwrap(),
        "<p><mark>a</mark><br />\n<ins>b</ins></p>\n"
    );
}

#[test]
fn test_deep_alternating_containers_render() {
    let html = render(&format!("{}a", "> - ".repeat(500)));
    let opened = html.matches("<blockquote>").count() + html.matches("<ul>").count();
    assert_eq!(opened, 6);
    assert!(html.ends_with("</blockquote>\n"));
}
