//! Ordered and unordered lists.
//!
//! Items are collected line by line. A line indented at least to the item's
//! content column continues the item; a sibling marker starts the next item;
//! any other block that can interrupt a paragraph ends the list. Tightness is
//! decided after the item contents are parsed.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::BlockParser;
use crate::scanner::{ScanMatch, Scanner};
use crate::state::{BlockState, Container};
use crate::token::{Content, Token};
use crate::util::{expand_leading_tab, expand_tab};

static LEADING_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A(\s*)\S").unwrap());

static BLANK_LINE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t\v\f]*\n").unwrap());

/// Rules that can end a list item, besides a sibling item.
const ITEM_BREAK_RULES: &[&str] = &[
    "thematic_break",
    "fenced_code",
    "axt_heading",
    "block_quote",
    "block_html",
    "list",
];

/// Marker and first-line text of a list item.
struct ItemStart {
    spaces: usize,
    marker: String,
    text: String,
}

#[derive(Default)]
struct ListBuilder {
    items: Vec<Token>,
    loose: bool,
    /// Index where the list belongs when a following block was already appended.
    insert_at: Option<usize>,
    end_pos: Option<usize>,
}

pub(super) fn parse_list(
    parser: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    let first = {
        let src = state.src.as_str();
        ItemStart {
            spaces: m.group(src, "list_1").unwrap_or_default().len(),
            marker: m.group(src, "list_2")?.to_owned(),
            text: m.group(src, "list_3").unwrap_or_default().to_owned(),
        }
    };

    // An empty item cannot interrupt a paragraph.
    if first.text.trim().is_empty()
        && let Some(end) = state.append_paragraph()
    {
        return Some(end);
    }

    let ordered = first.marker.len() > 1;
    let depth = state.depth();
    let mut token = Token::new("list")
        .with_attr("depth", depth)
        .with_attr("ordered", ordered);
    if ordered {
        let start: i64 = first.marker[..first.marker.len() - 1].parse().ok()?;
        if start != 1 {
            // Only a list starting at 1 may interrupt a paragraph.
            if let Some(end) = state.append_paragraph() {
                return Some(end);
            }
            token.set_attr("start", start);
        }
    }

    state.cursor = (m.end() + 1).min(state.cursor_max);
    let rules = parser.nested_rules(parser.list_rules(), "list", depth);
    let bullet = bullet_pattern(first.marker.chars().last()?);

    let mut list = ListBuilder::default();
    let mut next = Some(first);
    while let Some(item) = next.take() {
        next = parse_list_item(parser, state, &mut list, &rules, bullet, item);
    }

    let tight = !list.loose;
    if tight {
        for item in &mut list.items {
            for child in item.child_tokens_mut().into_iter().flatten() {
                if child.kind == "paragraph" {
                    child.kind = "block_text";
                }
            }
        }
    }
    token.set_attr("tight", tight);
    token.content = Content::Children(list.items);

    match (list.insert_at, list.end_pos) {
        (Some(index), Some(end)) => {
            let index = index.min(state.tokens.len());
            state.tokens.insert(index, token);
            Some(end)
        }
        _ => {
            state.append_token(token);
            Some(state.cursor)
        }
    }
}

fn bullet_pattern(last: char) -> &'static str {
    match last {
        '.' => r"\d{0,9}\.",
        ')' => r"\d{0,9}\)",
        '*' => r"\*",
        '+' => r"\+",
        _ => "-",
    }
}

/// Parse one item, returning the start of the next sibling item if any.
fn parse_list_item(
    parser: &BlockParser,
    state: &mut BlockState<'_>,
    list: &mut ListBuilder,
    rules: &[String],
    bullet: &str,
    item: ItemStart,
) -> Option<ItemStart> {
    let leading_width = item.spaces + item.marker.len();
    let (mut text, continue_width) = compile_continue_width(&item.text, leading_width);
    let continue_space = " ".repeat(continue_width);
    let sc = item_scanner(parser, bullet, leading_width);

    let mut src = String::new();
    let mut next = None;
    let mut prev_blank = false;
    while state.cursor < state.cursor_max {
        let pos = state.find_line_end();
        let line = state.get_text(pos).to_owned();
        if BLANK_LINE_START.is_match(&line) {
            src.push('\n');
            prev_blank = true;
            state.cursor = pos;
            continue;
        }

        let line = expand_leading_tab(&line, 4).into_owned();
        if line.starts_with(&continue_space) {
            // An item can begin with at most one blank line.
            if prev_blank && text.is_empty() && src.trim().is_empty() {
                break;
            }
            src.push_str(&line);
            prev_blank = false;
            state.cursor = pos;
            continue;
        }

        if let Some(m) = sc.match_at(&state.src, state.cursor) {
            match m.rule() {
                "list_item" => {
                    if prev_blank {
                        list.loose = true;
                    }
                    let group = |name| m.group(&state.src, name).unwrap_or_default();
                    next = Some(ItemStart {
                        spaces: group("listitem_1").len(),
                        marker: group("listitem_2").to_owned(),
                        text: group("listitem_3").to_owned(),
                    });
                    state.cursor = (m.end() + 1).min(state.cursor_max);
                    break;
                }
                "list" => break,
                _ => {
                    let insert_at = state.tokens.len();
                    if let Some(end) = parser.parse_method(&m, state) {
                        list.insert_at = Some(insert_at);
                        list.end_pos = Some(end);
                        break;
                    }
                }
            }
        }

        if prev_blank {
            break;
        }
        // Lazy continuation.
        src.push_str(&line);
        state.cursor = pos;
    }

    text.push_str(&clean_item_text(&src, continue_width));
    // Trailing blank lines belong to whatever follows the item.
    let content_len = text.trim_end_matches('\n').len();
    text.truncate(content_len);
    if !text.is_empty() {
        text.push('\n');
    }

    let children = {
        let mut child = state.child_state(text, Some(Container::List));
        parser.parse(&mut child, rules);
        child.tokens
    };
    if is_loose(&children) {
        list.loose = true;
    }
    list.items.push(Token::children("list_item", children));
    next
}

/// First-line text of an item and the column its content starts at.
fn compile_continue_width(text: &str, leading_width: usize) -> (String, usize) {
    let text = expand_leading_tab(text, 3);
    let text = expand_tab(&text);
    match LEADING_SPACE.captures(&text) {
        Some(caps) => {
            // Five or more spaces: the content is indented code one column in.
            let space_width = if text.starts_with("     ") {
                1
            } else {
                caps.get(1).map_or(0, |g| g.len())
            };
            (format!("{}\n", &text[space_width..]), leading_width + space_width)
        }
        None => (String::new(), leading_width + 1),
    }
}

/// Scanner for the lines following an item: sibling markers plus the rules
/// that may end the item, with indentation limited to the item's marker.
fn item_scanner(parser: &BlockParser, bullet: &str, leading_width: usize) -> Arc<Scanner> {
    let item_pattern = format!(
        r"^(?P<listitem_1> {{0,{w}}})(?P<listitem_2>{bullet})(?P<listitem_3>[ \t]*|[ \t][^\n]+)$",
        w = leading_width.min(3)
    );
    let mut pairs: Vec<(&str, String)> = ITEM_BREAK_RULES
        .iter()
        .filter_map(|name| parser.pattern(name).map(|p| (*name, p.to_owned())))
        .collect();
    if leading_width < 3 {
        let limit = format!("{{0,{leading_width}}}");
        for (_, pattern) in &mut pairs {
            *pattern = pattern.replacen("{0,3}", &limit, 1);
        }
    }
    pairs.insert(1.min(pairs.len()), ("list_item", item_pattern));

    let pairs: Vec<(&str, &str)> = pairs.iter().map(|(n, p)| (*n, p.as_str())).collect();
    parser.compile_pairs(&pairs)
}

/// Remove the item indentation from continuation lines.
fn clean_item_text(src: &str, continue_width: usize) -> String {
    let prefix = " ".repeat(continue_width);
    let text: String = src
        .split_inclusive('\n')
        .map(|line| line.strip_prefix(prefix.as_str()).unwrap_or(line))
        .collect();
    expand_tab(&text).into_owned()
}

fn is_loose(tokens: &[Token]) -> bool {
    let mut paragraphs = 0;
    for token in tokens {
        match token.kind {
            "blank_line" => return true,
            "paragraph" => {
                paragraphs += 1;
                if paragraphs > 1 {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
