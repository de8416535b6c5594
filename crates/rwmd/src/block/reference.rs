//! Link reference definitions: `[label]: /url "title"`.

use std::sync::LazyLock;

use regex::Regex;

use super::{BLANK_LINE, BlockParser};
use crate::helpers::{parse_link_href, parse_link_title};
use crate::scanner::ScanMatch;
use crate::state::{BlockState, LinkRef};
use crate::util::{escape_url, normalize_label, safe_entity, unescape_char};

static LINE_REST_BLANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[ \t]*(?:\n|\z)").unwrap());

pub(super) fn parse_ref_link(
    _: &BlockParser,
    m: &ScanMatch,
    state: &mut BlockState<'_>,
) -> Option<usize> {
    // A definition cannot interrupt a paragraph.
    if state.in_paragraph() {
        return None;
    }

    let src = state.src.as_str();
    let label = m.group(src, "reflink_1")?;
    let key = normalize_label(label);
    if key.is_empty() {
        return None;
    }

    let (href, href_pos) = parse_link_href(src, m.end(), true)?;
    let max_pos = BLANK_LINE
        .find_at(src, href_pos)
        .map_or(state.cursor_max, |b| b.start());

    let mut title = parse_link_title(src, href_pos, max_pos);
    let mut end = None;
    if let Some((_, title_pos)) = &title {
        match LINE_REST_BLANK.find(&src[*title_pos..]) {
            Some(rest) => end = Some(title_pos + rest.end()),
            None => title = None,
        }
    }
    let end = match end {
        Some(end) => end,
        None => href_pos + LINE_REST_BLANK.find(&src[href_pos..])?.end(),
    };

    if !state.env.ref_links.contains_key(&key) {
        let link = LinkRef {
            url: escape_url(&unescape_char(href)),
            title: title.map(|(t, _)| safe_entity(&t)),
            label: label.to_owned(),
        };
        state.env.ref_links.insert(key, link);
    }
    Some(end)
}
