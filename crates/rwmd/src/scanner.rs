//! Combined-alternation scanner over named rule patterns.
//!
//! A [`Scanner`] joins an ordered list of `(name, pattern)` pairs into a single
//! regex `(?P<n1>p1)|(?P<n2>p2)|…`. Searching returns the leftmost hit; when
//! several rules match at the same position the earlier-registered one wins.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use regex::{Captures, Regex};

use crate::error::Error;

/// A compiled alternation of named rule patterns.
#[derive(Debug, Default)]
pub struct Scanner {
    regex: Option<Regex>,
    anchored: Option<Regex>,
    rules: Vec<String>,
}

/// A scanner hit: the winning rule plus the offsets of every participating named group.
///
/// Offsets are byte positions into the source that was scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanMatch {
    rule: String,
    start: usize,
    end: usize,
    groups: HashMap<String, (usize, usize)>,
}

impl ScanMatch {
    /// Name of the rule whose alternative matched.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Start offset of the whole match.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// End offset of the whole match.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Matched text.
    #[must_use]
    pub fn as_str<'s>(&self, src: &'s str) -> &'s str {
        &src[self.start..self.end]
    }

    /// Text of a named group, `None` if the group did not participate.
    #[must_use]
    pub fn group<'s>(&self, src: &'s str, name: &str) -> Option<&'s str> {
        self.groups.get(name).map(|&(s, e)| &src[s..e])
    }

    /// Offsets of a named group.
    #[must_use]
    pub fn group_range(&self, name: &str) -> Option<(usize, usize)> {
        self.groups.get(name).copied()
    }
}

impl Scanner {
    /// Compile `pairs` into a combined scanner.
    ///
    /// With `multiline` set, `^` and `$` match at line boundaries (block rules).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`] if a pattern is invalid or two rules declare
    /// the same group name.
    pub fn new<N: AsRef<str>, P: AsRef<str>>(
        pairs: &[(N, P)],
        multiline: bool,
    ) -> Result<Self, Error> {
        if pairs.is_empty() {
            return Ok(Self::default());
        }

        let body = pairs
            .iter()
            .map(|(name, pattern)| format!("(?P<{}>{})", name.as_ref(), pattern.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let flags = if multiline { "(?m)" } else { "" };
        let name = pairs
            .iter()
            .map(|(name, _)| name.as_ref())
            .collect::<Vec<_>>()
            .join("|");

        let regex = Regex::new(&format!("{flags}{body}")).map_err(|source| Error::Pattern {
            name: name.clone(),
            source,
        })?;
        let anchored = Regex::new(&format!(r"{flags}\A(?:{body})"))
            .map_err(|source| Error::Pattern { name, source })?;

        Ok(Self {
            regex: Some(regex),
            anchored: Some(anchored),
            rules: pairs.iter().map(|(n, _)| n.as_ref().to_owned()).collect(),
        })
    }

    /// Rule names in priority order.
    #[must_use]
    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Earliest match at or after `pos`.
    #[must_use]
    pub fn search(&self, src: &str, pos: usize) -> Option<ScanMatch> {
        self.search_range(src, pos, src.len())
    }

    /// Earliest match at or after `pos` that ends no later than `end`.
    ///
    /// `end` behaves as the end of input, so `$` matches there.
    #[must_use]
    pub fn search_range(&self, src: &str, pos: usize, end: usize) -> Option<ScanMatch> {
        let regex = self.regex.as_ref()?;
        let end = end.min(src.len());
        if pos > end || !src.is_char_boundary(pos) || !src.is_char_boundary(end) {
            return None;
        }
        let caps = regex.captures_at(&src[..end], pos)?;
        self.to_match(regex, &caps, 0)
    }

    /// Match anchored at `pos`.
    ///
    /// The source is sliced at `pos`, so `^` always holds there. Callers only
    /// anchor at line starts or at positions where no rule looks behind.
    #[must_use]
    pub fn match_at(&self, src: &str, pos: usize) -> Option<ScanMatch> {
        let regex = self.anchored.as_ref()?;
        if pos > src.len() || !src.is_char_boundary(pos) {
            return None;
        }
        let caps = regex.captures(&src[pos..])?;
        self.to_match(regex, &caps, pos)
    }

    fn to_match(&self, regex: &Regex, caps: &Captures<'_>, offset: usize) -> Option<ScanMatch> {
        let whole = caps.get(0)?;
        let rule = self.rules.iter().find(|r| caps.name(r).is_some())?.clone();
        let groups = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_owned(), (m.start() + offset, m.end() + offset)))
            })
            .collect();
        Some(ScanMatch {
            rule,
            start: whole.start() + offset,
            end: whole.end() + offset,
            groups,
        })
    }
}

/// Content-addressed cache of compiled scanners.
///
/// Keys are built from the `(name, pattern)` pairs, so identical rule sets
/// share one compiled scanner across parses and threads.
#[derive(Debug, Default)]
pub(crate) struct ScannerCache {
    multiline: bool,
    scanners: RwLock<HashMap<String, Arc<Scanner>>>,
}

impl ScannerCache {
    pub(crate) fn new(multiline: bool) -> Self {
        Self {
            multiline,
            scanners: RwLock::default(),
        }
    }

    pub(crate) fn multiline(&self) -> bool {
        self.multiline
    }

    /// Fetch the scanner for `pairs`, compiling it on first use.
    ///
    /// A combination that fails to compile is logged and replaced by a scanner
    /// that never matches; registration validates rules up front so this only
    /// happens for ad-hoc pattern sets.
    pub(crate) fn get_or_compile(&self, pairs: &[(&str, &str)]) -> Arc<Scanner> {
        let key = pairs
            .iter()
            .map(|(name, pattern)| format!("{name}\u{1f}{pattern}"))
            .collect::<Vec<_>>()
            .join("\u{1e}");

        if let Some(scanner) = self
            .scanners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(scanner);
        }

        tracing::trace!(rules = pairs.len(), "Compiling scanner");
        let scanner = match Scanner::new(pairs, self.multiline) {
            Ok(scanner) => Arc::new(scanner),
            Err(e) => {
                tracing::error!(error = %e, "Failed to compile scanner");
                Arc::new(Scanner::default())
            }
        };
        self.scanners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&scanner));
        scanner
    }

    /// Drop every cached scanner (rules changed).
    pub(crate) fn clear(&mut self) {
        self.scanners
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(pairs: &[(&str, &str)]) -> Scanner {
        Scanner::new(pairs, true).unwrap()
    }

    #[test]
    fn test_leftmost_position_wins() {
        let sc = scanner(&[("late", "b"), ("early", "a")]);
        let m = sc.search("xab", 0).unwrap();
        assert_eq!(m.rule(), "early");
        assert_eq!(m.start(), 1);
    }

    #[test]
    fn test_priority_breaks_ties() {
        let sc = scanner(&[("first", "ab"), ("second", "a")]);
        let m = sc.search("ab", 0).unwrap();
        assert_eq!(m.rule(), "first");

        let sc = scanner(&[("second", "a"), ("first", "ab")]);
        let m = sc.search("ab", 0).unwrap();
        assert_eq!(m.rule(), "second");
    }

    #[test]
    fn test_groups() {
        let sc = scanner(&[("heading", r"^(?P<h_marks>#+) (?P<h_text>.*)$")]);
        let src = "x\n## Title\n";
        let m = sc.search(src, 0).unwrap();
        assert_eq!(m.group(src, "h_marks"), Some("##"));
        assert_eq!(m.group(src, "h_text"), Some("Title"));
        assert_eq!(m.group(src, "missing"), None);
        assert_eq!(m.as_str(src), "## Title");
    }

    #[test]
    fn test_line_start_respects_context() {
        let sc = scanner(&[("hash", "^#")]);
        assert!(sc.search("a#", 1).is_none());
        assert_eq!(sc.search("a\n#", 1).unwrap().start(), 2);
    }

    #[test]
    fn test_match_at_is_anchored() {
        let sc = scanner(&[("b", "b")]);
        assert!(sc.match_at("ab", 0).is_none());
        let m = sc.match_at("ab", 1).unwrap();
        assert_eq!((m.start(), m.end()), (1, 2));
    }

    #[test]
    fn test_search_range_limits_window() {
        let sc = scanner(&[("b", "b")]);
        assert!(sc.search_range("aab", 0, 2).is_none());
        assert!(sc.search_range("aab", 0, 3).is_some());
    }

    #[test]
    fn test_duplicate_group_names_fail() {
        let err = Scanner::new(&[("a", "(?P<g>a)"), ("b", "(?P<g>b)")], true).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn test_empty_scanner_never_matches() {
        let sc = Scanner::new::<&str, &str>(&[], true).unwrap();
        assert!(sc.search("anything", 0).is_none());
        assert!(sc.match_at("anything", 0).is_none());
    }

    #[test]
    fn test_cache_reuses_scanner() {
        let cache = ScannerCache::new(true);
        let a = cache.get_or_compile(&[("a", "a")]);
        let b = cache.get_or_compile(&[("a", "a")]);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_cache_invalid_pattern_yields_empty_scanner() {
        let cache = ScannerCache::new(true);
        let sc = cache.get_or_compile(&[("bad", "(")]);
        assert!(sc.search("(", 0).is_none());
    }
}
