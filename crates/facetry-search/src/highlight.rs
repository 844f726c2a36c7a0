//! Snippet highlighting.
//!
//! Given a field value and the terms a query matched, the [`Highlighter`]
//! produces short fragments around each match with the terms wrapped in
//! markers (`<b>`/`</b>` by default). When nothing matches it falls back to
//! the raw value truncated to the fragment length, so a highlighted field
//! always shows something.
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use facetry_search::Highlighter;
//!
//! let hl = Highlighter::new("<b>", "</b>", 3);
//! let terms: BTreeSet<String> = ["nitrogen".to_string()].into();
//!
//! let snippets: Vec<String> = hl
//!     .highlight("Soil nitrogen retention under cover crops", &terms, 20)
//!     .iter()
//!     .collect();
//! assert_eq!(snippets, ["Soil <b>nitrogen</b>"]);
//!
//! let fallback: Vec<String> = hl
//!     .highlight("Soil nitrogen retention under cover crops", &BTreeSet::new(), 20)
//!     .iter()
//!     .collect();
//! assert_eq!(fallback, ["Soil nitrogen retent"]);
//! ```

use std::collections::{BTreeSet, HashSet};

use facetry_core::HighlightSettings;

use crate::analysis::{tokenize, truncate_chars};

/// Produces marked-up snippets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighter {
    pre: String,
    post: String,
    max_snippets: usize,
}

impl Highlighter {
    /// Create a highlighter. `max_snippets` is clamped to at least 1.
    pub fn new(pre: impl Into<String>, post: impl Into<String>, max_snippets: usize) -> Self {
        Self {
            pre: pre.into(),
            post: post.into(),
            max_snippets: max_snippets.max(1),
        }
    }

    /// Create a highlighter from catalog settings.
    pub fn from_settings(settings: &HighlightSettings) -> Self {
        Self::new(&settings.pre, &settings.post, settings.max_snippets)
    }

    /// Maximum snippets produced per value.
    pub fn max_snippets(&self) -> usize {
        self.max_snippets
    }

    /// Highlight `terms` in `value`.
    ///
    /// Term matching is case-insensitive on whole tokens. The returned
    /// [`Snippets`] is lazy: fragments are cut only as they are iterated.
    pub fn highlight<'a>(
        &'a self,
        value: &'a str,
        terms: &BTreeSet<String>,
        max_fragment_length: usize,
    ) -> Snippets<'a> {
        let wanted: HashSet<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let matches = tokenize(value)
            .into_iter()
            .filter(|t| wanted.contains(&t.term))
            .map(|t| (t.start, t.end))
            .collect();
        Snippets {
            highlighter: self,
            value,
            matches,
            max_len: max_fragment_length.max(1),
        }
    }

    /// Highlight every value of a multi-valued field.
    ///
    /// Returns the snippets of all values in order, and whether any value
    /// contained a match. Values without a match contribute their fallback,
    /// cut to `fallback_length`.
    pub fn highlight_values(
        &self,
        values: &[String],
        terms: &BTreeSet<String>,
        max_fragment_length: usize,
        fallback_length: usize,
    ) -> (Vec<String>, bool) {
        let mut out = Vec::new();
        let mut matched = false;
        for value in values {
            let snippets = self.highlight(value, terms, max_fragment_length);
            if snippets.is_fallback() {
                out.extend(self.highlight(value, terms, fallback_length).iter());
            } else {
                matched = true;
                out.extend(snippets.iter());
            }
        }
        (out, matched)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::from_settings(&HighlightSettings::default())
    }
}

/// Snippets for one value. Iterate with [`Snippets::iter`]; each call starts
/// over from the first fragment.
#[derive(Debug, Clone)]
pub struct Snippets<'a> {
    highlighter: &'a Highlighter,
    value: &'a str,
    matches: Vec<(usize, usize)>,
    max_len: usize,
}

impl Snippets<'_> {
    /// Whether no term matched, so iteration yields the truncated raw value.
    pub fn is_fallback(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of term occurrences found in the value.
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Iterate over the snippets from the start.
    pub fn iter(&self) -> SnippetIter<'_> {
        SnippetIter {
            snippets: self,
            next_match: 0,
            covered_until: 0,
            emitted: 0,
        }
    }

    /// Byte window of at most `max_len` characters around a match, starting
    /// no earlier than `floor` and snapped to whitespace where possible. A
    /// match longer than `max_len` is its own window and is never split.
    fn window(&self, ms: usize, me: usize, floor: usize) -> (usize, usize) {
        let v = self.value;
        let match_chars = v[ms..me].chars().count();
        if match_chars >= self.max_len {
            return (ms, me);
        }
        let context = self.max_len.saturating_sub(match_chars) / 2;

        let mut start = ms;
        for (i, _) in v[floor..ms].char_indices().rev().take(context) {
            start = floor + i;
        }
        if start > 0 && !v[..start].ends_with(char::is_whitespace) {
            if let Some((i, c)) = v[start..ms].char_indices().find(|(_, c)| c.is_whitespace()) {
                start += i + c.len_utf8();
            }
        }

        let mut end = v[start..]
            .char_indices()
            .nth(self.max_len)
            .map_or(v.len(), |(i, _)| start + i);
        if end < v.len() && !v[end..].starts_with(char::is_whitespace) {
            let from = me.min(end);
            if let Some((i, _)) = v[from..end]
                .char_indices()
                .rev()
                .find(|(_, c)| c.is_whitespace())
            {
                end = from + i;
            }
        }
        (start, end)
    }

    fn mark(&self, start: usize, end: usize) -> String {
        let hl = self.highlighter;
        let v = self.value;
        let mut out = String::new();
        let mut cursor = start;
        for &(ms, me) in &self.matches {
            if ms < cursor || me > end {
                continue;
            }
            out.push_str(&v[cursor..ms]);
            out.push_str(&hl.pre);
            out.push_str(&v[ms..me]);
            out.push_str(&hl.post);
            cursor = me;
        }
        out.push_str(&v[cursor..end]);
        out.trim().to_string()
    }
}

impl<'s> IntoIterator for &'s Snippets<'_> {
    type Item = String;
    type IntoIter = SnippetIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        SnippetIter {
            snippets: self,
            next_match: 0,
            covered_until: 0,
            emitted: 0,
        }
    }
}

/// Lazy iterator over [`Snippets`].
#[derive(Debug, Clone)]
pub struct SnippetIter<'s> {
    snippets: &'s Snippets<'s>,
    next_match: usize,
    covered_until: usize,
    emitted: usize,
}

impl Iterator for SnippetIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let s = self.snippets;
        if self.emitted >= s.highlighter.max_snippets {
            return None;
        }

        if s.matches.is_empty() {
            if self.emitted > 0 || s.value.trim().is_empty() {
                return None;
            }
            self.emitted += 1;
            return Some(truncate_chars(s.value, s.max_len).to_string());
        }

        while let Some(&(ms, me)) = s.matches.get(self.next_match) {
            self.next_match += 1;
            if ms < self.covered_until {
                continue;
            }
            let (start, end) = s.window(ms, me, self.covered_until);
            self.covered_until = end.max(me);
            self.emitted += 1;
            return Some(s.mark(start, end));
        }
        None
    }
}
