//! Blacklist redaction engine
//!
//! Replaces caller-supplied terms with `<ANONYM>`, either literally
//! (case-insensitive substring) or approximately, token by token, using a
//! normalized similarity ratio so misspelled names are caught too.

pub mod similarity;

use deid_core::{ANONYM_PLACEHOLDER, CONTACT_PLACEHOLDER};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Similarity threshold used when the caller does not pick one.
pub const DEFAULT_THRESHOLD: f64 = 85.0;

/// Tokens whose length differs from a term by more than this are never
/// scored.
const MAX_LENGTH_DELTA: usize = 2;

lazy_static! {
    // Whitespace runs and punctuation runs split the text; both are kept as
    // their own segments so the text can be rebuilt exactly.
    static ref DELIMITER: Regex = Regex::new(r#"\s+|[,;.!?:\-()\[\]"']+"#).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchMode {
    /// Case-insensitive literal substring replacement.
    Exact,
    /// Token-wise comparison; tokens scoring at or above `threshold` (0–100)
    /// against any term are replaced.
    Fuzzy { threshold: f64 },
}

impl MatchMode {
    pub fn from_flags(fuzzy: bool, threshold: f64) -> Self {
        if fuzzy {
            MatchMode::Fuzzy { threshold }
        } else {
            MatchMode::Exact
        }
    }
}

impl Default for MatchMode {
    fn default() -> Self {
        MatchMode::Fuzzy {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
struct Term {
    lower: String,
    char_len: usize,
}

/// A prepared blacklist. Build once per batch and reuse for every record.
pub struct BlacklistMatcher {
    terms: Vec<Term>,
    mode: MatchMode,
    literal: Vec<Regex>,
}

impl BlacklistMatcher {
    pub fn new<I, S>(terms: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned = clean_terms(terms);
        let literal = match mode {
            MatchMode::Exact => compile_literal(&cleaned),
            MatchMode::Fuzzy { .. } => Vec::new(),
        };
        let terms = cleaned
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let char_len = lower.chars().count();
                Term { lower, char_len }
            })
            .collect();

        Self {
            terms,
            mode,
            literal,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Redact blacklisted terms from `text`.
    pub fn redact(&self, text: &str) -> String {
        self.redact_counted(text).0
    }

    /// Redact and report how many replacements were made.
    pub fn redact_counted(&self, text: &str) -> (String, usize) {
        if text.is_empty() || self.terms.is_empty() {
            return (text.to_string(), 0);
        }
        match self.mode {
            MatchMode::Exact => self.redact_exact(text),
            MatchMode::Fuzzy { threshold } => self.redact_fuzzy(text, threshold),
        }
    }

    fn redact_exact(&self, text: &str) -> (String, usize) {
        let mut count = 0;
        let mut result = text.to_string();
        for pattern in &self.literal {
            let replaced = pattern.replace_all(&result, |caps: &regex::Captures<'_>| {
                match caps.name("keep") {
                    Some(kept) => kept.as_str().to_string(),
                    None => {
                        count += 1;
                        ANONYM_PLACEHOLDER.to_string()
                    }
                }
            });
            result = replaced.into_owned();
        }
        (result, count)
    }

    fn redact_fuzzy(&self, text: &str, threshold: f64) -> (String, usize) {
        let mut count = 0;
        let mut result = String::with_capacity(text.len());
        for segment in segments(text) {
            match segment {
                Segment::Delimiter(d) => result.push_str(d),
                Segment::Word(w) if self.word_matches(w, threshold) => {
                    count += 1;
                    result.push_str(ANONYM_PLACEHOLDER);
                }
                Segment::Word(w) => result.push_str(w),
            }
        }
        (result, count)
    }

    fn word_matches(&self, word: &str, threshold: f64) -> bool {
        if is_placeholder(word) {
            return false;
        }
        let lower = word.to_lowercase();
        let len = lower.chars().count();
        self.terms.iter().any(|term| {
            if lower == term.lower {
                return true;
            }
            len.abs_diff(term.char_len) <= MAX_LENGTH_DELTA
                && similarity::ratio(&lower, &term.lower) >= threshold
        })
    }
}

/// One-shot redaction; prefer [`BlacklistMatcher`] when redacting many texts
/// with the same terms.
pub fn redact(text: &str, terms: &[String], fuzzy: bool, threshold: f64) -> String {
    BlacklistMatcher::new(terms, MatchMode::from_flags(fuzzy, threshold)).redact(text)
}

/// Trim terms and drop empty entries. Order and duplicates are preserved.
pub fn clean_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    terms
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Word(&'a str),
    Delimiter(&'a str),
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in DELIMITER.find_iter(text) {
        if m.start() > last {
            out.push(Segment::Word(&text[last..m.start()]));
        }
        out.push(Segment::Delimiter(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        out.push(Segment::Word(&text[last..]));
    }
    out
}

fn is_placeholder(word: &str) -> bool {
    word == ANONYM_PLACEHOLDER || word == CONTACT_PLACEHOLDER
}

/// One alternation over all terms, longest first, so the result does not
/// depend on term order. Existing placeholders are matched first and kept.
fn compile_literal(terms: &[String]) -> Vec<Regex> {
    if terms.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<&String> = terms.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    sorted.dedup();

    let keep = format!(
        "(?P<keep>{}|{})",
        regex::escape(ANONYM_PLACEHOLDER),
        regex::escape(CONTACT_PLACEHOLDER)
    );
    let alternation: Vec<String> = sorted.iter().map(|t| regex::escape(t)).collect();
    let combined = format!("{}|{}", keep, alternation.join("|"));

    match RegexBuilder::new(&combined).case_insensitive(true).build() {
        Ok(re) => vec![re],
        Err(e) => {
            warn!("Blacklist too large for a single pattern ({}), matching term by term", e);
            sorted
                .iter()
                .filter_map(|t| {
                    RegexBuilder::new(&format!("{}|{}", keep, regex::escape(t)))
                        .case_insensitive(true)
                        .build()
                        .ok()
                })
                .collect()
        }
    }
}
