//! Citation extraction from opinion text

use crate::citation::Citation;
use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::error;

/// Produces the citations of a text in left-to-right order
pub trait CitationExtractor: Send + Sync {
    /// `is_html` is false for plain text, which has no markup to skip
    fn extract(&self, text: &str, is_html: bool) -> Vec<Citation>;
}

/// Reporter abbreviations recognized out of the box
pub const DEFAULT_REPORTERS: &[&str] = &[
    // Supreme Court
    "U.S.", "S. Ct.", "S.Ct.", "L. Ed.", "L. Ed. 2d", "L.Ed.", "L.Ed.2d",
    "Dall.", "Cranch", "Wheat.", "Pet.", "How.", "Black", "Wall.",
    // Federal
    "F.", "F.2d", "F.3d", "F.4th", "F. Supp.", "F. Supp. 2d", "F. Supp. 3d",
    "F. App'x", "F.R.D.", "B.R.", "Fed. Cl.", "Vet. App.", "U.S. App. D.C.",
    // Regional
    "A.", "A.2d", "A.3d", "Atl.", "P.", "P.2d", "P.3d", "Pac.",
    "N.E.", "N.E.2d", "N.E.3d", "N.W.", "N.W.2d", "S.E.", "S.E.2d",
    "S.W.", "S.W.2d", "S.W.3d", "So.", "So. 2d", "So. 3d",
    // State
    "Cal. Rptr.", "Cal. Rptr. 2d", "Cal. Rptr. 3d", "N.Y.S.", "N.Y.S.2d", "N.Y.S.3d",
];

/// Matches `volume reporter page` triples against a reporter list.
///
/// The reporter index of a citation is the token position of the first
/// reporter word, counting whitespace-separated tokens of the text with any
/// markup removed.
#[derive(Debug, Clone)]
pub struct ReporterExtractor {
    reporters: HashSet<String>,
    max_words: usize,
}

impl ReporterExtractor {
    /// Extractor using [`DEFAULT_REPORTERS`]
    pub fn new() -> Self {
        Self::with_reporters(std::iter::empty::<String>())
    }

    /// Extractor using [`DEFAULT_REPORTERS`] plus `extra`
    pub fn with_reporters<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reporters: HashSet<String> = DEFAULT_REPORTERS
            .iter()
            .map(|r| normalize(r))
            .chain(extra.into_iter().map(|r| normalize(r.as_ref())))
            .filter(|r| !r.is_empty())
            .collect();
        let max_words = reporters
            .iter()
            .map(|r| r.split(' ').count())
            .max()
            .unwrap_or(1);

        Self { reporters, max_words }
    }

    pub fn knows(&self, reporter: &str) -> bool {
        self.reporters.contains(&normalize(reporter))
    }

    /// Longest reporter starting at token `start`, with its word count
    fn reporter_at(&self, tokens: &[&str], start: usize) -> Option<(String, usize)> {
        (1..=self.max_words.min(tokens.len() - start))
            .rev()
            .map(|words| (tokens[start..start + words].join(" "), words))
            .find(|(candidate, _)| self.reporters.contains(candidate))
    }
}

impl Default for ReporterExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CitationExtractor for ReporterExtractor {
    fn extract(&self, text: &str, is_html: bool) -> Vec<Citation> {
        let stripped;
        let text = if is_html {
            let tags = match tag_pattern() {
                Ok(tags) => tags,
                Err(e) => {
                    error!(error = %e, "Tag pattern failed to compile, skipping HTML text");
                    return Vec::new();
                }
            };
            stripped = tags.replace_all(text, " ");
            stripped.as_ref()
        } else {
            text
        };

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut citations = Vec::new();
        let mut i = 1;

        while i < tokens.len() {
            if let Some((reporter, words)) = self.reporter_at(&tokens, i) {
                let volume = parse_volume(tokens[i - 1]);
                let page = tokens.get(i + words).and_then(|t| parse_page(t));
                if let (Some(volume), Some(page)) = (volume, page) {
                    citations.push(Citation::new(volume, reporter, page, i));
                    i += words + 1;
                    continue;
                }
            }
            i += 1;
        }

        citations
    }
}

fn tag_pattern() -> &'static Result<Regex, regex_lite::Error> {
    static TAGS: OnceLock<Result<Regex, regex_lite::Error>> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>"))
}

fn normalize(reporter: &str) -> String {
    reporter.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Volume token: digits, optionally opened by a bracket as in `(13 Atl. 33)`
fn parse_volume(token: &str) -> Option<u32> {
    let digits = token.trim_start_matches(['(', '[']);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Page token with trailing punctuation removed. Slip opinion pages such as
/// `___` are kept.
fn parse_page(token: &str) -> Option<String> {
    let page = token.trim_end_matches([',', ';', ':', '.', ')', ']']);
    let valid = !page.is_empty()
        && page.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && page.chars().any(|c| c.is_ascii_digit() || c == '_');
    valid.then(|| page.to_string())
}
