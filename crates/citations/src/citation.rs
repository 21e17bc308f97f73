//! Reporter citation value object

use crate::document::DocumentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A citation to a reporter volume and page, e.g. `22 U.S. 44`.
///
/// Identity is the `(volume, reporter, page)` triple: the same citation found
/// at two positions of a document compares equal. Position and resolution
/// fields are carried along but ignored by `Eq` and `Hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub volume: u32,
    pub reporter: String,
    /// Pages may be non-numeric (`___` for slip opinions)
    pub page: String,
    /// Token position of the reporter within the source text
    pub reporter_index: usize,
    /// Canonical URL of the cited opinion, once resolved
    pub match_url: Option<String>,
    /// Id of the cited opinion, once resolved
    pub match_id: Option<DocumentId>,
}

impl Citation {
    pub fn new(
        volume: u32,
        reporter: impl Into<String>,
        page: impl Into<String>,
        reporter_index: usize,
    ) -> Self {
        Self {
            volume,
            reporter: reporter.into(),
            page: page.into(),
            reporter_index,
            match_url: None,
            match_id: None,
        }
    }

    /// `volume reporter page` with single spaces
    pub fn canonical(&self) -> String {
        format!("{} {} {}", self.volume, self.reporter, self.page)
    }

    pub fn is_resolved(&self) -> bool {
        self.match_id.is_some()
    }

    /// Attach the opinion this citation refers to
    pub fn resolve(&mut self, url: impl Into<String>, id: DocumentId) {
        self.match_url = Some(url.into());
        self.match_id = Some(id);
    }

    /// Pattern matching the citation's textual form. The whitespace between
    /// the parts and one optional trailing whitespace are captured.
    ///
    /// Volume and page are anchored on word boundaries, so `2 U.S. 44` does
    /// not match inside `22 U.S. 44` or `2 U.S. 445`.
    pub fn as_regex(&self) -> String {
        let page_end = if self.page.ends_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            r"\b"
        } else {
            ""
        };
        format!(
            r"\b{}(\s+){}(\s+){}{}(\s?)",
            self.volume,
            regex_lite::escape(&self.reporter),
            regex_lite::escape(&self.page),
            page_end,
        )
    }

    /// Replacement for a match of [`Citation::as_regex`]. Captured whitespace
    /// is reinserted with `${n}` references.
    pub fn as_html(&self) -> String {
        let inner = format!(
            concat!(
                r#"<span class="volume">{}</span>${{1}}"#,
                r#"<span class="reporter">{}</span>${{2}}"#,
                r#"<span class="page">{}</span>${{3}}"#,
            ),
            self.volume,
            literal(&self.reporter),
            literal(&self.page),
        );

        match (&self.match_url, self.match_id) {
            (Some(url), Some(id)) => format!(
                r#"<span class="citation" data-id="{}"><a href="{}">{}</a></span>"#,
                id,
                literal(url),
                inner
            ),
            _ => format!(r#"<span class="citation no-link">{}</span>"#, inner),
        }
    }
}

/// Escape `$` so text survives replacement expansion
fn literal(text: &str) -> String {
    text.replace('$', "$$")
}

impl PartialEq for Citation {
    fn eq(&self, other: &Self) -> bool {
        self.volume == other.volume && self.reporter == other.reporter && self.page == other.page
    }
}

impl Eq for Citation {}

impl Hash for Citation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.volume.hash(state);
        self.reporter.hash(state);
        self.page.hash(state);
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.volume, self.reporter, self.page)
    }
}
