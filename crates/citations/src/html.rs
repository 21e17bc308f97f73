//! Inline citation markup for rendered opinions

use crate::citation::Citation;
use crate::document::{SourceText, TextFormat};
use regex_lite::Regex;

const PRE_OPEN: &str = r#"<pre class="inline">"#;
const PRE_CLOSE: &str = "</pre>";

/// Rewrite `source` with every citation occurrence replaced by its markup.
///
/// HTML sources are substituted in place. Plain text is wrapped in a single
/// inline `<pre>` block that is closed before and reopened after each
/// citation.
pub fn create_cited_html(
    source: SourceText<'_>,
    citations: &[Citation],
) -> Result<String, regex_lite::Error> {
    let mut body = source.body.to_string();

    for citation in citations {
        let pattern = Regex::new(&citation.as_regex())?;
        let replacement = match source.format {
            TextFormat::Html => citation.as_html(),
            TextFormat::Plain => format!("{PRE_CLOSE}{}{PRE_OPEN}", citation.as_html()),
        };
        body = pattern.replace_all(&body, replacement.as_str()).into_owned();
    }

    Ok(match source.format {
        TextFormat::Html => body,
        TextFormat::Plain => format!("{PRE_OPEN}{body}{PRE_CLOSE}"),
    })
}
