//! Readable text extracted from page HTML.

use htmd::HtmlToMarkdown;
use tracing::warn;

use crate::session::SESSION_TARGET;

const SKIPPED_TAGS: [&str; 6] = ["script", "style", "noscript", "iframe", "svg", "template"];

/// Converts page HTML into Markdown-flavoured text.
///
/// Falls back to the raw HTML when conversion fails so `dump` never errors on
/// a valid page.
#[must_use]
pub(crate) fn html_to_text(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    match converter.convert(html) {
        Ok(markdown) => collapse_blank_lines(&markdown),
        Err(error) => {
            warn!(target: SESSION_TARGET, %error, "html conversion failed; returning raw html");
            html.to_owned()
        }
    }
}

/// Keeps at most one blank line between content lines and trims both ends.
fn collapse_blank_lines(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut blank_run = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run = true;
            continue;
        }
        if !collapsed.is_empty() {
            collapsed.push('\n');
            if blank_run {
                collapsed.push('\n');
            }
        }
        blank_run = false;
        collapsed.push_str(line.trim_end());
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn scripts_and_styles_are_dropped() {
        let text = html_to_text(
            "<html><head><style>p{}</style></head><body>\
             <h1>Example Domain</h1><script>alert(1)</script><p>Hello</p></body></html>",
        );
        assert!(text.contains("Example Domain"));
        assert!(text.contains("Hello"));
        assert!(!text.contains("alert"));
        assert!(!text.contains("p{}"));
    }

    #[rstest]
    #[case("a\n\n\n\nb", "a\n\nb")]
    #[case("\n\na\nb\n\n", "a\nb")]
    #[case("a   \n \n b", "a\n\n b")]
    fn blank_runs_collapse_to_one_line(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(collapse_blank_lines(input), expected);
    }
}
