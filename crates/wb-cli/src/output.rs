//! Rendering of daemon results on stdout.
//!
//! Human output prints strings verbatim, lists of strings one per line, and
//! any other structured value as indented JSON. JSON output prints the result
//! as one compact document per invocation.

use std::io::{self, Write};

use clap::ValueEnum;
use serde_json::Value;

/// Output format requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human output on a terminal, JSON otherwise.
    #[default]
    Auto,
    /// Always human output.
    Human,
    /// Always JSON.
    Json,
}

/// Concrete format once the terminal check has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedOutputFormat {
    /// Plain text for people.
    Human,
    /// Machine-readable JSON.
    Json,
}

impl OutputFormat {
    /// Resolves `Auto` against whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto => ResolvedOutputFormat::Json,
        }
    }
}

/// Writes `value` to `writer` in the resolved format.
///
/// Human output writes nothing for `null`.
///
/// # Errors
///
/// Propagates write failures.
pub fn render<W: Write>(
    writer: &mut W,
    value: &Value,
    format: ResolvedOutputFormat,
) -> io::Result<()> {
    match format {
        ResolvedOutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value)?;
            writeln!(writer)
        }
        ResolvedOutputFormat::Human => render_human(writer, value),
    }
}

fn render_human<W: Write>(writer: &mut W, value: &Value) -> io::Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::String(text) => {
            writer.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(writer)?;
            }
            Ok(())
        }
        Value::Bool(_) | Value::Number(_) => writeln!(writer, "{value}"),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            for item in items.iter().filter_map(Value::as_str) {
                writeln!(writer, "{item}")?;
            }
            Ok(())
        }
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_writer_pretty(&mut *writer, value)?;
            writeln!(writer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn rendered(value: &Value, format: ResolvedOutputFormat) -> String {
        let mut buffer = Vec::new();
        render(&mut buffer, value, format).expect("render");
        String::from_utf8(buffer).expect("utf8")
    }

    #[rstest]
    #[case::terminal(true, ResolvedOutputFormat::Human)]
    #[case::pipe(false, ResolvedOutputFormat::Json)]
    fn auto_follows_the_terminal(#[case] terminal: bool, #[case] expected: ResolvedOutputFormat) {
        assert_eq!(OutputFormat::Auto.resolve(terminal), expected);
    }

    #[rstest]
    fn explicit_formats_ignore_the_terminal() {
        assert_eq!(OutputFormat::Json.resolve(true), ResolvedOutputFormat::Json);
        assert_eq!(OutputFormat::Human.resolve(false), ResolvedOutputFormat::Human);
    }

    #[rstest]
    #[case::text(json!("Example Domain"), "Example Domain\n")]
    #[case::text_with_newline(json!("line\n"), "line\n")]
    #[case::tabs(json!(["a", "b"]), "a\nb\n")]
    #[case::empty_list(json!([]), "")]
    #[case::null(Value::Null, "")]
    #[case::number(json!(1.5), "1.5\n")]
    fn human_rendering(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(rendered(&value, ResolvedOutputFormat::Human), expected);
    }

    #[rstest]
    fn human_rendering_pretty_prints_objects() {
        let output = rendered(&json!({"tabName": "a"}), ResolvedOutputFormat::Human);
        assert_eq!(output, "{\n  \"tabName\": \"a\"\n}\n");
    }

    #[rstest]
    fn json_rendering_is_compact() {
        let output = rendered(&json!({"tabName": "a", "url": "x"}), ResolvedOutputFormat::Json);
        assert_eq!(output, "{\"tabName\":\"a\",\"url\":\"x\"}\n");
    }

    #[rstest]
    fn json_rendering_keeps_null() {
        assert_eq!(rendered(&Value::Null, ResolvedOutputFormat::Json), "null\n");
    }
}
