//! Interpretation of compiler output
//!
//! Neither compiler reports results in a structured form: the server embeds
//! them in its `canvas-xml` response and `lzc` prints them as text. The
//! matching rules live behind [`OutputInterpreter`] so they can change with
//! the tool's output format without touching the strategies.

use regex::Regex;
use std::sync::LazyLock;

/// `<warnings>` block of a canvas-xml metadata document
static WARNINGS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<warnings>(.*?)</warnings>").unwrap());

/// One warning inside the `<warnings>` block
static WARNING_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<error>\s*(.*?)\s*</error>").unwrap());

/// Error page the server returns instead of a canvas
static SERVER_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<pre>Error:\s*(.*?)\s*</pre>").unwrap());

/// Line numbers OpenLaszlo 3.1 prefixes to its output
static LINE_NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\s+").unwrap());

static ERROR_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Compilation errors occurred:\n").unwrap());

const COMPILING_BANNER: &str = "Compiling:";

/// Warnings and error text recovered from a compiler's output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl Diagnostics {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Rules that turn raw compiler output into [`Diagnostics`].
///
/// Implementations must be pure: the same input always yields the same
/// diagnostics, and an `error` is reported only for a failed compile.
pub trait OutputInterpreter: Send + Sync {
    /// Interpret the body of a `canvas-xml` response from the compile server
    fn interpret_metadata(&self, body: &str) -> Diagnostics;

    /// Interpret the captured streams of an `lzc` run
    fn interpret_command_output(&self, stdout: &str, stderr: &str) -> Diagnostics;
}

/// Matching rules for the OpenLaszlo 3.x/4.x tools
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardInterpreter;

impl OutputInterpreter for StandardInterpreter {
    fn interpret_metadata(&self, body: &str) -> Diagnostics {
        if let Some(block) = WARNINGS_BLOCK.captures(body) {
            let warnings = WARNING_ENTRY
                .captures_iter(&block[1])
                .map(|entry| entry[1].to_string())
                .collect();
            return Diagnostics {
                warnings,
                error: None,
            };
        }

        if !body.contains("<canvas>") {
            if let Some(error) = SERVER_ERROR.captures(body) {
                return Diagnostics {
                    warnings: Vec::new(),
                    error: Some(error[1].to_string()),
                };
            }
        }

        Diagnostics::default()
    }

    fn interpret_command_output(&self, stdout: &str, stderr: &str) -> Diagnostics {
        // lzc writes errors to stdout and warnings to stderr
        let stdout = LINE_NUMBER_PREFIX.replace_all(stdout, "");
        if let Some(marker) = ERROR_MARKER.find(&stdout) {
            return Diagnostics {
                warnings: Vec::new(),
                error: Some(stdout[marker.end()..].trim().to_string()),
            };
        }

        let mut lines = stderr.lines().peekable();
        if lines
            .peek()
            .is_some_and(|first| first.starts_with(COMPILING_BANNER))
        {
            lines.next();
        }

        Diagnostics {
            warnings: lines
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_warnings_in_order() {
        let body = r#"<canvas>
            <warnings>
              <error> hello.lzx:3:10: unknown attribute "bogus" </error>
              <error>
                hello.lzx:7:2: class "foo" is redefined
              </error>
            </warnings>
        </canvas>"#;

        let diagnostics = StandardInterpreter.interpret_metadata(body);
        assert!(!diagnostics.is_failure());
        assert_eq!(
            diagnostics.warnings,
            vec![
                r#"hello.lzx:3:10: unknown attribute "bogus""#.to_string(),
                r#"hello.lzx:7:2: class "foo" is redefined"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_metadata_error_page() {
        let body = "<html><body><pre>Error: hello.lzx:4:1: element type \"canvas\" \
                    must be terminated\n</pre></body></html>";

        let diagnostics = StandardInterpreter.interpret_metadata(body);
        assert_eq!(
            diagnostics.error.as_deref(),
            Some("hello.lzx:4:1: element type \"canvas\" must be terminated")
        );
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn test_metadata_error_inside_canvas_is_ignored() {
        let body = "<canvas><pre>Error: not really</pre></canvas>";
        assert_eq!(
            StandardInterpreter.interpret_metadata(body),
            Diagnostics::default()
        );
    }

    #[test]
    fn test_command_output_error_marker() {
        let stdout = "Compilation errors occurred:\nhello.lzx:3:5: element broken is not closed\n";
        let diagnostics = StandardInterpreter.interpret_command_output(stdout, "Compiling: hello.lzx\n");
        assert_eq!(
            diagnostics.error.as_deref(),
            Some("hello.lzx:3:5: element broken is not closed")
        );
    }

    #[test]
    fn test_command_output_strips_line_numbers() {
        let stdout = "1 Compilation errors occurred:\n2  hello.lzx:1:1: bad\n";
        let diagnostics = StandardInterpreter.interpret_command_output(stdout, "");
        assert_eq!(diagnostics.error.as_deref(), Some("hello.lzx:1:1: bad"));
    }

    #[test]
    fn test_command_output_warnings_skip_banner() {
        let stderr = "Compiling: hello.lzx\nhello.lzx:2:1: unknown attribute\n";
        let diagnostics = StandardInterpreter.interpret_command_output("", stderr);
        assert!(!diagnostics.is_failure());
        assert_eq!(diagnostics.warnings, vec!["hello.lzx:2:1: unknown attribute"]);
    }

    #[test]
    fn test_command_output_banner_only_stripped_when_first() {
        let stderr = "hello.lzx:2:1: first\nCompiling: later\n";
        let diagnostics = StandardInterpreter.interpret_command_output("", stderr);
        assert_eq!(diagnostics.warnings.len(), 2);
    }
}
