//! Core domain models

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::CoreError;

/// Runtime used when neither the caller nor the configuration names one
pub const DEFAULT_RUNTIME: &str = "swf8";

/// Request type the compile server produces when none is given
pub const DEFAULT_FORMAT: &str = "swf";

/// Request type for the metadata (warnings and errors) document
pub const METADATA_FORMAT: &str = "canvas-xml";

/// Extension of OpenLaszlo source files
pub const SOURCE_EXTENSION: &str = ".lzx";

/// Options recognized by the compile strategies.
///
/// Every field is optional; each strategy supplies its own default.
/// `format` is only read by the compile server and `profile` only by the
/// command-line compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Compile in debug mode
    pub debug: Option<bool>,
    /// Target runtime tag, e.g. `swf8`
    pub runtime: Option<String>,
    /// Name and location of the output file
    pub output: Option<PathBuf>,
    /// Whether the application is proxied (server only)
    pub proxied: Option<bool>,
    /// Server request type (server only)
    pub format: Option<String>,
    /// Emit profiling instrumentation (command line only)
    pub profile: Option<bool>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn proxied(mut self, proxied: bool) -> Self {
        self.proxied = Some(proxied);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn profile(mut self, profile: bool) -> Self {
        self.profile = Some(profile);
        self
    }

    /// The runtime to compile for, falling back to [`DEFAULT_RUNTIME`]
    pub fn runtime_or_default(&self) -> &str {
        self.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME)
    }

    /// Fill in `runtime` if the caller left it unset
    pub fn with_default_runtime(mut self, runtime: &str) -> Self {
        if self.runtime.is_none() {
            self.runtime = Some(runtime.to_string());
        }
        self
    }
}

/// Normalized outcome of a compile, whichever strategy produced it.
///
/// A present `error` means the compile failed, whether or not `output`
/// exists on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    /// Path of the compiled artifact
    pub output: PathBuf,
    /// Compiler warnings in the order the tool reported them
    pub warnings: Vec<String>,
    /// Compiler error text, if compilation failed
    pub error: Option<String>,
}

impl CompileResult {
    pub fn success(output: PathBuf, warnings: Vec<String>) -> Self {
        Self {
            output,
            warnings,
            error: None,
        }
    }

    pub fn failure(output: PathBuf, error: String) -> Self {
        Self {
            output,
            warnings: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Suffix the compiler gives artifacts for `runtime`, e.g. `.lzr=swf8.swf`
pub fn output_suffix(runtime: &str) -> String {
    format!(".lzr={}.swf", runtime)
}

/// File name of `path` with one trailing `suffix` removed
pub fn file_stem_without<'a>(path: &'a Path, suffix: &str) -> Result<&'a str, CoreError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::InvalidSourceName(path.to_path_buf()))?;
    Ok(name.strip_suffix(suffix).unwrap_or(name))
}

/// Source file name without its `.lzx` extension
pub fn source_stem(source: &Path) -> Result<&str, CoreError> {
    file_stem_without(source, SOURCE_EXTENSION)
}

/// Default artifact path: next to the source, named `<stem>.lzr=<runtime>.swf`
pub fn default_output_path(source: &Path, runtime: &str) -> Result<PathBuf, CoreError> {
    let stem = source_stem(source)?;
    let name = format!("{}{}", stem, output_suffix(runtime));
    Ok(match source.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        let output = default_output_path(Path::new("apps/hello.lzx"), "swf8").unwrap();
        assert_eq!(output, PathBuf::from("apps/hello.lzr=swf8.swf"));
    }

    #[test]
    fn test_default_output_path_keeps_foreign_extension() {
        let output = default_output_path(Path::new("hello.xml"), "dhtml").unwrap();
        assert_eq!(output, PathBuf::from("hello.xml.lzr=dhtml.swf"));
    }

    #[test]
    fn test_source_stem_rejects_missing_name() {
        assert!(source_stem(Path::new("/")).is_err());
    }

    #[test]
    fn test_with_default_runtime_keeps_caller_choice() {
        let options = CompileOptions::new().runtime("swf7").with_default_runtime("swf8");
        assert_eq!(options.runtime.as_deref(), Some("swf7"));

        let options = CompileOptions::new().with_default_runtime("swf8");
        assert_eq!(options.runtime_or_default(), "swf8");
    }

    #[test]
    fn test_failed_result_serializes_error() {
        let result = CompileResult::failure(PathBuf::from("a.swf"), "a.lzx:1:1: oops".into());
        assert!(!result.is_success());
        let json = result.to_json().unwrap();
        assert!(json.contains("a.lzx:1:1: oops"));
    }
}
