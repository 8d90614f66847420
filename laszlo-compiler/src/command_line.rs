//! Bridge to the OpenLaszlo command-line compiler
//!
//! `lzc` is slower than the compile server, but unlike the server it can
//! compile files in any location.

use laszlo_core::{
    default_output_path, file_stem_without, output_suffix, source_stem, CompileOptions,
    CompileResult,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::interpreter::{OutputInterpreter, StandardInterpreter};
use crate::CompilerError;

/// Locations of the `lzc` script, relative to the OpenLaszlo home
const BIN_DIRECTORIES: &[&str] = &[
    // binary distribution
    "bin",
    // source distribution
    "WEB-INF/lps/server/bin",
];

/// Name of the compiler script on this host
pub fn executable_name() -> &'static str {
    if cfg!(windows) {
        "lzc.bat"
    } else {
        "lzc"
    }
}

/// Compiler that runs the `lzc` script as a subprocess
pub struct CommandLineCompiler {
    lzc: PathBuf,
    home: Option<PathBuf>,
    interpreter: Arc<dyn OutputInterpreter>,
}

impl CommandLineCompiler {
    /// Locate `lzc` inside the OpenLaszlo installation at `home`
    pub fn new(home: impl Into<PathBuf>) -> Result<Self, CompilerError> {
        let home = home.into();
        let lzc = Self::executable_path(&home)?;
        Ok(Self {
            lzc,
            home: Some(home),
            interpreter: Arc::new(StandardInterpreter),
        })
    }

    /// Use an explicit compiler script instead of searching a home directory
    pub fn with_script(lzc: impl Into<PathBuf>, home: Option<PathBuf>) -> Self {
        Self {
            lzc: lzc.into(),
            home,
            interpreter: Arc::new(StandardInterpreter),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Arc<dyn OutputInterpreter>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// First existing compiler script among the known locations under `home`
    pub fn executable_path(home: &Path) -> Result<PathBuf, CompilerError> {
        let name = executable_name();
        BIN_DIRECTORIES
            .iter()
            .map(|dir| home.join(dir).join(name))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                CompilerError::Configuration(format!(
                    "couldn't find {} in {} under {}",
                    name,
                    BIN_DIRECTORIES.join(" or "),
                    home.display()
                ))
            })
    }

    pub fn executable(&self) -> &Path {
        &self.lzc
    }

    /// Compile `source` with `lzc`.
    ///
    /// `lzc` always names its output after the source, so `output` may only
    /// move the artifact to another directory, not rename it.
    pub fn compile(
        &self,
        source: &Path,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompilerError> {
        let suffix = output_suffix(options.runtime_or_default());
        let output = match &options.output {
            Some(output) => output.clone(),
            None => default_output_path(source, options.runtime_or_default())?,
        };

        // TODO: support renaming by compiling into a temporary directory and
        // moving the artifact into place afterwards.
        if source_stem(source)? != file_stem_without(&output, &suffix)? {
            return Err(CompilerError::OutputMismatch {
                source_file: source.to_path_buf(),
                output,
            });
        }

        let args = command_args(source, &output, options);
        let mut command = Command::new(&self.lzc);
        command.args(&args);
        if let Some(home) = &self.home {
            if std::env::var_os("LPS_HOME").is_none() {
                command.env("LPS_HOME", home);
            }
        }

        tracing::debug!(
            "Running {} {}",
            self.lzc.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        let run = command.output()?;

        let stdout = String::from_utf8_lossy(&run.stdout);
        let stderr = String::from_utf8_lossy(&run.stderr);
        let diagnostics = self.interpreter.interpret_command_output(&stdout, &stderr);
        if let Some(error) = diagnostics.error {
            return Err(CompilerError::Compilation(error));
        }

        tracing::info!(
            "Compiled {} -> {} with lzc ({} warnings)",
            source.display(),
            output.display(),
            diagnostics.warnings.len()
        );
        Ok(CompileResult::success(output, diagnostics.warnings))
    }
}

/// Arguments for an `lzc` run, ending with the source path
fn command_args(source: &Path, output: &Path, options: &CompileOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if let Some(runtime) = &options.runtime {
        args.push(format!("--runtime={}", runtime).into());
    }
    if options.debug.unwrap_or(false) {
        args.push("--debug".into());
    }
    if options.profile.unwrap_or(false) {
        args.push("--profile".into());
    }
    let output_dir = directory_of(output);
    if directory_of(source) != output_dir {
        args.push("--dir".into());
        args.push(output_dir.as_os_str().to_os_string());
    }
    args.push(source.as_os_str().to_os_string());
    args
}

/// Parent directory of `path`, `.` for a bare file name
fn directory_of(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
