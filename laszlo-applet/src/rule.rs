//! File-extension build rules

use anyhow::{bail, Context, Result};
use laszlo_compiler::CompilerFacade;
use laszlo_core::{CompileOptions, CompileResult};
use std::path::{Path, PathBuf};

/// Builds `*.<target_ext>` files from `*.<source_ext>` files with the same stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRule {
    source_ext: String,
    target_ext: String,
}

impl BuildRule {
    pub fn new(source_ext: impl Into<String>, target_ext: impl Into<String>) -> Self {
        Self {
            source_ext: source_ext.into(),
            target_ext: target_ext.into(),
        }
    }

    /// `hello.swf` from `hello.lzx`
    pub fn lzx_to_swf() -> Self {
        Self::new("lzx", "swf")
    }

    pub fn matches(&self, target: &Path) -> bool {
        target
            .extension()
            .is_some_and(|ext| ext.to_str() == Some(self.target_ext.as_str()))
    }

    /// The source a target is built from, if the rule applies to it
    pub fn source_for(&self, target: &Path) -> Option<PathBuf> {
        self.matches(target)
            .then(|| target.with_extension(&self.source_ext))
    }

    /// Compile the source for `target` into `target`
    pub fn build(&self, compiler: &CompilerFacade, target: &Path) -> Result<CompileResult> {
        let Some(source) = self.source_for(target) else {
            bail!(
                "{} doesn't end in .{}",
                target.display(),
                self.target_ext
            );
        };
        if !source.is_file() {
            bail!(
                "Don't know how to build {}: {} doesn't exist",
                target.display(),
                source.display()
            );
        }

        tracing::info!("Compiling {} => {}", source.display(), target.display());
        let options = CompileOptions::new().output(target);
        compiler
            .compile(&source, &options)
            .with_context(|| format!("Failed to build {}", target.display()))
    }
}
