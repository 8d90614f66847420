//! An OpenLaszlo applet and its source tree

use anyhow::{Context, Result};
use glob::glob;
use laszlo_compiler::CompilerFacade;
use laszlo_core::{CompileOptions, CompileResult, SOURCE_EXTENSION};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// `http:` references to runtime-loaded assets
static ASSET_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"http:(.*?)['"]"#).unwrap());

/// `xs.each(function(x){...});` over an array
static EACH_LOOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^\s*([a-zA-Z][a-zA-Z0-9]*)\.each\(function\(([a-zA-Z][a-zA-Z0-9]*)\)\{(.*?)\}\);")
        .unwrap()
});

/// Directory under an applet's source that holds generated files
const BUILD_DIR: &str = "build";

/// Marks artifacts compiled next to their source
const ARTIFACT_MARKER: &str = ".lzx.swf";

pub struct Applet {
    source: PathBuf,
}

impl Applet {
    /// Applet compiled from `source`; `.lzx` is appended if missing
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let has_extension = source
            .to_str()
            .is_some_and(|s| s.ends_with(SOURCE_EXTENSION));
        let source = if has_extension {
            source
        } else {
            let mut name = source.into_os_string();
            name.push(SOURCE_EXTENSION);
            PathBuf::from(name)
        };
        Self { source }
    }

    /// Applet in a web project: sources live in `lzx/`
    pub fn in_project(root: &Path, basename: &str) -> Self {
        Self::new(root.join("lzx").join(basename))
    }

    /// Compile `lzx/<basename>` into `public/<target>` under `root`
    pub fn compile_in_project(
        compiler: &CompilerFacade,
        root: &Path,
        basename: &str,
        target: &str,
        force: bool,
    ) -> Result<Option<CompileResult>> {
        let target = root.join("public").join(target);
        Self::in_project(root, basename).compile(
            compiler,
            Some(&target),
            &CompileOptions::new(),
            force,
        )
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn source_dir(&self) -> &Path {
        match self.source.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// `<source>.swf`
    pub fn default_target(&self) -> PathBuf {
        let mut name = self.source.clone().into_os_string();
        name.push(".swf");
        PathBuf::from(name)
    }

    /// Compile the applet unless `target` is already up to date.
    ///
    /// Returns `None` when the compile was skipped.
    pub fn compile(
        &self,
        compiler: &CompilerFacade,
        target: Option<&Path>,
        options: &CompileOptions,
        force: bool,
    ) -> Result<Option<CompileResult>> {
        let target = target.map(Path::to_path_buf).unwrap_or_else(|| self.default_target());
        if !force && self.up_to_date(&target) {
            tracing::debug!("{} is up to date", target.display());
            return Ok(None);
        }

        tracing::info!("Compiling {} -> {}", self.source.display(), target.display());
        let mut options = options.clone();
        options.output.get_or_insert(target);
        let result = compiler
            .compile(&self.source, &options)
            .with_context(|| format!("Failed to compile {}", self.source.display()))?;
        Ok(Some(result))
    }

    /// Whether `target` is newer than every file in the applet's source tree.
    ///
    /// Compiled artifacts and the `build/` directory don't count as sources.
    pub fn up_to_date(&self, target: &Path) -> bool {
        let Some(target_mtime) = modified(target) else {
            return false;
        };

        let build_dir = self.source_dir().join(BUILD_DIR);
        let newest_source = WalkDir::new(self.source_dir())
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry) && entry.path() != build_dir)
            .filter_map(Result::ok)
            .filter(|entry| !entry.file_type().is_dir())
            .filter(|entry| !entry.path().to_string_lossy().contains(ARTIFACT_MARKER))
            // dangling links have no mtime
            .filter_map(|entry| modified(entry.path()))
            .max();

        match newest_source {
            Some(source_mtime) => source_mtime < target_mtime,
            None => true,
        }
    }

    /// Files referenced through `http:` URLs from the applet's sources.
    ///
    /// Sources in the applet directory and one level below are scanned;
    /// references from the subdirectories are relative to the applet
    /// directory once a leading `../` is removed.
    pub fn runtime_assets(&self) -> Result<Vec<PathBuf>> {
        let dir = self.source_dir();
        let mut references = Vec::new();
        for source in lzx_files(&dir.join("*.lzx"))? {
            references.extend(asset_references(&source)?);
        }
        for source in lzx_files(&dir.join("*").join("*.lzx"))? {
            references.extend(
                asset_references(&source)?
                    .into_iter()
                    .map(|r| r.strip_prefix("../").map(str::to_string).unwrap_or(r)),
            );
        }

        let mut seen = HashSet::new();
        Ok(references
            .into_iter()
            .filter(|r| seen.insert(r.clone()))
            .map(|r| dir.join(r))
            .filter(|path| path.exists() && !path.is_dir())
            .collect())
    }

    /// Copy the applet's JavaScript into `dir`, rewriting it on the way.
    ///
    /// Files whose copy is newer than the source are skipped unless `force`
    /// is set. Returns the number of files written.
    pub fn preprocess_to(&self, dir: &Path, force: bool) -> Result<usize> {
        let source_dir = self.source_dir();
        let mut written = 0;

        let scripts = WalkDir::new(source_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "js"));

        for entry in scripts {
            let src = entry.path();
            let relative = src.strip_prefix(source_dir).unwrap_or(src);
            let dst = dir.join(relative);

            if !force {
                if let (Some(dst_mtime), Some(src_mtime)) = (modified(&dst), modified(src)) {
                    if dst_mtime > src_mtime {
                        continue;
                    }
                }
            }

            tracing::info!("Copy {} {}", src.display(), dst.display());
            let content = std::fs::read_to_string(src)
                .with_context(|| format!("Failed to read {}", src.display()))?;
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&dst, preprocess_string(&content))
                .with_context(|| format!("Failed to write {}", dst.display()))?;
            written += 1;
        }

        Ok(written)
    }
}

/// Rewrite `xs.each(function(x){...});` into an indexed `for` loop
pub fn preprocess_string(content: &str) -> String {
    EACH_LOOP
        .replace_all(content, |caps: &regex::Captures| {
            format!(
                "var $0={}, $1=$0.length;for(var $2=0; $1--;){{var {}=$0[$2++];{}}}",
                &caps[1], &caps[2], &caps[3]
            )
        })
        .into_owned()
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn lzx_files(pattern: &Path) -> Result<Vec<PathBuf>> {
    let pattern = pattern.to_string_lossy();
    let paths = glob(&pattern).with_context(|| format!("Invalid pattern {}", pattern))?;
    Ok(paths.filter_map(Result::ok).collect())
}

fn asset_references(source: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    Ok(ASSET_REFERENCE
        .captures_iter(&content)
        .map(|caps| caps[1].to_string())
        .collect())
}
