//! Mapping of filesystem paths onto the compile server's document root

use glob::glob;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::CompilerError;

/// A physical directory the server exposes under a different name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootAlias {
    /// Directory on disk
    pub physical: PathBuf,
    /// First path segment the server knows it by
    pub alias: String,
}

impl RootAlias {
    pub fn new(physical: impl Into<PathBuf>, alias: impl Into<String>) -> Self {
        Self {
            physical: physical.into(),
            alias: alias.into(),
        }
    }
}

/// Path of a source file as the server sees it, one entry per segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPath(Vec<String>);

impl ServerPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ServerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// The servable root of an OpenLaszlo server installation
#[derive(Debug, Clone)]
pub struct ServerRoot {
    home: PathBuf,
    aliases: Vec<RootAlias>,
}

impl ServerRoot {
    /// Root with no aliases; `home` is used as-is
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            aliases: Vec::new(),
        }
    }

    /// Inspect an installation directory.
    ///
    /// A binary server distribution keeps its web application in
    /// `Server/lps-*/`; when that layout is present the web application is
    /// the root. Symbolic links directly inside the root become aliases.
    pub fn discover(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let home = locate_webapp(&home).unwrap_or(home);
        let aliases = symlink_aliases(&home);
        Self { home, aliases }
    }

    /// Add an alias that is tried before any discovered one
    pub fn with_alias(mut self, alias: RootAlias) -> Self {
        self.aliases.insert(0, alias);
        self
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = RootAlias>) -> Self {
        let mut configured: Vec<RootAlias> = aliases.into_iter().collect();
        configured.append(&mut self.aliases);
        self.aliases = configured;
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn aliases(&self) -> &[RootAlias] {
        &self.aliases
    }

    /// Resolve an absolute path to its location on the server.
    ///
    /// `..` components are collapsed first. Aliases are tried in order; the
    /// home prefix is only used when none of them matches.
    pub fn resolve(&self, absolute: &Path) -> Result<ServerPath, CompilerError> {
        let absolute = normalize(absolute);
        for alias in &self.aliases {
            if let Ok(rest) = absolute.strip_prefix(&alias.physical) {
                let mut segments = vec![alias.alias.clone()];
                segments.extend(path_segments(rest));
                return Ok(ServerPath(segments));
            }
        }

        match absolute.strip_prefix(&self.home) {
            Ok(rest) => Ok(ServerPath(path_segments(rest))),
            Err(_) => Err(CompilerError::Location {
                path: absolute,
                root: self.home.clone(),
            }),
        }
    }
}

fn locate_webapp(home: &Path) -> Option<PathBuf> {
    let pattern = home.join("Server").join("lps-*").join("WEB-INF");
    let pattern = pattern.to_str()?;
    glob(pattern)
        .ok()?
        .filter_map(Result::ok)
        .next()
        .and_then(|web_inf| web_inf.parent().map(Path::to_path_buf))
}

fn symlink_aliases(home: &Path) -> Vec<RootAlias> {
    let Ok(entries) = std::fs::read_dir(home) else {
        return Vec::new();
    };

    let mut links: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_symlink()))
        .map(|entry| entry.path())
        .collect();
    links.sort();

    links
        .into_iter()
        .filter_map(|link| {
            let target = std::fs::read_link(&link).ok()?;
            let alias = link.file_name()?.to_str()?.to_string();
            Some(RootAlias::new(home.join(target), alias))
        })
        .collect()
}

/// Collapse `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
