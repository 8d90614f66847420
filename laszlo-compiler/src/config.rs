//! Compiler configuration

use laszlo_core::DEFAULT_RUNTIME;
use std::path::PathBuf;

use crate::server_root::RootAlias;

/// Environment variable naming the OpenLaszlo installation
pub const HOME_VAR: &str = "OPENLASZLO_HOME";

/// Environment variable naming the compile server's base URL
pub const URL_VAR: &str = "OPENLASZLO_URL";

/// Everything needed to choose and build a compiler
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Filesystem location of the OpenLaszlo SDK or server
    pub home: Option<PathBuf>,
    /// Base URL of a running compile server
    pub server_url: Option<String>,
    /// Explicit `lzc` script, bypassing the search under `home`
    pub compiler_script: Option<PathBuf>,
    /// Runtime applied when a compile call doesn't name one
    pub default_runtime: String,
    /// Extra directories mapped into the server root
    pub aliases: Vec<RootAlias>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            home: None,
            server_url: None,
            compiler_script: None,
            default_runtime: DEFAULT_RUNTIME.to_string(),
            aliases: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Read `OPENLASZLO_HOME` and `OPENLASZLO_URL` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup.
    ///
    /// Test harnesses use this to get an isolated configuration without
    /// touching the process environment. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            home: get(HOME_VAR).map(PathBuf::from),
            server_url: get(URL_VAR),
            ..Self::default()
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn with_compiler_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.compiler_script = Some(script.into());
        self
    }

    pub fn with_default_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.default_runtime = runtime.into();
        self
    }

    pub fn with_alias(mut self, alias: RootAlias) -> Self {
        self.aliases.push(alias);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_both_variables() {
        let config = CompilerConfig::from_lookup(lookup(&[
            (HOME_VAR, "/opt/lps"),
            (URL_VAR, "http://localhost:8080/lps-4.0"),
        ]));
        assert_eq!(config.home, Some(PathBuf::from("/opt/lps")));
        assert_eq!(config.server_url.as_deref(), Some("http://localhost:8080/lps-4.0"));
        assert_eq!(config.default_runtime, DEFAULT_RUNTIME);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = CompilerConfig::from_lookup(lookup(&[(HOME_VAR, ""), (URL_VAR, "  ")]));
        assert!(config.home.is_none());
        assert!(config.server_url.is_none());
    }
}
