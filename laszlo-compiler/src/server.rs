//! Bridge to the OpenLaszlo compile server
//!
//! The server is much faster than `lzc`, but it can only compile files that
//! lie inside its own document root.

use laszlo_core::{
    default_output_path, CompileOptions, CompileResult, DEFAULT_FORMAT, METADATA_FORMAT,
};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::interpreter::{Diagnostics, OutputInterpreter, StandardInterpreter};
use crate::server_root::{RootAlias, ServerRoot};
use crate::CompilerError;

/// Server location used when none is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/lps-dev";

/// Compiler that issues requests to a running OpenLaszlo server
pub struct CompileServer {
    root: ServerRoot,
    base_url: String,
    client: Client,
    interpreter: Arc<dyn OutputInterpreter>,
}

impl CompileServer {
    /// Create a bridge to the server installed at `home`.
    ///
    /// `server_url` defaults to [`DEFAULT_SERVER_URL`].
    pub fn new(home: impl Into<PathBuf>, server_url: Option<&str>) -> Self {
        Self::with_root(ServerRoot::discover(home), server_url)
    }

    pub fn with_root(root: ServerRoot, server_url: Option<&str>) -> Self {
        let base_url = server_url
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim_end_matches('/')
            .to_string();

        Self {
            root,
            base_url,
            client: Client::new(),
            interpreter: Arc::new(StandardInterpreter),
        }
    }

    /// Map an extra directory into the server root, ahead of discovered links
    pub fn with_alias(mut self, alias: RootAlias) -> Self {
        self.root = self.root.with_alias(alias);
        self
    }

    pub fn with_interpreter(mut self, interpreter: Arc<dyn OutputInterpreter>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn root(&self) -> &ServerRoot {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Compile `source` on the server.
    ///
    /// The artifact is requested first and written to the output path, then
    /// the metadata is requested for warnings and errors. `format` selects
    /// the artifact's request type (default `swf`).
    pub fn compile(
        &self,
        source: &Path,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompilerError> {
        let mtime = modified(source)?;
        let output = match &options.output {
            Some(output) => output.clone(),
            None => {
                let absolute = std::path::absolute(source)?;
                default_output_path(&absolute, options.runtime_or_default())?
            }
        };

        self.compile_object(source, &output, options)?;
        let diagnostics = self.request_metadata(source, options)?;

        if modified(source)? != mtime {
            return Err(CompilerError::RaceCondition(source.to_path_buf()));
        }
        if let Some(error) = diagnostics.error {
            return Err(CompilerError::Compilation(error));
        }

        tracing::info!(
            "Compiled {} -> {} on server ({} warnings)",
            source.display(),
            output.display(),
            diagnostics.warnings.len()
        );
        Ok(CompileResult::success(output, diagnostics.warnings))
    }

    fn compile_object(
        &self,
        source: &Path,
        output: &Path,
        options: &CompileOptions,
    ) -> Result<(), CompilerError> {
        let format = options.format.as_deref().unwrap_or(DEFAULT_FORMAT);
        let mut response = self.request(source, options, format)?;

        let mut file = File::create(output)?;
        response.copy_to(&mut file)?;
        Ok(())
    }

    fn request_metadata(
        &self,
        source: &Path,
        options: &CompileOptions,
    ) -> Result<Diagnostics, CompilerError> {
        let body = self.request(source, options, METADATA_FORMAT)?.text()?;
        Ok(self.interpreter.interpret_metadata(&body))
    }

    fn request(
        &self,
        source: &Path,
        options: &CompileOptions,
        format: &str,
    ) -> Result<Response, CompilerError> {
        let url = self.request_url(source, options, format)?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url.clone()).send()?;
        if response.status() != StatusCode::OK {
            return Err(CompilerError::Transport {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response)
    }

    /// URL that asks the server to compile `source` into `format`
    pub fn request_url(
        &self,
        source: &Path,
        options: &CompileOptions,
        format: &str,
    ) -> Result<Url, CompilerError> {
        let absolute = std::path::absolute(source)?;
        let server_path = self.root.resolve(&absolute)?;

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            CompilerError::Configuration(format!("invalid server URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                CompilerError::Configuration(format!(
                    "server URL {} cannot have a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(server_path.segments());

        let params = query_params(options, format);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

/// Query parameters for a request, in wire order, with unset keys omitted
fn query_params(options: &CompileOptions, format: &str) -> Vec<(&'static str, String)> {
    let params = [
        ("lzr", options.runtime.clone()),
        ("debug", options.debug.map(|d| d.to_string())),
        // an unset `proxied` is sent as false
        ("lzproxied", Some(options.proxied.unwrap_or(false).to_string())),
        ("lzt", Some(format.to_string())),
    ];

    params
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect()
}

fn modified(path: &Path) -> Result<SystemTime, CompilerError> {
    Ok(std::fs::metadata(path)?.modified()?)
}
