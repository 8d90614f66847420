//! Compiler selection and the process-wide default compiler

use laszlo_core::{CompileOptions, CompileResult};
use parking_lot::{const_mutex, Mutex};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::command_line::CommandLineCompiler;
use crate::config::{CompilerConfig, HOME_VAR, URL_VAR};
use crate::server::CompileServer;
use crate::server_root::ServerRoot;
use crate::CompilerError;

/// A way of compiling a single source file
pub trait CompileStrategy: Send + Sync {
    fn compile(&self, source: &Path, options: &CompileOptions)
        -> Result<CompileResult, CompilerError>;

    fn kind(&self) -> CompilerKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerKind {
    Server,
    CommandLine,
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerKind::Server => write!(f, "compile server"),
            CompilerKind::CommandLine => write!(f, "command-line compiler"),
        }
    }
}

impl CompileStrategy for CompileServer {
    fn compile(
        &self,
        source: &Path,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompilerError> {
        CompileServer::compile(self, source, options)
    }

    fn kind(&self) -> CompilerKind {
        CompilerKind::Server
    }
}

impl CompileStrategy for CommandLineCompiler {
    fn compile(
        &self,
        source: &Path,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompilerError> {
        CommandLineCompiler::compile(self, source, options)
    }

    fn kind(&self) -> CompilerKind {
        CompilerKind::CommandLine
    }
}

/// The strategy chosen for a configuration
pub enum Compiler {
    Server(CompileServer),
    CommandLine(CommandLineCompiler),
}

impl Compiler {
    /// Choose a strategy.
    ///
    /// The compile server is preferred since it is much faster; it needs both
    /// a home and a URL. A home alone (or an explicit `lzc` script) selects
    /// the command-line compiler.
    pub fn select(config: &CompilerConfig) -> Result<Self, CompilerError> {
        match (&config.home, &config.server_url) {
            (Some(home), Some(url)) => {
                let root = ServerRoot::discover(home).with_aliases(config.aliases.iter().cloned());
                Ok(Compiler::Server(CompileServer::with_root(root, Some(url.as_str()))))
            }
            (Some(_), None) => Ok(Compiler::CommandLine(command_line_compiler(config)?)),
            (None, _) if config.compiler_script.is_some() => {
                Ok(Compiler::CommandLine(command_line_compiler(config)?))
            }
            (None, _) => Err(CompilerError::Configuration(format!(
                "Couldn't find an OpenLaszlo compiler. \
                 To use the compile server (recommended), set {} and {}. \
                 To use the command-line compiler, set {}.",
                URL_VAR, HOME_VAR, HOME_VAR
            ))),
        }
    }

    fn strategy(&self) -> &dyn CompileStrategy {
        match self {
            Compiler::Server(server) => server,
            Compiler::CommandLine(lzc) => lzc,
        }
    }
}

impl CompileStrategy for Compiler {
    fn compile(
        &self,
        source: &Path,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompilerError> {
        self.strategy().compile(source, options)
    }

    fn kind(&self) -> CompilerKind {
        self.strategy().kind()
    }
}

fn command_line_compiler(config: &CompilerConfig) -> Result<CommandLineCompiler, CompilerError> {
    match (&config.compiler_script, &config.home) {
        (Some(script), home) => Ok(CommandLineCompiler::with_script(script, home.clone())),
        (None, Some(home)) => CommandLineCompiler::new(home),
        (None, None) => Err(CompilerError::Configuration(format!(
            "a compiler script or {} must be specified",
            HOME_VAR
        ))),
    }
}

/// Compiles through whichever strategy the configuration selects
pub struct CompilerFacade {
    config: CompilerConfig,
    compiler: Compiler,
}

impl CompilerFacade {
    pub fn new(config: CompilerConfig) -> Result<Self, CompilerError> {
        let compiler = Compiler::select(&config)?;
        tracing::info!("Using the OpenLaszlo {}", compiler.kind());
        Ok(Self { config, compiler })
    }

    pub fn from_env() -> Result<Self, CompilerError> {
        Self::new(CompilerConfig::from_env())
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn kind(&self) -> CompilerKind {
        self.compiler.kind()
    }

    /// Compile `source`, applying the default runtime if none is given.
    ///
    /// A source outside the server root is compiled once with the
    /// command-line compiler instead; the selection itself is unchanged.
    pub fn compile(
        &self,
        source: &Path,
        options: &CompileOptions,
    ) -> Result<CompileResult, CompilerError> {
        let options = options
            .clone()
            .with_default_runtime(&self.config.default_runtime);

        match self.compiler.compile(source, &options) {
            Err(err) if err.is_location() => {
                tracing::warn!("{}; falling back to the command-line compiler", err);
                command_line_compiler(&self.config)?.compile(source, &options)
            }
            result => result,
        }
    }
}

static DEFAULT_COMPILER: Mutex<Option<Arc<CompilerFacade>>> = const_mutex(None);

/// The process-wide compiler, selected from the environment on first use.
///
/// A failed selection is not cached, so fixing the environment and calling
/// again works.
pub fn default_compiler() -> Result<Arc<CompilerFacade>, CompilerError> {
    let mut slot = DEFAULT_COMPILER.lock();
    if let Some(facade) = slot.as_ref() {
        return Ok(Arc::clone(facade));
    }

    let facade = Arc::new(CompilerFacade::from_env()?);
    *slot = Some(Arc::clone(&facade));
    Ok(facade)
}

/// Replace the process-wide compiler, returning the previous one
pub fn set_default_compiler(facade: CompilerFacade) -> Option<Arc<CompilerFacade>> {
    DEFAULT_COMPILER.lock().replace(Arc::new(facade))
}

/// Forget the process-wide compiler so the next use re-reads the environment
pub fn reset_default_compiler() {
    DEFAULT_COMPILER.lock().take();
}

/// Compile `source` with the process-wide compiler
pub fn compile(
    source: impl AsRef<Path>,
    options: &CompileOptions,
) -> Result<CompileResult, CompilerError> {
    default_compiler()?.compile(source.as_ref(), options)
}
