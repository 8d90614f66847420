//! Bridge to the OpenLaszlo compilers
//!
//! Two strategies compile `.lzx` sources: [`CompileServer`] talks to a
//! running OpenLaszlo server over HTTP, and [`CommandLineCompiler`] runs the
//! `lzc` script as a subprocess. [`CompilerFacade`] selects between them from
//! a [`CompilerConfig`] and normalizes both into a `CompileResult`.

pub mod command_line;
pub mod config;
pub mod error;
pub mod facade;
pub mod interpreter;
pub mod server;
pub mod server_root;

pub use command_line::CommandLineCompiler;
pub use config::CompilerConfig;
pub use error::CompilerError;
pub use facade::{
    compile, default_compiler, reset_default_compiler, set_default_compiler, CompileStrategy,
    Compiler, CompilerFacade, CompilerKind,
};
pub use interpreter::{Diagnostics, OutputInterpreter, StandardInterpreter};
pub use server::CompileServer;
pub use server_root::{RootAlias, ServerPath, ServerRoot};
