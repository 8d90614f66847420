//! OpenLaszlo command-line bridge
//!
//! Compiles `.lzx` applications through the compile server or `lzc`,
//! whichever the environment (or the flags below) configure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use laszlo_applet::{Applet, BuildRule};
use laszlo_compiler::{CompilerConfig, CompilerError, CompilerFacade};
use laszlo_core::{default_output_path, CompileOptions, CompileResult};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "openlaszlo", about = "Compile OpenLaszlo applications")]
struct Cli {
    /// OpenLaszlo installation (overrides OPENLASZLO_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Compile server base URL (overrides OPENLASZLO_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Explicit lzc script
    #[arg(long, global = true)]
    compiler_script: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile a single source file
    Compile {
        source: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        runtime: Option<String>,
        #[arg(long)]
        debug: bool,
        #[arg(long)]
        profile: bool,
        #[arg(long)]
        proxied: bool,
        /// Server request type
        #[arg(long)]
        format: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build `.swf` targets from the `.lzx` files next to them
    Build {
        #[arg(required = true)]
        targets: Vec<PathBuf>,
    },
    /// Compile an applet unless its target is up to date
    Applet {
        source: PathBuf,
        #[arg(short, long)]
        target: Option<PathBuf>,
        #[arg(short, long)]
        force: bool,
    },
    /// List the files an applet loads at runtime
    Assets { source: PathBuf },
    /// Copy an applet's JavaScript into a directory, rewriting it on the way
    Preprocess {
        source: PathBuf,
        dir: PathBuf,
        #[arg(short, long)]
        force: bool,
    },
    /// Show which compiler the configuration selects
    Which,
}

impl Cli {
    fn config(&self) -> CompilerConfig {
        let mut config = CompilerConfig::from_env();
        if let Some(home) = &self.home {
            config = config.with_home(home);
        }
        if let Some(url) = &self.url {
            config = config.with_server_url(url);
        }
        if let Some(script) = &self.compiler_script {
            config = config.with_compiler_script(script);
        }
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,openlaszlo=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match cli.cmd {
        Cmd::Compile {
            source,
            output,
            runtime,
            debug,
            profile,
            proxied,
            format,
            json,
        } => {
            let compiler = CompilerFacade::new(config)?;
            let options = CompileOptions {
                debug: debug.then_some(true),
                runtime,
                output,
                proxied: proxied.then_some(true),
                format,
                profile: profile.then_some(true),
            };
            cmd_compile(&compiler, source, &options, json)
        }
        Cmd::Build { targets } => {
            let compiler = CompilerFacade::new(config)?;
            let rule = BuildRule::lzx_to_swf();
            for target in &targets {
                let result = rule.build(&compiler, target)?;
                report_warnings(&result);
            }
            Ok(())
        }
        Cmd::Applet {
            source,
            target,
            force,
        } => {
            let compiler = CompilerFacade::new(config)?;
            let applet = Applet::new(source);
            match applet.compile(&compiler, target.as_deref(), &CompileOptions::new(), force)? {
                Some(result) => {
                    report_warnings(&result);
                    println!("{}", result.output.display());
                }
                None => println!("{} is up to date", applet.source().display()),
            }
            Ok(())
        }
        Cmd::Assets { source } => {
            for asset in Applet::new(source).runtime_assets()? {
                println!("{}", asset.display());
            }
            Ok(())
        }
        Cmd::Preprocess { source, dir, force } => {
            let written = Applet::new(source).preprocess_to(&dir, force)?;
            println!("{} file(s) written to {}", written, dir.display());
            Ok(())
        }
        Cmd::Which => {
            let compiler = CompilerFacade::new(config)?;
            println!("{}", compiler.kind());
            Ok(())
        }
    }
}

fn cmd_compile(
    compiler: &CompilerFacade,
    source: PathBuf,
    options: &CompileOptions,
    json: bool,
) -> Result<()> {
    let result = match compiler.compile(&source, options) {
        Ok(result) => result,
        Err(CompilerError::Compilation(message)) if json => {
            let output = failure_output(&source, options, &compiler.config().default_runtime)?;
            let failure = CompileResult::failure(output, message);
            println!("{}", failure.to_json()?);
            anyhow::bail!("Failed to compile {}", source.display());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to compile {}", source.display()))
        }
    };

    report_warnings(&result);
    if json {
        println!("{}", result.to_json()?);
    } else {
        println!("{}", result.output.display());
    }
    Ok(())
}

/// Where the failed compile would have written its artifact
fn failure_output(
    source: &Path,
    options: &CompileOptions,
    default_runtime: &str,
) -> Result<PathBuf> {
    if let Some(output) = &options.output {
        return Ok(output.clone());
    }
    let runtime = options.runtime.as_deref().unwrap_or(default_runtime);
    Ok(default_output_path(&std::path::absolute(source)?, runtime)?)
}

fn report_warnings(result: &CompileResult) {
    for warning in &result.warnings {
        tracing::warn!("{}", warning);
        eprintln!("warning: {}", warning);
    }
}
