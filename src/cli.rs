//! Thin `clap`-based front end for the `hqlc` binary.
//!
//! Deliberately not a general-purpose HQL CLI: no REPL, no bundler
//! invocation, no execution of the emitted JS. It reads a file, drives
//! [`crate::compile_entry`], and prints either the JSON-serialized target
//! AST for every compiled module or a rendered `miette` diagnostic.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::GraphicalReportHandler;

use crate::config::{CompileConfig, Target};
use crate::pipeline::compile_entry;

#[derive(Parser, Debug)]
#[command(name = "hqlc", about = "Compiles HQL source to ECMAScript modules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compiles `file` and the local modules it imports, printing the
    /// JSON-serialized target AST for each compiled module.
    Compile {
        file: PathBuf,
        /// Emits TypeScript (type annotations preserved) instead of JS.
        #[arg(long)]
        ts: bool,
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,
        #[arg(long, default_value_t = 100)]
        max_depth: usize,
        /// Pretty-prints the JSON output instead of one line per module.
        #[arg(long)]
        pretty: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Compile { file, ts, max_iterations, max_depth, pretty } => {
            handle_compile(&file, ts, max_iterations, max_depth, pretty)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            render_diagnostic(&err);
            ExitCode::FAILURE
        }
    }
}

fn handle_compile(
    file: &std::path::Path,
    ts: bool,
    max_iterations: usize,
    max_depth: usize,
    pretty: bool,
) -> Result<(), crate::HqlError> {
    let source_dir = file.parent().map(std::path::Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let config = CompileConfig {
        target: if ts { Target::Ts } else { Target::Js },
        max_iterations,
        max_depth,
        source_dir,
        ..CompileConfig::default()
    };
    let modules = compile_entry(file, &config)?;
    for module in &modules {
        tracing::debug!(path = %module.path.display(), "compiled module");
        let json = if pretty {
            serde_json::to_string_pretty(&module.js)
        } else {
            serde_json::to_string(&module.js)
        }
        .expect("JsModule serialization is infallible");
        println!("{json}");
    }
    Ok(())
}

fn render_diagnostic(err: &crate::HqlError) {
    let mut rendered = String::new();
    let handler = GraphicalReportHandler::new();
    if handler.render_report(&mut rendered, err).is_ok() {
        eprint!("{rendered}");
    } else {
        eprintln!("{err}");
    }
}
