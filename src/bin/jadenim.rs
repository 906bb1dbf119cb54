//! jadenim CLI - compiles a parsed Jade template (JSON) into a Nim module

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
use jadenim::{ast::Node, wrap_module, CompileOptions, Compiler, NoFilters};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "jadenim")]
#[command(version)]
#[command(about = "Compile a parsed Jade template into Nim rendering code", long_about = None)]
struct Cli {
    /// Template path, reported in diagnostics
    filename: String,

    /// Nim type the generated `render` procedure takes as `self`
    typename: String,

    /// Template tree as JSON (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Output file path (writes to stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,

    /// Doctype to assume before the template declares one
    #[arg(short, long)]
    doctype: Option<String>,

    /// Emit every expression as a runtime call
    #[arg(long)]
    no_fold: bool,

    /// Print only the procedure body, without the module wrapper
    #[arg(long)]
    body_only: bool,
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = match cli.input {
        Some(ref path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let root: Node = serde_json::from_str(&json).map_err(jadenim::CompileError::from)?;

    let mut options = CompileOptions::new()
        .with_filename(cli.filename.clone())
        .with_typename(cli.typename.clone());
    if let Some(doctype) = cli.doctype {
        options = options.with_doctype(doctype);
    }
    if cli.no_fold {
        options = options.without_folding();
    }

    let output = Compiler::new(options, &NoFilters).compile(&root)?;
    let source = if cli.body_only {
        output.source
    } else {
        wrap_module(&output.source, Some(cli.typename.as_str()))
    };

    match cli.output {
        Some(path) => fs::write(path, source)?,
        None => io::stdout().write_all(source.as_bytes())?,
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("jadenim: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  jadenim <FILENAME> <TYPENAME> < template.json > template.nim");
}
