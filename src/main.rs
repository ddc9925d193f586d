//! Quack Compiler CLI
//!
//! Command-line interface for compiling a parsed Quack program to
//! textual stack-machine assembly.

use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "quackc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Quack compiler - compile a parsed Quack program to stack-machine assembly", long_about = None)]
struct Cli {
    /// Parsed source unit (see `quackc::ast::ParsedUnit`)
    source: PathBuf,

    /// Builtin type table (JSON)
    #[arg(long, default_value = "builtins.json")]
    builtins: PathBuf,

    /// Name for the synthesised main class
    #[arg(long, default_value = "Main")]
    name: String,

    /// Dump the AST and stop: once for the raw parsed unit, twice for the
    /// post-desugar/post-class-loading tree
    #[arg(short, long, action = clap::ArgAction::Count)]
    tree: u8,

    /// Verbose diagnostics on error
    #[arg(short, long)]
    verbose: bool,

    /// Print the generated class names on success
    #[arg(short, long)]
    list: bool,

    /// Output directory for generated `.asm` files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.tree > 0 {
        run_tree(&cli.source, cli.tree);
        return;
    }

    run_build(&cli.source, &cli.builtins, &cli.name, &cli.out_dir, cli.list, cli.verbose);
}

fn run_tree(source: &std::path::Path, depth: u8) {
    let text = match std::fs::read_to_string(source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: could not read {}: {e}", source.display());
            process::exit(1);
        }
    };
    let unit: quackc::ParsedUnit = match serde_json::from_str(&text) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Error: could not parse {}: {e}", source.display());
            process::exit(1);
        }
    };

    if depth == 1 {
        println!("{:#?}", unit);
        return;
    }

    let mut program = quackc::Program { classes: unit.classes };
    quackc::mainblock::synthesize_main(&mut program, "Main", unit.top_level, quackc::Span::default());
    if let Err(e) = quackc::desugar::desugar_program(&mut program) {
        eprintln!("Error: {}", e.with_source_name(source.to_string_lossy().into_owned()));
        process::exit(1);
    }
    quackc::loader::attach_constructors(&mut program);
    println!("{:#?}", program);
}

fn run_build(source: &std::path::Path, builtins: &std::path::Path, name: &str, out_dir: &std::path::Path, list: bool, verbose: bool) {
    tracing::debug!(source = %source.display(), "starting compile");
    match quackc::compile_file(source, name, builtins, out_dir) {
        Ok(classes) => {
            println!("Compiled {} -> {}", source.display(), out_dir.display());
            if list {
                println!("{}", classes.join(" "));
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "compile failed");
            eprintln!("Error: {}", e);
            if verbose {
                eprintln!("kind: {:?}", e.kind);
            }
            process::exit(1);
        }
    }
}
