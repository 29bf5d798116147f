//! Command-line frontend for the IR type-inference engine.
//!
//! Modules travel as wire-encoded JSON (`{"tool": "ir_module", ...}`);
//! adapters in other processes produce and consume the same format.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lingo_core::stdlib::StdlibSignatures;
use lingo_core::type_system::TypeSystem;
use lingo_core::wire;
use lingo_core::ContextAnalyzer;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "lingo", version, about = "IR analysis for the Lingo code translator")]
struct Cli {
    /// Extend the stdlib signature table from a JSON file
    #[arg(long, global = true, value_name = "FILE")]
    stdlib: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run cross-function type inference and print the type map
    Analyze {
        /// Wire-encoded IR module (JSON)
        input: PathBuf,
    },
    /// Attach inferred types and emit the annotated module
    Annotate {
        /// Wire-encoded IR module (JSON)
        input: PathBuf,
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the call graph in DOT format
    Graph {
        /// Wire-encoded IR module (JSON)
        input: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "lingo=info,lingo_core=info",
        1 => "lingo=debug,lingo_core=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_module(path: &Path) -> Result<lingo_core::IRModule> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let module = wire::from_json(&json)
        .with_context(|| format!("cannot decode {}", path.display()))?;
    info!(
        module = %module.name,
        functions = module.all_functions().len(),
        "module loaded"
    );
    Ok(module)
}

fn build_type_system(stdlib_path: Option<&Path>) -> Result<TypeSystem> {
    let mut stdlib = StdlibSignatures::new();
    if let Some(path) = stdlib_path {
        let json = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let added = stdlib
            .load_json(&json)
            .with_context(|| format!("cannot parse signature table {}", path.display()))?;
        info!(added, "stdlib signatures loaded");
    }
    Ok(TypeSystem::new().with_stdlib(stdlib))
}

fn run(cli: Cli) -> Result<()> {
    let system = build_type_system(cli.stdlib.as_deref())?;
    match cli.command {
        Command::Analyze { input } => {
            let module = load_module(&input)?;
            let types = system.analyze_cross_function_types(&module);
            for (name, info) in &types {
                let name = name.to_string();
                let ty = info.ty.to_string();
                println!(
                    "{name:<40} {ty:<24} {:.2}  {}",
                    info.confidence,
                    info.source.as_str()
                );
            }
        }
        Command::Annotate { input, output } => {
            let mut module = load_module(&input)?;
            system.annotate_module(&mut module);
            let json = wire::to_json_pretty(&module);
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::Graph { input } => {
            let module = load_module(&input)?;
            let mut analyzer = ContextAnalyzer::new();
            analyzer.analyze_module(&module);
            print!("{}", analyzer.call_graph.to_dot());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("lingo: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_core::ir::{Expr, IRFunction, IRModule, Stmt};
    use std::io::Write;

    fn sample_module_file() -> tempfile::NamedTempFile {
        let mut module = IRModule::new("sample");
        module.functions.push(IRFunction::new(
            "get_name",
            vec![],
            vec![Stmt::ret(Expr::str("Alice"))],
        ));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(wire::to_json(&module).as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_module_round_trip() {
        let file = sample_module_file();
        let module = load_module(file.path()).unwrap();
        assert_eq!(module.name, "sample");
        assert_eq!(module.functions.len(), 1);
    }

    #[test]
    fn test_load_module_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(load_module(file.path()).is_err());
    }

    #[test]
    fn test_stdlib_table_loading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[{"path": "vendor.fetch", "returns": "string"}]"#)
            .unwrap();
        assert!(build_type_system(Some(file.path())).is_ok());
        assert!(build_type_system(None).is_ok());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["lingo", "-v", "analyze", "m.json"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Command::Analyze { .. }));

        let cli = Cli::try_parse_from([
            "lingo",
            "--stdlib",
            "sigs.json",
            "annotate",
            "m.json",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert!(cli.stdlib.is_some());
        assert!(matches!(
            cli.command,
            Command::Annotate {
                output: Some(_),
                ..
            }
        ));
    }
}
