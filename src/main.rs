//! polylower command line interface
//!
//! Usage:
//!   polylower [OPTIONS] <input-file>
//!   polylower --help
//!
//! Examples:
//!   polylower gemm.json                      # Print the lowered IR
//!   polylower --emit=scan gemm.json          # Print the scan AST only
//!   polylower --emit=all -vv gemm.json       # Both, with debug logging

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, error, info};
use polylower::utils::PrettyPrint;
use polylower::{codegen::print_scan_ast, LoweringConfig};
use std::fs;
use std::path::PathBuf;

/// polylower - lower scheduled polyhedral regions into structured IR
#[derive(Parser, Debug)]
#[command(name = "polylower")]
#[command(version)]
#[command(about = "Lowers a scheduled polyhedral region into a structured IR loop nest", long_about = None)]
struct Cli {
    /// SCoP description to lower (JSON)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, default_value = "ir")]
    emit: EmitKind,

    /// Keep each statement instance in its own block
    #[arg(long)]
    no_merge_blocks: bool,

    /// Prefix of generated loop variables
    #[arg(long, default_value = "c")]
    loop_prefix: String,

    /// Line width of the IR printer
    #[arg(long, default_value = "80")]
    width: usize,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Scan AST as C-like pseudo code
    Scan,
    /// Lowered IR
    Ir,
    /// Scan AST followed by the IR
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("polylower v{}", polylower::VERSION);
    debug!("Input file: {:?}", cli.input);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;

    let config = build_config(&cli);
    debug!("Lowering config: {:?}", config);

    let region = match polylower::lower_description(&source, &config) {
        Ok(region) => region,
        Err(e) => {
            error!("Lowering failed: {:#}", e);
            return Err(e);
        }
    };

    let output = match cli.emit {
        EmitKind::Scan => print_scan_ast(&region.scan),
        EmitKind::Ir => region.ir.pretty_print(cli.width)?,
        EmitKind::All => format!(
            "// scan AST\n{}\n// IR\n{}",
            print_scan_ast(&region.scan),
            region.ir.pretty_print(cli.width)?
        ),
    };
    write_output(&cli.output, &output)
}

fn build_config(cli: &Cli) -> LoweringConfig {
    LoweringConfig {
        merge_blocks: !cli.no_merge_blocks,
        loop_prefix: cli.loop_prefix.clone(),
        dump_scan_ast: false,
        verbosity: cli.verbose,
    }
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
