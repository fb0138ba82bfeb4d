use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use tempo_cli::{run, BatchConfig, EmitKind};

/// Rewrite source trees so private mutable state can be checkpointed and
/// rolled back.
#[derive(Parser)]
#[command(name = "tempo", version, about)]
struct Cli {
    /// Tree files, directories, or @listfile indirections
    #[arg(required = true)]
    inputs: Vec<String>,

    /// External symbol table (JSON); repeatable
    #[arg(long = "symbols", value_name = "FILE")]
    symbol_tables: Vec<PathBuf>,

    /// Package prefix applied to rewritten output
    #[arg(long, short = 'p')]
    prefix: Option<String>,

    /// Output root directory (default: stdout)
    #[arg(long, short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long, short = 'w')]
    overwrite: bool,

    /// Write the fully qualified names of rewritten classes here
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output form
    #[arg(long, value_enum, default_value_t = Emit::Java)]
    emit: Emit,

    /// Also rewrite static private fields
    #[arg(long)]
    static_fields: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Java,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = BatchConfig {
        inputs: cli.inputs,
        symbol_tables: cli.symbol_tables,
        prefix: cli.prefix,
        output_root: cli.output,
        overwrite: cli.overwrite,
        config_out: cli.config,
        emit: match cli.emit {
            Emit::Java => EmitKind::Java,
            Emit::Json => EmitKind::Json,
        },
        rewrite_static_fields: cli.static_fields,
    };

    let report = run(&config)?;
    eprintln!(
        "{} unit(s) rewritten, {} failed",
        report.processed, report.failed
    );
    Ok(if report.failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
