use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Reorganizes a raw equation-application debug log into an indented,
/// human-readable report.
#[derive(Debug, Parser)]
#[command(name = "kdebug-eqlog", version)]
struct Args {
    /// Equation-application log produced by the proof engine
    input: PathBuf,
    /// Where to write the rendered report
    output: PathBuf,
    /// Inline referenced source snippets into the report (best-effort)
    #[arg(long)]
    resolve_equation_sources: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.input) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: could not read {}: {err}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let rendered = match kdebug_eqlog::process(&text, args.resolve_equation_sources) {
        Ok(rendered) => rendered,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = std::fs::write(&args.output, rendered) {
        eprintln!("error: could not write {}: {err}", args.output.display());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
