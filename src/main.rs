use billflags::prelude::*;
use billflags::{PatternSet, TextNormalizer};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build outcome-labelled bill datasets from legislative exports
#[derive(Parser, Debug)]
#[command(name = "billflags")]
#[command(about = "Classify bill outcomes, clean bill text and write one dataset per era")]
#[command(version)]
struct Args {
    /// Log debug output; ignored when RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Directory of extracted text, laid out as <NNN>th/<HB|SB>NNNN.txt
    #[arg(long = "text-dir", env = "BILLFLAGS_TEXT_DIR")]
    text_dir: Option<PathBuf>,

    /// Directory the era artifact is written to
    #[arg(long = "out-dir", env = "BILLFLAGS_OUT_DIR", default_value = "data")]
    out_dir: PathBuf,

    /// YAML file overriding the built-in pattern sets
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Sessions to keep (e.g. --session 109 110). Defaults to all
    #[arg(long = "session", num_args = 1..)]
    sessions: Vec<u32>,

    /// Write the dataset to stdout instead of the out directory
    #[arg(long)]
    stdout: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the current-era dataset from the API bill export (JSON)
    Current {
        /// JSON array of bill objects with embedded actions
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Build the legacy-era dataset from the bulk CSV export
    Legacy {
        /// Directory holding tn_bills.csv, tn_bill_actions.csv and tn_bill_sponsors.csv
        #[arg(long = "input-dir")]
        input_dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the default pattern configuration as YAML
    Patterns,

    /// Normalize one raw text file (or stdin) and print the result
    Normalize {
        /// Raw text file; reads stdin when omitted
        file: Option<PathBuf>,

        /// YAML file overriding the built-in pattern sets
        #[arg(long)]
        patterns: Option<PathBuf>,
    },
}

fn print_available_commands() {
    println!("Available commands:");
    println!("  current    Build the current-era dataset from the API export");
    println!("  legacy     Build the legacy-era dataset from the bulk CSV export");
    println!("  patterns   Print the default pattern configuration");
    println!("  normalize  Normalize one raw bill text");
}

/// RUST_LOG directives win over `-v`; invalid directives fall back to the flag
fn env_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(default_level.into()))
}

fn init_tracing(verbose: bool) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, directives.as_deref()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn run_era(era: Era, input: PathBuf, run: RunArgs) -> anyhow::Result<()> {
    let mut builder = ConfigBuilder::new(era, input)
        .out_dir(run.out_dir)
        .sessions(run.sessions);

    if let Some(text_dir) = run.text_dir {
        builder = builder.text_dir(text_dir);
    }
    if let Some(patterns) = run.patterns {
        builder = builder.patterns_file(patterns)?;
    }

    let config = builder.build()?;
    let processor = PipelineProcessor::new(config)?;

    let report = if run.stdout {
        let (records, report) = processor.run().await?;
        billflags::Emitter::to_writer(io::stdout().lock(), &records)?;
        println!();
        report
    } else {
        processor.run_and_emit().await?
    };

    for rejection in &report.rejected {
        tracing::debug!(error = %rejection, "rejection detail");
    }
    tracing::info!(
        era = %era,
        rows = report.rows,
        rejected = report.rejected.len(),
        skipped = report.skipped,
        missing_text = report.missing_text,
        artifact = ?report.artifact,
        "done"
    );

    Ok(())
}

fn run_normalize(file: Option<PathBuf>, patterns: Option<PathBuf>) -> anyhow::Result<()> {
    let patterns = match patterns {
        Some(path) => billflags::load_patterns(path)?,
        None => PatternSet::default(),
    };
    let normalizer = TextNormalizer::new(&patterns.text)?;

    let bytes = match file {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            buf
        }
    };

    let raw = billflags::normalizer::decode_latin1(&bytes);
    println!("{}", normalizer.normalize(&raw));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Some(Command::Current { input, run }) => run_era(Era::Current, input, run).await,
        Some(Command::Legacy { input_dir, run }) => run_era(Era::Legacy, input_dir, run).await,
        Some(Command::Patterns) => {
            print!("{}", PatternSet::default().to_yaml()?);
            Ok(())
        }
        Some(Command::Normalize { file, patterns }) => run_normalize(file, patterns),
        None => {
            print_available_commands();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_rust_log_overrides_verbose_flag() {
        let filter = env_filter(false, Some("warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = env_filter(true, Some("error"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_verbose_flag_without_rust_log() {
        assert_eq!(env_filter(false, None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(env_filter(true, None).max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
