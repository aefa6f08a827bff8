// ========================================================================================
//
//                          The thin batch driver: Fagerstrom
//
// ========================================================================================
//
// The engine has no CLI surface of its own; this driver accepts an input
// table, an output location, and a cohort config, runs the pipeline once over
// the batch, and prints the QC summary. Per-respondent failures never abort a
// run: every input row comes back out, score fields absent where scoring could
// not be performed. A nonzero exit code means a batch-level failure (bad
// config, unreadable input, unwritable output), nothing else.

#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::Parser;
use fagerstrom::config::EngineConfig;
use fagerstrom::data::{read_respondents, write_scored};
use fagerstrom::pipeline::Engine;
use fagerstrom::validate;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(
    name = "fagerstrom",
    version,
    about = "An engine for standardized FTND nicotine-dependence scoring of survey data."
)]
struct Args {
    /// Input respondent table (CSV, one row per respondent).
    #[clap(value_name = "INPUT")]
    input: PathBuf,

    /// Output path for the scored table. Refused if the file already exists.
    #[clap(value_name = "OUTPUT")]
    output: PathBuf,

    /// Cohort configuration (TOML): column map, missing sentinels, scoring
    /// policy.
    #[clap(long, value_name = "TOML")]
    config: PathBuf,

    /// Optional path for a machine-readable QC summary (JSON).
    #[clap(long, value_name = "JSON")]
    qc_report: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let start = Instant::now();

    let config = EngineConfig::load(&args.config)?;
    let table = read_respondents(&args.input, &config.columns)?;
    let rounding = config.scoring.rounding();

    let engine = Engine::new(config);
    let scored = engine.score_batch(&table.records);

    write_scored(&args.output, &table, &scored, rounding)?;

    let summary = validate::summarize(&scored);
    eprintln!("{summary}");
    if let Some(path) = &args.qc_report {
        summary.write_json(path)?;
        log::info!("wrote QC report to '{}'", path.display());
    }

    eprintln!(
        "> Scored {} of {} respondents in {:.2?}.",
        summary.rows_scored,
        summary.rows_total,
        start.elapsed()
    );
    Ok(())
}
