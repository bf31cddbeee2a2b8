//! rfm-runner: headless batch runner for the retail segmentation analysis.
//!
//! Usage:
//!   rfm-runner ingest  --input online_retail.json --db output/retail.db
//!   rfm-runner analyze --db output/retail.db [--config analysis.json]
//!   rfm-runner export-rfm --db output/retail.db [--run <run-id>]

use anyhow::Result;
use clap::{Parser, Subcommand};
use rfm_core::{
    config::AnalysisConfig,
    ingest::{load_raw_records, process_records},
    pipeline::AnalysisPipeline,
    report::LogReport,
    store::AnalysisStore,
    AnalysisError,
};

/// Retail RFM segmentation and churn-risk cohort comparison
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional JSON config; missing keys use the defaults
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a raw export and publish the sales, returns and calendar tables
    Ingest {
        /// Raw export (JSON array of rows)
        #[arg(short, long, default_value = "online_retail.json")]
        input: String,

        /// SQLite database to publish into
        #[arg(long, default_value = "output/retail.db")]
        db: String,
    },
    /// Score customers, persist the RFM table and compare cohorts
    Analyze {
        #[arg(long, default_value = "output/retail.db")]
        db: String,
    },
    /// Print a persisted RFM table as JSON lines
    ExportRfm {
        #[arg(long, default_value = "output/retail.db")]
        db: String,

        /// Run to export; defaults to the latest
        #[arg(long)]
        run: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    let result = match args.command {
        Command::Ingest { input, db } => run_ingest(&config, &input, &db),
        Command::Analyze { db } => run_analyze(config, &db),
        Command::ExportRfm { db, run } => run_export(&db, run),
    };

    if let Err(e) = &result {
        report_failure(e);
    }
    result.map_err(Into::into)
}

fn run_ingest(config: &AnalysisConfig, input: &str, db: &str) -> Result<(), AnalysisError> {
    let raw = load_raw_records(input)?;
    let output = process_records(&raw, &config.ingest)?;

    if let Some(parent) = std::path::Path::new(db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = AnalysisStore::open(db)?;
    store.migrate()?;
    store.replace_sales(&output.sales)?;
    store.replace_returns(&output.returns)?;
    store.replace_calendar(&output.calendar)?;

    log::info!("Data saved to {db}");
    Ok(())
}

fn run_analyze(config: AnalysisConfig, db: &str) -> Result<(), AnalysisError> {
    let store = AnalysisStore::open_existing(db)?;
    store.migrate()?;
    let pipeline = AnalysisPipeline::new(config, &store);
    pipeline.run(&mut LogReport)?;
    Ok(())
}

fn run_export(db: &str, run: Option<String>) -> Result<(), AnalysisError> {
    let store = AnalysisStore::open_existing(db)?;
    let run_id = match run {
        Some(id) => id,
        None => store.latest_run_id()?.ok_or_else(|| AnalysisError::MissingInput {
            location: format!("{db}#run"),
        })?,
    };
    let table = store
        .load_rfm_table(&run_id)?
        .ok_or_else(|| AnalysisError::MissingInput {
            location: format!("{db}#run/{run_id}"),
        })?;

    for record in &table.records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}

/// Log the whole failure before exiting, including every offending row.
fn report_failure(e: &AnalysisError) {
    log::error!("Analysis failed: {e}");
    match e {
        AnalysisError::SchemaViolation { dataset, violations } => {
            for v in violations {
                log::error!("  {dataset}: {v}");
            }
        }
        AnalysisError::DegenerateDistribution { .. } => {
            log::error!("  the customer population is too small or too uniform to score");
        }
        _ => {}
    }
}
