use anyhow::Result;
use clap::Parser;
use salesdw::{
    config::PipelineConfig,
    logging::init_logging,
    pipeline::{Pipeline, PipelineOutcome},
};
use std::{path::PathBuf, process::ExitCode};
use tracing::info;

/// Load customers, products and sales extracts into the sales star schema.
///
/// Every option is optional; defaults read `data/raw/*_data.csv` and write
/// `data/dw/smart_sales.db`.
#[derive(Parser, Debug)]
#[command(name = "salesdw", version)]
struct Cli {
    /// YAML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory relative source names resolve against [default: data/raw]
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Customers source [default: customers_data.csv]
    #[arg(long)]
    customers: Option<PathBuf>,

    /// Products source [default: products_data.csv]
    #[arg(long)]
    products: Option<PathBuf>,

    /// Sales source [default: sales_data.csv]
    #[arg(long)]
    sales: Option<PathBuf>,

    /// Warehouse database file [default: data/dw/smart_sales.db]
    #[arg(long)]
    database: Option<PathBuf>,

    /// Also write cleaned sources as CSV into this directory
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Field delimiter of the sources [default: ,]
    #[arg(long)]
    delimiter: Option<char>,

    /// Keep fully empty rows and columns
    #[arg(long)]
    keep_empty: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging for this crate (ignored when RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> salesdw::Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(v) = self.raw_dir {
            cfg.raw_dir = v;
        }
        if let Some(v) = self.customers {
            cfg.customers = v;
        }
        if let Some(v) = self.products {
            cfg.products = v;
        }
        if let Some(v) = self.sales {
            cfg.sales = v;
        }
        if let Some(v) = self.database {
            cfg.database = v;
        }
        if let Some(v) = self.processed_dir {
            cfg.processed_dir = Some(v);
        }
        if let Some(v) = self.delimiter {
            cfg.delimiter = v;
        }
        if self.keep_empty {
            cfg.drop_fully_empty = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json = cli.json;

    let outcome = match cli.into_config() {
        Ok(cfg) => {
            info!(database = %cfg.database.display(), raw_dir = %cfg.raw_dir.display(), "startup");
            Pipeline::new(cfg).run()
        }
        Err(e) => PipelineOutcome::config_failure(e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }

    match outcome.failure_line() {
        None => Ok(ExitCode::SUCCESS),
        Some(line) => {
            eprintln!("{}", line);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(outcome: &PipelineOutcome) {
    println!("state: {}", outcome.state);
    for t in &outcome.tables {
        let extracted = t
            .rows_extracted
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        let cleaned = t
            .scrub
            .as_ref()
            .map_or_else(|| "-".to_string(), |s| s.rows_after.to_string());
        print!(
            "{:<10} extracted={:<6} cleaned={:<6}",
            t.table, extracted, cleaned
        );
        match &t.load {
            Some(l) => println!(
                " loaded={:<6} missing_key={} invalid_date={} orphan={}",
                l.rows_loaded,
                l.rows_rejected_missing_key,
                l.rows_rejected_invalid_date,
                l.rows_rejected_orphan
            ),
            None => println!(" loaded=-"),
        }
    }
}
