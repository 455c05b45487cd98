use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use market_data_ingestor::providers::{csv_dir::CsvDirProvider, yahoo_chart::YahooChartProvider};
use shared_utils::env::get_env_var;
use tod_analyzer::{
    config::{self, AnalysisConfig},
    pipeline::{self, AnalysisRun, SharedProvider},
    report::{CsvExporter, MetadataRow},
    summary, universe,
};
use tracing::{error, info};

const CONFIG_ENV: &str = "TOD_ANALYZER_CONFIG";

#[derive(Parser)]
#[command(version, about = "Time-of-day intraday pattern analyzer")]
struct Cli {
    /// Config TOML; falls back to $TOD_ANALYZER_CONFIG, then built-in defaults.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = Source::Yahoo)]
    source: Source,

    /// Directory of `<SYMBOL>_<timeframe>.csv` exports (with `--source csv`).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Overrides `[output] dir`.
    #[arg(long, global = true, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Yahoo,
    Csv,
}

impl Source {
    fn label(self) -> &'static str {
        match self {
            Source::Yahoo => "Yahoo Finance chart API",
            Source::Csv => "CSV exports",
        }
    }
}

#[derive(Clone, Copy, Subcommand)]
enum Cmd {
    /// Screen, analyze, export every table and print the dashboards.
    Analyze {
        #[arg(long)]
        no_export: bool,
    },
    /// Screen, analyze, export trades and print the backtest summary.
    Backtest {
        #[arg(long)]
        no_export: bool,
    },
    /// Print the session's window set.
    Windows,
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| get_env_var(CONFIG_ENV).ok().map(PathBuf::from));
    let mut cfg = match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            config::load_config_path(&path)?
        }
        None => {
            let mut cfg = AnalysisConfig::default();
            config::normalize_config(&mut cfg)?;
            cfg
        }
    };
    if let Some(dir) = &cli.out_dir {
        cfg.output.dir = dir.clone();
    }
    Ok(cfg)
}

fn provider(cli: &Cli, cfg: &AnalysisConfig) -> Result<SharedProvider> {
    let provider: SharedProvider = match cli.source {
        Source::Yahoo => Arc::new(YahooChartProvider::new(cfg.fetch.requests_per_second)?),
        Source::Csv => {
            let dir = cli
                .data_dir
                .as_ref()
                .context("--data-dir is required with --source csv")?;
            Arc::new(CsvDirProvider::new(dir)?)
        }
    };
    Ok(provider)
}

async fn analyze_universe(cli: &Cli, cfg: &AnalysisConfig) -> Result<AnalysisRun> {
    let provider = provider(cli, cfg)?;
    let now = Utc::now();
    let instruments = universe::screen(
        provider.clone(),
        &cfg.universe.instruments,
        &cfg.universe,
        cfg.fetch.concurrency,
        now,
    )
    .await;
    if instruments.is_empty() {
        bail!("no instrument passed screening");
    }
    pipeline::run_universe(provider, instruments, cfg, now).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    let session = cfg.session()?;

    match cli.cmd {
        Cmd::Windows => {
            print!("{}", summary::render_windows(&cfg.window_set(&session)));
        }
        Cmd::Analyze { no_export } => {
            let run = analyze_universe(&cli, &cfg).await?;
            print!("{}", summary::render_run(&run, cfg.output.top));
            if !no_export {
                let exporter = CsvExporter::for_run(&cfg.output.dir, &run, session.tz);
                let meta = MetadataRow::new(&run, &cfg, session.tz, cli.source.label());
                match exporter.export_all(&run, &meta) {
                    Ok(files) => info!(dir = %exporter.dir().display(), files = files.len(), "export done"),
                    Err(err) => error!(error = %err, "export failed"),
                }
            }
        }
        Cmd::Backtest { no_export } => {
            let run = analyze_universe(&cli, &cfg).await?;
            print!("{}", summary::render_backtest(&run.backtest, cfg.output.top));
            if !no_export {
                let exporter = CsvExporter::for_run(&cfg.output.dir, &run, session.tz);
                if let Err(err) = exporter.export_trades(&run) {
                    error!(error = %err, "export failed");
                }
            }
        }
    }

    Ok(())
}
