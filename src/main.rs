mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use logfork_logs::{FanoutEngine, JsonSink, ResultSink, TextSink};
use logfork_source::{FileSource, HttpSource, LineStream};

use crate::config::Config;

/// logfork - answer questions about an access log in a single pass
#[derive(Parser, Debug)]
#[command(name = "logfork")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log URL (overrides the config file)
    #[arg(long, value_name = "URL", conflicts_with = "file")]
    url: Option<String>,

    /// Read a local log file instead of fetching one
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// TOML file with the source URL and query catalog
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Print partial results when the source fails or is interrupted
    #[arg(long)]
    report_partial: bool,

    /// Print running values every N lines (0 disables)
    #[arg(long, default_value = "0")]
    progress_every: u64,

    /// Abort the download after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run_app(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    let engine = config.build_engine()?.with_progress(args.progress_every);
    watch_for_interrupt(&engine);

    let sink: Arc<dyn ResultSink> = match args.format {
        Format::Text => Arc::new(TextSink),
        Format::Json => Arc::new(JsonSink),
    };

    let cancel = engine.cancellation_token();
    let lines = tokio::select! {
        _ = cancel.cancelled() => anyhow::bail!("Interrupted before the log was opened"),
        lines = open_source(&args, &config) => lines?,
    };

    match engine.run(lines, Arc::clone(&sink)).await {
        Ok(summary) => {
            tracing::info!(lines = summary.lines, "Done");
            Ok(())
        }
        Err(e) => {
            if args.report_partial {
                for report in e.partial_reports() {
                    sink.partial(report);
                }
            }
            Err(e.into())
        }
    }
}

/// Open the configured source: a local file, the `--url` override, or the config URL
async fn open_source(args: &Args, config: &Config) -> Result<LineStream> {
    if let Some(path) = &args.file {
        return Ok(FileSource::new(path).lines().await?);
    }

    let url = args.url.as_deref().unwrap_or(&config.source);
    let source = HttpSource::new(url, args.timeout.map(Duration::from_secs))?;
    Ok(source.lines().await?)
}

/// Cancel the run on Ctrl-C so queries report instead of hanging
fn watch_for_interrupt(engine: &FanoutEngine) {
    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            cancel.cancel();
        }
    });
}
