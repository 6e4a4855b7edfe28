//! CLI entry point for the rangeget tool.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::HumanBytes;
use rangeget_core::{
    HttpClient, ProgressAggregator, TransferEngine, TransferJob, TransferReport,
    resolve_output_path,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod progress_ui;

use cli::Args;
use config::Settings;

/// Conventional exit status for a run interrupted by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = config::load_default_file_config()?;
    let mut settings = Settings::default();
    if let Some(file_config) = &loaded.config {
        debug!(path = ?loaded.path, "applying config file");
        settings.apply_file(file_config);
    }
    args.apply_to(&mut settings);
    debug!(?settings, "effective settings");

    let output = resolve_output_path(&args.url, args.output.as_deref())?;
    let mut job = TransferJob::new(&args.url, output).with_config(settings.transfer.clone());
    if let Some(auth_header) = &args.auth_header {
        job = job.with_auth_header(auth_header);
    }
    if let Some(display_id) = &args.display_id {
        job = job.with_display_id(display_id);
    }

    let client = HttpClient::with_settings(
        settings.connect_timeout_secs,
        settings.read_timeout_secs,
        settings.transfer.streams,
    )
    .context("Failed to build HTTP client")?;
    let engine = TransferEngine::new(client);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling download");
            trigger.cancel();
        }
    });

    info!(url = %job.url(), output = %job.output().display(), "rangeget starting");

    let progress = ProgressAggregator::new();
    let ui = progress_ui::spawn_progress_ui(
        !args.no_progress && !args.quiet,
        progress.subscribe(),
        job.display_id(),
    );

    let result = engine.run(&job, &progress, &cancel).await;

    // Dropping the last publisher closes the feed and ends the bar.
    drop(progress);
    if let Some(handle) = ui {
        let _ = handle.await;
    }

    match result {
        Ok(report) => {
            if !args.quiet {
                println!("{}", summary(&report));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) if error.is_cancelled() => {
            eprintln!("Download cancelled; partial file left at {}", job.output().display());
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Err(error) => Err(anyhow::Error::new(error)
            .context(format!("Failed to download {}", job.url()))),
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn summary(report: &TransferReport) -> String {
    let secs = report.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        (report.bytes as f64 / secs) as u64
    } else {
        report.bytes
    };
    format!(
        "Downloaded {} ({}) in {:.1}s at {}/s [{}, {} chunk(s)]",
        report.path.display(),
        HumanBytes(report.bytes),
        secs,
        HumanBytes(rate),
        report.mode,
        report.chunks
    )
}
