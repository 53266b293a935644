use anyhow::Result;
use clap::Parser;
use colored::*;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use site_mirror::{HttpFetcher, MirrorCommand, WebsiteMirror};

#[tokio::main]
async fn main() -> Result<()> {
    let args = MirrorCommand::parse();
    setup_logging(args.verbose, args.quiet);

    let config = args.to_config()?;
    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
    let mirror = WebsiteMirror::new(config, fetcher)?;

    println!("🚀 Mirroring {} into {:?}", mirror.config().seed_url.as_str().blue(), mirror.config().output_dir);

    let summary = mirror.mirror_website().await;

    if let Some(report) = &args.report {
        match summary.to_json() {
            Ok(json) => match tokio::fs::write(report, json).await {
                Ok(()) => info!("Wrote run report to {:?}", report),
                Err(e) => error!("Failed to write report {:?}: {}", report, e),
            },
            Err(e) => error!("Failed to serialize run report: {}", e),
        }
    }

    let headline = if summary.timed_out {
        "⏱️  Time bound reached, mirror is partial".yellow()
    } else {
        "✅ Website mirroring completed".green()
    };
    println!("{}", headline);
    println!(
        "📊 {} pages, {} resources saved, {} resources skipped, {} failures in {:.1}s",
        summary.pages_saved,
        summary.resources_saved,
        summary.resources_skipped,
        failure_count(summary.failures),
        summary.elapsed_secs
    );

    Ok(())
}

fn failure_count(failures: usize) -> ColoredString {
    if failures > 0 {
        failures.to_string().red()
    } else {
        failures.to_string().normal()
    }
}

/// Verbosity flags pick the default filter; `RUST_LOG` overrides it.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "site_mirror=info,warn",
            1 => "site_mirror=debug,info",
            _ => "debug",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
