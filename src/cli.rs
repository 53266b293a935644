use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::downloader::{MirrorConfig, DEFAULT_USER_AGENT};

#[derive(Parser, Debug)]
#[command(
    name = "site-mirror",
    about = "A CLI utility to mirror a website into a local directory tree",
    version,
    long_about = "Crawls a website from a seed URL and saves every reachable page, plus the seed host's images, scripts and stylesheets, into a directory tree that follows the URL paths. Content is saved verbatim."
)]
pub struct MirrorCommand {
    /// The URL to start mirroring from
    #[arg(required = true)]
    pub url: String,

    /// Output directory for the mirrored website (created if absent)
    #[arg(required = true)]
    pub output_dir: PathBuf,

    /// Number of link hops to follow from the seed page
    #[arg(short = 'd', long, default_value = "10")]
    pub max_depth: u32,

    /// Upper bound on the whole run, in seconds
    #[arg(short = 't', long, default_value = "600", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log failures
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl MirrorCommand {
    pub fn to_config(&self) -> Result<MirrorConfig> {
        let seed_url = Url::parse(&self.url)
            .with_context(|| format!("Invalid seed URL: {}", self.url))?;
        if !matches!(seed_url.scheme(), "http" | "https") {
            bail!("Seed URL must use http or https: {}", self.url);
        }
        if seed_url.host_str().is_none() {
            bail!("Seed URL has no host: {}", self.url);
        }

        Ok(MirrorConfig {
            seed_url,
            output_dir: self.output_dir.clone(),
            max_depth: self.max_depth,
            run_timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
        })
    }
}
