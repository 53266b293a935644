use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{MirrorError, Result};
use crate::fetcher::Fetch;
use crate::file_manager::FileManager;
use crate::html_parser::extract_page_content;
use crate::stats::{CrawlStats, CrawlSummary};
use crate::visited::VisitedSet;

pub const DEFAULT_MAX_DEPTH: u32 = 10;
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_USER_AGENT: &str = concat!("SiteMirror/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub seed_url: Url,
    pub output_dir: PathBuf,
    /// Link hops followed from the seed page.
    pub max_depth: u32,
    /// Upper bound on the whole run; unfinished work is abandoned.
    pub run_timeout: Duration,
    pub user_agent: String,
}

impl MirrorConfig {
    pub fn new(seed_url: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            seed_url,
            output_dir: output_dir.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            run_timeout: DEFAULT_RUN_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// One unit of crawl work.
///
/// `depth` on a page is the remaining hop budget: a page with budget 0 is never
/// fetched, and its children would get `depth - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlTask {
    Page { url: Url, depth: u32 },
    Resource { url: Url },
}

/// State shared by every task of a run.
struct CrawlContext {
    fetcher: Arc<dyn Fetch>,
    file_manager: FileManager,
    visited: VisitedSet,
    base_host: String,
    stats: CrawlStats,
}

impl CrawlContext {
    async fn process(&self, task: CrawlTask) -> Vec<CrawlTask> {
        match task {
            CrawlTask::Page { url, depth } => self.process_page(url, depth).await,
            CrawlTask::Resource { url } => {
                self.process_resource(url).await;
                Vec::new()
            }
        }
    }

    async fn process_page(&self, url: Url, depth: u32) -> Vec<CrawlTask> {
        if depth == 0 || !self.visited.claim(url.as_str()) {
            return Vec::new();
        }

        match self.download_page(&url, depth).await {
            Ok(children) => children,
            Err(e) => {
                self.stats.failure();
                warn!("Failed to download page {}: {}", url, e);
                Vec::new()
            }
        }
    }

    async fn download_page(&self, url: &Url, depth: u32) -> Result<Vec<CrawlTask>> {
        info!("Downloading {}", url);
        let content = self.fetcher.fetch(url).await?;

        let target = self.file_manager.map_to_path(url)?;
        self.file_manager.save_page(&target, &content).await?;
        self.stats.page_saved();
        debug!("Saved page {} to {:?}", url, target);

        let page = extract_page_content(&String::from_utf8_lossy(&content), url);
        for reference in page.invalid {
            let e = MirrorError::InvalidUrl {
                url: reference.raw,
                source: reference.error,
            };
            self.stats.failure();
            warn!("Skipping malformed reference on {}: {}", url, e);
        }

        let mut children: Vec<CrawlTask> = page
            .resources
            .into_iter()
            .map(|resource| CrawlTask::Resource { url: resource.url })
            .collect();

        let child_depth = depth - 1;
        if child_depth > 0 {
            children.extend(page.links.into_iter().map(|url| CrawlTask::Page {
                url,
                depth: child_depth,
            }));
        }

        Ok(children)
    }

    async fn process_resource(&self, url: Url) {
        if !self.visited.claim(url.as_str()) {
            return;
        }

        if url.host_str() != Some(self.base_host.as_str()) {
            debug!("Skipping foreign resource {}", url);
            self.stats.resource_skipped();
            return;
        }

        match self.download_resource(&url).await {
            Ok(true) => self.stats.resource_saved(),
            Ok(false) => self.stats.resource_skipped(),
            Err(e) => {
                self.stats.failure();
                warn!("Failed to save resource {}: {}", url, e);
            }
        }
    }

    /// Returns `false` if a file was already present at the target.
    async fn download_resource(&self, url: &Url) -> Result<bool> {
        let target = self.file_manager.map_to_path(url)?;
        if self.file_manager.file_exists(&target).await? {
            debug!("Resource {} already present at {:?}", url, target);
            return Ok(false);
        }

        debug!("Downloading resource {}", url);
        let content = self.fetcher.fetch(url).await?;
        self.file_manager.save_resource(&target, &content).await
    }
}

/// Crawl scheduler: spawns every page and resource as its own task and keeps
/// spawning children until the frontier is exhausted or the run times out.
pub struct WebsiteMirror {
    config: MirrorConfig,
    context: Arc<CrawlContext>,
}

impl WebsiteMirror {
    /// Prepares a run. Fails if the seed has no host or the output directory
    /// cannot be created.
    pub fn new(config: MirrorConfig, fetcher: Arc<dyn Fetch>) -> anyhow::Result<Self> {
        let base_host = config
            .seed_url
            .host_str()
            .ok_or_else(|| anyhow!("Seed URL has no host: {}", config.seed_url))?
            .to_string();
        let file_manager = FileManager::new(&config.output_dir)?;

        let context = Arc::new(CrawlContext {
            fetcher,
            file_manager,
            visited: VisitedSet::new(),
            base_host,
            stats: CrawlStats::default(),
        });

        Ok(Self { config, context })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn base_host(&self) -> &str {
        &self.context.base_host
    }

    /// The seed carries one more than `max_depth` so that pages exactly
    /// `max_depth` hops away are still fetched.
    pub fn seed_task(&self) -> CrawlTask {
        CrawlTask::Page {
            url: self.config.seed_url.clone(),
            depth: self.config.max_depth.saturating_add(1),
        }
    }

    pub async fn mirror_website(&self) -> CrawlSummary {
        let started = Instant::now();
        info!(
            "Mirroring {} into {:?} (max depth {}, time bound {:?})",
            self.config.seed_url,
            self.config.output_dir,
            self.config.max_depth,
            self.config.run_timeout
        );

        let mut tasks = JoinSet::new();
        Self::dispatch(&self.context, &mut tasks, self.seed_task());

        let timed_out = tokio::time::timeout(
            self.config.run_timeout,
            Self::drain(&self.context, &mut tasks),
        )
        .await
        .is_err();

        if timed_out {
            warn!(
                "Time bound of {:?} elapsed, abandoning {} in-flight tasks",
                self.config.run_timeout,
                tasks.len()
            );
            tasks.abort_all();
        }

        self.context
            .stats
            .summary(self.context.visited.len(), timed_out, started.elapsed())
    }

    fn dispatch(context: &Arc<CrawlContext>, tasks: &mut JoinSet<Vec<CrawlTask>>, task: CrawlTask) {
        let context = Arc::clone(context);
        tasks.spawn(async move { context.process(task).await });
    }

    async fn drain(context: &Arc<CrawlContext>, tasks: &mut JoinSet<Vec<CrawlTask>>) {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(children) => {
                    for child in children {
                        Self::dispatch(context, tasks, child);
                    }
                }
                Err(e) if e.is_panic() => {
                    context.stats.failure();
                    error!("Crawl task panicked: {}", e);
                }
                Err(_) => {}
            }
        }
    }
}
