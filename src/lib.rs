pub mod cli;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod html_parser;
pub mod stats;
pub mod visited;

// Re-export main types for convenience
pub use cli::MirrorCommand;
pub use downloader::{CrawlTask, MirrorConfig, WebsiteMirror};
pub use error::MirrorError;
pub use fetcher::{Fetch, HttpFetcher};
pub use file_manager::FileManager;
pub use html_parser::{extract_page_content, HtmlParser, PageContent, ResourceLink, ResourceType};
pub use stats::CrawlSummary;
pub use visited::VisitedSet;
