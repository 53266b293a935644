use anyhow::Context;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{MirrorError, Result};

/// File name written for URLs that resolve to a directory.
pub const DEFAULT_FILE_NAME: &str = "index.html";

/// Maps URLs onto the output tree and writes fetched bytes into it.
#[derive(Clone, Debug)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    /// Creates the output root if needed. Failing here is the only fatal
    /// filesystem error of a run.
    pub fn new(base_dir: &Path) -> anyhow::Result<Self> {
        let base_dir = base_dir.to_path_buf();
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", base_dir))?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Maps `url` to its file under the output root.
    ///
    /// The URL path is normalized lexically; a `..` that climbs above the root is
    /// rejected. Paths ending in `/`, or landing on an existing directory, get
    /// [`DEFAULT_FILE_NAME`] appended.
    pub fn map_to_path(&self, url: &Url) -> Result<PathBuf> {
        if url.host_str().is_none() {
            return Err(MirrorError::MissingHost {
                url: url.to_string(),
            });
        }

        self.map_url_path(url.path())
            .ok_or_else(|| MirrorError::PathEscape {
                url: url.to_string(),
            })
    }

    fn map_url_path(&self, url_path: &str) -> Option<PathBuf> {
        let url_path = if url_path.is_empty() { "/" } else { url_path };

        let mut segments: Vec<&str> = Vec::new();
        for segment in url_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                segment => segments.push(segment),
            }
        }

        let mut path = self.base_dir.clone();
        path.extend(&segments);

        if url_path.ends_with('/') || path.is_dir() {
            path.push(DEFAULT_FILE_NAME);
        }

        Some(path)
    }

    /// Writes a page verbatim, replacing whatever is at `path`.
    ///
    /// The bytes go to a sibling temp file that is renamed over `path`, so pages
    /// sharing a target (same path, different query) replace it whole.
    pub async fn save_page(&self, path: &Path, content: &[u8]) -> Result<()> {
        create_parent_dirs(path).await?;

        let staging = staging_path(path);
        if let Err(e) = tokio::fs::write(&staging, content).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(MirrorError::io(&staging, e));
        }
        if let Err(e) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(MirrorError::io(path, e));
        }
        Ok(())
    }

    /// Writes a resource unless `path` already exists.
    ///
    /// Returns `false` when an existing file was left untouched.
    pub async fn save_resource(&self, path: &Path, content: &[u8]) -> Result<bool> {
        create_parent_dirs(path).await?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(MirrorError::io(path, e)),
        };

        file.write_all(content)
            .await
            .map_err(|e| MirrorError::io(path, e))?;
        file.flush().await.map_err(|e| MirrorError::io(path, e))?;

        Ok(true)
    }

    pub async fn file_exists(&self, path: &Path) -> Result<bool> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| MirrorError::io(path, e))
    }
}

fn staging_path(path: &Path) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.part", file_name, std::process::id(), n))
}

async fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MirrorError::io(parent, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_new_creates_output_root() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("nested").join("out");

        let manager = FileManager::new(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(manager.base_dir(), root.as_path());
    }

    #[test]
    fn test_map_plain_file_path() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();

        let path = manager.map_to_path(&url("https://ex.com/about")).unwrap();
        assert_eq!(path, temp_dir.path().join("about"));

        let path = manager
            .map_to_path(&url("https://ex.com/static/app.js?v=3"))
            .unwrap();
        assert_eq!(path, temp_dir.path().join("static").join("app.js"));
    }

    #[test]
    fn test_map_root_gets_index() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();

        let path = manager.map_to_path(&url("https://ex.com")).unwrap();
        assert_eq!(path, temp_dir.path().join(DEFAULT_FILE_NAME));
    }

    #[test]
    fn test_map_existing_directory_gets_index() {
        let temp_dir = tempdir().unwrap();
        fs::create_dir_all(temp_dir.path().join("docs")).unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();

        let expected = temp_dir.path().join("docs").join(DEFAULT_FILE_NAME);
        assert_eq!(manager.map_to_path(&url("https://ex.com/docs/")).unwrap(), expected);
        assert_eq!(manager.map_to_path(&url("https://ex.com/docs")).unwrap(), expected);
    }

    #[test]
    fn test_map_trailing_slash_without_directory() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();

        let path = manager.map_to_path(&url("https://ex.com/blog/")).unwrap();
        assert_eq!(path, temp_dir.path().join("blog").join(DEFAULT_FILE_NAME));
    }

    #[test]
    fn test_map_collapses_separators_and_dots() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();

        let path = manager.map_url_path("//a/./b//../c.css").unwrap();
        assert_eq!(path, temp_dir.path().join("a").join("c.css"));
    }

    #[test]
    fn test_map_rejects_escape_from_root() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();

        assert!(manager.map_url_path("/../etc/passwd").is_none());
        assert!(manager.map_url_path("/a/../../secret").is_none());
        assert!(manager.map_url_path("/a/b/../../ok").is_some());
    }

    #[test]
    fn test_map_requires_host() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();

        let result = manager.map_to_path(&url("data:text/plain,hello"));
        assert!(matches!(result, Err(MirrorError::MissingHost { .. })));
    }

    #[tokio::test]
    async fn test_save_page_creates_parents_and_overwrites() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();
        let path = temp_dir.path().join("a").join("b").join("page");

        manager.save_page(&path, b"<html>one</html>").await.unwrap();
        manager.save_page(&path, b"<html>two</html>").await.unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"<html>two</html>");
    }

    #[tokio::test]
    async fn test_concurrent_page_saves_replace_whole_file() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();
        let path = temp_dir.path().join("p");

        let bodies: Vec<Vec<u8>> = (0..16u8)
            .map(|i| vec![b'a' + i; 64 * 1024 - i as usize * 512])
            .collect();

        let handles: Vec<_> = bodies
            .iter()
            .cloned()
            .map(|body| {
                let manager = manager.clone();
                let path = path.clone();
                tokio::spawn(async move { manager.save_page(&path, &body).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let written = fs::read(&path).unwrap();
        assert!(bodies.contains(&written), "page content was interleaved");

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "staging files left behind");
    }

    #[tokio::test]
    async fn test_save_resource_never_overwrites() {
        let temp_dir = tempdir().unwrap();
        let manager = FileManager::new(temp_dir.path()).unwrap();
        let path = temp_dir.path().join("img").join("logo.png");

        assert!(manager.save_resource(&path, &[0x89, 0x50]).await.unwrap());
        assert!(!manager.save_resource(&path, b"changed").await.unwrap());

        assert_eq!(fs::read(&path).unwrap(), vec![0x89, 0x50]);
        assert!(manager.file_exists(&path).await.unwrap());
    }
}
