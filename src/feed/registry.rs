//! Registry feed over HTTP with a local cache copy.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::Feed;
use crate::config::PacConfig;
use crate::{Error, Result};

/// Delegated statistics fetched from a registry.
///
/// When a cache path is configured and the file there is fresh enough, it
/// is read instead of the network. A successful download replaces the
/// cache atomically.
pub struct RegistryFeed {
    url: String,
    cache: Option<PathBuf>,
    max_age: Option<Duration>,
    timeout: Duration,
}

impl RegistryFeed {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            cache: None,
            max_age: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Build from the feed settings of a config.
    pub fn from_config(config: &PacConfig) -> Self {
        Self {
            url: config.feed_url.clone(),
            cache: config.feed_cache.clone(),
            max_age: config.feed_cache_max_age(),
            timeout: config.feed_timeout(),
        }
    }

    pub fn with_cache(mut self, path: impl AsRef<Path>) -> Self {
        self.cache = Some(path.as_ref().to_path_buf());
        self
    }

    /// Refetch once the cache is older than `max_age`.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cache(&self) -> Option<&Path> {
        self.cache.as_deref()
    }

    fn fresh_cache(&self) -> Option<&Path> {
        self.cache
            .as_deref()
            .filter(|path| is_fresh(path, self.max_age))
    }

    fn download(&self) -> Result<Vec<u8>> {
        log::info!(
            "Fetching data from {}, it might take a few minutes, please wait...",
            self.url
        );

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = agent.get(&self.url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => Error::FeedStatus(code),
            ureq::Error::Transport(t) => Error::FeedTransport(t.to_string()),
        })?;

        if response.status() != 200 {
            return Err(Error::FeedStatus(response.status()));
        }

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| Error::FeedTransport(format!("failed to read response: {}", e)))?;

        log::info!("Downloaded {} bytes from {}", body.len(), self.url);
        Ok(body)
    }

    /// Replace the cache file with `data` via a temp file in the same directory.
    fn store(&self, path: &Path, data: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl Feed for RegistryFeed {
    fn describe(&self) -> String {
        match self.fresh_cache() {
            Some(path) => format!("cached feed {}", path.display()),
            None => self.url.clone(),
        }
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        if let Some(path) = self.fresh_cache() {
            log::info!("Using cached feed: {}", path.display());
            return Ok(Box::new(fs::File::open(path)?));
        }

        let body = self.download()?;
        if let Some(path) = &self.cache {
            if let Err(e) = self.store(path, &body) {
                log::warn!("Failed to update feed cache {}: {}", path.display(), e);
            }
        }
        Ok(Box::new(Cursor::new(body)))
    }
}

/// Whether `path` exists and, when `max_age` is set, was modified within it.
pub fn is_fresh(path: &Path, max_age: Option<Duration>) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    let Some(max_age) = max_age else {
        return true;
    };
    meta.modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map_or(true, |age| age <= max_age)
}
