//! Generator configuration: built-in defaults layered with a user file and
//! command-line overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::range::IpEntry;
use crate::{Error, Result};

/// Config files probed in the working directory when none is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["pac-config.json", "pac-config.yaml", "pac-config.yml"];

/// APNIC delegated statistics, the default feed.
pub const DEFAULT_FEED_URL: &str = "http://ftp.apnic.net/apnic/stats/apnic/delegated-apnic-latest";

/// Fully resolved configuration for one generator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PacConfig {
    /// Output PAC path
    pub file: PathBuf,
    /// External proxy directive, e.g. `SOCKS5 127.0.0.1:7070`
    pub proxy: String,
    /// Internal proxy for in-country traffic; direct when unset
    pub internal_proxy: Option<String>,
    pub local_ips: Vec<IpEntry>,
    pub normal_ips: Vec<IpEntry>,
    pub fake_ips: Vec<IpEntry>,
    pub local_domains: Vec<String>,
    pub normal_domains: Vec<String>,
    pub walled_domains: Vec<String>,
    /// Verbose logging, including every feed record
    pub debug: bool,
    /// Log the normalized partition
    pub dump_ips: bool,
    pub feed_url: String,
    /// Local copy of the feed; used when present, refreshed after download
    pub feed_cache: Option<PathBuf>,
    /// Maximum cache age in seconds before it is refetched; forever when unset
    pub feed_cache_max_age: Option<u64>,
    /// HTTP timeout in seconds
    pub feed_timeout: u64,
    pub registry: String,
    pub country: String,
    /// Template path; the embedded template when unset
    pub template: Option<PathBuf>,
}

impl Default for PacConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("flora.pac"),
            proxy: "SOCKS5 127.0.0.1:7070; SOCKS 127.0.0.1:7070".to_string(),
            internal_proxy: None,
            local_ips: [
                "10.0.0.0/8",
                "100.64.0.0/10",
                "127.0.0.0/8",
                "169.254.0.0/16",
                "172.16.0.0/12",
                "192.168.0.0/16",
            ]
            .into_iter()
            .map(IpEntry::from)
            .collect(),
            normal_ips: Vec::new(),
            fake_ips: Vec::new(),
            local_domains: vec!["localhost".to_string()],
            normal_domains: Vec::new(),
            walled_domains: Vec::new(),
            debug: false,
            dump_ips: false,
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_cache: Some(PathBuf::from("delegated-apnic-latest")),
            feed_cache_max_age: None,
            feed_timeout: 60,
            registry: "apnic".to_string(),
            country: "CN".to_string(),
            template: None,
        }
    }
}

impl PacConfig {
    /// Layer `user` over `self`: lists are appended, scalars replaced.
    pub fn layer(mut self, user: UserConfig) -> Self {
        if let Some(file) = user.file {
            self.file = file;
        }
        if let Some(proxy) = user.proxy {
            self.proxy = proxy;
        }
        if user.internal_proxy.is_some() {
            self.internal_proxy = user.internal_proxy;
        }
        self.local_ips.extend(user.local_ips);
        self.normal_ips.extend(user.normal_ips);
        self.fake_ips.extend(user.fake_ips);
        self.local_domains.extend(user.local_domains);
        self.normal_domains.extend(user.normal_domains);
        self.walled_domains.extend(user.walled_domains);
        if let Some(debug) = user.debug {
            self.debug = debug;
        }
        if let Some(dump) = user.dump_ips {
            self.dump_ips = dump;
        }
        if let Some(url) = user.feed_url {
            self.feed_url = url;
        }
        if user.feed_cache.is_some() {
            self.feed_cache = user.feed_cache;
        }
        if user.feed_cache_max_age.is_some() {
            self.feed_cache_max_age = user.feed_cache_max_age;
        }
        if let Some(timeout) = user.feed_timeout {
            self.feed_timeout = timeout;
        }
        if let Some(registry) = user.registry {
            self.registry = registry;
        }
        if let Some(country) = user.country {
            self.country = country;
        }
        if user.template.is_some() {
            self.template = user.template;
        }
        self
    }

    /// Reject settings the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.file.as_os_str().is_empty() {
            return Err(Error::Config("output file is empty".to_string()));
        }
        if self.proxy.trim().is_empty() {
            return Err(Error::Config("proxy directive is empty".to_string()));
        }
        if self.registry.is_empty() || self.country.is_empty() {
            return Err(Error::Config(
                "registry and country must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout)
    }

    pub fn feed_cache_max_age(&self) -> Option<Duration> {
        self.feed_cache_max_age.map(Duration::from_secs)
    }
}

/// User-supplied configuration, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    pub file: Option<PathBuf>,
    pub proxy: Option<String>,
    pub internal_proxy: Option<String>,
    pub local_ips: Vec<IpEntry>,
    pub normal_ips: Vec<IpEntry>,
    pub fake_ips: Vec<IpEntry>,
    pub local_domains: Vec<String>,
    pub normal_domains: Vec<String>,
    pub walled_domains: Vec<String>,
    pub debug: Option<bool>,
    pub dump_ips: Option<bool>,
    pub feed_url: Option<String>,
    pub feed_cache: Option<PathBuf>,
    pub feed_cache_max_age: Option<u64>,
    pub feed_timeout: Option<u64>,
    pub registry: Option<String>,
    pub country: Option<String>,
    pub template: Option<PathBuf>,
}

impl UserConfig {
    /// Parse config text; YAML when `yaml` is set, JSON otherwise.
    pub fn parse(content: &str, yaml: bool) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        if yaml {
            Ok(serde_yaml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }

    /// Load a config file, picking the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        Self::parse(&content, yaml)
    }

    /// Load `path` if given, otherwise the first default file found in `dir`.
    ///
    /// Returns the default (empty) config when nothing is found.
    pub fn load(path: Option<&Path>, dir: &Path) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => DEFAULT_CONFIG_FILES
                .iter()
                .map(|f| dir.join(f))
                .find(|p| p.exists()),
        };

        match path {
            Some(path) => {
                log::info!("Using config file: {}", path.display());
                Self::from_path(&path)
            }
            None => Ok(Self::default()),
        }
    }
}
