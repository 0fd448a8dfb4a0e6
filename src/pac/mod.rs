//! Classifier assembly: the containers rendered into the PAC script.

mod generator;
mod template;

pub use generator::PacGenerator;
pub use template::{Template, DEFAULT_TEMPLATE};

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::PacConfig;
use crate::range::source::collect_entries;
use crate::range::{normalize, NormalizeOptions, NormalizeReport, Partition, Range};
use crate::Classification;

/// Proxy directive per classification ordinal.
///
/// Serialises as a JSON array indexed by [`Classification::as_u8`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProxyTable([Option<String>; Classification::COUNT]);

impl ProxyTable {
    /// Build the table from the external proxy and optional internal proxy.
    ///
    /// An empty internal proxy counts as unset.
    pub fn new(proxy: &str, internal_proxy: Option<&str>) -> Self {
        let normal = match internal_proxy.map(str::trim).filter(|p| !p.is_empty()) {
            Some(internal) => format!("{}; DIRECT", internal),
            None => "DIRECT".to_string(),
        };
        Self([
            None,
            Some("DIRECT".to_string()),
            Some(normal),
            Some(format!("{}; DIRECT", proxy)),
            Some(proxy.to_string()),
        ])
    }

    pub fn get(&self, classification: Classification) -> Option<&str> {
        self.0[classification.as_u8() as usize].as_deref()
    }
}

/// Exact domain name to classification; the last assignment wins.
///
/// Names are stored lowercased to match the PAC lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DomainMap(BTreeMap<String, Classification>);

impl DomainMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: &str, classification: Classification) {
        let domain = domain.trim();
        if domain.is_empty() {
            return;
        }
        self.0.insert(domain.to_ascii_lowercase(), classification);
    }

    pub fn extend<'a, I>(&mut self, domains: I, classification: Classification)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for domain in domains {
            self.insert(domain, classification);
        }
    }

    pub fn get(&self, domain: &str) -> Option<Classification> {
        self.0.get(&domain.to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the template needs from one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    pub ips: Partition,
    pub domains: DomainMap,
    pub proxies: ProxyTable,
}

impl Classifier {
    /// Merge feed ranges with the configured ranges, normalize them, and
    /// build the domain map and proxy table.
    ///
    /// Feed ranges come first so that an explicit range identical to a feed
    /// range replaces it.
    pub fn assemble(
        config: &PacConfig,
        feed_ranges: Vec<Range>,
        options: &NormalizeOptions,
    ) -> (Self, NormalizeReport) {
        let mut ranges = feed_ranges;
        ranges.extend(collect_entries(&config.local_ips, Classification::Local, "localIps"));
        ranges.extend(collect_entries(&config.normal_ips, Classification::Normal, "normalIps"));
        ranges.extend(collect_entries(&config.fake_ips, Classification::Poisoned, "fakeIps"));

        let (ips, report) = normalize(ranges, options);

        let mut domains = DomainMap::new();
        domains.extend(&config.local_domains, Classification::Local);
        domains.extend(&config.normal_domains, Classification::Normal);
        domains.extend(&config.walled_domains, Classification::Gfwed);

        let proxies = ProxyTable::new(&config.proxy, config.internal_proxy.as_deref());

        (
            Self {
                ips,
                domains,
                proxies,
            },
            report,
        )
    }
}
