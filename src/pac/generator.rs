//! End-to-end generation: feed -> normalization -> assembly -> template.

use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Classifier, Template};
use crate::config::PacConfig;
use crate::feed::{Feed, RangeCollector, RecordGrammar};
use crate::range::{NormalizeOptions, Range};
use crate::{Error, Result};

/// Generates a PAC script from a resolved config and a feed.
pub struct PacGenerator {
    config: PacConfig,
    options: NormalizeOptions,
    grammar: RecordGrammar,
    template: Template,
}

impl PacGenerator {
    /// Validate `config` and load its template.
    pub fn new(config: PacConfig) -> Result<Self> {
        config.validate()?;
        let grammar = RecordGrammar::new(&config.registry, &config.country)?;
        let template = Template::load(config.template.as_deref())?;
        template.validate()?;
        let options = NormalizeOptions {
            max_passes: None,
            dump: config.dump_ips,
        };
        Ok(Self {
            config,
            options,
            grammar,
            template,
        })
    }

    pub fn with_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    pub fn config(&self) -> &PacConfig {
        &self.config
    }

    /// Pull every record from `feed`.
    ///
    /// Returns [`Error::FeedUnavailable`] unless the feed finished successfully.
    pub fn collect_feed(&self, feed: &dyn Feed) -> Result<Vec<Range>> {
        let mut sink = RangeCollector::new().with_trace(self.config.debug);
        let fetched = feed.fetch(&self.grammar, &mut sink);
        match (fetched, sink.outcome()) {
            (Ok(_), Some(true)) => Ok(sink.into_ranges()),
            _ => Err(Error::FeedUnavailable),
        }
    }

    /// Normalize feed and configured ranges and build the rendered tables.
    pub fn classify(&self, feed_ranges: Vec<Range>) -> Classifier {
        let (classifier, report) = Classifier::assemble(&self.config, feed_ranges, &self.options);
        log::info!(
            "Normalized {} ip ranges into {} ({} splits, {} trims, {} passes), {} domains",
            report.input,
            report.output,
            report.splits,
            report.trims,
            report.passes,
            classifier.domains.len()
        );
        classifier
    }

    /// Render the template from already classified tables.
    pub fn render_classifier(&self, classifier: &Classifier) -> Result<String> {
        let values: Vec<(&str, Value)> = vec![
            ("ips", serde_json::to_value(&classifier.ips)?),
            ("domains", serde_json::to_value(&classifier.domains)?),
            ("proxies", serde_json::to_value(&classifier.proxies)?),
            ("proxy", json!(self.config.proxy)),
            ("internalProxy", json!(self.config.internal_proxy)),
        ];
        self.template.render(&values)
    }

    /// Fetch, classify and render, without touching the output file.
    pub fn render(&self, feed: &dyn Feed) -> Result<String> {
        let ranges = self.collect_feed(feed)?;
        let classifier = self.classify(ranges);
        self.render_classifier(&classifier)
    }

    /// Generate and write the PAC file, returning its path.
    ///
    /// Nothing is written when the feed fails.
    pub fn write(&self, feed: &dyn Feed) -> Result<PathBuf> {
        let pac = self.render(feed)?;
        let path = self.config.file.clone();
        write_atomic(&path, pac.as_bytes())?;
        log::info!("File generated: {}", path.display());
        Ok(path)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    temp.write_all(data)?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
