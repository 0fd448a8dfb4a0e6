//! Placeholder substitution into the PAC skeleton.
//!
//! A value named `key` may appear in the template as any of
//! `{/*{key}*/}`, `[/*[key]*/]` or `'{{key}}'`, so the unrendered template
//! is still valid JavaScript.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// The built-in PAC script skeleton.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/flora.pac.template.js");

/// Placeholders every template has to provide.
const REQUIRED_KEYS: &[&str] = &["ips", "domains", "proxies"];

/// A PAC template.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn embedded() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(fs::read_to_string(path)?))
    }

    /// Load `path` when given, otherwise the embedded template.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::embedded()),
        }
    }

    fn markers(key: &str) -> [String; 3] {
        [
            format!("{{/*{{{}}}*/}}", key),
            format!("[/*[{}]*/]", key),
            format!("'{{{{{}}}}}'", key),
        ]
    }

    /// Whether any placeholder form for `key` appears in the template.
    pub fn has_placeholder(&self, key: &str) -> bool {
        Self::markers(key).iter().any(|m| self.text.contains(m.as_str()))
    }

    /// Check that the required placeholders are present.
    pub fn validate(&self) -> Result<()> {
        match REQUIRED_KEYS.iter().find(|key| !self.has_placeholder(key)) {
            Some(key) => Err(Error::Template(format!("missing placeholder for '{}'", key))),
            None => Ok(()),
        }
    }

    /// Replace every placeholder with the JSON encoding of its value.
    pub fn render(&self, values: &[(&str, Value)]) -> Result<String> {
        self.validate()?;
        let mut result = self.text.clone();
        for (key, value) in values {
            let json = serde_json::to_string(value)?;
            for marker in Self::markers(key) {
                result = result.replace(&marker, &json);
            }
        }
        Ok(result)
    }
}
