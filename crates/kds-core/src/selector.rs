//! Equality-based label selectors
//!
//! A [`LabelSelector`] is a conjunction of exact `key=value` matches. The
//! empty selector matches every node.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Conjunction of exact-match label requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Create an empty selector (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Whether no requirements are set
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The requirements, ordered by key
    pub fn requirements(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Evaluate the selector against a label set
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

impl From<BTreeMap<String, String>> for LabelSelector {
    fn from(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }
}

impl FromStr for LabelSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut labels = BTreeMap::new();

        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once("==")
                .or_else(|| pair.split_once('='))
                .ok_or_else(|| {
                    Error::config(format!(
                        "invalid label selector {s:?}: expected key=value, got {pair:?}"
                    ))
                })?;

            let key = key.trim();
            if key.is_empty() {
                return Err(Error::config(format!(
                    "invalid label selector {s:?}: empty key in {pair:?}"
                )));
            }
            if key.starts_with('!') || key.ends_with('!') {
                return Err(Error::config(format!(
                    "invalid label selector {s:?}: only equality requirements are supported"
                )));
            }

            labels.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Self { labels })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.labels {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for LabelSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LabelSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Table(BTreeMap<String, String>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Repr::Table(labels) => Ok(Self { labels }),
        }
    }
}
