// Configuration comes in as untyped string properties (from a file, then
// overridden by the environment) and is resolved once into a typed
// DictionaryConfig. Resolution never fails: a bad value falls back to its
// default with a warning.

use keystone_base::{err, Result};
use std::{collections::BTreeMap, path::Path};
use tracing::warn;

pub const CHUNK_SIZE_PROPERTY: &str = "keystone.dictionary.chunk.size";
pub const COLLECT_FAILURE_PROPERTY: &str = "keystone.dictionary.collect.failure.policy";
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const ENV_PREFIX: &str = "KEYSTONE_";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Properties {
    props: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key=value` lines. Blank lines and `#` comments are skipped,
    /// a line without `=` is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let mut props = Properties::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('=') {
                Some((k, v)) => props.set(k.trim(), v.trim()),
                None => return Err(err(format!("properties line {}: missing '='", n + 1))),
            }
        }
        Ok(props)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Overlays `KEYSTONE_*` variables: `KEYSTONE_DICTIONARY_CHUNK_SIZE`
    /// sets `keystone.dictionary.chunk.size`.
    pub fn with_env_overrides(mut self) -> Self {
        self.overlay_vars(std::env::vars());
        self
    }

    pub(crate) fn overlay_vars(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (k, v) in vars {
            if let Some(rest) = k.strip_prefix(ENV_PREFIX) {
                let key = format!("keystone.{}", rest.to_ascii_lowercase().replace('_', "."));
                self.set(&key, &v);
            }
        }
    }

    pub fn set(&mut self, key: &str, val: &str) {
        self.props.insert(key.to_string(), val.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(|s| s.as_str())
    }
}

/// What the collector does when a partition scan fails.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum CollectFailurePolicy {
    /// Log the failure and report the partition as having no distinct
    /// values. Indistinguishable downstream from a genuinely empty partition.
    #[default]
    EmptyResult,
    /// Propagate the failure and fail every column of the batch.
    FailBatch,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DictionaryConfig {
    pub chunk_size: usize,
    pub collect_failure_policy: CollectFailurePolicy,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        DictionaryConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            collect_failure_policy: CollectFailurePolicy::default(),
        }
    }
}

impl DictionaryConfig {
    pub fn from_properties(props: &Properties) -> Self {
        DictionaryConfig {
            chunk_size: Self::resolve_chunk_size(props.get(CHUNK_SIZE_PROPERTY)),
            collect_failure_policy: Self::resolve_failure_policy(props.get(COLLECT_FAILURE_PROPERTY)),
        }
    }

    /// A missing value is the default; an unparsable or zero value is the
    /// default plus a warning.
    pub fn resolve_chunk_size(raw: Option<&str>) -> usize {
        let Some(raw) = raw else {
            return DEFAULT_CHUNK_SIZE;
        };
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(
                    property = CHUNK_SIZE_PROPERTY,
                    value = raw,
                    default = DEFAULT_CHUNK_SIZE,
                    "dictionary chunk size not configured properly, taking default size"
                );
                DEFAULT_CHUNK_SIZE
            }
        }
    }

    fn resolve_failure_policy(raw: Option<&str>) -> CollectFailurePolicy {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("empty") => CollectFailurePolicy::EmptyResult,
            Some("fail") => CollectFailurePolicy::FailBatch,
            Some(other) => {
                warn!(
                    property = COLLECT_FAILURE_PROPERTY,
                    value = other,
                    "unknown collect failure policy, using 'empty'"
                );
                CollectFailurePolicy::EmptyResult
            }
        }
    }

    /// The chunk size the writer actually uses. A zero that slipped in by
    /// constructing the struct directly gets the same fallback as a bad
    /// property.
    pub fn effective_chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            Self::resolve_chunk_size(Some("0"))
        } else {
            self.chunk_size
        }
    }
}
