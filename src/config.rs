//! Configuration Module
//!
//! Per-entity-type cache settings and instance options, loadable from environment variables.

use std::collections::{BTreeSet, HashMap};
use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Default TTL in seconds for cached results.
pub const DEFAULT_TTL_SECONDS: u64 = 60 * 60;

/// Longest TTL a model may configure: ten years.
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Default maximum number of entries per entity type.
pub const DEFAULT_LIMIT: usize = 50;

/// Read methods intercepted when a model config does not list its own.
pub const DEFAULT_METHODS: &[&str] = &[
    "find_by_id",
    "find_one",
    "find_all",
    "find_and_count_all",
    "count",
    "min",
    "max",
    "sum",
];

// == Model Config ==
/// Cache settings for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Seconds a stored result stays fresh
    #[serde(alias = "ttl")]
    pub ttl_seconds: u64,
    /// Method names routed through the cache
    pub methods: BTreeSet<String>,
    /// Maximum number of entries kept for this type
    pub limit: usize,
}

impl ModelConfig {
    /// Creates a config with the given TTL and limit and the default method list.
    pub fn new(ttl_seconds: u64, limit: usize) -> Self {
        Self {
            ttl_seconds,
            limit,
            ..Self::default()
        }
    }

    /// Replaces the intercepted method set.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Rejects zero limits and TTLs outside `1..=MAX_TTL_SECONDS`.
    pub fn validate(&self, type_name: &str) -> Result<()> {
        if self.ttl_seconds == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "{}: ttl_seconds must be positive",
                type_name
            )));
        }
        if self.ttl_seconds > MAX_TTL_SECONDS {
            return Err(CacheError::InvalidConfig(format!(
                "{}: ttl_seconds must not exceed {}",
                type_name, MAX_TTL_SECONDS
            )));
        }
        if self.limit == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "{}: limit must be positive",
                type_name
            )));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
            limit: DEFAULT_LIMIT,
        }
    }
}

// == Cache Options ==
/// Instance-wide options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Forward low-level events (init/hit/miss/load/purge) to the delegate
    pub debug: bool,
    /// Seconds between `ops` snapshots, fractions allowed; 0 disables the ticker
    pub ops_interval_secs: f64,
}

impl CacheOptions {
    /// The ops ticker period, or None when the ticker is disabled.
    ///
    /// # Returns
    /// `None` for zero and for values that are not a valid duration
    pub fn ops_interval(&self) -> Option<Duration> {
        if self.ops_interval_secs == 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(self.ops_interval_secs).ok()
    }

    /// Rejects negative, non-finite and out-of-range intervals.
    pub fn validate(&self) -> Result<()> {
        if self.ops_interval_secs != 0.0 && self.ops_interval().is_none() {
            return Err(CacheError::InvalidConfig(format!(
                "ops_interval_secs must be a non-negative number of seconds, got {}",
                self.ops_interval_secs
            )));
        }
        Ok(())
    }
}

// == Config ==
/// Full cache configuration: model table plus options.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Entity type name -> cache settings
    pub models: HashMap<String, ModelConfig>,
    pub options: CacheOptions,
}

impl Config {
    /// Creates a config from a model table with default options.
    pub fn new(models: HashMap<String, ModelConfig>) -> Self {
        Self {
            models,
            options: CacheOptions::default(),
        }
    }

    /// Adds or replaces the config for one entity type.
    pub fn with_model(mut self, type_name: impl Into<String>, model: ModelConfig) -> Self {
        self.models.insert(type_name.into(), model);
        self
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEBUG` - Forward low-level events to the delegate (default: false)
    /// - `CACHE_OPS_INTERVAL` - Seconds between ops snapshots, e.g. `0.5` (default: 0, disabled)
    /// - `CACHE_MODELS` - JSON object of type name -> `{ttl_seconds, methods, limit}`
    pub fn from_env() -> Result<Self> {
        let options = CacheOptions {
            debug: env::var("CACHE_DEBUG")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            ops_interval_secs: env::var("CACHE_OPS_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
        };

        let models = match env::var("CACHE_MODELS") {
            Ok(raw) => parse_models(&raw)?,
            Err(_) => HashMap::new(),
        };

        Ok(Self { models, options })
    }

    /// Validates the options and every model config.
    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        for (type_name, model) in &self.models {
            model.validate(type_name)?;
        }
        Ok(())
    }
}

/// Parses a JSON model table, filling unset fields with defaults.
pub fn parse_models(raw: &str) -> Result<HashMap<String, ModelConfig>> {
    let models: HashMap<String, ModelConfig> = serde_json::from_str(raw)
        .map_err(|e| CacheError::InvalidConfig(format!("CACHE_MODELS: {}", e)))?;
    for (type_name, model) in &models {
        model.validate(type_name)?;
    }
    Ok(models)
}
