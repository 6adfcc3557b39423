//! Engine configuration.
//!
//! Configuration is read from an optional JSON file and then overridden by
//! environment variables:
//!
//! - `GRAPHMAP_GRAPH_CACHE`: path of the graph artifact
//! - `GRAPHMAP_RAW_SOURCE`: raw JSON map used to (re)build the artifact
//! - `GRAPHMAP_LANDMARKS`: number of landmarks to select

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::landmarks::DEFAULT_LANDMARK_COUNT;
use crate::store::{default_graph_cache_path, GraphSource};

pub const ENV_GRAPH_CACHE: &str = "GRAPHMAP_GRAPH_CACHE";
pub const ENV_RAW_SOURCE: &str = "GRAPHMAP_RAW_SOURCE";
pub const ENV_LANDMARKS: &str = "GRAPHMAP_LANDMARKS";

/// Default search radius for settlement annotations, in metres.
pub const DEFAULT_SETTLEMENT_RADIUS_M: f64 = 5_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Graph artifact location; the platform data directory when unset.
    pub graph_cache: Option<PathBuf>,
    pub raw_source: Option<PathBuf>,
    pub landmark_count: usize,
    /// Regional center names used as landmark candidates.
    pub regional_centers: Vec<String>,
    /// CSV with `name,lat,lon` rows resolving regional centers.
    pub places_file: Option<PathBuf>,
    /// GeoNames CSV used to name route points.
    pub settlements_file: Option<PathBuf>,
    pub settlement_radius_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            graph_cache: None,
            raw_source: None,
            landmark_count: DEFAULT_LANDMARK_COUNT,
            regional_centers: Vec::new(),
            places_file: None,
            settlements_file: None,
            settlement_radius_m: DEFAULT_SETTLEMENT_RADIUS_M,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise defaults, then apply the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name.
    ///
    /// Unparseable landmark counts are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_GRAPH_CACHE).filter(|v| !v.is_empty()) {
            self.graph_cache = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_RAW_SOURCE).filter(|v| !v.is_empty()) {
            self.raw_source = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup(ENV_LANDMARKS) {
            match value.trim().parse() {
                Ok(count) => self.landmark_count = count,
                Err(_) => warn!(
                    variable = ENV_LANDMARKS,
                    value = %value,
                    "ignoring invalid landmark count"
                ),
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.settlement_radius_m.is_finite() || self.settlement_radius_m < 0.0 {
            return Err(Error::invalid(format!(
                "settlement_radius_m must be a non-negative number, got {}",
                self.settlement_radius_m
            )));
        }
        Ok(())
    }

    /// Graph artifact path, falling back to the platform data directory.
    pub fn graph_cache_path(&self) -> Result<PathBuf> {
        match &self.graph_cache {
            Some(path) => Ok(path.clone()),
            None => default_graph_cache_path(),
        }
    }

    pub fn graph_source(&self) -> Result<GraphSource> {
        let cache = self.graph_cache_path()?;
        Ok(match &self.raw_source {
            Some(raw) => GraphSource::with_raw(cache, raw),
            None => GraphSource::cache_only(cache),
        })
    }
}
