//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::sampler::{Sampler, DEFAULT_SAMPLES};

/// Name of the per-directory config file
pub const PROJECT_CONFIG: &str = ".tolstack.yaml";

/// tolstack configuration with layered hierarchy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Monte Carlo sample count per quantity
    pub samples: Option<usize>,

    /// Seed for reproducible Monte Carlo runs
    pub seed: Option<u64>,

    /// Units label printed in reports
    pub units: Option<String>,

    /// Always print where-used lines
    pub where_used: Option<bool>,

    /// Always print sensitivities
    pub sensitivity: Option<bool>,

    /// Always print tolerance contributions
    pub contributions: Option<bool>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/tolstack/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (./.tolstack.yaml)
        if let Some(project) = Self::read(&PathBuf::from(PROJECT_CONFIG)) {
            config.merge(project);
        }

        // 4. Environment variables
        if let Some(samples) = std::env::var("TOLSTACK_SAMPLES")
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            config.samples = Some(samples);
        }
        if let Some(seed) = std::env::var("TOLSTACK_SEED")
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            config.seed = Some(seed);
        }

        config
    }

    fn read(path: &PathBuf) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("ignoring config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tolstack")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.samples.is_some() {
            self.samples = other.samples;
        }
        if other.seed.is_some() {
            self.seed = other.seed;
        }
        if other.units.is_some() {
            self.units = other.units;
        }
        if other.where_used.is_some() {
            self.where_used = other.where_used;
        }
        if other.sensitivity.is_some() {
            self.sensitivity = other.sensitivity;
        }
        if other.contributions.is_some() {
            self.contributions = other.contributions;
        }
    }

    /// Monte Carlo sample count, defaulting to 100,000
    pub fn samples(&self) -> usize {
        self.samples.unwrap_or(DEFAULT_SAMPLES)
    }

    /// Build a sampler: seeded when a seed is configured, OS-seeded otherwise
    pub fn sampler(&self) -> Sampler {
        match self.seed {
            Some(seed) => Sampler::seeded(self.samples(), seed),
            None => Sampler::new(self.samples()),
        }
    }
}
