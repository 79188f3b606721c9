//! Configuration management for kinship services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (KINSHIP_ prefix, `__` separator,
//!    e.g. `KINSHIP__CACHE__TTL_SECS=7200`)
//! 2. Config file (kinship.toml)
//! 3. Defaults

use std::time::Duration;

use serde::Deserialize;

use crate::error::KinshipError;
use crate::types::MAX_FAMILY_MEMBERS;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KinshipConfig {
    pub neo4j: Neo4jSettings,
    pub database: DatabaseSettings,
    pub resolution: ResolutionSettings,
    pub cache: CacheSettings,
}

impl KinshipConfig {
    /// Load configuration from `{file_prefix}.toml` (optional) overlaid with
    /// `KINSHIP__` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self, KinshipError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("KINSHIP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

/// Graph store connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jSettings {
    /// When false, tier 1 is skipped and graph sync is a no-op.
    pub enabled: bool,
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "kinship-dev".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

/// Relational store (citizen records + relationship cache) settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    /// Apply embedded migrations on startup.
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/kinship".to_string(),
            max_connections: 8,
            run_migrations: true,
        }
    }
}

/// Resolution orchestrator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolutionSettings {
    pub default_depth: u32,
    pub max_depth: u32,
    pub max_members: usize,
    /// Refresh the relationship cache in the background after a graph hit.
    pub sync_on_resolve: bool,
}

impl ResolutionSettings {
    /// Clamp a requested traversal depth to `1..=max_depth`.
    pub fn clamp_depth(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_depth.max(1))
    }
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            default_depth: 2,
            max_depth: 4,
            max_members: MAX_FAMILY_MEMBERS,
            sync_on_resolve: true,
        }
    }
}

/// Relationship cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Lifetime of graph-sourced cache rows.
    pub ttl_secs: u64,
    /// Interval between expired-row cleanup passes.
    pub cleanup_interval_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            cleanup_interval_secs: 900,
        }
    }
}
