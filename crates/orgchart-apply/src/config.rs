//! Configuration for the orgchart-apply batch driver.

use std::time::Duration;

use serde::Deserialize;

use orgchart_graph::GraphConfig;

use crate::error::Result;

/// Environment prefix: `ORGCHART__APPLY__STOP_ON_ERROR=false`,
/// `ORGCHART__NEO4J__URI=bolt://...`.
const ENV_PREFIX: &str = "ORGCHART";

/// Batch driver configuration.
///
/// Loaded from the `[apply]` section of `orgchart.toml` or
/// `ORGCHART__APPLY__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyConfig {
    /// Directory for journal entries.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: String,

    /// JSON file holding the per-kind counters between batches.
    #[serde(default = "default_counters_path")]
    pub counters_path: String,

    /// Deadline for each individual store call.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,

    /// Stop the batch at the first failed record.
    #[serde(default = "default_true")]
    pub stop_on_error: bool,
}

impl ApplyConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

fn default_journal_dir() -> String {
    "./journal".to_string()
}

fn default_counters_path() -> String {
    "./counters.json".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            journal_dir: default_journal_dir(),
            counters_path: default_counters_path(),
            store_timeout_secs: default_store_timeout(),
            stop_on_error: true,
        }
    }
}

fn layered(file_prefix: &str) -> Result<config::Config> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(cfg)
}

/// Load `[apply]`, falling back to defaults when the section is absent.
pub fn load_apply_config(file_prefix: &str) -> Result<ApplyConfig> {
    let cfg = layered(file_prefix)?;
    match cfg.get::<ApplyConfig>("apply") {
        Ok(c) => Ok(c),
        Err(config::ConfigError::NotFound(_)) => Ok(ApplyConfig::default()),
        Err(e) => Err(e.into()),
    }
}

/// Load `[neo4j]`, each key falling back to the client default.
pub fn load_graph_config(file_prefix: &str) -> Result<GraphConfig> {
    let cfg = layered(file_prefix)?;
    let defaults = GraphConfig::default();

    Ok(GraphConfig {
        uri: cfg.get_string("neo4j.uri").unwrap_or(defaults.uri),
        user: cfg.get_string("neo4j.user").unwrap_or(defaults.user),
        password: cfg.get_string("neo4j.password").unwrap_or(defaults.password),
        max_connections: cfg
            .get_int("neo4j.max_connections")
            .ok()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.max_connections),
        fetch_size: cfg
            .get_int("neo4j.fetch_size")
            .ok()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(defaults.fetch_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
        let path = dir.path().join("orgchart.toml");
        std::fs::write(&path, body).unwrap();
        dir.path().join("orgchart").to_string_lossy().into_owned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent").to_string_lossy().into_owned();

        let apply = load_apply_config(&prefix).unwrap();
        assert!(apply.stop_on_error);
        assert_eq!(apply.store_timeout(), Duration::from_secs(30));

        let graph = load_graph_config(&prefix).unwrap();
        assert_eq!(graph.uri, "bolt://localhost:7687");
        assert_eq!(graph.max_connections, 16);
    }

    #[test]
    fn sections_are_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = write_config(
            &dir,
            r#"
[apply]
journal_dir = "/var/lib/orgchart/journal"
stop_on_error = false

[neo4j]
uri = "bolt://graph.internal:7687"
fetch_size = 64
"#,
        );

        let apply = load_apply_config(&prefix).unwrap();
        assert_eq!(apply.journal_dir, "/var/lib/orgchart/journal");
        assert!(!apply.stop_on_error);
        assert_eq!(apply.counters_path, "./counters.json");

        let graph = load_graph_config(&prefix).unwrap();
        assert_eq!(graph.uri, "bolt://graph.internal:7687");
        assert_eq!(graph.fetch_size, 64);
        assert_eq!(graph.user, "neo4j");
    }
}
