//! Configuration system for simscore.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/simscore/config.toml` and/or `.simscore/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::bootstrap::Bootstrap;
use crate::error::ConfigError;
use crate::types::{SCORE_COLUMN, WeightSet};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimscoreConfig {
    /// Metric weights used for the composite score.
    #[serde(default = "default_weights")]
    pub weights: WeightSet,
    /// Bootstrap settings for per-tag confidence intervals.
    #[serde(default)]
    pub bootstrap: Bootstrap,
    /// Scoring pass settings.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Run registry settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for SimscoreConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            bootstrap: Bootstrap::default(),
            scoring: ScoringConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

fn default_weights() -> WeightSet {
    WeightSet::new()
        .with("bleu", 0.2)
        .with("rouge_l", 0.3)
        .with("token_f1", 0.5)
}

/// Scoring pass configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score records on a worker pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Column summarized per tag.
    #[serde(default = "default_summary_metric")]
    pub summary_metric: String,
    /// Number of top rows shown after a pass.
    #[serde(default = "default_top")]
    pub top: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            summary_metric: default_summary_metric(),
            top: default_top(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_summary_metric() -> String {
    SCORE_COLUMN.to_string()
}

fn default_top() -> usize {
    10
}

/// Run registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database that runs are logged to. No logging when unset.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

impl SimscoreConfig {
    /// Reject settings that would make a pass meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bootstrap.iterations == 0 {
            return Err(ConfigError::Invalid {
                message: "bootstrap.iterations must be at least 1".to_string(),
            });
        }
        let alpha = self.bootstrap.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::Invalid {
                message: format!("bootstrap.alpha must be in (0, 1), got {alpha}"),
            });
        }
        self.weights.validate().map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// Load configuration from all layers.
///
/// Sections merge key by key across layers, except `weights`: the highest
/// layer that sets a weight table replaces the lower ones entirely, so a
/// config naming only `exact_match` scores with `exact_match` alone.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SimscoreConfig>,
) -> Result<SimscoreConfig, Box<figment::Error>> {
    let mut layers: Vec<Figment> = Vec::new();

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "simscore", "simscore") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            layers.push(Figment::from(Toml::file(&user_config)));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            layers.push(Figment::from(Toml::file(&ws_config)));
        }
    }

    // Environment variables (SIMSCORE_BOOTSTRAP__SEED, SIMSCORE_WEIGHTS__BLEU, etc.)
    layers.push(Figment::from(Env::prefixed("SIMSCORE_").split("__")));

    // Explicit overrides
    if let Some(overrides) = overrides {
        layers.push(Figment::from(Serialized::defaults(overrides)));
    }

    let mut figment = Figment::from(Serialized::defaults(SimscoreConfig::default()));
    let mut weights: Option<WeightSet> = None;
    for layer in layers {
        if layer.contains("weights") {
            weights = Some(layer.extract_inner("weights").map_err(Box::new)?);
        }
        figment = figment.merge(layer);
    }

    let mut config: SimscoreConfig = figment.extract().map_err(Box::new)?;
    if let Some(weights) = weights {
        config.weights = weights;
    }
    Ok(config)
}

/// Check whether any simscore configuration file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "simscore", "simscore") {
        if config_dir.config_dir().join("config.toml").exists() {
            return true;
        }
    }

    if let Some(ws) = workspace {
        if ws.join(".simscore").join("config.toml").exists() {
            return true;
        }
    }

    false
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".simscore").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimscoreConfig::default();
        assert_eq!(config.weights.get("bleu"), Some(0.2));
        assert_eq!(config.weights.get("rouge_l"), Some(0.3));
        assert_eq!(config.weights.get("token_f1"), Some(0.5));
        assert_eq!(config.bootstrap.iterations, 1000);
        assert_eq!(config.bootstrap.alpha, 0.05);
        assert!(config.bootstrap.seed.is_none());
        assert!(config.scoring.parallel);
        assert_eq!(config.scoring.summary_metric, "score");
        assert!(config.store.database.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = SimscoreConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SimscoreConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_workspace_config_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg_dir = dir.path().join(".simscore");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[bootstrap]\niterations = 200\nseed = 11\n\n[scoring]\nparallel = false\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.bootstrap.iterations, 200);
        assert_eq!(config.bootstrap.seed, Some(11));
        assert_eq!(config.bootstrap.alpha, 0.05);
        assert!(!config.scoring.parallel);
        assert!(config_exists(Some(dir.path())));
    }

    #[test]
    fn test_workspace_weights_replace_default_weights() {
        let dir = TempDir::new().unwrap();
        let cfg_dir = dir.path().join(".simscore");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[weights]\nexact_match = 1.0\n").unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.weights.len(), 1);
        assert_eq!(config.weights.get("exact_match"), Some(1.0));
        assert_eq!(config.weights.get("bleu"), None);
        assert_eq!(config.bootstrap.iterations, 1000);
    }

    #[test]
    fn test_override_weights_replace_file_weights() {
        let dir = TempDir::new().unwrap();
        let cfg_dir = dir.path().join(".simscore");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[weights]\nexact_match = 1.0\ntoken_f1 = 2.0\n",
        )
        .unwrap();

        let mut overrides = SimscoreConfig::default();
        overrides.weights = WeightSet::new().with("bleu", 1.0);
        let config = load_config(Some(dir.path()), Some(&overrides)).unwrap();
        assert_eq!(config.weights, WeightSet::new().with("bleu", 1.0));
    }

    #[test]
    fn test_defaults_apply_without_weight_table() {
        let dir = TempDir::new().unwrap();
        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.weights, default_weights());
    }

    #[test]
    fn test_validate_rejects_bad_alpha_and_iterations() {
        let mut config = SimscoreConfig::default();
        config.bootstrap.alpha = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimscoreConfig::default();
        config.bootstrap.iterations = 0;
        assert!(config.validate().is_err());

        let mut config = SimscoreConfig::default();
        config.weights = WeightSet::new().with("bleu", -0.1);
        assert!(config.validate().is_err());
    }
}
