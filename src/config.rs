//! Loading service configuration (seeding + optional exercise bank) from TOML.
//!
//! See `AppConfig` for the expected schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::NewExercise;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
  /// Seed the demo catalogue when the store starts out empty.
  #[serde(default = "default_true")]
  pub seed_defaults: bool,
  /// JSON snapshot file. `None` keeps everything in memory.
  #[serde(default)]
  pub snapshot_path: Option<PathBuf>,
  /// Extra exercises added to an empty store alongside the demo catalogue.
  #[serde(default)]
  pub exercises: Vec<ExerciseCfg>,
}

fn default_true() -> bool { true }

impl Default for AppConfig {
  fn default() -> Self {
    Self { seed_defaults: true, snapshot_path: None, exercises: Vec::new() }
  }
}

/// Exercise entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseCfg {
  pub title: String,
  pub content: String,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub tags: Vec<String>,
}

impl From<ExerciseCfg> for NewExercise {
  fn from(c: ExerciseCfg) -> Self {
    NewExercise { title: c.title, content: c.content, description: c.description, tags: c.tags }
  }
}

/// Attempt to load `AppConfig` from RECALL_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("RECALL_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "recall_backend", %path, bank = cfg.exercises.len(), "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "recall_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "recall_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Config from file (or defaults), with RECALL_DATA_PATH overriding the snapshot location.
pub fn resolve_config() -> AppConfig {
  let mut cfg = load_config_from_env().unwrap_or_default();
  if let Ok(path) = std::env::var("RECALL_DATA_PATH") {
    if !path.trim().is_empty() {
      cfg.snapshot_path = Some(PathBuf::from(path));
    }
  }
  cfg
}
