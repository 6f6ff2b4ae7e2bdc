//! Project configuration stored in `deployctl.toml`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::target_pattern::is_valid_segment;

pub const CONFIG_FILE_NAME: &str = "deployctl.toml";

/// Project configuration (TOML).
///
/// ```toml
/// project = "shop"
///
/// [runner]
/// enabled = true
///
/// [[app]]
/// name = "web"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerSettings>,

    /// Declared apps, in declaration order.
    #[serde(default, rename = "app")]
    pub apps: Vec<AppConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerSettings {
    /// Whether operations for this project may run on a remote runner.
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub name: String,
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_segment(&self.project) {
            return Err(anyhow!(
                "project must be a non-empty name of [-0-9A-Za-z_] (got '{}')",
                self.project
            ));
        }
        let mut seen = HashSet::new();
        for app in &self.apps {
            if !is_valid_segment(&app.name) {
                return Err(anyhow!(
                    "app name must be a non-empty name of [-0-9A-Za-z_] (got '{}')",
                    app.name
                ));
            }
            if !seen.insert(app.name.as_str()) {
                return Err(anyhow!("duplicate app '{}'", app.name));
            }
        }
        Ok(())
    }

    pub fn app_names(&self) -> Vec<&str> {
        self.apps.iter().map(|app| app.name.as_str()).collect()
    }

    pub fn runner_enabled(&self) -> bool {
        self.runner.as_ref().is_some_and(|runner| runner.enabled)
    }
}

/// A configuration together with the file it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: ProjectConfig,
}

impl LoadedConfig {
    /// Directory holding the configuration file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Source of project configuration. `Ok(None)` means no configuration exists.
pub trait ConfigLoader {
    fn load(&self) -> Result<Option<LoadedConfig>>;
}

/// Loads `deployctl.toml` from `start` or its closest ancestor.
pub struct FsConfigLoader {
    start: PathBuf,
}

impl FsConfigLoader {
    pub fn new(start: impl Into<PathBuf>) -> Self {
        Self {
            start: start.into(),
        }
    }
}

impl ConfigLoader for FsConfigLoader {
    fn load(&self) -> Result<Option<LoadedConfig>> {
        let Some(path) = find_config(&self.start) else {
            debug!(start = %self.start.display(), "no project configuration found");
            return Ok(None);
        };
        let config = load_config(&path)?;
        Ok(Some(LoadedConfig { path, config }))
    }
}

/// Walk up from `start` looking for [`CONFIG_FILE_NAME`].
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    debug!(path = %path.display(), "loading project configuration");
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ProjectConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Write a configuration file (used by fixtures and scaffolding).
pub fn write_config(path: &Path, cfg: &ProjectConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize project config")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_APPS: &str = r#"
project = "shop"

[runner]
enabled = true

[[app]]
name = "web"

[[app]]
name = "api"
"#;

    #[test]
    fn parses_apps_in_declaration_order() {
        let cfg: ProjectConfig = toml::from_str(TWO_APPS).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.project, "shop");
        assert_eq!(cfg.app_names(), vec!["web", "api"]);
        assert!(cfg.runner_enabled());
    }

    #[test]
    fn runner_defaults_to_disabled() {
        let cfg: ProjectConfig = toml::from_str("project = \"shop\"\n").expect("parse");
        assert!(!cfg.runner_enabled());
        assert!(cfg.apps.is_empty());
    }

    #[test]
    fn rejects_duplicate_and_malformed_apps() {
        let dup: ProjectConfig =
            toml::from_str("project = \"shop\"\n[[app]]\nname = \"web\"\n[[app]]\nname = \"web\"\n")
                .expect("parse");
        assert!(dup.validate().unwrap_err().to_string().contains("duplicate app"));

        let bad: ProjectConfig =
            toml::from_str("project = \"shop\"\n[[app]]\nname = \"w/b\"\n").expect("parse");
        assert!(bad.validate().is_err());
    }

    #[test]
    fn loader_finds_config_in_ancestor() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(CONFIG_FILE_NAME), TWO_APPS).expect("write");
        let nested = temp.path().join("services").join("web");
        fs::create_dir_all(&nested).expect("mkdir");

        let loaded = FsConfigLoader::new(&nested)
            .load()
            .expect("load")
            .expect("config present");
        assert_eq!(loaded.config.project, "shop");
        assert_eq!(loaded.dir(), temp.path());
    }

    #[test]
    fn loader_returns_none_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let loaded = FsConfigLoader::new(temp.path()).load().expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        let cfg: ProjectConfig = toml::from_str(TWO_APPS).expect("parse");
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }
}
