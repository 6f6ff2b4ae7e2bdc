//! Stored CLI connection contexts under `<config-dir>/deployctl/context/`.
//!
//! Each context is a `<name>.toml` file. The name of the default context is
//! kept in `.default`; an empty value or `-` means no default is set.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::target_pattern::is_valid_segment;

/// Overrides the configuration directory (`<config-dir>/deployctl`).
pub const CONFIG_DIR_ENV: &str = "DEPLOYCTL_CONFIG_DIR";

const DEFAULT_FILE: &str = ".default";
const NO_DEFAULT: &str = "-";

/// One stored connection context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Workspace to use when no flag or environment value is given.
    pub workspace: String,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub tls: bool,
    pub tls_skip_verify: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            tls: true,
            tls_skip_verify: false,
        }
    }
}

/// Read access to stored contexts.
pub trait ContextStore {
    /// Name of the default context, if one is set.
    fn default_name(&self) -> Result<Option<String>>;
    /// Load a context by name.
    fn load(&self, name: &str) -> Result<ContextConfig>;
}

/// Filesystem-backed [`ContextStore`].
#[derive(Debug, Clone)]
pub struct FsContextStore {
    dir: PathBuf,
}

impl FsContextStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the default location, honouring [`CONFIG_DIR_ENV`].
    pub fn from_env() -> Self {
        Self::new(default_config_dir().join("context"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a context (temp file + rename).
    pub fn write(&self, name: &str, cfg: &ContextConfig) -> Result<()> {
        validate_name(name)?;
        let mut buf = toml::to_string_pretty(cfg).context("serialize context toml")?;
        buf.push('\n');
        write_atomic(&self.context_path(name), &buf)
    }

    /// Record `name` as the default context, or clear it with `None`.
    pub fn set_default(&self, name: Option<&str>) -> Result<()> {
        let value = match name {
            Some(name) => {
                validate_name(name)?;
                name
            }
            None => NO_DEFAULT,
        };
        write_atomic(&self.dir.join(DEFAULT_FILE), &format!("{value}\n"))
    }

    fn context_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.toml"))
    }
}

impl ContextStore for FsContextStore {
    fn default_name(&self) -> Result<Option<String>> {
        let path = self.dir.join(DEFAULT_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", path.display()));
            }
        };
        let name = contents.trim();
        if name.is_empty() || name == NO_DEFAULT {
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    fn load(&self, name: &str) -> Result<ContextConfig> {
        validate_name(name)?;
        let path = self.context_path(name);
        debug!(path = %path.display(), "loading stored context");
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(anyhow!("context '{name}' not found in {}", self.dir.display()));
            }
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
    }
}

/// `$DEPLOYCTL_CONFIG_DIR`, else `<config-dir>/deployctl`.
pub fn default_config_dir() -> PathBuf {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deployctl")
}

fn validate_name(name: &str) -> Result<()> {
    if !is_valid_segment(name) {
        return Err(anyhow!("context name must be [-0-9A-Za-z_] only (got '{name}')"));
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("context path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp context {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace context {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FsContextStore::new(temp.path().join("context"));
        assert_eq!(store.default_name().expect("default"), None);
    }

    #[test]
    fn dash_default_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FsContextStore::new(temp.path());
        store.set_default(None).expect("clear default");
        assert_eq!(store.default_name().expect("default"), None);
    }

    #[test]
    fn stored_default_loads_workspace_and_server() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FsContextStore::new(temp.path());
        let cfg = ContextConfig {
            workspace: "staging".to_string(),
            server: ServerConfig {
                address: "deploy.example.com:9701".to_string(),
                ..ServerConfig::default()
            },
        };
        store.write("prod", &cfg).expect("write");
        store.set_default(Some("prod")).expect("set default");

        let name = store.default_name().expect("default").expect("some default");
        assert_eq!(name, "prod");
        let loaded = store.load(&name).expect("load");
        assert_eq!(loaded, cfg);
        assert!(loaded.server.tls);
    }

    #[test]
    fn server_table_defaults_tls_on() {
        let cfg: ContextConfig = toml::from_str("workspace = \"dev\"\n").expect("parse");
        assert!(cfg.server.tls);
        assert!(!cfg.server.tls_skip_verify);
        assert!(cfg.server.address.is_empty());
    }

    #[test]
    fn load_unknown_context_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FsContextStore::new(temp.path());
        let err = store.load("ghost").unwrap_err();
        assert!(err.to_string().contains("context 'ghost' not found"));
    }
}
