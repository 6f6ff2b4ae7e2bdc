//! Variable files (`--var-file`, `*.auto.vars.toml`) and `DEPLOYCTL_VAR_*`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde_json::Value as JsonValue;
use toml::Value as TomlValue;
use tracing::debug;

/// Environment variables with this prefix set input variables.
pub const VAR_ENV_PREFIX: &str = "DEPLOYCTL_VAR_";

const AUTO_SUFFIXES: [&str; 2] = [".auto.vars.toml", ".auto.vars.json"];

/// Read a variable file. `.json` files are JSON, everything else TOML.
///
/// Values must be scalars; numbers and booleans are rendered as text.
pub fn read_var_file(path: &Path) -> Result<Vec<(String, String)>> {
    debug!(path = %path.display(), "reading variable file");
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json_vars(&contents).with_context(|| format!("parse {}", path.display()))
    } else {
        parse_toml_vars(&contents).with_context(|| format!("parse {}", path.display()))
    }
}

/// Auto-loaded variable files in `dir`, sorted by file name.
pub fn auto_var_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err).with_context(|| format!("read {}", dir.display())),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if AUTO_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Collect `DEPLOYCTL_VAR_<name>` pairs, sorted by name.
pub fn env_vars<I>(vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut pairs: Vec<(String, String)> = vars
        .into_iter()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix(VAR_ENV_PREFIX)?;
            (!name.is_empty()).then(|| (name.to_string(), value))
        })
        .collect();
    pairs.sort();
    pairs
}

fn parse_toml_vars(contents: &str) -> Result<Vec<(String, String)>> {
    let table: toml::Table = toml::from_str(contents)?;
    table
        .into_iter()
        .map(|(name, value)| {
            let rendered = match value {
                TomlValue::String(s) => s,
                TomlValue::Integer(n) => n.to_string(),
                TomlValue::Float(n) => n.to_string(),
                TomlValue::Boolean(b) => b.to_string(),
                TomlValue::Datetime(dt) => dt.to_string(),
                TomlValue::Array(_) | TomlValue::Table(_) => {
                    return Err(anyhow!("variable '{name}' must be a scalar value"));
                }
            };
            Ok((name, rendered))
        })
        .collect()
}

fn parse_json_vars(contents: &str) -> Result<Vec<(String, String)>> {
    let value: JsonValue = serde_json::from_str(contents)?;
    let JsonValue::Object(map) = value else {
        return Err(anyhow!("variable file must contain a JSON object"));
    };
    map.into_iter()
        .map(|(name, value)| {
            let rendered = match value {
                JsonValue::String(s) => s,
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => {
                    return Err(anyhow!("variable '{name}' must be a scalar value"));
                }
            };
            Ok((name, rendered))
        })
        .collect()
}
