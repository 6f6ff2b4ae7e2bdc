//! Input variable merging.
//!
//! Values arrive from several sources and are merged lowest precedence first:
//! environment, auto-loaded files, `--var-file` files, then `--var` flags.
//! Later writers replace earlier values but keep the first insertion position.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum VariableSource {
    Env,
    File(PathBuf),
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub source: VariableSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    #[error("variable name must not be empty (source: {0:?})")]
    EmptyName(VariableSource),
}

/// Ordered name to value assignments with last-writer-wins semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableSet {
    entries: IndexMap<String, Variable>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: Variable) -> Result<(), VariableError> {
        if variable.name.trim().is_empty() {
            return Err(VariableError::EmptyName(variable.source));
        }
        self.entries.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Insert every `(name, value)` pair with the same source.
    pub fn extend_from<I>(&mut self, source: &VariableSource, pairs: I) -> Result<(), VariableError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in pairs {
            self.insert(Variable {
                name,
                value,
                source: source.clone(),
            })?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Already-read variable inputs, grouped by precedence tier.
#[derive(Debug, Clone, Default)]
pub struct VariableInputs {
    pub env: Vec<(String, String)>,
    /// Auto-loaded and explicit files, in application order.
    pub files: Vec<(PathBuf, Vec<(String, String)>)>,
    pub flags: Vec<(String, String)>,
}

/// Merge all tiers into one [`VariableSet`], flags applied last.
pub fn merge_variables(inputs: VariableInputs) -> Result<VariableSet, VariableError> {
    let mut set = VariableSet::new();
    set.extend_from(&VariableSource::Env, inputs.env)?;
    for (path, pairs) in inputs.files {
        set.extend_from(&VariableSource::File(path), pairs)?;
    }
    set.extend_from(&VariableSource::Flag, inputs.flags)?;
    Ok(set)
}
