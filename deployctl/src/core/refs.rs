//! Lightweight identifiers for projects, apps and workspaces.
//!
//! Refs address a target without fetching its full descriptor. They are
//! validated on construction and immutable afterwards.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Workspace used when no flag, environment value or stored context names one.
pub const DEFAULT_WORKSPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefError {
    #[error("project name must not be empty")]
    EmptyProject,
    #[error("app name must not be empty")]
    EmptyApp,
    #[error("workspace name must not be empty")]
    EmptyWorkspace,
}

/// Identifies a project by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectRef {
    name: String,
}

impl ProjectRef {
    pub fn new(name: impl Into<String>) -> Result<Self, RefError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RefError::EmptyProject);
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address an app inside this project.
    pub fn app(&self, app: impl Into<String>) -> Result<AppRef, RefError> {
        AppRef::new(self.name.clone(), app)
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identifies an application by project name plus application name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AppRef {
    project: String,
    app: String,
}

impl AppRef {
    pub fn new(project: impl Into<String>, app: impl Into<String>) -> Result<Self, RefError> {
        let project = project.into();
        let app = app.into();
        if project.trim().is_empty() {
            return Err(RefError::EmptyProject);
        }
        if app.trim().is_empty() {
            return Err(RefError::EmptyApp);
        }
        Ok(Self { project, app })
    }

    pub fn project_name(&self) -> &str {
        &self.project
    }

    pub fn app_name(&self) -> &str {
        &self.app
    }

    pub fn project(&self) -> ProjectRef {
        ProjectRef {
            name: self.project.clone(),
        }
    }
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.app)
    }
}

/// Identifies a workspace. Resolution always yields one (see [`DEFAULT_WORKSPACE`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkspaceRef {
    name: String,
}

impl WorkspaceRef {
    pub fn new(name: impl Into<String>) -> Result<Self, RefError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RefError::EmptyWorkspace);
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for WorkspaceRef {
    fn default() -> Self {
        Self {
            name: DEFAULT_WORKSPACE.to_string(),
        }
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
