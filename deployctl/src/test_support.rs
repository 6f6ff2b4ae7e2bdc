//! Test-only fakes for the init and dispatch collaborators.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::context::Invocation;
use crate::core::refs::ProjectRef;
use crate::io::context_store::{ContextConfig, ContextStore};
use crate::io::project_config::{AppConfig, ConfigLoader, LoadedConfig, ProjectConfig};
use crate::io::server::{Application, DataSource, OnDemandRunnerConfig, Project, ServerClient};
use crate::io::ui::Ui;

/// [`ConfigLoader`] returning a fixed result and counting calls.
pub struct StaticConfigLoader {
    result: std::result::Result<Option<LoadedConfig>, String>,
    loads: Cell<usize>,
}

impl StaticConfigLoader {
    pub fn none() -> Self {
        Self::from_result(Ok(None))
    }

    pub fn some(config: LoadedConfig) -> Self {
        Self::from_result(Ok(Some(config)))
    }

    pub fn failing(message: &str) -> Self {
        Self::from_result(Err(message.to_string()))
    }

    fn from_result(result: std::result::Result<Option<LoadedConfig>, String>) -> Self {
        Self {
            result,
            loads: Cell::new(0),
        }
    }

    /// Number of `load` calls so far.
    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Option<LoadedConfig>> {
        self.loads.set(self.loads.get() + 1);
        self.result.clone().map_err(|message| anyhow!(message))
    }
}

/// In-memory [`ContextStore`].
#[derive(Default)]
pub struct MemoryContextStore {
    default: Option<String>,
    contexts: BTreeMap<String, ContextConfig>,
    failure: Option<String>,
}

impl MemoryContextStore {
    /// A store whose default context `name` records `workspace`.
    pub fn with_default(name: &str, workspace: &str) -> Self {
        let mut contexts = BTreeMap::new();
        contexts.insert(
            name.to_string(),
            ContextConfig {
                workspace: workspace.to_string(),
                ..ContextConfig::default()
            },
        );
        Self {
            default: Some(name.to_string()),
            contexts,
            failure: None,
        }
    }

    /// A store whose every read fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }
}

impl ContextStore for MemoryContextStore {
    fn default_name(&self) -> Result<Option<String>> {
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        Ok(self.default.clone())
    }

    fn load(&self, name: &str) -> Result<ContextConfig> {
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        self.contexts
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("context '{name}' not found"))
    }
}

/// [`ServerClient`] answering from canned projects and profiles.
#[derive(Default)]
pub struct ScriptedServer {
    projects: Vec<Project>,
    project_failure: Option<String>,
    profiles: Vec<OnDemandRunnerConfig>,
    profile_failure: Option<String>,
    profile_list_calls: Cell<usize>,
    project_calls: RefCell<Vec<String>>,
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    pub fn with_failing_project(mut self, message: &str) -> Self {
        self.project_failure = Some(message.to_string());
        self
    }

    pub fn with_profiles(mut self, profiles: Vec<OnDemandRunnerConfig>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_failing_profile_list(mut self, message: &str) -> Self {
        self.profile_failure = Some(message.to_string());
        self
    }

    pub fn profile_list_calls(&self) -> usize {
        self.profile_list_calls.get()
    }

    /// Project names requested so far, in order.
    pub fn project_calls(&self) -> Vec<String> {
        self.project_calls.borrow().clone()
    }
}

impl ServerClient for ScriptedServer {
    fn get_project(&self, project: &ProjectRef) -> Result<Project> {
        self.project_calls.borrow_mut().push(project.name().to_string());
        if let Some(message) = &self.project_failure {
            return Err(anyhow!(message.clone()));
        }
        self.projects
            .iter()
            .find(|candidate| candidate.name == project.name())
            .cloned()
            .ok_or_else(|| anyhow!("project not found: {project}"))
    }

    fn list_ondemand_runner_configs(&self) -> Result<Vec<OnDemandRunnerConfig>> {
        self.profile_list_calls.set(self.profile_list_calls.get() + 1);
        if let Some(message) = &self.profile_failure {
            return Err(anyhow!(message.clone()));
        }
        Ok(self.profiles.clone())
    }
}

/// [`Ui`] that records every line.
#[derive(Default)]
pub struct RecordingUi {
    outputs: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
}

impl RecordingUi {
    pub fn outputs(&self) -> Vec<String> {
        self.outputs.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl Ui for RecordingUi {
    fn output(&self, message: &str) {
        self.outputs.borrow_mut().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }
}

/// A loaded configuration for `project` declaring `apps` in order. The path
/// points at a directory that does not exist, so no variable files are found.
pub fn project_config(project: &str, apps: &[&str]) -> LoadedConfig {
    LoadedConfig {
        path: PathBuf::from("/nonexistent/deployctl-fixture/deployctl.toml"),
        config: ProjectConfig {
            project: project.to_string(),
            runner: None,
            apps: apps
                .iter()
                .map(|name| AppConfig {
                    name: name.to_string(),
                })
                .collect(),
        },
    }
}

/// A remote-enabled, Git-sourced project with no runner profile assigned.
pub fn git_project(name: &str, apps: &[&str]) -> Project {
    Project {
        name: name.to_string(),
        applications: apps
            .iter()
            .map(|app| Application {
                name: app.to_string(),
            })
            .collect(),
        remote_enabled: true,
        data_source: Some(DataSource::Git {
            url: format!("https://git.example.com/{name}.git"),
            path: String::new(),
            git_ref: "main".to_string(),
        }),
        ondemand_runner: None,
    }
}

pub fn runner_profile(name: &str, default: bool) -> OnDemandRunnerConfig {
    OnDemandRunnerConfig {
        name: name.to_string(),
        plugin_type: "docker".to_string(),
        default,
    }
}

/// An invocation with the given positional args and everything else unset.
pub fn invocation(args: &[&str]) -> Invocation {
    Invocation {
        args: args.iter().map(|arg| arg.to_string()).collect(),
        ..Invocation::default()
    }
}
