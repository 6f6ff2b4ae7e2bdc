//! Command initialization: builds the immutable [`CommandContext`].
//!
//! [`init`] runs once per invocation. It validates flag placement, resolves
//! the workspace and target, loads variables, and checks that the requested
//! execution mode is possible. Nothing mutates the context afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::flag_order::check_flags_after_args;
use crate::core::refs::{AppRef, ProjectRef, WorkspaceRef};
use crate::core::variables::{VariableInputs, VariableSet, merge_variables};
use crate::error::InitError;
use crate::flags::{GlobalFlags, OperationFlags};
use crate::io::context_store::ContextStore;
use crate::io::project_config::{ConfigLoader, LoadedConfig};
use crate::io::server::ServerClient;
use crate::io::var_file::{auto_var_files, env_vars, read_var_file};
use crate::remote::decide_remote;
use crate::target::{ConfigPolicy, TargetFlags, TargetMode, resolve_target};
use crate::workspace::{WORKSPACE_ENV, resolve_workspace};

/// Environment values read once per invocation.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub workspace: Option<String>,
    /// `DEPLOYCTL_VAR_*` values with the prefix stripped.
    pub vars: Vec<(String, String)>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            workspace: env::var(WORKSPACE_ENV).ok(),
            vars: env_vars(env::vars()),
        }
    }
}

/// Raw inputs of one command invocation.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub global: GlobalFlags,
    pub operation: OperationFlags,
    /// Positional arguments left after flag parsing.
    pub args: Vec<String>,
    /// Flag names the invoked command accepts, without hyphens.
    pub recognized_flags: BTreeSet<String>,
    pub env: EnvSnapshot,
}

/// Per-command initialization behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    pub target: TargetMode,
    pub config: ConfigPolicy,
    /// Check, via the server, that a positionally targeted project can
    /// actually run remotely.
    pub validate_runner: bool,
}

/// Collaborators consulted during initialization.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub config: &'a dyn ConfigLoader,
    pub contexts: &'a dyn ContextStore,
    pub server: Option<&'a dyn ServerClient>,
}

/// Everything later phases need to know about the invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CommandContext {
    workspace: WorkspaceRef,
    project: Option<ProjectRef>,
    app: Option<AppRef>,
    requires_runner: bool,
    args: Vec<String>,
    variables: VariableSet,
    labels: BTreeMap<String, String>,
    remote_source: BTreeMap<String, String>,
    remote: bool,
    plain: bool,
    flag_project: Option<String>,
    flag_app: Option<String>,
    config_path: Option<PathBuf>,
    #[serde(skip)]
    config: Option<LoadedConfig>,
}

impl CommandContext {
    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }

    pub fn project(&self) -> Option<&ProjectRef> {
        self.project.as_ref()
    }

    pub fn app(&self) -> Option<&AppRef> {
        self.app.as_ref()
    }

    /// True when the target was given positionally, which delegates the
    /// operation to a remote runner.
    pub fn requires_runner(&self) -> bool {
        self.requires_runner
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn remote_source(&self) -> &BTreeMap<String, String> {
        &self.remote_source
    }

    /// `--remote` was given.
    pub fn remote_requested(&self) -> bool {
        self.remote
    }

    pub fn plain(&self) -> bool {
        self.plain
    }

    /// Raw `--project` value.
    pub fn flag_project(&self) -> Option<&str> {
        self.flag_project.as_deref()
    }

    /// Raw `--app` value.
    pub fn flag_app(&self) -> Option<&str> {
        self.flag_app.as_deref()
    }

    pub fn config(&self) -> Option<&LoadedConfig> {
        self.config.as_ref()
    }
}

/// Build the command context. Errors stop the command before any work runs.
pub fn init(
    invocation: Invocation,
    options: InitOptions,
    collaborators: Collaborators<'_>,
) -> Result<CommandContext, InitError> {
    let Invocation {
        global,
        operation,
        args,
        recognized_flags,
        env,
    } = invocation;

    check_flags_after_args(&args, &recognized_flags)?;

    let workspace = resolve_workspace(
        global.workspace.as_deref(),
        env.workspace.as_deref(),
        collaborators.contexts,
    )
    .map_err(InitError::Collaborator)?;

    let flag_project = non_empty(global.project);
    let flag_app = non_empty(global.app);
    let target = resolve_target(
        args,
        options.target,
        options.config,
        TargetFlags {
            project: flag_project.as_deref(),
            app: flag_app.as_deref(),
        },
        collaborators.config,
    )?;

    let variables = load_variables(
        env.vars,
        target.config.as_ref(),
        &operation.var_files,
        operation.vars,
    )?;

    if options.target != TargetMode::AppOptional && operation.remote && target.app.is_none() {
        let enabled = target
            .config
            .as_ref()
            .is_some_and(|loaded| loaded.config.runner_enabled());
        if !enabled {
            return Err(InitError::RemoteUnsupported);
        }
    }

    if target.requires_runner && options.validate_runner {
        if let Some(project) = &target.project {
            validate_runner_capability(project, collaborators.server)?;
        }
    }

    let ctx = CommandContext {
        workspace,
        project: target.project,
        app: target.app,
        requires_runner: target.requires_runner,
        args: target.args,
        variables,
        labels: operation.labels.into_iter().collect(),
        remote_source: operation.remote_source.into_iter().collect(),
        remote: operation.remote,
        plain: global.plain,
        flag_project,
        flag_app,
        config_path: target.config.as_ref().map(|loaded| loaded.path.clone()),
        config: target.config,
    };
    info!(
        workspace = %ctx.workspace,
        project = ?ctx.project.as_ref().map(ProjectRef::name),
        app = ?ctx.app.as_ref().map(ToString::to_string),
        requires_runner = ctx.requires_runner,
        "command context initialized"
    );
    Ok(ctx)
}

fn load_variables(
    env: Vec<(String, String)>,
    config: Option<&LoadedConfig>,
    var_files: &[PathBuf],
    flags: Vec<(String, String)>,
) -> Result<VariableSet, InitError> {
    let mut files = Vec::new();
    if let Some(loaded) = config {
        for path in auto_var_files(loaded.dir()).map_err(InitError::VariableFile)? {
            files.push(read_file(&path)?);
        }
    }
    for path in var_files {
        files.push(read_file(path)?);
    }
    Ok(merge_variables(VariableInputs { env, files, flags })?)
}

fn read_file(path: &Path) -> Result<(PathBuf, Vec<(String, String)>), InitError> {
    let pairs = read_var_file(path).map_err(InitError::VariableFile)?;
    Ok((path.to_path_buf(), pairs))
}

fn validate_runner_capability(
    project: &ProjectRef,
    server: Option<&dyn ServerClient>,
) -> Result<(), InitError> {
    let Some(server) = server else {
        debug!(project = %project, "no server connection; skipping runner capability check");
        return Ok(());
    };
    let descriptor = server
        .get_project(project)
        .map_err(InitError::Collaborator)?;
    let decision = decide_remote(server, &descriptor).map_err(InitError::Collaborator)?;
    if !decision.is_remote() {
        return Err(InitError::RunnerUnavailable {
            project: project.name().to_string(),
            reason: decision.reason.to_string(),
        });
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::variables::VariableSource;
    use crate::error::ErrorKind;
    use crate::io::server::OnDemandRunnerRef;
    use crate::test_support::{
        MemoryContextStore, ScriptedServer, StaticConfigLoader, git_project, invocation,
        project_config,
    };

    fn options(target: TargetMode) -> InitOptions {
        InitOptions {
            target,
            config: ConfigPolicy::Load,
            validate_runner: false,
        }
    }

    #[test]
    fn flag_after_args_fails_before_anything_else() {
        let loader = StaticConfigLoader::failing("must not be read");
        let store = MemoryContextStore::failing("must not be read");
        let mut inv = invocation(&["shop", "--label", "x=y"]);
        inv.recognized_flags.insert("label".to_string());

        let err = init(
            inv,
            options(TargetMode::AppOptional),
            Collaborators {
                config: &loader,
                contexts: &store,
                server: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, InitError::FlagOrder(_)));
        assert_eq!(err.kind(), ErrorKind::InputShape);
    }

    #[test]
    fn builds_context_from_config_and_flags() {
        let loader = StaticConfigLoader::some(project_config("shop", &["web", "api"]));
        let store = MemoryContextStore::with_default("ctx", "staging");
        let mut inv = invocation(&[]);
        inv.global.app = Some("api".to_string());
        inv.operation.labels = vec![
            ("team".to_string(), "a".to_string()),
            ("team".to_string(), "b".to_string()),
        ];
        inv.operation.vars = vec![("region".to_string(), "eu".to_string())];
        inv.env.vars = vec![("region".to_string(), "us".to_string())];

        let ctx = init(
            inv,
            options(TargetMode::AppRequired),
            Collaborators {
                config: &loader,
                contexts: &store,
                server: None,
            },
        )
        .expect("init");

        assert_eq!(ctx.workspace().name(), "staging");
        assert_eq!(ctx.project().unwrap().name(), "shop");
        assert_eq!(ctx.app().unwrap().to_string(), "shop/api");
        assert!(!ctx.requires_runner());
        assert_eq!(ctx.labels().get("team").map(String::as_str), Some("b"));
        let region = ctx.variables().get("region").expect("region");
        assert_eq!(region.value, "eu");
        assert_eq!(region.source, VariableSource::Flag);
    }

    #[test]
    fn remote_flag_requires_runner_enabled_config() {
        let loader = StaticConfigLoader::some(project_config("shop", &["web"]));
        let store = MemoryContextStore::default();
        let mut inv = invocation(&[]);
        inv.operation.remote = true;

        let err = init(
            inv,
            options(TargetMode::None),
            Collaborators {
                config: &loader,
                contexts: &store,
                server: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, InitError::RemoteUnsupported));
        assert_eq!(err.kind(), ErrorKind::Capability);
    }

    #[test]
    fn remote_flag_allowed_when_runner_enabled() {
        let mut cfg = project_config("shop", &["web"]);
        cfg.config.runner = Some(crate::io::project_config::RunnerSettings { enabled: true });
        let loader = StaticConfigLoader::some(cfg);
        let store = MemoryContextStore::default();
        let mut inv = invocation(&[]);
        inv.operation.remote = true;

        let ctx = init(
            inv,
            options(TargetMode::None),
            Collaborators {
                config: &loader,
                contexts: &store,
                server: None,
            },
        )
        .expect("init");
        assert!(ctx.remote_requested());
    }

    #[test]
    fn positional_target_is_checked_against_server_capability() {
        let loader = StaticConfigLoader::none();
        let store = MemoryContextStore::default();
        let mut project = git_project("shop", &["web"]);
        project.remote_enabled = false;
        let server = ScriptedServer::new().with_project(project);

        let err = init(
            invocation(&["shop"]),
            InitOptions {
                target: TargetMode::AppOptional,
                config: ConfigPolicy::Skip,
                validate_runner: true,
            },
            Collaborators {
                config: &loader,
                contexts: &store,
                server: Some(&server),
            },
        )
        .unwrap_err();
        match err {
            InitError::RunnerUnavailable { project, reason } => {
                assert_eq!(project, "shop");
                assert!(reason.contains("disabled"));
            }
            other => panic!("expected runner unavailable, got {other:?}"),
        }
    }

    #[test]
    fn positional_target_passes_when_project_runs_remotely() {
        let loader = StaticConfigLoader::none();
        let store = MemoryContextStore::default();
        let mut project = git_project("shop", &["web"]);
        project.ondemand_runner = Some(OnDemandRunnerRef {
            name: "kubernetes".to_string(),
        });
        let server = ScriptedServer::new().with_project(project);

        let ctx = init(
            invocation(&["shop/web", "--", "-v"]),
            InitOptions {
                target: TargetMode::AppRequired,
                config: ConfigPolicy::Skip,
                validate_runner: true,
            },
            Collaborators {
                config: &loader,
                contexts: &store,
                server: Some(&server),
            },
        )
        .expect("init");
        assert!(ctx.requires_runner());
        assert_eq!(ctx.app().unwrap().to_string(), "shop/web");
        assert_eq!(ctx.args(), ["--", "-v"]);
    }

    #[test]
    fn context_storage_failure_is_collaborator_error() {
        let loader = StaticConfigLoader::none();
        let store = MemoryContextStore::failing("permission denied");
        let err = init(
            invocation(&[]),
            options(TargetMode::None),
            Collaborators {
                config: &loader,
                contexts: &store,
                server: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn missing_var_file_is_configuration_error() {
        let loader = StaticConfigLoader::some(project_config("shop", &["web"]));
        let store = MemoryContextStore::default();
        let mut inv = invocation(&[]);
        inv.operation.var_files = vec![PathBuf::from("/nonexistent/prod.vars.toml")];

        let err = init(
            inv,
            options(TargetMode::None),
            Collaborators {
                config: &loader,
                contexts: &store,
                server: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, InitError::VariableFile(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
