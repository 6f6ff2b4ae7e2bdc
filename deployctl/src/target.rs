//! Target resolution: which project and app a command operates on.
//!
//! Sources, in order: a positional `project/app` (or bare project) argument,
//! the project configuration with `--project`/`--app` overrides, and finally
//! the single app declared in the configuration.

use tracing::debug;

use crate::core::refs::{AppRef, ProjectRef};
use crate::core::target_pattern::{TargetArg, parse_target};
use crate::error::InitError;
use crate::io::project_config::{ConfigLoader, LoadedConfig};

/// How a command expects its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// No positional target is parsed.
    #[default]
    None,
    /// Exactly one app must be resolved (`project/app`, `--app`, or the
    /// configuration's only app).
    AppRequired,
    /// `project/app` or a bare project argument may be given.
    AppOptional,
    /// Only a `project/app` argument is parsed; a bare argument stays
    /// positional.
    ProjectRequired,
}

/// When the project configuration is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigPolicy {
    /// Always load; a missing configuration is an error.
    #[default]
    Load,
    /// Always try to load; a missing configuration is fine.
    LoadOptional,
    /// Load only when the target cannot be resolved otherwise, then require it.
    Skip,
}

/// Raw `--project` / `--app` flag values.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetFlags<'a> {
    pub project: Option<&'a str>,
    pub app: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedTarget {
    pub project: Option<ProjectRef>,
    pub app: Option<AppRef>,
    /// Set when the target came from a positional argument.
    pub requires_runner: bool,
    /// Positional arguments left after target extraction.
    pub args: Vec<String>,
    pub config: Option<LoadedConfig>,
}

/// Resolve project and app refs from positional args and configuration.
pub fn resolve_target<L: ConfigLoader + ?Sized>(
    mut args: Vec<String>,
    mode: TargetMode,
    policy: ConfigPolicy,
    flags: TargetFlags<'_>,
    loader: &L,
) -> Result<ResolvedTarget, InitError> {
    let mut project = None;
    let mut app = None;
    let mut requires_runner = false;
    let mut load_config = policy != ConfigPolicy::Skip;

    if mode != TargetMode::None {
        if let Some(first) = args.first() {
            match (parse_target(first), mode) {
                (TargetArg::ProjectAndApp { project: p, app: a }, _) => {
                    debug!(project = p, app = a, "target from positional argument");
                    let app_ref = AppRef::new(p, a)?;
                    project = Some(app_ref.project());
                    app = Some(app_ref);
                }
                (TargetArg::ProjectOnly(_) | TargetArg::NoMatch, TargetMode::AppOptional)
                    if !first.trim().is_empty() =>
                {
                    debug!(project = %first, "project target from positional argument");
                    project = Some(ProjectRef::new(first.as_str())?);
                }
                _ => {}
            }
        }
        if project.is_some() {
            args.remove(0);
            requires_runner = true;
        }

        let unresolved = match mode {
            TargetMode::AppRequired => app.is_none(),
            _ => project.is_none() && app.is_none(),
        };
        if unresolved {
            load_config = true;
        }
    }

    let mut config = None;
    if load_config {
        match loader.load().map_err(InitError::Config)? {
            Some(loaded) => {
                let configured = match non_empty(flags.project) {
                    Some(name) => ProjectRef::new(name)?,
                    None => ProjectRef::new(loaded.config.project.as_str())?,
                };
                if mode == TargetMode::AppRequired && app.is_none() {
                    if let Some(name) = non_empty(flags.app) {
                        debug!(project = %configured, app = name, "app target from flag");
                        app = Some(configured.app(name)?);
                    }
                }
                if project.is_none() {
                    project = Some(configured);
                }
                config = Some(loaded);
            }
            None if policy == ConfigPolicy::LoadOptional => {
                debug!("project configuration not found; continuing without it");
            }
            None => return Err(InitError::ConfigNotFound),
        }
    }

    if mode == TargetMode::AppRequired && app.is_none() {
        let (Some(loaded), Some(project)) = (config.as_ref(), project.as_ref()) else {
            return Err(InitError::ConfigNotFound);
        };
        let names = loaded.config.app_names();
        app = match names.as_slice() {
            [only] => Some(project.app(*only)?),
            [] => {
                return Err(InitError::NoApps {
                    project: project.name().to_string(),
                });
            }
            _ => {
                return Err(InitError::AmbiguousApp {
                    apps: names.iter().map(|name| name.to_string()).collect(),
                });
            }
        };
    }

    debug_assert!(
        app.as_ref()
            .zip(project.as_ref())
            .is_none_or(|(app, project)| app.project_name() == project.name()),
        "app ref must belong to the resolved project"
    );

    Ok(ResolvedTarget {
        project,
        app,
        requires_runner,
        args,
        config,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
