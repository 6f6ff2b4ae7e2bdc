//! Decide whether an operation on a project can run on a remote runner.

use std::fmt;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::io::server::{Project, ServerClient};

/// Where per-app operations execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerMode {
    Local,
    Remote,
}

impl fmt::Display for RunnerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerMode::Local => f.write_str("local"),
            RunnerMode::Remote => f.write_str("remote"),
        }
    }
}

/// The condition that determined a [`RemoteDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    RemoteDisabled,
    NoDataSource,
    DataSourceNotRemote,
    ExplicitProfile,
    DefaultProfile,
    NoProfile,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DecisionReason::RemoteDisabled => "remote operations are disabled for the project",
            DecisionReason::NoDataSource => "the project has no data source configured",
            DecisionReason::DataSourceNotRemote => {
                "the project's data source cannot be fetched by a remote runner"
            }
            DecisionReason::ExplicitProfile => "the project has an on-demand runner profile",
            DecisionReason::DefaultProfile => "a default on-demand runner profile exists",
            DecisionReason::NoProfile => {
                "no on-demand runner profile is assigned and no global default exists"
            }
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteDecision {
    pub mode: RunnerMode,
    pub reason: DecisionReason,
}

impl RemoteDecision {
    fn local(reason: DecisionReason) -> Self {
        Self {
            mode: RunnerMode::Local,
            reason,
        }
    }

    fn remote(reason: DecisionReason) -> Self {
        Self {
            mode: RunnerMode::Remote,
            reason,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.mode == RunnerMode::Remote
    }
}

/// Evaluate the project's capabilities in order, stopping at the first
/// determining condition. Only the profile listing touches the server and
/// its failure is returned as an error.
pub fn decide_remote<C: ServerClient + ?Sized>(
    client: &C,
    project: &Project,
) -> Result<RemoteDecision> {
    if !project.remote_enabled {
        debug!(project = %project.name, "remote operations disabled; operation will occur locally");
        return Ok(RemoteDecision::local(DecisionReason::RemoteDisabled));
    }

    let Some(source) = &project.data_source else {
        // Operations needing a source will fail downstream.
        debug!(project = %project.name, "no data source configured; operation cannot occur remotely");
        return Ok(RemoteDecision::local(DecisionReason::NoDataSource));
    };

    if !source.supports_remote_sourcing() {
        debug!(project = %project.name, "data source is not remote; operation cannot occur remotely");
        return Ok(RemoteDecision::local(DecisionReason::DataSourceNotRemote));
    }

    if let Some(profile) = &project.ondemand_runner {
        debug!(project = %project.name, profile = %profile.name, "explicit on-demand runner profile; operation will occur remotely");
        return Ok(RemoteDecision::remote(DecisionReason::ExplicitProfile));
    }

    let configs = client.list_ondemand_runner_configs()?;
    if let Some(default) = configs.iter().find(|config| config.default) {
        debug!(project = %project.name, profile = %default.name, "default on-demand runner profile; operation will occur remotely");
        return Ok(RemoteDecision::remote(DecisionReason::DefaultProfile));
    }

    // A remote runner could still try without a profile, but it would most
    // likely lack the tooling and permissions the operation needs.
    debug!(project = %project.name, "no runner profile and no global default; operation will occur locally");
    Ok(RemoteDecision::local(DecisionReason::NoProfile))
}
