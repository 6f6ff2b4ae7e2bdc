//! Errors raised while building a [`crate::context::CommandContext`].

use thiserror::Error;

use crate::core::flag_order::FlagAfterArgsError;
use crate::core::refs::RefError;
use crate::core::variables::VariableError;
use crate::exit_codes;

/// Coarse classification used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed user input; never retried.
    InputShape,
    /// Missing or invalid project configuration or variable files.
    Configuration,
    /// The project cannot do what was asked of it.
    Capability,
    /// Failure talking to context storage or the server.
    Collaborator,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    FlagOrder(#[from] FlagAfterArgsError),

    #[error("invalid target: {0}")]
    Target(#[from] RefError),

    #[error(
        "This command requires a single targeted app. You have multiple apps defined\n\
         ({}) so you can specify the app to target using the \"--app\" flag\n\
         or a \"project/app\" argument.",
        .apps.join(", ")
    )]
    AmbiguousApp { apps: Vec<String> },

    #[error("project '{project}' declares no apps; specify an app target explicitly")]
    NoApps { project: String },

    #[error(
        "no {file} found in this directory or any parent; specify a \"project/app\" target or run inside a project",
        file = crate::io::project_config::CONFIG_FILE_NAME
    )]
    ConfigNotFound,

    #[error("failed to load project configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("failed to load variables: {0:#}")]
    VariableFile(anyhow::Error),

    #[error(transparent)]
    Variable(#[from] VariableError),

    #[error(
        "The `--remote` flag was specified but remote operations are not supported\n\
         for this project.\n\n\
         Remote operations must be manually enabled by setting 'runner.enabled = true'\n\
         in your deployctl.toml."
    )]
    RemoteUnsupported,

    #[error(
        "Project '{project}' was targeted explicitly, which requires a remote runner, but\n\
         it cannot run operations remotely ({reason}).\n\n\
         Run the command from the project directory without a positional target to\n\
         operate locally, or enable remote operations for the project."
    )]
    RunnerUnavailable { project: String, reason: String },

    #[error(transparent)]
    Collaborator(anyhow::Error),
}

impl InitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InitError::FlagOrder(_)
            | InitError::Target(_)
            | InitError::AmbiguousApp { .. }
            | InitError::NoApps { .. }
            | InitError::Variable(_) => ErrorKind::InputShape,
            InitError::ConfigNotFound | InitError::Config(_) | InitError::VariableFile(_) => {
                ErrorKind::Configuration
            }
            InitError::RemoteUnsupported | InitError::RunnerUnavailable { .. } => {
                ErrorKind::Capability
            }
            InitError::Collaborator(_) => ErrorKind::Collaborator,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InputShape => exit_codes::INVALID_INPUT,
            ErrorKind::Configuration | ErrorKind::Capability | ErrorKind::Collaborator => {
                exit_codes::FAILURE
            }
        }
    }
}
