//! App dispatch: apply an operation to every targeted app.
//!
//! Planning turns the [`CommandContext`] into an ordered list of
//! [`AppTask`]s and a routing mode. Execution runs the tasks in order,
//! checking the cancellation signal before each one, and folds the per-app
//! outcomes with [`Aggregate`].

use tracing::{debug, info, warn};

use crate::cancel::CancelSignal;
use crate::context::CommandContext;
use crate::core::outcome::{
    Aggregate, AppOutcome, DispatchOutcome, OperationError, OperationResult, reduce,
};
use crate::core::refs::{AppRef, ProjectRef, WorkspaceRef};
use crate::io::server::ServerClient;
use crate::io::ui::Ui;
use crate::remote::{RunnerMode, decide_remote};

/// One app an operation is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppHandle {
    app: AppRef,
    workspace: WorkspaceRef,
}

impl AppHandle {
    pub fn app(&self) -> &AppRef {
        &self.app
    }

    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }
}

/// Shared, read-only state handed to every operation callback.
#[derive(Debug, Clone)]
pub struct OperationContext {
    cancel: CancelSignal,
    mode: RunnerMode,
    workspace: WorkspaceRef,
    runner_id: Option<String>,
}

impl OperationContext {
    /// Long-running callbacks poll this to stop early.
    pub fn cancel(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn mode(&self) -> RunnerMode {
        self.mode
    }

    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }

    /// Id of the active local runner, for correlating server calls.
    pub fn runner_id(&self) -> Option<&str> {
        self.runner_id.as_deref()
    }
}

/// A single unit of dispatch work.
#[derive(Debug, Clone)]
pub struct AppTask {
    pub handle: AppHandle,
}

impl AppTask {
    /// Run the operation for this app and tag the result.
    pub fn run<F>(&self, ctx: &OperationContext, op: &F) -> AppOutcome
    where
        F: Fn(&OperationContext, &AppHandle) -> OperationResult + Sync,
    {
        op(ctx, &self.handle).into()
    }
}

/// Ordered tasks plus the routing chosen for them.
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    pub mode: RunnerMode,
    pub tasks: Vec<AppTask>,
    pub runner_id: Option<String>,
}

impl DispatchPlan {
    pub fn apps(&self) -> impl Iterator<Item = &AppRef> {
        self.tasks.iter().map(|task| task.handle.app())
    }

    /// Run every task in order. Cancellation is checked between tasks; a
    /// canceled run keeps the outcomes recorded so far.
    pub fn execute<F>(&self, workspace: &WorkspaceRef, cancel: &CancelSignal, op: F) -> DispatchOutcome
    where
        F: Fn(&OperationContext, &AppHandle) -> OperationResult + Sync,
    {
        let ctx = OperationContext {
            cancel: cancel.clone(),
            mode: self.mode,
            workspace: workspace.clone(),
            runner_id: self.runner_id.clone(),
        };

        let mut aggregate = Aggregate::default();
        for task in &self.tasks {
            if cancel.is_canceled() {
                warn!(
                    completed = aggregate.completed(),
                    remaining = self.tasks.len() - aggregate.completed(),
                    "dispatch canceled"
                );
                return DispatchOutcome::Canceled(aggregate);
            }
            debug!(app = %task.handle.app, "operating on app");
            aggregate.record(task.run(&ctx, &op));
        }
        aggregate.finish()
    }
}

/// Expands a [`CommandContext`] into app tasks and runs an operation on each.
pub struct Dispatcher<'a> {
    ctx: &'a CommandContext,
    server: Option<&'a dyn ServerClient>,
    ui: &'a dyn Ui,
    local_runner_id: Option<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(ctx: &'a CommandContext, server: Option<&'a dyn ServerClient>, ui: &'a dyn Ui) -> Self {
        Self {
            ctx,
            server,
            ui,
            local_runner_id: None,
        }
    }

    /// Attach the id of a running local runner. It is forwarded to
    /// operations only when they execute locally.
    pub fn with_local_runner(mut self, id: impl Into<String>) -> Self {
        self.local_runner_id = Some(id.into());
        self
    }

    /// Build the target list and routing.
    ///
    /// Failures are shown through the UI here and returned as
    /// [`OperationError::AlreadyReported`].
    pub fn plan(&self) -> Result<DispatchPlan, OperationError> {
        let mut mode = if self.ctx.requires_runner() || self.ctx.remote_requested() {
            RunnerMode::Remote
        } else {
            RunnerMode::Local
        };
        let mut candidates: Vec<AppRef> = Vec::new();

        let flag_project = match self.ctx.flag_project() {
            Some(name) => Some(self.report(ProjectRef::new(name).map_err(anyhow::Error::from))?),
            None => None,
        };

        if let Some(project) = &flag_project {
            let Some(server) = self.server else {
                self.ui.error(&format!(
                    "Listing the apps of project '{project}' requires a server connection; \
                     set --server-addr or a default context."
                ));
                return Err(OperationError::AlreadyReported);
            };
            let descriptor = self.report(server.get_project(project))?;
            let decision = self.report(decide_remote(server, &descriptor))?;
            mode = decision.mode;
            info!(project = %project, mode = %mode, reason = %decision.reason, "routing decided");
            self.ui.output(match mode {
                RunnerMode::Remote => "Using remote runner",
                RunnerMode::Local => "Using local runner",
            });
            for app in descriptor.applications {
                candidates.push(self.report(project.app(app.name).map_err(anyhow::Error::from))?);
            }
        }

        // Apps without an explicit ref belong to --project when given,
        // otherwise to the resolved project.
        let project = flag_project.or_else(|| self.ctx.project().cloned());
        if let Some(app) = self.ctx.app() {
            candidates = vec![app.clone()];
        } else if let Some(name) = self.ctx.flag_app() {
            let Some(project) = &project else {
                self.ui.error("No project targeted; specify --project or a \"project/app\" argument.");
                return Err(OperationError::AlreadyReported);
            };
            candidates = vec![self.report(project.app(name).map_err(anyhow::Error::from))?];
        } else if candidates.is_empty() {
            if let (Some(loaded), Some(project)) = (self.ctx.config(), &project) {
                for name in loaded.config.app_names() {
                    candidates.push(self.report(project.app(name).map_err(anyhow::Error::from))?);
                }
            }
        }

        let tasks: Vec<AppTask> = candidates
            .into_iter()
            .map(|app| AppTask {
                handle: AppHandle {
                    app,
                    workspace: self.ctx.workspace().clone(),
                },
            })
            .collect();

        let runner_id = match mode {
            RunnerMode::Local => self.local_runner_id.clone(),
            RunnerMode::Remote => None,
        };
        debug!(apps = tasks.len(), mode = %mode, "dispatch planned");
        Ok(DispatchPlan {
            mode,
            tasks,
            runner_id,
        })
    }

    /// Plan, then apply `op` to each app in order.
    pub fn dispatch<F>(&self, cancel: &CancelSignal, op: F) -> DispatchOutcome
    where
        F: Fn(&OperationContext, &AppHandle) -> OperationResult + Sync,
    {
        match self.plan() {
            Ok(plan) => plan.execute(self.ctx.workspace(), cancel, op),
            Err(err) => reduce([AppOutcome::from(OperationResult::Err(err))]),
        }
    }

    fn report<T>(&self, result: anyhow::Result<T>) -> Result<T, OperationError> {
        result.map_err(|err| {
            warn!(error = %format!("{err:#}"), "dispatch planning failed");
            self.ui.error(&format!("{err:#}"));
            OperationError::AlreadyReported
        })
    }
}
