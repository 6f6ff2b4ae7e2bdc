//! Workspace resolution.
//!
//! Precedence, highest first: `--workspace` flag, `DEPLOYCTL_WORKSPACE`, the
//! workspace recorded in the default stored context, then `default`.

use anyhow::Result;
use tracing::debug;

use crate::core::refs::WorkspaceRef;
use crate::io::context_store::ContextStore;

pub const WORKSPACE_ENV: &str = "DEPLOYCTL_WORKSPACE";

/// Resolve the active workspace. Only storage read failures are errors.
pub fn resolve_workspace<S: ContextStore + ?Sized>(
    flag: Option<&str>,
    env: Option<&str>,
    store: &S,
) -> Result<WorkspaceRef> {
    if let Some(name) = non_empty(flag) {
        debug!(workspace = name, "workspace from flag");
        return Ok(WorkspaceRef::new(name)?);
    }
    if let Some(name) = non_empty(env) {
        debug!(workspace = name, "workspace from environment");
        return Ok(WorkspaceRef::new(name)?);
    }
    if let Some(context_name) = store.default_name()? {
        let context = store.load(&context_name)?;
        if let Some(name) = non_empty(Some(context.workspace.as_str())) {
            debug!(workspace = name, context = %context_name, "workspace from stored context");
            return Ok(WorkspaceRef::new(name)?);
        }
    }
    Ok(WorkspaceRef::default())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
