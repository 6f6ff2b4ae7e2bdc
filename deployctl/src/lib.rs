//! Command execution-context resolution and per-app dispatch for deployctl.
//!
//! Every command invocation goes through two phases:
//!
//! - **Init** ([`context::init`]): validate flag placement, resolve the
//!   workspace ([`workspace`]) and the project/app target ([`target`]), load
//!   variables, and check that the requested execution mode is possible
//!   ([`remote`]). The result is an immutable [`context::CommandContext`].
//! - **Dispatch** ([`dispatch`]): expand the context into app tasks, pick the
//!   routing mode, and apply an operation to each app in order, aggregating
//!   failures and honouring cancellation.
//!
//! The layering follows a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (refs, target parsing, flag order,
//!   variable merging, outcome aggregation). No I/O.
//! - **[`io`]**: Collaborators behind traits (project configuration, stored
//!   contexts, the server, variable files, the terminal). Swapped for fakes in
//!   tests.

pub mod cancel;
pub mod context;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod exit_codes;
pub mod flags;
pub mod io;
pub mod logging;
pub mod remote;
pub mod target;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workspace;
