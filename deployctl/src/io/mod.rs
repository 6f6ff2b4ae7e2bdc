//! Collaborators consumed at their interface boundary.

pub mod context_store;
pub mod project_config;
pub mod server;
pub mod ui;
pub mod var_file;
