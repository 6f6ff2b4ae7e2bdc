//! deployctl: resolve what a command targets and where it runs.
//!
//! Commands resolve the workspace and the project/app target from
//! arguments, `deployctl.toml`, the environment and stored contexts, then
//! either print the result or dispatch once per targeted app.

use std::collections::BTreeSet;
use std::env;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::debug;

use deployctl::cancel::CancelSignal;
use deployctl::context::{Collaborators, CommandContext, EnvSnapshot, InitOptions, Invocation, init};
use deployctl::core::flag_order::check_flags_after_args;
use deployctl::core::outcome::{DispatchError, OperationError};
use deployctl::dispatch::Dispatcher;
use deployctl::error::InitError;
use deployctl::exit_codes;
use deployctl::flags::{ConnectionFlags, GlobalFlags, OperationFlags, recognized_flag_names};
use deployctl::io::context_store::FsContextStore;
use deployctl::io::project_config::FsConfigLoader;
use deployctl::io::server::{HttpServerClient, ServerClient, resolve_connection};
use deployctl::io::ui::{ConsoleUi, Ui};
use deployctl::logging;
use deployctl::target::{ConfigPolicy, TargetMode};

#[derive(Parser)]
#[command(
    name = "deployctl",
    version,
    about = "Resolve deployment targets and dispatch per-app operations"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalFlags,

    #[command(subcommand)]
    command: Command,
}

/// Flags and arguments shared by every subcommand.
#[derive(Args)]
struct CommandArgs {
    #[command(flatten)]
    operation: OperationFlags,

    #[command(flatten)]
    connection: ConnectionFlags,

    /// Optional `project/app` (or `project`) target, then command arguments.
    /// Flags must come before these.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved command context.
    Context {
        /// Print as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        args: CommandArgs,
    },
    /// Resolve a single app and show where its operations would run.
    Inspect {
        #[command(flatten)]
        args: CommandArgs,
    },
    /// Print every app an operation would be dispatched to.
    Targets {
        #[command(flatten)]
        args: CommandArgs,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Context { .. } => "context",
            Command::Inspect { .. } => "inspect",
            Command::Targets { .. } => "targets",
        }
    }

    fn init_options(&self) -> InitOptions {
        match self {
            Command::Context { .. } => InitOptions {
                target: TargetMode::AppOptional,
                config: ConfigPolicy::LoadOptional,
                validate_runner: false,
            },
            Command::Inspect { .. } => InitOptions {
                target: TargetMode::AppRequired,
                config: ConfigPolicy::Load,
                validate_runner: true,
            },
            Command::Targets { .. } => InitOptions {
                target: TargetMode::AppOptional,
                config: ConfigPolicy::LoadOptional,
                validate_runner: true,
            },
        }
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let ui = ConsoleUi::new(cli.global.plain);
    let code = match run(cli, &ui) {
        Ok(()) => exit_codes::OK,
        Err(err) => report(&err, &ui),
    };
    process::exit(code);
}

fn run(cli: Cli, ui: &ConsoleUi) -> Result<()> {
    let name = cli.command.name();
    let options = cli.command.init_options();
    let (json, args) = match cli.command {
        Command::Context { json, args } => (json, args),
        Command::Inspect { args } | Command::Targets { args } => (false, args),
    };

    // Input-shape errors come before any storage or server access.
    let recognized = recognized_flags(name);
    check_flags_after_args(&args.args, &recognized).map_err(InitError::from)?;

    let cwd = env::current_dir().context("determine working directory")?;
    let loader = FsConfigLoader::new(cwd);
    let store = FsContextStore::from_env();
    let client = match resolve_connection(args.connection.server(), &store)? {
        Some(server) => Some(HttpServerClient::connect(&server)?),
        None => {
            debug!("no server connection configured");
            None
        }
    };
    let server = client.as_ref().map(|client| client as &dyn ServerClient);

    let invocation = Invocation {
        global: cli.global,
        operation: args.operation,
        args: args.args,
        recognized_flags: recognized,
        env: EnvSnapshot::capture(),
    };
    let ctx = init(
        invocation,
        options,
        Collaborators {
            config: &loader,
            contexts: &store,
            server,
        },
    )?;

    match name {
        "context" => print_context(&ctx, json, ui),
        "inspect" => inspect(&ctx, server, ui),
        _ => targets(&ctx, server, ui),
    }
}

/// Flag names accepted by `subcommand`, including global flags.
fn recognized_flags(subcommand: &str) -> BTreeSet<String> {
    let root = Cli::command();
    match root.find_subcommand(subcommand) {
        Some(cmd) => recognized_flag_names(&root, cmd),
        None => recognized_flag_names(&root, &root),
    }
}

fn print_context(ctx: &CommandContext, json: bool, ui: &ConsoleUi) -> Result<()> {
    if json {
        let payload = serde_json::to_string_pretty(ctx).context("serialize context")?;
        println!("{payload}");
        return Ok(());
    }

    ui.output(&format!("workspace: {}", ctx.workspace()));
    if let Some(project) = ctx.project() {
        ui.output(&format!("project: {project}"));
    }
    if let Some(app) = ctx.app() {
        ui.output(&format!("app: {app}"));
    }
    if ctx.requires_runner() {
        ui.output("target given explicitly; operations require a remote runner");
    }
    if let Some(loaded) = ctx.config() {
        ui.output(&format!("config: {}", loaded.path.display()));
    }
    for variable in ctx.variables().iter() {
        ui.output(&format!("var {}={}", variable.name, variable.value));
    }
    for (key, value) in ctx.labels() {
        ui.output(&format!("label {key}={value}"));
    }
    if !ctx.args().is_empty() {
        ui.output(&format!("args: {}", ctx.args().join(" ")));
    }
    Ok(())
}

fn inspect(ctx: &CommandContext, server: Option<&dyn ServerClient>, ui: &ConsoleUi) -> Result<()> {
    let plan = Dispatcher::new(ctx, server, ui).plan().map_err(already_reported)?;
    for app in plan.apps() {
        ui.output(&format!("{app} ({} runner)", plan.mode));
    }
    Ok(())
}

fn targets(ctx: &CommandContext, server: Option<&dyn ServerClient>, ui: &ConsoleUi) -> Result<()> {
    let cancel = CancelSignal::new();
    let outcome = Dispatcher::new(ctx, server, ui).dispatch(&cancel, |op, handle| {
        ui.output(&format!(
            "{} (workspace: {}, {} runner)",
            handle.app(),
            handle.workspace(),
            op.mode()
        ));
        Ok(())
    });
    outcome.into_result()?;
    Ok(())
}

fn already_reported(err: OperationError) -> anyhow::Error {
    match err {
        OperationError::Failed(err) => err,
        OperationError::AlreadyReported => DispatchError::AlreadyReported.into(),
    }
}

/// Print `err` unless it was already shown, and pick the exit code.
fn report(err: &anyhow::Error, ui: &dyn Ui) -> i32 {
    if let Some(init_err) = err.downcast_ref::<InitError>() {
        debug!(kind = ?init_err.kind(), "command initialization failed");
        ui.error(&init_err.to_string());
        return init_err.exit_code();
    }
    if err
        .downcast_ref::<DispatchError>()
        .is_some_and(DispatchError::is_already_reported)
    {
        return exit_codes::FAILURE;
    }
    ui.error(&format!("{err:#}"));
    exit_codes::FAILURE
}
