//! CLI tests for context resolution.
//!
//! Spawns the deployctl binary inside a temporary project directory with an
//! isolated context store and checks exit codes and printed output.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use deployctl::exit_codes;
use deployctl::io::context_store::{CONFIG_DIR_ENV, ContextConfig, FsContextStore};
use deployctl::io::project_config::{AppConfig, CONFIG_FILE_NAME, ProjectConfig, write_config};
use deployctl::io::var_file::VAR_ENV_PREFIX;
use deployctl::workspace::WORKSPACE_ENV;
use serde_json::Value;
use tempfile::TempDir;

struct Fixture {
    project: TempDir,
    config: TempDir,
}

impl Fixture {
    fn new(apps: &[&str]) -> Self {
        let project = tempfile::tempdir().expect("project dir");
        let config = tempfile::tempdir().expect("config dir");
        write_config(
            &project.path().join(CONFIG_FILE_NAME),
            &ProjectConfig {
                project: "shop".to_string(),
                runner: None,
                apps: apps
                    .iter()
                    .map(|name| AppConfig {
                        name: name.to_string(),
                    })
                    .collect(),
            },
        )
        .expect("write config");
        Self { project, config }
    }

    fn store_default_workspace(&self, workspace: &str) {
        let store = FsContextStore::new(self.config.path().join("context"));
        store
            .write(
                "ctx",
                &ContextConfig {
                    workspace: workspace.to_string(),
                    ..ContextConfig::default()
                },
            )
            .expect("write context");
        store.set_default(Some("ctx")).expect("set default");
    }

    fn command(&self) -> Command {
        self.command_in(self.project.path())
    }

    fn command_in(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_deployctl"));
        cmd.current_dir(dir)
            .env(CONFIG_DIR_ENV, self.config.path())
            .env_remove(WORKSPACE_ENV)
            .env_remove("RUST_LOG");
        cmd
    }
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("run deployctl")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn context_json(cmd: &mut Command) -> Value {
    let output = run(cmd.args(["context", "--json"]));
    assert_eq!(output.status.code(), Some(exit_codes::OK), "stderr: {}", stderr(&output));
    serde_json::from_slice(&output.stdout).expect("context json")
}

#[test]
fn flag_after_positional_exits_with_invalid_input() {
    let fixture = Fixture::new(&["web"]);
    let output = run(fixture.command().args(["context", "shop", "--label", "team=web"]));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID_INPUT));
    let err = stderr(&output);
    assert!(err.contains("Flags must be specified before positional arguments"), "{err}");
    assert!(err.contains("Misplaced flags: label"), "{err}");
}

#[test]
fn flag_order_is_checked_before_stored_contexts_are_read() {
    let fixture = Fixture::new(&["web"]);
    FsContextStore::new(fixture.config.path().join("context"))
        .set_default(Some("ghost"))
        .expect("set default");

    let output = run(fixture.command().args(["targets", "shop", "--label", "a=b"]));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID_INPUT));
    let err = stderr(&output);
    assert!(err.contains("Misplaced flags: label"), "{err}");
    assert!(!err.contains("ghost"), "{err}");
}

#[test]
fn workspace_precedence_flag_env_stored_default() {
    let fixture = Fixture::new(&["web"]);
    assert_eq!(context_json(&mut fixture.command())["workspace"], "default");

    fixture.store_default_workspace("staging");
    assert_eq!(context_json(&mut fixture.command())["workspace"], "staging");

    let mut with_env = fixture.command();
    with_env.env(WORKSPACE_ENV, "prod");
    assert_eq!(context_json(&mut with_env)["workspace"], "prod");

    let mut with_flag = fixture.command();
    with_flag.env(WORKSPACE_ENV, "prod").args(["-w", "dev"]);
    assert_eq!(context_json(&mut with_flag)["workspace"], "dev");
}

#[test]
fn positional_target_requires_runner() {
    let fixture = Fixture::new(&["web", "api"]);
    let output = run(fixture.command().args(["context", "--json", "billing/invoices", "extra"]));
    assert_eq!(output.status.code(), Some(exit_codes::OK), "stderr: {}", stderr(&output));

    let ctx: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(ctx["project"], "billing");
    assert_eq!(ctx["app"]["app"], "invoices");
    assert_eq!(ctx["requires_runner"], true);
    assert_eq!(ctx["args"], serde_json::json!(["extra"]));
}

#[test]
fn variables_merge_env_files_and_flags() {
    let fixture = Fixture::new(&["web"]);
    fs::write(
        fixture.project.path().join("base.auto.vars.toml"),
        "region = \"us\"\ntier = 2\n",
    )
    .expect("write auto vars");

    let mut cmd = fixture.command();
    cmd.env(format!("{VAR_ENV_PREFIX}owner"), "platform")
        .args(["context", "--json", "--var", "region=eu"]);
    let output = run(&mut cmd);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "stderr: {}", stderr(&output));

    let ctx: Value = serde_json::from_slice(&output.stdout).expect("json");
    let vars = &ctx["variables"];
    assert_eq!(vars["owner"]["value"], "platform");
    assert_eq!(vars["owner"]["source"]["kind"], "env");
    assert_eq!(vars["tier"]["value"], "2");
    assert_eq!(vars["tier"]["source"]["kind"], "file");
    assert_eq!(vars["region"]["value"], "eu");
    assert_eq!(vars["region"]["source"]["kind"], "flag");
}

#[test]
fn inspect_with_several_apps_is_ambiguous() {
    let fixture = Fixture::new(&["web", "api"]);
    let output = run(fixture.command().arg("inspect"));

    assert_eq!(output.status.code(), Some(exit_codes::INVALID_INPUT));
    let err = stderr(&output);
    assert!(err.contains("multiple apps defined"), "{err}");
    assert!(err.contains("(web, api)"), "{err}");
}

#[test]
fn inspect_with_app_flag_resolves_locally() {
    let fixture = Fixture::new(&["web", "api"]);
    let output = run(fixture.command().args(["--plain", "inspect", "--app", "api"]));

    assert_eq!(output.status.code(), Some(exit_codes::OK), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "shop/api (local runner)");
}

#[test]
fn inspect_outside_a_project_fails() {
    let fixture = Fixture::new(&["web"]);
    let elsewhere = tempfile::tempdir().expect("tempdir");
    let output = run(fixture.command_in(elsewhere.path()).arg("inspect"));

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(stderr(&output).contains(CONFIG_FILE_NAME));
}

#[test]
fn targets_lists_every_app_in_declared_order() {
    let fixture = Fixture::new(&["web", "api", "worker"]);
    fixture.store_default_workspace("staging");
    let output = run(fixture.command().args(["targets", "--plain"]));

    assert_eq!(output.status.code(), Some(exit_codes::OK), "stderr: {}", stderr(&output));
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "shop/web (workspace: staging, local runner)",
            "shop/api (workspace: staging, local runner)",
            "shop/worker (workspace: staging, local runner)",
        ]
    );
}
