//! Client boundary to the deployment server.
//!
//! The [`ServerClient`] trait decouples target resolution and dispatch from
//! the transport. Tests use scripted clients; the binary talks HTTP/JSON via
//! [`HttpServerClient`].

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::refs::ProjectRef;
use crate::io::context_store::{ContextStore, ServerConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-side project descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub applications: Vec<Application>,
    /// Remote operations toggle (`runner.enabled` in the project config).
    #[serde(default)]
    pub remote_enabled: bool,
    #[serde(default)]
    pub data_source: Option<DataSource>,
    /// On-demand runner profile explicitly assigned to the project.
    #[serde(default)]
    pub ondemand_runner: Option<OnDemandRunnerRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
}

/// Where a remote runner sources project data from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataSource {
    /// Data is uploaded from the invoking machine.
    Local,
    Git {
        url: String,
        #[serde(default)]
        path: String,
        #[serde(default, rename = "ref")]
        git_ref: String,
    },
}

impl DataSource {
    /// True for sources a remote runner can fetch on its own.
    pub fn supports_remote_sourcing(&self) -> bool {
        matches!(self, DataSource::Git { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnDemandRunnerRef {
    pub name: String,
}

/// On-demand runner profile as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnDemandRunnerConfig {
    pub name: String,
    #[serde(default)]
    pub plugin_type: String,
    /// Global default profile marker.
    #[serde(default)]
    pub default: bool,
}

/// Server calls needed before delegating an operation.
pub trait ServerClient {
    fn get_project(&self, project: &ProjectRef) -> Result<Project>;
    fn list_ondemand_runner_configs(&self) -> Result<Vec<OnDemandRunnerConfig>>;
}

/// Pick the connection: explicit flags win, then the default stored context.
pub fn resolve_connection<S: ContextStore + ?Sized>(
    flag_server: Option<ServerConfig>,
    store: &S,
) -> Result<Option<ServerConfig>> {
    if let Some(server) = flag_server {
        if !server.address.trim().is_empty() {
            debug!(address = %server.address, "using connection from flags");
            return Ok(Some(server));
        }
    }
    let Some(name) = store.default_name()? else {
        return Ok(None);
    };
    let context = store.load(&name)?;
    if context.server.address.trim().is_empty() {
        debug!(context = %name, "default context has no server address");
        return Ok(None);
    }
    debug!(context = %name, address = %context.server.address, "using connection from stored context");
    Ok(Some(context.server))
}

#[derive(Deserialize)]
struct GetProjectResponse {
    project: Project,
}

#[derive(Deserialize)]
struct ListOnDemandRunnerConfigsResponse {
    #[serde(default)]
    configs: Vec<OnDemandRunnerConfig>,
}

/// HTTP/JSON implementation of [`ServerClient`].
pub struct HttpServerClient {
    base_url: String,
    client: Client,
}

impl HttpServerClient {
    pub fn connect(server: &ServerConfig) -> Result<Self> {
        let address = server.address.trim();
        if address.is_empty() {
            return Err(anyhow!("server address must not be empty"));
        }
        let base_url = if address.contains("://") {
            address.trim_end_matches('/').to_string()
        } else {
            let scheme = if server.tls { "https" } else { "http" };
            format!("{scheme}://{}", address.trim_end_matches('/'))
        };
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(server.tls_skip_verify)
            .build()
            .context("build http client")?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        response
            .json()
            .with_context(|| format!("decode response from {url}"))
    }
}

impl ServerClient for HttpServerClient {
    #[instrument(skip_all, fields(project = %project))]
    fn get_project(&self, project: &ProjectRef) -> Result<Project> {
        let response: GetProjectResponse =
            self.get_json(&format!("/v1/projects/{}", project.name()))?;
        Ok(response.project)
    }

    #[instrument(skip_all)]
    fn list_ondemand_runner_configs(&self) -> Result<Vec<OnDemandRunnerConfig>> {
        let response: ListOnDemandRunnerConfigsResponse =
            self.get_json("/v1/ondemand-runner-configs")?;
        Ok(response.configs)
    }
}
