use std::rc::Rc;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use labfmt_core::client::FormatterClient;
use labfmt_core::client::HttpMethod;
use labfmt_core::client::HttpRequest;
use labfmt_core::client::HttpResponse;
use labfmt_core::client::Transport;
use labfmt_core::language::KernelLanguage;
use serde::Deserialize;
use url::Url;

use crate::arg_parser::CliArgs;
use crate::configuration::ConfigError;
use crate::environment::Environment;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8888/";
pub const SERVER_URL_ENV_VAR: &str = "JUPYTER_SERVER_URL";
pub const TOKEN_ENV_VAR: &str = "JUPYTER_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
  pub base_url: Url,
  pub token: Option<String>,
  /// Overrides the `Plugin-Version` header.
  pub plugin_version: Option<String>,
}

/// Resolves the connection settings from the args, then the environment.
pub fn resolve_server_settings(args: &CliArgs, environment: &impl Environment) -> Result<ServerSettings> {
  let url_text = args
    .server_url
    .clone()
    .or_else(|| environment.env_var(SERVER_URL_ENV_VAR))
    .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
  let base_url = parse_server_url(&url_text).map_err(ConfigError)?;
  Ok(ServerSettings {
    base_url,
    token: args.token.clone().or_else(|| environment.env_var(TOKEN_ENV_VAR)),
    plugin_version: args.plugin_version.clone(),
  })
}

fn parse_server_url(text: &str) -> Result<Url> {
  let url = Url::parse(text).map_err(|err| anyhow!("Invalid server url '{}': {}", text, err))?;
  if !matches!(url.scheme(), "http" | "https") {
    bail!("Invalid server url '{}': The scheme must be http or https.", text);
  }
  Ok(url)
}

/// Sends requests through the environment, authenticating with the
/// server's token when one is configured.
pub struct ServerTransport<TEnvironment: Environment> {
  environment: TEnvironment,
  token: Option<String>,
}

impl<TEnvironment: Environment> Transport for ServerTransport<TEnvironment> {
  fn send(&self, mut request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>> {
    if let Some(token) = &self.token {
      request.headers.push(("Authorization".to_string(), format!("token {}", token)));
    }
    log_verbose!(self.environment, "{} {}", request.method.as_str(), request.url);
    self.environment.send_http(request)
  }
}

pub type ServerClient<TEnvironment> = FormatterClient<ServerTransport<TEnvironment>>;

pub fn create_client<TEnvironment: Environment>(settings: &ServerSettings, environment: &TEnvironment) -> ServerClient<TEnvironment> {
  let transport = ServerTransport {
    environment: environment.clone(),
    token: settings.token.clone(),
  };
  let client = FormatterClient::new(transport, settings.base_url.as_str());
  match &settings.plugin_version {
    Some(plugin_version) => client.with_plugin_version(plugin_version.clone()),
    None => client,
  }
}

#[derive(Deserialize)]
struct KernelSpecsResponse {
  #[serde(default)]
  default: Option<String>,
  #[serde(default)]
  kernelspecs: IndexMap<String, KernelSpecEntry>,
}

#[derive(Deserialize)]
struct KernelSpecEntry {
  spec: KernelSpecDetails,
}

#[derive(Deserialize)]
struct KernelSpecDetails {
  #[serde(default)]
  language: Option<String>,
}

/// Finds a notebook's language from the kernels installed on the server.
///
/// Uses the kernel named in the notebook, or the server's default kernel.
pub struct ServerKernelLanguage<TEnvironment: Environment> {
  client: Rc<ServerClient<TEnvironment>>,
  kernel_name: Option<String>,
}

impl<TEnvironment: Environment> ServerKernelLanguage<TEnvironment> {
  pub fn new(client: Rc<ServerClient<TEnvironment>>, kernel_name: Option<String>) -> Self {
    Self { client, kernel_name }
  }
}

impl<TEnvironment: Environment> KernelLanguage for ServerKernelLanguage<TEnvironment> {
  fn language(&self) -> LocalBoxFuture<'_, Result<Option<String>>> {
    async move {
      let url = format!("{}/api/kernelspecs", self.client.base_url().trim_end_matches('/'));
      let response = self
        .client
        .transport()
        .send(HttpRequest {
          method: HttpMethod::Get,
          url: url.clone(),
          headers: Vec::new(),
          body: None,
        })
        .await
        .with_context(|| format!("Error requesting GET {}", url))?;
      if response.status != 200 {
        bail!("Error requesting GET {}: Server responded with status {}.", url, response.status);
      }
      let specs: KernelSpecsResponse = serde_json::from_str(&response.body).context("Error deserializing kernel specs response.")?;
      let Some(kernel_name) = self.kernel_name.clone().or(specs.default) else {
        return Ok(None);
      };
      Ok(specs.kernelspecs.get(&kernel_name).and_then(|entry| entry.spec.language.clone()))
    }
    .boxed_local()
  }
}
