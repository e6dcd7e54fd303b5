use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use indexmap::IndexMap;
use labfmt_core::client::HttpMethod;
use labfmt_core::client::HttpRequest;
use labfmt_core::client::HttpResponse;
use labfmt_core::client::MOUNT_SEGMENT;
use labfmt_core::client::PLUGIN_VERSION;
use labfmt_core::client::PLUGIN_VERSION_HEADER;
use parking_lot::Mutex;
use serde_json::json;
use serde_json::Value;

pub type TestFormatFn = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

#[derive(Clone)]
struct TestFormatter {
  label: String,
  enabled: bool,
  format: TestFormatFn,
}

struct TestServerState {
  version: String,
  token: Option<String>,
  is_offline: bool,
  formatters: IndexMap<String, TestFormatter>,
  default_kernel: Option<String>,
  kernel_languages: IndexMap<String, String>,
  requests: Vec<HttpRequest>,
}

/// In-memory Jupyter server with the code formatter extension installed.
#[derive(Clone)]
pub struct TestServer(Arc<Mutex<TestServerState>>);

impl Default for TestServer {
  fn default() -> Self {
    TestServer(Arc::new(Mutex::new(TestServerState {
      version: PLUGIN_VERSION.to_string(),
      token: None,
      is_offline: false,
      formatters: Default::default(),
      default_kernel: None,
      kernel_languages: Default::default(),
      requests: Vec::new(),
    })))
  }
}

impl TestServer {
  pub fn set_version(&self, version: &str) -> &Self {
    self.0.lock().version = version.to_string();
    self
  }

  pub fn require_token(&self, token: &str) -> &Self {
    self.0.lock().token = Some(token.to_string());
    self
  }

  pub fn set_offline(&self) -> &Self {
    self.0.lock().is_offline = true;
    self
  }

  pub fn add_formatter(&self, name: &str, label: &str, format: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static) -> &Self {
    self.0.lock().formatters.insert(
      name.to_string(),
      TestFormatter {
        label: label.to_string(),
        enabled: true,
        format: Arc::new(format),
      },
    );
    self
  }

  /// A formatter that is installed but can't be imported by the server.
  pub fn add_disabled_formatter(&self, name: &str, label: &str) -> &Self {
    self.0.lock().formatters.insert(
      name.to_string(),
      TestFormatter {
        label: label.to_string(),
        enabled: false,
        format: Arc::new(|_| Err("not importable".to_string())),
      },
    );
    self
  }

  pub fn add_kernel(&self, name: &str, language: &str) -> &Self {
    let mut state = self.0.lock();
    if state.default_kernel.is_none() {
      state.default_kernel = Some(name.to_string());
    }
    state.kernel_languages.insert(name.to_string(), language.to_string());
    self
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.0.lock().requests.clone()
  }

  /// Bodies of the format requests received so far.
  pub fn format_requests(&self) -> Vec<Value> {
    self
      .requests()
      .iter()
      .filter(|request| request.method == HttpMethod::Post)
      .filter_map(|request| request.body.as_ref())
      .map(|body| serde_json::from_str(body).unwrap())
      .collect()
  }

  pub fn handle(&self, request: &HttpRequest) -> Result<HttpResponse> {
    let mut state = self.0.lock();
    state.requests.push(request.clone());
    if state.is_offline {
      bail!("Connection refused (os error 111)");
    }
    if let Some(token) = &state.token {
      if request.header("Authorization") != Some(format!("token {}", token).as_str()) {
        return Ok(response(403, "Forbidden", ""));
      }
    }

    let url = url::Url::parse(&request.url)?;
    let path = url.path();
    if path.ends_with("/api/kernelspecs") {
      return Ok(kernelspecs_response(&state));
    }
    let mount_prefix = format!("/{}/", MOUNT_SEGMENT);
    let Some((_, route)) = path.split_once(&mount_prefix) else {
      return Ok(response(404, "Not Found", ""));
    };

    if route == "version" {
      return Ok(json_response(json!({ "version": state.version })));
    }

    let client_version = request.header(PLUGIN_VERSION_HEADER).unwrap_or_default();
    if client_version != state.version {
      let message = format!(
        "Mismatched versions of server extension ({}) and lab extension ({}). Please ensure they are the same.",
        state.version, client_version
      );
      return Ok(response(422, &message, ""));
    }

    match (request.method, route) {
      (HttpMethod::Get, "formatters") => {
        let formatters = state
          .formatters
          .iter()
          .map(|(name, formatter)| (name.clone(), json!({ "enabled": formatter.enabled, "label": formatter.label })))
          .collect::<serde_json::Map<_, _>>();
        Ok(json_response(json!({ "formatters": formatters })))
      }
      (HttpMethod::Post, "format") => {
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or_default())?;
        let name = body["formatter"].as_str().unwrap_or_default();
        let formatter = match state.formatters.get(name) {
          Some(formatter) if formatter.enabled => formatter,
          _ => return Ok(response(404, &format!("Formatter {} not found!", name), "")),
        };
        let code = body["code"]
          .as_array()
          .map(|items| items.iter().map(|item| item.as_str().unwrap_or_default()).collect::<Vec<_>>())
          .unwrap_or_default();
        let results = code
          .into_iter()
          .map(|code| match (formatter.format)(code) {
            Ok(code) => json!({ "code": code }),
            Err(error) => json!({ "error": error }),
          })
          .collect::<Vec<_>>();
        Ok(json_response(json!({ "code": results })))
      }
      _ => Ok(response(404, "Not Found", "")),
    }
  }
}

fn kernelspecs_response(state: &TestServerState) -> HttpResponse {
  let kernelspecs = state
    .kernel_languages
    .iter()
    .map(|(name, language)| {
      (
        name.clone(),
        json!({ "name": name, "spec": { "display_name": name, "language": language } }),
      )
    })
    .collect::<serde_json::Map<_, _>>();
  json_response(json!({ "default": state.default_kernel, "kernelspecs": kernelspecs }))
}

fn json_response(value: Value) -> HttpResponse {
  response(200, "OK", &value.to_string())
}

fn response(status: u16, status_text: &str, body: &str) -> HttpResponse {
  HttpResponse {
    status,
    status_text: status_text.to_string(),
    body: body.to_string(),
  }
}
