use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use futures::future::LocalBoxFuture;

use crate::protocol::FormatRequest;
use crate::protocol::FormatResult;
use crate::protocol::FormattersResponse;
use crate::protocol::VersionResponse;

/// Path segment the formatting server extension is mounted at.
pub const MOUNT_SEGMENT: &str = "jupyterlab_code_formatter";
pub const PLUGIN_VERSION_HEADER: &str = "Plugin-Version";
/// Version advertised in the `Plugin-Version` header unless overridden.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
}

impl HttpMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
  pub method: HttpMethod,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<String>,
}

impl HttpRequest {
  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub status_text: String,
  pub body: String,
}

/// Issues a single HTTP request. Implementations must not retry.
///
/// A transport only fails for network level problems. Any response the
/// server produced, whatever its status, is returned as `Ok`.
pub trait Transport {
  fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>>;
}

/// The server answered with a status other than 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
  pub status: u16,
  pub message: String,
}

impl std::fmt::Display for ResponseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.message.is_empty() {
      write!(f, "Server responded with status {}.", self.status)
    } else {
      write!(f, "Server responded with status {}: {}", self.status, self.message)
    }
  }
}

impl std::error::Error for ResponseError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
  Matches,
  Mismatch { client: String, server: String },
}

/// Client for the formatting server extension.
pub struct FormatterClient<TTransport: Transport> {
  transport: TTransport,
  base_url: String,
  plugin_version: String,
}

impl<TTransport: Transport> FormatterClient<TTransport> {
  pub fn new(transport: TTransport, base_url: impl Into<String>) -> Self {
    Self {
      transport,
      base_url: base_url.into(),
      plugin_version: PLUGIN_VERSION.to_string(),
    }
  }

  pub fn with_plugin_version(mut self, plugin_version: impl Into<String>) -> Self {
    self.plugin_version = plugin_version.into();
    self
  }

  pub fn plugin_version(&self) -> &str {
    &self.plugin_version
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn transport(&self) -> &TTransport {
    &self.transport
  }

  /// Full url of a path relative to the extension's mount point.
  pub fn url_for(&self, path: &str) -> String {
    format!("{}/{}/{}", self.base_url.trim_end_matches('/'), MOUNT_SEGMENT, path.trim_start_matches('/'))
  }

  /// Sends a request and returns the raw response text.
  ///
  /// Fails with a [`ResponseError`] when the status is not 200.
  pub async fn send(&self, path: &str, method: HttpMethod, body: Option<String>) -> Result<String> {
    let url = self.url_for(path);
    let response = self
      .transport
      .send(HttpRequest {
        method,
        url: url.clone(),
        headers: vec![(PLUGIN_VERSION_HEADER.to_string(), self.plugin_version.clone())],
        body,
      })
      .await
      .with_context(|| format!("Error requesting {} {}", method.as_str(), url))?;
    if response.status != 200 {
      let message = if response.body.trim().is_empty() {
        response.status_text
      } else {
        response.body
      };
      return Err(
        ResponseError {
          status: response.status,
          message,
        }
        .into(),
      );
    }
    Ok(response.body)
  }

  pub async fn list_formatters(&self, use_cache: bool) -> Result<FormattersResponse> {
    let text = self.send(&with_cache_marker("formatters", use_cache), HttpMethod::Get, None).await?;
    serde_json::from_str(&text).context("Error deserializing formatters response.")
  }

  pub async fn format(&self, request: &FormatRequest) -> Result<FormatResult> {
    let body = serde_json::to_string(request)?;
    let text = self.send(&with_cache_marker("format", request.use_cache), HttpMethod::Post, Some(body)).await?;
    let result: FormatResult = serde_json::from_str(&text).context("Error deserializing format response.")?;
    if result.code.len() != request.code.len() {
      bail!(
        "Server returned {} result(s) for {} input(s) with formatter '{}'.",
        result.code.len(),
        request.code.len(),
        request.formatter_name
      );
    }
    Ok(result)
  }

  pub async fn get_version(&self) -> Result<String> {
    let text = self.send("version", HttpMethod::Get, None).await?;
    let response: VersionResponse = serde_json::from_str(&text).context("Error deserializing version response.")?;
    Ok(response.version)
  }

  pub async fn check_version(&self) -> Result<VersionCheck> {
    let server = self.get_version().await?;
    if server == self.plugin_version {
      Ok(VersionCheck::Matches)
    } else {
      Ok(VersionCheck::Mismatch {
        client: self.plugin_version.clone(),
        server,
      })
    }
  }
}

fn with_cache_marker(path: &str, use_cache: bool) -> String {
  if use_cache {
    format!("{}?cached", path)
  } else {
    path.to_string()
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::protocol::FormatResultItem;
  use crate::test_helpers::TestTransport;

  fn create_client(transport: &TestTransport) -> FormatterClient<TestTransport> {
    FormatterClient::new(transport.clone(), "http://localhost:8888/lab-base/").with_plugin_version("2.2.1")
  }

  #[tokio::test]
  async fn joins_path_onto_mount_segment() {
    let transport = TestTransport::default();
    transport.respond_ok(r#"{"version":"2.2.1"}"#);
    let client = create_client(&transport);
    assert_eq!(client.get_version().await.unwrap(), "2.2.1");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].url, "http://localhost:8888/lab-base/jupyterlab_code_formatter/version");
    assert_eq!(requests[0].header("plugin-version"), Some("2.2.1"));
    assert_eq!(requests[0].body, None);
  }

  #[tokio::test]
  async fn adds_cache_marker() {
    let transport = TestTransport::default();
    transport.respond_ok(r#"{"formatters":{}}"#);
    transport.respond_ok(r#"{"code":[{"code":"x = 1"}]}"#);
    let client = create_client(&transport);
    client.list_formatters(true).await.unwrap();
    let result = client
      .format(&FormatRequest {
        code: vec!["x=1".to_string()],
        formatter_name: "black".to_string(),
        options: serde_json::json!({}),
        is_notebook: false,
        use_cache: true,
      })
      .await
      .unwrap();
    assert_eq!(result.code, vec![FormatResultItem::Formatted("x = 1".to_string())]);

    let requests = transport.requests();
    assert_eq!(requests[0].url, "http://localhost:8888/lab-base/jupyterlab_code_formatter/formatters?cached");
    assert_eq!(requests[1].url, "http://localhost:8888/lab-base/jupyterlab_code_formatter/format?cached");
    assert_eq!(requests[1].method, HttpMethod::Post);
    let body: serde_json::Value = serde_json::from_str(requests[1].body.as_ref().unwrap()).unwrap();
    assert_eq!(
      body,
      serde_json::json!({ "code": ["x=1"], "formatter": "black", "options": {}, "notebook": false })
    );
  }

  #[tokio::test]
  async fn non_200_is_response_error() {
    let transport = TestTransport::default();
    transport.respond(500, "Internal Server Error", "");
    transport.respond(422, "Unprocessable Entity", "Mismatched versions");
    let client = create_client(&transport);

    let err = client.get_version().await.err().unwrap();
    let response_err = err.downcast_ref::<ResponseError>().unwrap();
    assert_eq!(response_err.status, 500);
    assert_eq!(response_err.message, "Internal Server Error");

    let err = client.list_formatters(false).await.err().unwrap();
    assert_eq!(err.to_string(), "Server responded with status 422: Mismatched versions");
  }

  #[tokio::test]
  async fn errors_on_misaligned_response() {
    let transport = TestTransport::default();
    transport.respond_ok(r#"{"code":[{"code":"x = 1"}]}"#);
    let client = create_client(&transport);
    let err = client
      .format(&FormatRequest {
        code: vec!["x=1".to_string(), "y=2".to_string()],
        formatter_name: "black".to_string(),
        options: serde_json::json!({}),
        is_notebook: true,
        use_cache: false,
      })
      .await
      .err()
      .unwrap();
    assert_eq!(err.to_string(), "Server returned 1 result(s) for 2 input(s) with formatter 'black'.");
  }

  #[tokio::test]
  async fn checks_version() {
    let transport = TestTransport::default();
    transport.respond_ok(r#"{"version":"2.2.1"}"#);
    transport.respond_ok(r#"{"version":"1.4.5"}"#);
    let client = create_client(&transport);
    assert_eq!(client.check_version().await.unwrap(), VersionCheck::Matches);
    assert_eq!(
      client.check_version().await.unwrap(),
      VersionCheck::Mismatch {
        client: "2.2.1".to_string(),
        server: "1.4.5".to_string(),
      }
    );
  }
}
