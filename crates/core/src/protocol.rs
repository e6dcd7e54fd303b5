use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// Body of a `POST format` request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormatRequest {
  /// Source texts to format, one per buffer.
  pub code: Vec<String>,
  #[serde(rename = "formatter")]
  pub formatter_name: String,
  /// Formatter specific options. Always an object on the wire.
  pub options: serde_json::Value,
  #[serde(rename = "notebook")]
  pub is_notebook: bool,
  /// Sent as the `?cached` query marker rather than in the body.
  #[serde(skip)]
  pub use_cache: bool,
}

/// Response of a `POST format` request.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FormatResult {
  pub code: Vec<FormatResultItem>,
}

/// The server's verdict for a single input of a [`FormatRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "RawFormatResultItem")]
pub enum FormatResultItem {
  Formatted(String),
  Error(String),
}

#[derive(Deserialize)]
struct RawFormatResultItem {
  #[serde(default)]
  code: Option<String>,
  #[serde(default)]
  error: Option<String>,
}

impl From<RawFormatResultItem> for FormatResultItem {
  fn from(raw: RawFormatResultItem) -> Self {
    // an error wins when the server sends both
    match (raw.error, raw.code) {
      (Some(error), _) if !error.is_empty() => FormatResultItem::Error(error),
      (_, Some(code)) => FormatResultItem::Formatted(code),
      (Some(error), None) => FormatResultItem::Error(error),
      (None, None) => FormatResultItem::Error("Server returned neither code nor an error.".to_string()),
    }
  }
}

/// Information about a formatter installed on the server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FormatterInfo {
  pub enabled: bool,
  pub label: String,
}

/// Response of a `GET formatters` request.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FormattersResponse {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  /// Keyed by formatter name in the order the server reported them.
  pub formatters: IndexMap<String, FormatterInfo>,
}

impl FormattersResponse {
  pub fn enabled(&self) -> impl Iterator<Item = (&String, &FormatterInfo)> {
    self.formatters.iter().filter(|(_, info)| info.enabled)
  }
}

/// Response of a `GET version` request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct VersionResponse {
  pub version: String,
}
