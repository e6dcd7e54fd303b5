use anyhow::Result;
use futures::future::LocalBoxFuture;
use serde::Deserialize;

/// Asks a running kernel which language it speaks.
pub trait KernelLanguage {
  fn language(&self) -> LocalBoxFuture<'_, Result<Option<String>>>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct KernelSpecMetadata {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub language: Option<String>,
}

/// `language_info.codemirror_mode` is either a bare mode name or an object.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CodeMirrorMode {
  Name(String),
  Spec { name: String },
}

impl CodeMirrorMode {
  pub fn name(&self) -> &str {
    match self {
      CodeMirrorMode::Name(name) => name,
      CodeMirrorMode::Spec { name } => name,
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct LanguageInfoMetadata {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub codemirror_mode: Option<CodeMirrorMode>,
}

/// The subset of notebook metadata used to pick a language.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NotebookMetadata {
  #[serde(default)]
  pub kernelspec: Option<KernelSpecMetadata>,
  #[serde(default)]
  pub language_info: Option<LanguageInfoMetadata>,
}

/// Where a notebook's language comes from, in priority order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LanguageSource {
  KernelSpec(String),
  LanguageInfoMode(String),
  LiveKernel,
  NoSignal,
}

impl LanguageSource {
  pub fn from_metadata(metadata: &NotebookMetadata, has_live_kernel: bool) -> Self {
    if let Some(language) = metadata.kernelspec.as_ref().and_then(|spec| non_blank(spec.language.as_deref())) {
      return LanguageSource::KernelSpec(language);
    }
    let mode = metadata
      .language_info
      .as_ref()
      .and_then(|info| info.codemirror_mode.as_ref())
      .and_then(|mode| non_blank(Some(mode.name())));
    if let Some(mode) = mode {
      return LanguageSource::LanguageInfoMode(mode);
    }
    if has_live_kernel {
      LanguageSource::LiveKernel
    } else {
      LanguageSource::NoSignal
    }
  }

  /// Resolves to a lowercase language identifier.
  pub async fn resolve(self, kernel: Option<&dyn KernelLanguage>) -> Result<Option<String>> {
    Ok(match self {
      LanguageSource::KernelSpec(language) | LanguageSource::LanguageInfoMode(language) => Some(language),
      LanguageSource::LiveKernel => match kernel {
        Some(kernel) => non_blank(kernel.language().await?.as_deref()),
        None => None,
      },
      LanguageSource::NoSignal => None,
    })
  }
}

fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(|value| value.trim()).filter(|value| !value.is_empty()).map(|value| value.to_lowercase())
}

const MIME_LANGUAGES: [(&str, &str); 12] = [
  ("text/x-python", "python"),
  ("text/x-ipython", "python"),
  ("text/x-rsrc", "r"),
  ("text/x-r-source", "r"),
  ("text/x-julia", "julia"),
  ("text/x-scala", "scala"),
  ("text/x-csrc", "c"),
  ("text/x-c++src", "c++"),
  ("text/x-sh", "bash"),
  ("text/x-rustsrc", "rust"),
  ("text/x-sql", "sql"),
  ("text/x-markdown", "markdown"),
];

/// Language of an editor buffer from its MIME type.
pub fn language_for_mime_type(mime_type: &str) -> Option<String> {
  let mime_type = mime_type.trim().to_lowercase();
  MIME_LANGUAGES
    .iter()
    .find(|(mime, _)| *mime == mime_type)
    .map(|(_, language)| language.to_string())
}

const EXTENSION_MIME_TYPES: [(&str, &str); 13] = [
  ("py", "text/x-python"),
  ("ipy", "text/x-ipython"),
  ("r", "text/x-rsrc"),
  ("jl", "text/x-julia"),
  ("scala", "text/x-scala"),
  ("c", "text/x-csrc"),
  ("h", "text/x-csrc"),
  ("cpp", "text/x-c++src"),
  ("hpp", "text/x-c++src"),
  ("sh", "text/x-sh"),
  ("rs", "text/x-rustsrc"),
  ("sql", "text/x-sql"),
  ("md", "text/x-markdown"),
];

/// MIME type for a file extension, the way an editor would assign one.
pub fn mime_type_for_extension(extension: &str) -> Option<&'static str> {
  let extension = extension.trim_start_matches('.').to_lowercase();
  EXTENSION_MIME_TYPES.iter().find(|(ext, _)| *ext == extension).map(|(_, mime)| *mime)
}
