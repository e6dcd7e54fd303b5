use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;

/// Formatter names that mean "do nothing" for a language.
pub const RESERVED_NOOP_NAMES: [&str; 2] = ["noop", "skip"];

pub fn is_noop_formatter(name: &str) -> bool {
  RESERVED_NOOP_NAMES.contains(&name)
}

/// A per-language default: either one formatter or several applied in order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DefaultFormatter {
  Single(String),
  Sequence(Vec<String>),
}

impl DefaultFormatter {
  pub fn to_vec(&self) -> Vec<String> {
    match self {
      DefaultFormatter::Single(name) => vec![name.clone()],
      DefaultFormatter::Sequence(names) => names.clone(),
    }
  }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Preferences {
  #[serde(default)]
  pub default_formatter: IndexMap<String, DefaultFormatter>,
}

/// The composite formatter configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatterConfig {
  #[serde(default)]
  pub preferences: Preferences,
  #[serde(default)]
  pub cache_formatters: bool,
  #[serde(default)]
  pub format_on_save: bool,
  #[serde(default)]
  pub suppress_formatter_errors: bool,
  #[serde(default, rename = "suppressFormatterErrorsIFFAutoFormatOnSave")]
  pub suppress_formatter_errors_iff_auto_format_on_save: bool,
  /// Every other key is the options object of the formatter with that name.
  #[serde(flatten)]
  pub formatter_options: serde_json::Map<String, serde_json::Value>,
}

impl FormatterConfig {
  /// Formatters configured for a language. An exact key wins, otherwise keys
  /// are compared lowercased in file order.
  pub fn default_formatters(&self, language: &str) -> Vec<String> {
    let default_formatter = &self.preferences.default_formatter;
    if let Some(value) = default_formatter.get(language) {
      return value.to_vec();
    }
    let language = language.to_lowercase();
    default_formatter
      .iter()
      .find(|(key, _)| key.to_lowercase() == language)
      .map(|(_, value)| value.to_vec())
      .unwrap_or_default()
  }

  /// The options object sent along with a formatter. Empty when none is configured.
  pub fn options_for(&self, formatter_name: &str) -> serde_json::Value {
    match self.formatter_options.get(formatter_name) {
      Some(value @ serde_json::Value::Object(_)) => value.clone(),
      _ => serde_json::Value::Object(Default::default()),
    }
  }

  /// Whether per-item problems should stay quiet for a run.
  pub fn should_suppress_errors(&self, saving: bool) -> bool {
    self.suppress_formatter_errors || (saving && self.suppress_formatter_errors_iff_auto_format_on_save)
  }
}

/// Ordered formatter names to apply to a buffer set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatterSelection(Vec<String>);

impl FormatterSelection {
  /// An explicit choice wins over the language default.
  pub fn resolve(config: &FormatterConfig, explicit: Option<&str>, language: Option<&str>) -> Self {
    match explicit {
      Some(name) => FormatterSelection(vec![name.to_string()]),
      None => FormatterSelection(language.map(|language| config.default_formatters(language)).unwrap_or_default()),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn names(&self) -> &[String] {
    &self.0
  }

  /// Names that should be dispatched, in order.
  pub fn dispatchable(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(|name| name.as_str()).filter(|name| !is_noop_formatter(name))
  }
}

/// Holds the current configuration and lets the host swap it at any time.
///
/// Readers take a snapshot, so a replacement made while a run is in
/// progress is seen by the run's next formatter step.
#[derive(Clone, Default)]
pub struct ConfigStore(Rc<RefCell<Rc<FormatterConfig>>>);

impl ConfigStore {
  pub fn new(config: FormatterConfig) -> Self {
    ConfigStore(Rc::new(RefCell::new(Rc::new(config))))
  }

  pub fn current(&self) -> Rc<FormatterConfig> {
    self.0.borrow().clone()
  }

  pub fn set(&self, config: FormatterConfig) {
    *self.0.borrow_mut() = Rc::new(config);
  }
}
