use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use labfmt_core::configuration::FormatterConfig;
use thiserror::Error;

use crate::arg_parser::CliArgs;
use crate::environment::Environment;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "labfmt.json";

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] pub anyhow::Error);

/// Loads the formatter configuration.
///
/// A missing default config file means the default configuration, but a
/// file given with `--config` must exist.
pub fn resolve_config_from_args(args: &CliArgs, environment: &impl Environment) -> Result<FormatterConfig> {
  let (config_path, is_explicit) = match &args.config {
    Some(config) => (PathBuf::from(config), true),
    None => (PathBuf::from(DEFAULT_CONFIG_FILE_NAME), false),
  };
  if !is_explicit && !environment.path_exists(&config_path) {
    log_verbose!(environment, "No {} found. Using the default configuration.", DEFAULT_CONFIG_FILE_NAME);
    return Ok(FormatterConfig::default());
  }

  let config_text = environment.read_file(&config_path).map_err(ConfigError)?;
  let config = deserialize_config(&config_text)
    .with_context(|| format!("Error deserializing configuration file {}.", config_path.display()))
    .map_err(ConfigError)?;
  Ok(config)
}

pub fn deserialize_config(config_text: &str) -> Result<FormatterConfig> {
  let value = jsonc_parser::parse_to_serde_value(config_text, &Default::default())?;
  match value {
    Some(value) => Ok(serde_json::from_value(value)?),
    None => Ok(FormatterConfig::default()),
  }
}
