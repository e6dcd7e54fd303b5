use anyhow::Result;
use indexmap::IndexMap;
use labfmt_core::client::FormatterClient;
use labfmt_core::client::Transport;
use labfmt_core::client::VersionCheck;
use thiserror::Error;

use crate::arg_parser::CliArgs;
use crate::arg_parser::FormattersSubCommand;
use crate::configuration::resolve_config_from_args;
use crate::environment::Environment;
use crate::server::create_client;
use crate::server::resolve_server_settings;
use crate::utils::get_table_lines;

#[derive(Debug, Error)]
#[error("Mismatched versions of server extension ({server}) and client ({client}). Please ensure they are the same.")]
pub struct VersionMismatchError {
  pub client: String,
  pub server: String,
}

pub fn output_help(environment: &impl Environment, help_text: &str) {
  environment.log(help_text);
}

pub async fn output_version<TEnvironment: Environment>(args: &CliArgs, environment: &TEnvironment) -> Result<()> {
  environment.log(&format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
  let settings = resolve_server_settings(args, environment)?;
  let client = create_client(&settings, environment);
  environment.log(&format!("Plugin version: {}", client.plugin_version()));
  match client.check_version().await? {
    VersionCheck::Matches => {
      environment.log(&format!("Server extension version: {}", client.plugin_version()));
    }
    VersionCheck::Mismatch { client, server } => {
      environment.log(&format!("Server extension version: {}", server));
      log_warn!(
        environment,
        "The server extension version ({}) differs from this client's ({}). The server will reject format requests until they match.",
        server,
        client
      );
    }
  }
  Ok(())
}

/// Fails when the server extension reports a different version.
pub async fn ensure_versions_match<TTransport: Transport>(client: &FormatterClient<TTransport>) -> Result<()> {
  match client.check_version().await? {
    VersionCheck::Matches => Ok(()),
    VersionCheck::Mismatch { client, server } => Err(VersionMismatchError { client, server }.into()),
  }
}

pub async fn output_formatters<TEnvironment: Environment>(args: &CliArgs, cmd: &FormattersSubCommand, environment: &TEnvironment) -> Result<()> {
  let config = resolve_config_from_args(args, environment)?;
  let settings = resolve_server_settings(args, environment)?;
  let client = create_client(&settings, environment);
  let response = client.list_formatters(config.cache_formatters).await?;
  let formatters: IndexMap<_, _> = if cmd.all {
    response.formatters.iter().collect()
  } else {
    response.enabled().collect()
  };

  if cmd.json {
    environment.log_machine_readable(&serde_json::to_string_pretty(&formatters)?);
    return Ok(());
  }

  if formatters.is_empty() {
    environment.log("No formatters available.");
    return Ok(());
  }
  let labels = formatters
    .iter()
    .map(|(name, info)| {
      let label = if info.enabled {
        info.label.clone()
      } else {
        format!("{} (disabled)", info.label)
      };
      (name.as_str(), label)
    })
    .collect::<Vec<_>>();
  let items = labels.iter().map(|(name, label)| (*name, label.as_str())).collect::<Vec<_>>();
  environment.log("Formatters:");
  for line in get_table_lines(&items, 2) {
    environment.log(&line);
  }
  Ok(())
}
