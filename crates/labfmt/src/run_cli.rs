use anyhow::Result;

use crate::arg_parser::CliArgs;
use crate::arg_parser::ParseArgsError;
use crate::arg_parser::SubCommand;
use crate::commands;
use crate::commands::CheckError;
use crate::commands::VersionMismatchError;
use crate::configuration::ConfigError;
use crate::environment::Environment;

#[derive(Debug)]
pub struct AppError {
  pub inner: anyhow::Error,
  pub exit_code: i32,
}

impl<TError> From<TError> for AppError
where
  TError: Into<anyhow::Error>,
{
  fn from(value: TError) -> Self {
    let inner = value.into();
    AppError {
      exit_code: get_exit_code(&inner),
      inner,
    }
  }
}

fn get_exit_code(err: &anyhow::Error) -> i32 {
  if err.downcast_ref::<ParseArgsError>().is_some() {
    10
  } else if err.downcast_ref::<ConfigError>().is_some() {
    11
  } else if err.downcast_ref::<VersionMismatchError>().is_some() {
    12
  } else if err.downcast_ref::<CheckError>().is_some() {
    20
  } else {
    1
  }
}

pub async fn run_cli<TEnvironment: Environment>(args: &CliArgs, environment: &TEnvironment) -> Result<()> {
  match &args.sub_command {
    SubCommand::Help(help_text) => {
      commands::output_help(environment, help_text);
      Ok(())
    }
    SubCommand::Version => commands::output_version(args, environment).await,
    SubCommand::Formatters(cmd) => commands::output_formatters(args, cmd, environment).await,
    SubCommand::Fmt(cmd) => commands::format_file(args, cmd, environment).await,
  }
}
