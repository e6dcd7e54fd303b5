use anyhow::anyhow;
use anyhow::Result;
use clap::error::ErrorKind;
use clap::ArgMatches;
use thiserror::Error;

pub struct CliArgs {
  pub sub_command: SubCommand,
  pub verbose: bool,
  pub config: Option<String>,
  pub server_url: Option<String>,
  pub token: Option<String>,
  pub plugin_version: Option<String>,
}

impl CliArgs {
  #[cfg(test)]
  pub fn empty() -> Self {
    Self::new_with_sub_command(SubCommand::Help("".to_string()))
  }

  pub fn is_stdout_machine_readable(&self) -> bool {
    matches!(&self.sub_command, SubCommand::Formatters(cmd) if cmd.json)
  }

  fn new_with_sub_command(sub_command: SubCommand) -> CliArgs {
    CliArgs {
      sub_command,
      verbose: false,
      config: None,
      server_url: None,
      token: None,
      plugin_version: None,
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubCommand {
  Fmt(FmtSubCommand),
  Formatters(FormattersSubCommand),
  Version,
  Help(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FmtSubCommand {
  pub file_path: String,
  /// Code cell indexes to format. Empty means every code cell.
  pub cells: Vec<usize>,
  pub formatter: Option<String>,
  pub on_save: bool,
  pub check: bool,
  pub strict_version: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FormattersSubCommand {
  pub all: bool,
  pub json: bool,
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ParseArgsError(#[from] anyhow::Error);

pub fn parse_args(args: Vec<String>) -> Result<CliArgs, ParseArgsError> {
  inner_parse_args(args).map_err(ParseArgsError)
}

fn inner_parse_args(args: Vec<String>) -> Result<CliArgs> {
  if args.len() == 1 || (args.len() == 2 && (args[1] == "help" || args[1] == "--help")) {
    let mut cli_parser = create_cli_parser();
    let help_text = format!("{}", cli_parser.render_help());
    return Ok(CliArgs::new_with_sub_command(SubCommand::Help(help_text)));
  } else if args.len() == 2 && (args[1] == "-v" || args[1] == "-V" || args[1] == "--version") {
    return Ok(CliArgs::new_with_sub_command(SubCommand::Version));
  }

  let cli_parser = create_cli_parser();
  let matches = match cli_parser.try_get_matches_from(&args) {
    Ok(result) => result,
    Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
      return Ok(CliArgs::new_with_sub_command(SubCommand::Help(err.render().to_string())));
    }
    Err(err) => return Err(err.into()),
  };

  let sub_command = match matches.subcommand() {
    Some(("fmt", matches)) => SubCommand::Fmt(FmtSubCommand {
      file_path: get_string(matches, "file").unwrap_or_default(),
      cells: match get_string(matches, "cells") {
        Some(text) => parse_cell_indexes(&text)?,
        None => Vec::new(),
      },
      formatter: get_string(matches, "formatter"),
      on_save: matches.get_flag("on-save"),
      check: matches.get_flag("check"),
      strict_version: matches.get_flag("strict-version"),
    }),
    Some(("formatters", matches)) => SubCommand::Formatters(FormattersSubCommand {
      all: matches.get_flag("all"),
      json: matches.get_flag("json"),
    }),
    Some(("version", _)) => SubCommand::Version,
    _ => unreachable!(),
  };

  Ok(CliArgs {
    sub_command,
    verbose: matches.get_flag("verbose"),
    config: get_string(&matches, "config"),
    server_url: get_string(&matches, "server-url"),
    token: get_string(&matches, "token"),
    plugin_version: get_string(&matches, "plugin-version"),
  })
}

fn get_string(matches: &ArgMatches, id: &str) -> Option<String> {
  matches.get_one::<String>(id).map(String::from)
}

fn parse_cell_indexes(text: &str) -> Result<Vec<usize>> {
  text
    .split(',')
    .map(|part| part.trim())
    .filter(|part| !part.is_empty())
    .map(|part| {
      part
        .parse::<usize>()
        .map_err(|_| anyhow!("Invalid cell index '{}'. Expected a comma separated list of code cell indexes (ex. 0,2).", part))
    })
    .collect()
}

pub fn create_cli_parser() -> clap::Command {
  use clap::Arg;
  use clap::ArgAction;
  use clap::Command;

  Command::new("labfmt")
    .bin_name("labfmt")
    .version(env!("CARGO_PKG_VERSION"))
    .about("Formats notebooks and source files with the formatters of a Jupyter server.")
    .subcommand_required(true)
    .after_help(
      r#"ENVIRONMENT VARIABLES:
  JUPYTER_SERVER_URL  Base url of the Jupyter server (default http://localhost:8888/).
  JUPYTER_TOKEN       Token used to authenticate with the Jupyter server.
  HTTPS_PROXY         Proxy to use when connecting to the server
                      (set HTTP_PROXY for HTTP).

EXAMPLES:
  Format every code cell of a notebook:

    labfmt fmt analysis.ipynb

  Format the first and third code cells with a specific formatter:

    labfmt fmt analysis.ipynb --cells 0,2 --formatter black

  List the formatters the server has available:

    labfmt formatters"#,
    )
    .subcommand(
      Command::new("fmt")
        .about("Formats a notebook or source file and writes the result to the file system.")
        .arg(Arg::new("file").help("Path to a .ipynb notebook or a source file.").required(true).num_args(1))
        .arg(
          Arg::new("cells")
            .long("cells")
            .value_name("indexes")
            .help("Comma separated indexes of the code cells to format (ex. 0,2). Formats every code cell when not provided.")
            .num_args(1),
        )
        .arg(
          Arg::new("formatter")
            .long("formatter")
            .short('f')
            .value_name("name")
            .help("Formatter to use instead of the configured default for the language.")
            .num_args(1),
        )
        .arg(
          Arg::new("on-save")
            .long("on-save")
            .help("Formats the way saving does. Does nothing unless formatOnSave is enabled in the configuration.")
            .conflicts_with_all(["cells", "formatter"])
            .action(ArgAction::SetTrue),
        )
        .arg(
          Arg::new("check")
            .long("check")
            .help("Reports whether formatting would change the file without writing it.")
            .action(ArgAction::SetTrue),
        )
        .arg(
          Arg::new("strict-version")
            .long("strict-version")
            .help("Fails when the server extension's version differs from this client's.")
            .action(ArgAction::SetTrue),
        ),
    )
    .subcommand(
      Command::new("formatters")
        .about("Lists the formatters available on the server.")
        .arg(Arg::new("all").long("all").help("Includes formatters the server can't import.").action(ArgAction::SetTrue))
        .arg(Arg::new("json").long("json").help("Outputs the formatters as JSON.").action(ArgAction::SetTrue)),
    )
    .subcommand(Command::new("version").about("Prints the client and server extension versions."))
    .arg(
      Arg::new("config")
        .long("config")
        .short('c')
        .value_name("path")
        .help("Path to the configuration file. Defaults to labfmt.json in the current directory.")
        .global(true)
        .num_args(1),
    )
    .arg(
      Arg::new("server-url")
        .long("server-url")
        .value_name("url")
        .help("Base url of the Jupyter server.")
        .global(true)
        .num_args(1),
    )
    .arg(
      Arg::new("token")
        .long("token")
        .value_name("token")
        .help("Token used to authenticate with the Jupyter server.")
        .global(true)
        .num_args(1),
    )
    .arg(
      Arg::new("plugin-version")
        .long("plugin-version")
        .value_name("version")
        .help("Version to report to the server extension.")
        .hide(true)
        .global(true)
        .num_args(1),
    )
    .arg(
      Arg::new("verbose")
        .long("verbose")
        .help("Prints additional diagnostic information.")
        .global(true)
        .action(ArgAction::SetTrue),
    )
}
