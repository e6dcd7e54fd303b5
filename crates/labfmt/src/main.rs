#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

#[macro_use]
mod environment;

use environment::RealEnvironment;
use environment::RealEnvironmentOptions;
use run_cli::AppError;

mod arg_parser;
mod commands;
mod configuration;
mod notebook;
mod notifier;
mod run_cli;
mod server;
mod utils;

#[cfg(test)]
mod test_helpers;

fn main() {
  let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
  rt.block_on(async move {
    if let Err(err) = run().await {
      let result = format!("{:#}", err.inner);
      #[allow(clippy::print_stderr)]
      if !result.is_empty() {
        eprintln!("{}", result);
      }
      std::process::exit(err.exit_code);
    }
  });
}

async fn run() -> Result<(), AppError> {
  let args = arg_parser::parse_args(std::env::args().collect())?;
  let environment = RealEnvironment::new(&RealEnvironmentOptions {
    is_verbose: args.verbose,
    is_stdout_machine_readable: args.is_stdout_machine_readable(),
  })?;
  run_cli::run_cli(&args, &environment).await?;
  Ok(())
}
