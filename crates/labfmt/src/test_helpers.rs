use std::cell::RefCell;

use crate::arg_parser::parse_args;
use crate::environment::TestEnvironment;
use crate::run_cli::run_cli;
use crate::run_cli::AppError;

#[derive(Debug)]
pub struct TestAppError {
  asserted_exit_code: RefCell<bool>,
  inner: AppError,
}

impl TestAppError {
  #[track_caller]
  pub fn assert_exit_code(&self, exit_code: i32) {
    self.asserted_exit_code.replace(true);
    assert_eq!(self.inner.exit_code, exit_code);
  }
}

impl std::fmt::Display for TestAppError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:#}", self.inner.inner)
  }
}

impl From<AppError> for TestAppError {
  fn from(inner: AppError) -> Self {
    Self {
      asserted_exit_code: Default::default(),
      inner,
    }
  }
}

impl Drop for TestAppError {
  fn drop(&mut self) {
    if std::thread::panicking() || self.inner.exit_code <= 1 {
      return;
    }
    if !*self.asserted_exit_code.borrow() {
      panic!("Exit code must be asserted. Was: {}", self.inner.exit_code);
    }
  }
}

pub fn run_test_cli(args: Vec<&str>, environment: &TestEnvironment) -> Result<(), TestAppError> {
  let mut args: Vec<String> = args.into_iter().map(String::from).collect();
  args.insert(0, String::from(""));
  let args = parse_args(args).map_err(AppError::from)?;
  environment.set_stdout_machine_readable(args.is_stdout_machine_readable());
  environment.set_verbose(args.verbose);

  let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
  runtime.block_on(run_cli(&args, environment)).map_err(AppError::from)?;
  Ok(())
}

/// Puts spaces around `=` on every line.
pub fn format_assignments(code: &str) -> Result<String, String> {
  if code.contains("def (") {
    return Err("Cannot parse: 1:4: def (".to_string());
  }
  let lines = code
    .split_inclusive('\n')
    .map(|line| match line.split_once('=') {
      Some((left, right)) => format!("{} = {}", left.trim_end(), right.trim_start()),
      None => line.to_string(),
    })
    .collect::<Vec<_>>();
  Ok(lines.concat())
}

/// Sorts the import lines at the start of the code.
pub fn sort_imports(code: &str) -> Result<String, String> {
  let lines = code.split_inclusive('\n').collect::<Vec<_>>();
  let import_count = lines.iter().take_while(|line| line.starts_with("import ")).count();
  let mut imports = lines[..import_count].to_vec();
  imports.sort();
  Ok(imports.into_iter().chain(lines[import_count..].iter().copied()).collect())
}
