use std::path::Path;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use labfmt_core::client::HttpRequest;
use labfmt_core::client::HttpResponse;

pub trait Environment: Clone + 'static {
  fn read_file(&self, file_path: impl AsRef<Path>) -> Result<String>;
  fn write_file(&self, file_path: impl AsRef<Path>, file_text: &str) -> Result<()>;
  fn path_exists(&self, file_path: impl AsRef<Path>) -> bool;
  fn env_var(&self, name: &str) -> Option<String>;
  fn log(&self, text: &str);
  fn log_stderr(&self, text: &str) {
    self.log_stderr_with_context(text, "labfmt");
  }
  /// Logs an error to the console providing the context name.
  /// This will cause the logger to output the context name when appropriate.
  fn log_stderr_with_context(&self, text: &str, context_name: &str);
  /// Information to output when stdout is read by another program.
  fn log_machine_readable(&self, text: &str);
  fn is_verbose(&self) -> bool;
  /// Sends a request to the Jupyter server. Non-200 statuses are
  /// returned as responses rather than errors.
  fn send_http(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>>;
}

// use a macro here so the expression provided is only evaluated when in verbose mode
macro_rules! log_verbose {
  ($environment:expr, $($arg:tt)*) => {
    if $environment.is_verbose() {
      let mut text = String::from("[VERBOSE] ");
      text.push_str(&format!($($arg)*));
      $environment.log_stderr(&text);
    }
  }
}

macro_rules! log_warn {
  ($environment:expr, $($arg:tt)*) => {
    {
      let mut text = String::from("Warning: ");
      text.push_str(&format!($($arg)*));
      $environment.log_stderr(&text);
    }
  }
}
