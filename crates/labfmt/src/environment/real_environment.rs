use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use labfmt_core::client::HttpRequest;
use labfmt_core::client::HttpResponse;

use super::Environment;
use crate::utils::Logger;
use crate::utils::LoggerOptions;
use crate::utils::RealHttpTransport;

pub struct RealEnvironmentOptions {
  pub is_verbose: bool,
  /// Whether stdout will be read by a program.
  pub is_stdout_machine_readable: bool,
}

#[derive(Clone)]
pub struct RealEnvironment {
  logger: Arc<Logger>,
  http_transport: Arc<RealHttpTransport>,
}

impl RealEnvironment {
  pub fn new(options: &RealEnvironmentOptions) -> Result<RealEnvironment> {
    let logger = Arc::new(Logger::new(&LoggerOptions {
      initial_context_name: "labfmt".to_string(),
      is_stdout_machine_readable: options.is_stdout_machine_readable,
      is_verbose: options.is_verbose,
    }));
    let http_transport = Arc::new(RealHttpTransport::new(|name| std::env::var(name).ok())?);
    Ok(RealEnvironment { logger, http_transport })
  }
}

impl Environment for RealEnvironment {
  fn read_file(&self, file_path: impl AsRef<Path>) -> Result<String> {
    let file_path = file_path.as_ref();
    log_verbose!(self, "Reading file: {}", file_path.display());
    fs::read_to_string(file_path).with_context(|| format!("Error reading file {}", file_path.display()))
  }

  fn write_file(&self, file_path: impl AsRef<Path>, file_text: &str) -> Result<()> {
    let file_path = file_path.as_ref();
    log_verbose!(self, "Writing file: {}", file_path.display());
    fs::write(file_path, file_text).with_context(|| format!("Error writing file {}", file_path.display()))
  }

  fn path_exists(&self, file_path: impl AsRef<Path>) -> bool {
    let file_path = file_path.as_ref();
    log_verbose!(self, "Checking path exists: {}", file_path.display());
    file_path.exists()
  }

  fn env_var(&self, name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
  }

  fn log(&self, text: &str) {
    self.logger.log(text, "labfmt");
  }

  fn log_stderr_with_context(&self, text: &str, context_name: &str) {
    self.logger.log_stderr_with_context(text, context_name);
  }

  fn log_machine_readable(&self, text: &str) {
    self.logger.log_machine_readable(text);
  }

  fn is_verbose(&self) -> bool {
    self.logger.is_verbose()
  }

  fn send_http(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>> {
    let http_transport = self.http_transport.clone();
    async move {
      // ureq blocks, so keep it off the runtime thread
      let response = tokio::task::spawn_blocking(move || http_transport.send(&request)).await??;
      Ok(response)
    }
    .boxed_local()
  }
}
