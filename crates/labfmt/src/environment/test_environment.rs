use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use labfmt_core::client::HttpRequest;
use labfmt_core::client::HttpResponse;
use parking_lot::Mutex;

use super::Environment;
use super::TestServer;

#[derive(Clone, Default)]
pub struct TestEnvironment {
  is_verbose: Arc<Mutex<bool>>,
  is_stdout_machine_readable: Arc<Mutex<bool>>,
  files: Arc<Mutex<HashMap<PathBuf, String>>>,
  env_vars: Arc<Mutex<HashMap<String, String>>>,
  stdout_messages: Arc<Mutex<Vec<String>>>,
  stderr_messages: Arc<Mutex<Vec<String>>>,
  server: TestServer,
}

impl TestEnvironment {
  pub fn new() -> TestEnvironment {
    Default::default()
  }

  pub fn server(&self) -> &TestServer {
    &self.server
  }

  pub fn add_file(&self, file_path: impl AsRef<Path>, text: &str) -> &Self {
    self.files.lock().insert(file_path.as_ref().to_path_buf(), text.to_string());
    self
  }

  pub fn set_env_var(&self, name: &str, value: &str) -> &Self {
    self.env_vars.lock().insert(name.to_string(), value.to_string());
    self
  }

  pub fn set_verbose(&self, value: bool) {
    *self.is_verbose.lock() = value;
  }

  pub fn set_stdout_machine_readable(&self, value: bool) {
    *self.is_stdout_machine_readable.lock() = value;
  }

  pub fn take_stdout_messages(&self) -> Vec<String> {
    self.stdout_messages.lock().drain(..).collect()
  }

  pub fn take_stderr_messages(&self) -> Vec<String> {
    self.stderr_messages.lock().drain(..).collect()
  }

  #[track_caller]
  pub fn assert_file_text(&self, file_path: impl AsRef<Path>, expected: &str) {
    let text = self.read_file(file_path).unwrap();
    pretty_assertions::assert_eq!(text, expected);
  }
}

impl Environment for TestEnvironment {
  fn read_file(&self, file_path: impl AsRef<Path>) -> Result<String> {
    let file_path = file_path.as_ref();
    self
      .files
      .lock()
      .get(file_path)
      .cloned()
      .ok_or_else(|| anyhow!("Error reading file {}: Not found.", file_path.display()))
  }

  fn write_file(&self, file_path: impl AsRef<Path>, file_text: &str) -> Result<()> {
    self.files.lock().insert(file_path.as_ref().to_path_buf(), file_text.to_string());
    Ok(())
  }

  fn path_exists(&self, file_path: impl AsRef<Path>) -> bool {
    self.files.lock().contains_key(file_path.as_ref())
  }

  fn env_var(&self, name: &str) -> Option<String> {
    self.env_vars.lock().get(name).cloned()
  }

  fn log(&self, text: &str) {
    if *self.is_stdout_machine_readable.lock() {
      return;
    }
    self.stdout_messages.lock().push(text.to_string());
  }

  fn log_stderr_with_context(&self, text: &str, _context_name: &str) {
    self.stderr_messages.lock().push(text.to_string());
  }

  fn log_machine_readable(&self, text: &str) {
    self.stdout_messages.lock().push(text.to_string());
  }

  fn is_verbose(&self) -> bool {
    *self.is_verbose.lock()
  }

  fn send_http(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>> {
    let result = self.server.handle(&request);
    async move {
      tokio::task::yield_now().await;
      result
    }
    .boxed_local()
  }
}
