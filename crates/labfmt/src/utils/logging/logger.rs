use parking_lot::Mutex;
use std::io::stderr;
use std::io::stdout;
use std::io::Stderr;
use std::io::Stdout;
use std::io::Write;
use std::sync::Arc;

#[derive(Clone)]
pub struct LoggerOptions {
  pub initial_context_name: String,
  /// Whether stdout will be read by a program.
  pub is_stdout_machine_readable: bool,
  pub is_verbose: bool,
}

#[derive(Clone)]
pub struct Logger {
  output_lock: Arc<Mutex<LoggerState>>,
  is_stdout_machine_readable: bool,
  is_verbose: bool,
}

struct LoggerState {
  last_context_name: String,
  std_out: Stdout,
  std_err: Stderr,
}

impl Logger {
  pub fn new(options: &LoggerOptions) -> Self {
    Logger {
      output_lock: Arc::new(Mutex::new(LoggerState {
        last_context_name: options.initial_context_name.clone(),
        std_out: stdout(),
        std_err: stderr(),
      })),
      is_stdout_machine_readable: options.is_stdout_machine_readable,
      is_verbose: options.is_verbose,
    }
  }

  #[inline]
  pub fn is_verbose(&self) -> bool {
    self.is_verbose
  }

  pub fn log(&self, text: &str, context_name: &str) {
    if self.is_stdout_machine_readable {
      return;
    }
    let mut state = self.output_lock.lock();
    self.inner_log(&mut state, true, text, context_name);
  }

  pub fn log_machine_readable(&self, text: &str) {
    let mut state = self.output_lock.lock();
    let last_context_name = state.last_context_name.clone(); // not really used here
    self.inner_log(&mut state, true, text, &last_context_name);
  }

  pub fn log_stderr_with_context(&self, text: &str, context_name: &str) {
    let mut state = self.output_lock.lock();
    self.inner_log(&mut state, false, text, context_name);
  }

  fn inner_log(&self, state: &mut LoggerState, is_std_out: bool, text: &str, context_name: &str) {
    let output_text = render_log_text(&mut state.last_context_name, is_std_out && self.is_stdout_machine_readable, text, context_name);

    // the reader may have closed the pipe early
    if is_std_out {
      let _ = write!(state.std_out, "{}", output_text);
      let _ = state.std_out.flush();
    } else {
      let _ = write!(state.std_err, "{}", output_text);
      let _ = state.std_err.flush();
    }
  }
}

/// Prefixes a `[context]` line when the context changes and ensures the
/// text ends with a newline.
fn render_log_text(last_context_name: &mut String, hide_context: bool, text: &str, context_name: &str) -> String {
  let mut output_text = String::new();
  if last_context_name != context_name {
    // don't output this if stdout is machine readable
    if !hide_context {
      output_text.push_str(&format!("[{}]\n", context_name));
    }
    *last_context_name = context_name.to_string();
  }

  output_text.push_str(text);

  // only add a newline if the logged text does not end with one
  if !output_text.ends_with('\n') {
    output_text.push('\n');
  }
  output_text
}
