use std::path::Path;
use std::rc::Rc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use labfmt_core::buffers::SharedText;
use labfmt_core::buffers::TextBuffer;
use labfmt_core::client::Transport;
use labfmt_core::configuration::ConfigStore;
use labfmt_core::language::mime_type_for_extension;
use labfmt_core::orchestrator::FormatOrchestrator;
use labfmt_core::orchestrator::RunOutcome;
use labfmt_core::target::EditorTarget;
use labfmt_core::target::FormatTarget;
use thiserror::Error;

use super::ensure_versions_match;
use crate::arg_parser::CliArgs;
use crate::arg_parser::FmtSubCommand;
use crate::configuration::resolve_config_from_args;
use crate::environment::Environment;
use crate::notebook::NotebookDocument;
use crate::notifier::EnvironmentNotifier;
use crate::server::create_client;
use crate::server::resolve_server_settings;
use crate::server::ServerKernelLanguage;
use crate::utils::get_difference;

const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

#[derive(Debug, Error)]
#[error("{file_path} is not formatted.")]
pub struct CheckError {
  pub file_path: String,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct FormatFailedError {
  pub message: String,
}

pub async fn format_file<TEnvironment: Environment>(args: &CliArgs, cmd: &FmtSubCommand, environment: &TEnvironment) -> Result<()> {
  let config = resolve_config_from_args(args, environment)?;
  let settings = resolve_server_settings(args, environment)?;
  let client = create_client(&settings, environment);
  if cmd.strict_version {
    ensure_versions_match(&client).await?;
  }
  let client = Rc::new(client);

  let file_path = Path::new(&cmd.file_path);
  let file_text = environment.read_file(file_path)?;
  let suppress_errors = config.should_suppress_errors(cmd.on_save);
  let notifier = Rc::new(EnvironmentNotifier::new(environment.clone()));
  let orchestrator = FormatOrchestrator::new(client.clone(), ConfigStore::new(config), notifier);

  let (outcome, formatted_text) = if is_notebook_path(file_path) {
    let notebook = NotebookDocument::parse(&file_text).with_context(|| format!("Error reading notebook {}", file_path.display()))?;
    let code_cell_count = notebook.code_cell_count();
    if let Some(index) = cmd.cells.iter().find(|index| **index >= code_cell_count) {
      bail!(
        "Cell index {} is out of range. {} has {} code cell(s).",
        index,
        file_path.display(),
        code_cell_count
      );
    }
    let kernel = ServerKernelLanguage::new(client.clone(), notebook.kernel_name());
    let target = notebook.target(&cmd.cells).with_kernel(Rc::new(kernel));
    let outcome = run_orchestrator(&orchestrator, &target, cmd).await;
    let formatted_text = if notebook.has_changes() {
      notebook.to_text()?
    } else {
      file_text.clone()
    };
    (outcome, formatted_text)
  } else {
    let buffer = SharedText::new(file_text.clone());
    let mime_type = file_path
      .extension()
      .and_then(|extension| extension.to_str())
      .and_then(mime_type_for_extension)
      .unwrap_or(PLAIN_TEXT_MIME_TYPE);
    log_verbose!(environment, "Using mime type {} for {}", mime_type, file_path.display());
    let target = EditorTarget::new(buffer.handle(), mime_type);
    let outcome = run_orchestrator(&orchestrator, &target, cmd).await;
    (outcome, buffer.text())
  };

  let report = match outcome {
    RunOutcome::Completed(report) => report,
    RunOutcome::Disabled => {
      environment.log_stderr("Format on save is disabled. Set \"formatOnSave\": true in the configuration file to enable it.");
      return Ok(());
    }
    RunOutcome::NoTargets => {
      environment.log_stderr(&format!("No code to format in {}.", file_path.display()));
      return Ok(());
    }
    RunOutcome::NoFormatter => {
      return Err(
        FormatFailedError {
          message: format!("No formatter was applied to {}.", file_path.display()),
        }
        .into(),
      );
    }
    RunOutcome::Failed(_) => {
      // the reason was already reported by the notifier
      return Err(
        FormatFailedError {
          message: format!("Error formatting {}.", file_path.display()),
        }
        .into(),
      );
    }
    RunOutcome::Busy => bail!("Another format run is in progress."),
  };
  for step in &report.steps {
    log_verbose!(environment, "Applied '{}' to {} buffer(s).", step.formatter_name, step.results.len());
  }

  if formatted_text != file_text {
    if cmd.check {
      environment.log_stderr(&format!("from {}:\n{}", file_path.display(), get_difference(&file_text, &formatted_text)));
      return Err(
        CheckError {
          file_path: file_path.display().to_string(),
        }
        .into(),
      );
    }
    environment.write_file(file_path, &formatted_text)?;
    environment.log(&format!("Formatted {}", file_path.display()));
  } else {
    log_verbose!(environment, "{} was already formatted.", file_path.display());
  }

  let error_count = report.error_count();
  if error_count > 0 && !suppress_errors {
    return Err(
      FormatFailedError {
        message: format!("Had {} error(s) formatting {}.", error_count, file_path.display()),
      }
      .into(),
    );
  }
  Ok(())
}

async fn run_orchestrator<TTransport: Transport>(orchestrator: &FormatOrchestrator<TTransport>, target: &dyn FormatTarget, cmd: &FmtSubCommand) -> RunOutcome {
  if cmd.on_save {
    orchestrator.format_on_save(target).await
  } else if cmd.cells.is_empty() {
    orchestrator.format_all(target, cmd.formatter.as_deref()).await
  } else {
    orchestrator.format_selected(target, cmd.formatter.as_deref()).await
  }
}

fn is_notebook_path(file_path: &Path) -> bool {
  file_path
    .extension()
    .and_then(|extension| extension.to_str())
    .map(|extension| extension.eq_ignore_ascii_case("ipynb"))
    .unwrap_or(false)
}
