use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;

use crate::buffers::BufferHandle;
use crate::buffers::BufferSnapshot;
use crate::client::FormatterClient;
use crate::client::Transport;
use crate::configuration::ConfigStore;
use crate::configuration::FormatterSelection;
use crate::notify::Notification;
use crate::notify::Notifier;
use crate::protocol::FormatRequest;
use crate::protocol::FormatResultItem;
use crate::target::FormatTarget;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkState {
  Idle,
  Formatting,
}

/// Holds the orchestrator in `Formatting` until dropped.
struct WorkingGuard<'a> {
  state: &'a Cell<WorkState>,
}

impl<'a> WorkingGuard<'a> {
  fn acquire(state: &'a Cell<WorkState>) -> Option<Self> {
    if state.get() == WorkState::Formatting {
      return None;
    }
    state.set(WorkState::Formatting);
    Some(WorkingGuard { state })
  }
}

impl Drop for WorkingGuard<'_> {
  fn drop(&mut self) {
    self.state.set(WorkState::Idle);
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatRun {
  /// Only format the selected or active buffers.
  pub selected_only: bool,
  /// Overrides the language default when set.
  pub formatter: Option<String>,
  /// The run was triggered by a save.
  pub saving: bool,
}

/// What happened to one buffer during one formatter step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
  Applied,
  /// The buffer changed while the request was outstanding and was left alone.
  Conflict,
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterStep {
  pub formatter_name: String,
  /// Index aligned with the run's buffers.
  pub results: Vec<StepResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  pub steps: Vec<FormatterStep>,
}

impl RunReport {
  pub fn applied_count(&self) -> usize {
    self.count(|result| matches!(result, StepResult::Applied))
  }

  pub fn conflict_count(&self) -> usize {
    self.count(|result| matches!(result, StepResult::Conflict))
  }

  pub fn error_count(&self) -> usize {
    self.count(|result| matches!(result, StepResult::Failed(_)))
  }

  fn count(&self, predicate: impl Fn(&StepResult) -> bool) -> usize {
    self.steps.iter().flat_map(|step| step.results.iter()).filter(|result| predicate(result)).count()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
  /// Another run was in progress, so nothing was done.
  Busy,
  /// Format on save is turned off.
  Disabled,
  NoTargets,
  NoFormatter,
  Completed(RunReport),
  /// The run was aborted. The message was already surfaced.
  Failed(String),
}

/// Formats buffers through the remote formatting service.
///
/// Each instance allows one run at a time. Calls made while a run is in
/// progress return [`RunOutcome::Busy`] without doing anything.
pub struct FormatOrchestrator<TTransport: Transport> {
  client: Rc<FormatterClient<TTransport>>,
  config: ConfigStore,
  notifier: Rc<dyn Notifier>,
  state: Cell<WorkState>,
}

impl<TTransport: Transport> FormatOrchestrator<TTransport> {
  pub fn new(client: Rc<FormatterClient<TTransport>>, config: ConfigStore, notifier: Rc<dyn Notifier>) -> Self {
    Self {
      client,
      config,
      notifier,
      state: Cell::new(WorkState::Idle),
    }
  }

  pub fn state(&self) -> WorkState {
    self.state.get()
  }

  pub fn config(&self) -> &ConfigStore {
    &self.config
  }

  pub async fn format_selected(&self, target: &dyn FormatTarget, formatter: Option<&str>) -> RunOutcome {
    self
      .format_buffers(
        target,
        FormatRun {
          selected_only: true,
          formatter: formatter.map(String::from),
          saving: false,
        },
      )
      .await
  }

  pub async fn format_all(&self, target: &dyn FormatTarget, formatter: Option<&str>) -> RunOutcome {
    self
      .format_buffers(
        target,
        FormatRun {
          selected_only: false,
          formatter: formatter.map(String::from),
          saving: false,
        },
      )
      .await
  }

  /// Applies a formatter the user picked explicitly.
  pub async fn format_action(&self, target: &dyn FormatTarget, formatter: &str) -> RunOutcome {
    self.format_selected(target, Some(formatter)).await
  }

  /// Formats everything before the document is persisted, if enabled.
  pub async fn format_on_save(&self, target: &dyn FormatTarget) -> RunOutcome {
    if !self.config.current().format_on_save {
      return RunOutcome::Disabled;
    }
    self
      .format_buffers(
        target,
        FormatRun {
          selected_only: false,
          formatter: None,
          saving: true,
        },
      )
      .await
  }

  pub async fn format_buffers(&self, target: &dyn FormatTarget, run: FormatRun) -> RunOutcome {
    let Some(_guard) = WorkingGuard::acquire(&self.state) else {
      return RunOutcome::Busy;
    };
    match self.run(target, &run).await {
      Ok(outcome) => outcome,
      Err(err) => {
        let message = format!("{:#}", err);
        self.notifier.notify(Notification::error(message.clone())).await;
        RunOutcome::Failed(message)
      }
    }
  }

  async fn run(&self, target: &dyn FormatTarget, run: &FormatRun) -> Result<RunOutcome> {
    let buffers = target.buffers(run.selected_only);
    if buffers.is_empty() {
      return Ok(RunOutcome::NoTargets);
    }

    let selection = match &run.formatter {
      Some(name) => FormatterSelection::resolve(&self.config.current(), Some(name), None),
      None => {
        let language = target.language().await?;
        let selection = FormatterSelection::resolve(&self.config.current(), None, language.as_deref());
        if selection.is_empty() {
          let message = match language {
            Some(language) => format!("No default formatter is configured for language '{}'.", language),
            None => "Could not determine the language to pick a default formatter for.".to_string(),
          };
          self.notifier.notify(Notification::error(message)).await;
          return Ok(RunOutcome::NoFormatter);
        }
        selection
      }
    };

    let mut report = RunReport::default();
    for formatter_name in selection.dispatchable() {
      let step = self.apply_formatter(target, &buffers, formatter_name, run.saving).await?;
      report.steps.push(step);
    }
    Ok(RunOutcome::Completed(report))
  }

  async fn apply_formatter(
    &self,
    target: &dyn FormatTarget,
    buffers: &[BufferHandle],
    formatter_name: &str,
    saving: bool,
  ) -> Result<FormatterStep> {
    let config = self.config.current();
    let snapshot = BufferSnapshot::capture(buffers);
    let result = self
      .client
      .format(&FormatRequest {
        code: snapshot.texts(),
        formatter_name: formatter_name.to_string(),
        options: config.options_for(formatter_name),
        is_notebook: target.is_notebook(),
        use_cache: config.cache_formatters,
      })
      .await?;

    let suppress_errors = self.config.current().should_suppress_errors(saving);
    let mut results = Vec::with_capacity(snapshot.len());
    for (index, ((buffer, original_text), item)) in snapshot.iter().zip(result.code).enumerate() {
      if buffer.text() != *original_text {
        results.push(StepResult::Conflict);
        if !suppress_errors {
          let message = if target.is_notebook() {
            format!(
              "Cell {} changed since the format request was sent. Skipped formatting it with '{}'.",
              index, formatter_name
            )
          } else {
            format!("File changed since the format request was sent. Skipped formatting it with '{}'.", formatter_name)
          };
          self.notifier.notify(Notification::warning(message)).await;
        }
        continue;
      }
      match item {
        FormatResultItem::Formatted(code) => {
          buffer.set_text(&code);
          results.push(StepResult::Applied);
        }
        FormatResultItem::Error(error) => {
          if !suppress_errors {
            self.notifier.notify(Notification::error(error.clone())).await;
          }
          results.push(StepResult::Failed(error));
        }
      }
    }

    Ok(FormatterStep {
      formatter_name: formatter_name.to_string(),
      results,
    })
  }
}
