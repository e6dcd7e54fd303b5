use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::buffers::BufferHandle;
use crate::language::language_for_mime_type;
use crate::language::KernelLanguage;
use crate::language::LanguageSource;
use crate::language::NotebookMetadata;

/// A set of buffers the orchestrator can format.
///
/// Notebooks and editors differ only in how buffers are enumerated and
/// how the language is found.
pub trait FormatTarget {
  /// Whether the server should treat the code as notebook cells.
  fn is_notebook(&self) -> bool;
  /// Code-bearing buffers in document order.
  fn buffers(&self, selected_only: bool) -> Vec<BufferHandle>;
  /// Lowercase language identifier, if any signal is available.
  fn language(&self) -> LocalBoxFuture<'_, Result<Option<String>>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CellKind {
  Code,
  Markdown,
  Raw,
}

pub struct NotebookCell {
  pub kind: CellKind,
  /// Selected or active.
  pub selected: bool,
  pub buffer: BufferHandle,
}

pub struct NotebookTarget {
  cells: Vec<NotebookCell>,
  metadata: NotebookMetadata,
  kernel: Option<Rc<dyn KernelLanguage>>,
}

impl NotebookTarget {
  pub fn new(cells: Vec<NotebookCell>, metadata: NotebookMetadata) -> Self {
    Self { cells, metadata, kernel: None }
  }

  pub fn with_kernel(mut self, kernel: Rc<dyn KernelLanguage>) -> Self {
    self.kernel = Some(kernel);
    self
  }

  pub fn cells(&self) -> &[NotebookCell] {
    &self.cells
  }

  pub fn language_source(&self) -> LanguageSource {
    LanguageSource::from_metadata(&self.metadata, self.kernel.is_some())
  }
}

impl FormatTarget for NotebookTarget {
  fn is_notebook(&self) -> bool {
    true
  }

  fn buffers(&self, selected_only: bool) -> Vec<BufferHandle> {
    self
      .cells
      .iter()
      .filter(|cell| cell.kind == CellKind::Code && (!selected_only || cell.selected))
      .map(|cell| cell.buffer.clone())
      .collect()
  }

  fn language(&self) -> LocalBoxFuture<'_, Result<Option<String>>> {
    let source = self.language_source();
    async move { source.resolve(self.kernel.as_deref()).await }.boxed_local()
  }
}

/// A single text editor.
pub struct EditorTarget {
  buffer: BufferHandle,
  mime_type: String,
}

impl EditorTarget {
  pub fn new(buffer: BufferHandle, mime_type: impl Into<String>) -> Self {
    Self {
      buffer,
      mime_type: mime_type.into(),
    }
  }

  pub fn mime_type(&self) -> &str {
    &self.mime_type
  }
}

impl FormatTarget for EditorTarget {
  fn is_notebook(&self) -> bool {
    false
  }

  fn buffers(&self, _selected_only: bool) -> Vec<BufferHandle> {
    vec![self.buffer.clone()]
  }

  fn language(&self) -> LocalBoxFuture<'_, Result<Option<String>>> {
    let language = language_for_mime_type(&self.mime_type);
    async move { Ok(language) }.boxed_local()
  }
}
