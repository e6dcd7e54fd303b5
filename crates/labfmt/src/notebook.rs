use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use labfmt_core::buffers::SharedText;
use labfmt_core::buffers::TextBuffer;
use labfmt_core::language::NotebookMetadata;
use labfmt_core::target::CellKind;
use labfmt_core::target::NotebookCell;
use labfmt_core::target::NotebookTarget;
use serde::Serialize;
use serde_json::Value;

struct CellEntry {
  kind: CellKind,
  original_source: String,
  buffer: SharedText,
}

/// A `.ipynb` file whose cell sources can be edited in place.
///
/// Everything other than the code cell sources is written back exactly
/// as it was read.
pub struct NotebookDocument {
  value: Value,
  metadata: NotebookMetadata,
  cells: Vec<CellEntry>,
}

impl NotebookDocument {
  pub fn parse(text: &str) -> Result<Self> {
    let value: Value = serde_json::from_str(text).context("Error parsing notebook JSON.")?;
    let Some(raw_cells) = value.get("cells").and_then(|cells| cells.as_array()) else {
      bail!("Expected the notebook to have a 'cells' array.");
    };
    let mut cells = Vec::with_capacity(raw_cells.len());
    for (index, raw_cell) in raw_cells.iter().enumerate() {
      let kind = match raw_cell.get("cell_type").and_then(|kind| kind.as_str()) {
        Some("code") => CellKind::Code,
        Some("markdown") => CellKind::Markdown,
        _ => CellKind::Raw,
      };
      let source = read_source(raw_cell.get("source")).with_context(|| format!("Error reading the source of cell {}.", index))?;
      cells.push(CellEntry {
        kind,
        buffer: SharedText::new(source.clone()),
        original_source: source,
      });
    }
    let metadata = match value.get("metadata") {
      Some(metadata) => serde_json::from_value(metadata.clone()).context("Error deserializing notebook metadata.")?,
      None => NotebookMetadata::default(),
    };
    Ok(NotebookDocument { value, metadata, cells })
  }

  pub fn kernel_name(&self) -> Option<String> {
    self.metadata.kernelspec.as_ref().and_then(|spec| spec.name.clone())
  }

  pub fn code_cell_count(&self) -> usize {
    self.cells.iter().filter(|cell| cell.kind == CellKind::Code).count()
  }

  /// Builds a format target over the cells. `selected` holds indexes
  /// counted among code cells only.
  pub fn target(&self, selected: &[usize]) -> NotebookTarget {
    let mut code_index = 0;
    let cells = self
      .cells
      .iter()
      .map(|cell| {
        let is_selected = cell.kind == CellKind::Code && selected.contains(&code_index);
        if cell.kind == CellKind::Code {
          code_index += 1;
        }
        NotebookCell {
          kind: cell.kind,
          selected: is_selected,
          buffer: cell.buffer.handle(),
        }
      })
      .collect();
    NotebookTarget::new(cells, self.metadata.clone())
  }

  pub fn has_changes(&self) -> bool {
    self.cells.iter().any(|cell| cell.buffer.text() != cell.original_source)
  }

  /// Serializes the notebook the way Jupyter writes it, with changed
  /// sources stored as a list of lines.
  ///
  /// The whole document is re-serialized, so numbers elsewhere in the
  /// notebook are written in serde_json's canonical form (`1e-05` becomes
  /// `0.00001`). Their values are unchanged. Callers that need the original
  /// bytes should check `has_changes` first.
  pub fn to_text(&self) -> Result<String> {
    let mut value = self.value.clone();
    if let Some(raw_cells) = value.get_mut("cells").and_then(|cells| cells.as_array_mut()) {
      for (raw_cell, cell) in raw_cells.iter_mut().zip(self.cells.iter()) {
        let text = cell.buffer.text();
        if text != cell.original_source {
          raw_cell["source"] = source_lines(&text);
        }
      }
    }

    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut serializer)?;
    let mut text = String::from_utf8(bytes)?;
    text.push('\n');
    Ok(text)
  }
}

fn read_source(source: Option<&Value>) -> Result<String> {
  match source {
    None | Some(Value::Null) => Ok(String::new()),
    Some(Value::String(text)) => Ok(text.clone()),
    Some(Value::Array(lines)) => {
      let mut text = String::new();
      for line in lines {
        match line.as_str() {
          Some(line) => text.push_str(line),
          None => bail!("Expected each source line to be a string."),
        }
      }
      Ok(text)
    }
    Some(_) => bail!("Expected the source to be a string or a list of strings."),
  }
}

fn source_lines(text: &str) -> Value {
  Value::Array(text.split_inclusive('\n').map(|line| Value::String(line.to_string())).collect())
}
