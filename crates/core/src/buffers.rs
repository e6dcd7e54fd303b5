use std::cell::RefCell;
use std::rc::Rc;

/// Text accessor for a cell or an editor.
pub trait TextBuffer {
  fn text(&self) -> String;
  fn set_text(&self, text: &str);
}

pub type BufferHandle = Rc<dyn TextBuffer>;

/// In-memory buffer shared between its owner and the orchestrator.
#[derive(Clone, Default, Debug)]
pub struct SharedText(Rc<RefCell<String>>);

impl SharedText {
  pub fn new(text: impl Into<String>) -> Self {
    SharedText(Rc::new(RefCell::new(text.into())))
  }

  pub fn handle(&self) -> BufferHandle {
    Rc::new(self.clone())
  }
}

impl TextBuffer for SharedText {
  fn text(&self) -> String {
    self.0.borrow().clone()
  }

  fn set_text(&self, text: &str) {
    let mut current = self.0.borrow_mut();
    current.clear();
    current.push_str(text);
  }
}

/// Texts of a set of buffers taken just before a request is sent.
pub struct BufferSnapshot {
  entries: Vec<(BufferHandle, String)>,
}

impl BufferSnapshot {
  pub fn capture(buffers: &[BufferHandle]) -> Self {
    BufferSnapshot {
      entries: buffers.iter().map(|buffer| (buffer.clone(), buffer.text())).collect(),
    }
  }

  pub fn texts(&self) -> Vec<String> {
    self.entries.iter().map(|(_, text)| text.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &(BufferHandle, String)> {
    self.entries.iter()
  }
}
