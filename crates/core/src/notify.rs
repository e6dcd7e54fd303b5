use futures::future::LocalBoxFuture;

pub const NOTIFICATION_TITLE: &str = "Code Formatter Error";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NotificationKind {
  Error,
  Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub kind: NotificationKind,
  pub message: String,
}

impl Notification {
  pub fn error(message: impl Into<String>) -> Self {
    Notification {
      kind: NotificationKind::Error,
      message: message.into(),
    }
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Notification {
      kind: NotificationKind::Warning,
      message: message.into(),
    }
  }
}

/// Surfaces problems to the user.
///
/// The returned future may stay pending until the user dismisses the
/// message, so the orchestrator awaits it before continuing.
pub trait Notifier {
  fn notify(&self, notification: Notification) -> LocalBoxFuture<'_, ()>;
}
