use futures::future::LocalBoxFuture;
use futures::FutureExt;
use labfmt_core::notify::Notification;
use labfmt_core::notify::NotificationKind;
use labfmt_core::notify::Notifier;
use labfmt_core::notify::NOTIFICATION_TITLE;

use crate::environment::Environment;

/// Writes notifications to stderr under the notification title.
pub struct EnvironmentNotifier<TEnvironment: Environment> {
  environment: TEnvironment,
}

impl<TEnvironment: Environment> EnvironmentNotifier<TEnvironment> {
  pub fn new(environment: TEnvironment) -> Self {
    Self { environment }
  }
}

impl<TEnvironment: Environment> Notifier for EnvironmentNotifier<TEnvironment> {
  fn notify(&self, notification: Notification) -> LocalBoxFuture<'_, ()> {
    let text = match notification.kind {
      NotificationKind::Error => notification.message,
      NotificationKind::Warning => format!("Warning: {}", notification.message),
    };
    self.environment.log_stderr_with_context(&text, NOTIFICATION_TITLE);
    async {}.boxed_local()
  }
}
