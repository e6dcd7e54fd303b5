use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::client::HttpRequest;
use crate::client::HttpResponse;
use crate::client::Transport;
use crate::notify::Notification;
use crate::notify::NotificationKind;
use crate::notify::Notifier;

struct QueuedResponse {
  response: Result<HttpResponse, String>,
  before_respond: Option<Box<dyn FnOnce()>>,
}

#[derive(Default)]
struct TestTransportState {
  requests: Vec<HttpRequest>,
  responses: VecDeque<QueuedResponse>,
}

/// Transport that replays queued responses and records every request.
///
/// Each send yields to the executor once before answering so other
/// futures can run while the request is "in flight".
#[derive(Clone, Default)]
pub struct TestTransport(Rc<RefCell<TestTransportState>>);

impl TestTransport {
  pub fn respond_ok(&self, body: &str) {
    self.respond(200, "OK", body);
  }

  pub fn respond(&self, status: u16, status_text: &str, body: &str) {
    self.queue(Ok(create_response(status, status_text, body)), None);
  }

  /// Runs `action` while the request is outstanding, then responds.
  pub fn respond_ok_after(&self, body: &str, action: impl FnOnce() + 'static) {
    self.queue(Ok(create_response(200, "OK", body)), Some(Box::new(action)));
  }

  pub fn fail(&self, message: &str) {
    self.queue(Err(message.to_string()), None);
  }

  pub fn requests(&self) -> Vec<HttpRequest> {
    self.0.borrow().requests.clone()
  }

  /// Deserialized bodies of the requests sent so far.
  pub fn request_bodies(&self) -> Vec<serde_json::Value> {
    self
      .0
      .borrow()
      .requests
      .iter()
      .filter_map(|request| request.body.as_ref())
      .map(|body| serde_json::from_str(body).unwrap())
      .collect()
  }

  fn queue(&self, response: Result<HttpResponse, String>, before_respond: Option<Box<dyn FnOnce()>>) {
    self.0.borrow_mut().responses.push_back(QueuedResponse { response, before_respond });
  }
}

fn create_response(status: u16, status_text: &str, body: &str) -> HttpResponse {
  HttpResponse {
    status,
    status_text: status_text.to_string(),
    body: body.to_string(),
  }
}

impl Transport for TestTransport {
  fn send(&self, request: HttpRequest) -> LocalBoxFuture<'_, Result<HttpResponse>> {
    async move {
      let queued = {
        let mut state = self.0.borrow_mut();
        state.requests.push(request);
        state.responses.pop_front()
      };
      tokio::task::yield_now().await;
      let Some(queued) = queued else {
        bail!("No response queued.");
      };
      if let Some(action) = queued.before_respond {
        action();
      }
      queued.response.map_err(|err| anyhow!("{}", err))
    }
    .boxed_local()
  }
}

#[derive(Clone, Default)]
pub struct TestNotifier(Rc<RefCell<Vec<Notification>>>);

impl TestNotifier {
  pub fn notifications(&self) -> Vec<Notification> {
    self.0.borrow().clone()
  }

  pub fn errors(&self) -> Vec<String> {
    self.messages(NotificationKind::Error)
  }

  pub fn warnings(&self) -> Vec<String> {
    self.messages(NotificationKind::Warning)
  }

  fn messages(&self, kind: NotificationKind) -> Vec<String> {
    self.0.borrow().iter().filter(|n| n.kind == kind).map(|n| n.message.clone()).collect()
  }
}

impl Notifier for TestNotifier {
  fn notify(&self, notification: Notification) -> LocalBoxFuture<'_, ()> {
    self.0.borrow_mut().push(notification);
    async {}.boxed_local()
  }
}
