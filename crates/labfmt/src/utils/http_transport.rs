use anyhow::bail;
use anyhow::Result;
use labfmt_core::client::HttpMethod;
use labfmt_core::client::HttpRequest;
use labfmt_core::client::HttpResponse;

/// Blocking HTTP client for talking to the Jupyter server.
pub struct RealHttpTransport {
  https_agent: ureq::Agent,
  http_agent: ureq::Agent,
}

impl RealHttpTransport {
  pub fn new(read_env_var: impl Fn(&str) -> Option<String>) -> Result<Self> {
    Ok(Self {
      https_agent: build_agent(AgentKind::Https, &read_env_var)?,
      http_agent: build_agent(AgentKind::Http, &read_env_var)?,
    })
  }

  pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
    let lowercase_url = request.url.to_lowercase();
    let agent = if lowercase_url.starts_with("https://") {
      &self.https_agent
    } else if lowercase_url.starts_with("http://") {
      &self.http_agent
    } else {
      bail!("Not implemented url scheme: {}", request.url);
    };

    let mut builder = agent.request(request.method.as_str(), &request.url);
    for (name, value) in &request.headers {
      builder = builder.set(name, value);
    }
    let result = match (&request.method, &request.body) {
      (HttpMethod::Post, Some(body)) => builder.set("Content-Type", "application/json").send_string(body),
      _ => builder.call(),
    };
    match result {
      Ok(resp) => into_http_response(resp),
      // non-200 statuses are reported by the caller
      Err(ureq::Error::Status(_, resp)) => into_http_response(resp),
      Err(err) => bail!("Error requesting {} - Error: {:#}", request.url, err),
    }
  }
}

fn into_http_response(resp: ureq::Response) -> Result<HttpResponse> {
  let status = resp.status();
  let status_text = resp.status_text().to_string();
  let body = resp.into_string()?;
  Ok(HttpResponse { status, status_text, body })
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum AgentKind {
  Http,
  Https,
}

fn build_agent(kind: AgentKind, read_env_var: &impl Fn(&str) -> Option<String>) -> Result<ureq::Agent> {
  let mut agent = ureq::AgentBuilder::new();
  if let Some(proxy_url) = get_proxy_url(kind, read_env_var) {
    agent = agent.proxy(ureq::Proxy::new(proxy_url)?);
  }
  Ok(agent.build())
}

fn get_proxy_url(kind: AgentKind, read_env_var: &impl Fn(&str) -> Option<String>) -> Option<String> {
  match kind {
    AgentKind::Http => read_proxy_env_var("HTTP_PROXY", read_env_var),
    AgentKind::Https => read_proxy_env_var("HTTPS_PROXY", read_env_var),
  }
}

fn read_proxy_env_var(env_var_name: &str, read_env_var: &impl Fn(&str) -> Option<String>) -> Option<String> {
  read_env_var(&env_var_name.to_uppercase()).or_else(|| read_env_var(&env_var_name.to_lowercase()))
}
