//! reqwest-backed transport to the fitness API.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::transport::{NetworkError, Transport};
use crate::request::ApiRequest;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// HTTP client for the backend REST API.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(
    base_url: &str,
    timeout: Duration,
    api_token: Option<&str>,
  ) -> Result<Self, NetworkError> {
    let base_url = Url::parse(base_url).map_err(|_| NetworkError::InvalidUrl(base_url.into()))?;

    let mut headers = HeaderMap::new();
    if let Some(token) = api_token {
      let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| NetworkError::Other(format!("invalid API token: {}", e)))?;
      headers.insert(AUTHORIZATION, value);
    }

    let client = Client::builder()
      .timeout(timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| NetworkError::Other(e.to_string()))?;

    Ok(Self { client, base_url })
  }

  /// Resolve an API path against the base URL, keeping any base path prefix.
  fn url_for(&self, path: &str) -> Result<Url, NetworkError> {
    let joined = format!(
      "{}/{}",
      self.base_url.as_str().trim_end_matches('/'),
      path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|_| NetworkError::InvalidUrl(joined))
  }

  /// Whether the backend answers at all. Any HTTP status counts as reachable.
  pub async fn check_reachable(&self) -> bool {
    match self.client.head(self.base_url.clone()).send().await {
      Ok(_) => true,
      Err(e) => {
        debug!("backend reachability check failed: {}", e);
        false
      }
    }
  }

  async fn execute(&self, request: &ApiRequest) -> Result<Value, NetworkError> {
    let url = self.url_for(&request.path)?;
    debug!(method = %request.method, %url, "sending request");

    let mut builder = self
      .client
      .request(request.method.into(), url.clone());

    if request.method.is_write() {
      builder = builder.header(CONTENT_TYPE, "application/json");
      if let Some(body) = &request.body {
        builder = builder.body(
          serde_json::to_vec(body).map_err(|e| NetworkError::Other(e.to_string()))?,
        );
      }
    }

    if let Some(key) = &request.idempotency_key {
      builder = builder.header(IDEMPOTENCY_KEY_HEADER, key.as_str());
    }

    let response = builder
      .send()
      .await
      .map_err(|e| classify(url.as_str(), e))?;

    let status = response.status();
    let text = response
      .text()
      .await
      .map_err(|e| classify(url.as_str(), e))?;

    if !status.is_success() {
      return Err(NetworkError::Status {
        status: status.as_u16(),
        body: text,
      });
    }

    decode_body(&text)
  }
}

impl Transport for HttpTransport {
  fn send<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<Value, NetworkError>> {
    self.execute(request).boxed()
  }
}

fn classify(url: &str, error: reqwest::Error) -> NetworkError {
  if error.is_timeout() {
    NetworkError::Timeout { url: url.into() }
  } else if error.is_connect() {
    NetworkError::Connect {
      url: url.into(),
      message: error.to_string(),
    }
  } else {
    NetworkError::Other(error.to_string())
  }
}

/// Empty bodies (e.g. 204 No Content) decode to `null`.
fn decode_body(text: &str) -> Result<Value, NetworkError> {
  if text.trim().is_empty() {
    return Ok(Value::Null);
  }
  serde_json::from_str(text).map_err(|e| NetworkError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn transport(base: &str) -> HttpTransport {
    HttpTransport::new(base, Duration::from_secs(5), None).unwrap()
  }

  #[test]
  fn test_url_keeps_base_path() {
    let t = transport("https://fit.example.com/v1/");
    assert_eq!(
      t.url_for("/api/workouts/3").unwrap().as_str(),
      "https://fit.example.com/v1/api/workouts/3"
    );
  }

  #[test]
  fn test_url_without_base_path() {
    let t = transport("http://localhost:5000");
    assert_eq!(
      t.url_for("/api/meals?date=2024-01-01").unwrap().as_str(),
      "http://localhost:5000/api/meals?date=2024-01-01"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    let result = HttpTransport::new("not a url", Duration::from_secs(1), None);
    assert!(matches!(result, Err(NetworkError::InvalidUrl(_))));
  }

  #[test]
  fn test_decode_body() {
    assert_eq!(decode_body("").unwrap(), Value::Null);
    assert_eq!(decode_body("  \n").unwrap(), Value::Null);
    assert_eq!(decode_body(r#"{"id":1}"#).unwrap(), json!({"id": 1}));
    assert!(matches!(decode_body("<html>"), Err(NetworkError::Decode(_))));
  }

  #[tokio::test]
  async fn test_unreachable_backend_is_a_network_error() {
    // Port 9 (discard) on localhost is expected to refuse connections
    let t = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2), None).unwrap();
    let request = ApiRequest::new(crate::request::Method::Get, "/api/meals", None);
    let result = t.send(&request).await;
    assert!(matches!(
      result,
      Err(NetworkError::Connect { .. }) | Err(NetworkError::Timeout { .. }) | Err(NetworkError::Other(_))
    ));
    assert!(!t.check_reachable().await);
  }
}
