//! HTTP transport used by the fetcher.

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use reqwest::{Url, redirect};
use thiserror::Error;
use tracing::debug;

use super::FetchError;
use crate::consts::APP_NAME;

/// Retrieves the body behind a URL.
///
/// The fetcher checks the scheme of the URL it asks for and the integrity of
/// the body; implementations that follow redirects must keep every hop on
/// HTTPS themselves.
pub trait Transport {
  fn get(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

impl<T: Transport> Transport for &T {
  fn get(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>> {
    (**self).get(url)
  }
}

const MAX_REDIRECTS: usize = 10;

/// A redirect hop left HTTPS.
#[derive(Debug, Error)]
#[error("redirected to non-https URL: {url}")]
struct InsecureRedirect {
  url: String,
}

/// reqwest-backed transport with a bounded per-request timeout.
///
/// Redirects are followed only while every hop stays on HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(timeout: Duration) -> Result<Self, FetchError> {
    let policy = redirect::Policy::custom(|attempt| {
      if attempt.url().scheme() != "https" {
        let url = attempt.url().to_string();
        attempt.error(InsecureRedirect { url })
      } else if attempt.previous().len() >= MAX_REDIRECTS {
        attempt.error("too many redirects")
      } else {
        attempt.follow()
      }
    });

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .redirect(policy)
      .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| FetchError::Client { message: e.to_string() })?;
    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
    debug!(url = %url, "GET");

    let response = self.client.get(url.clone()).send().await.map_err(|e| request_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }

    let bytes = response.bytes().await.map_err(|e| request_error(url, e))?;
    Ok(bytes.to_vec())
  }
}

fn request_error(url: &Url, err: reqwest::Error) -> FetchError {
  let mut source = err.source();
  while let Some(cause) = source {
    if let Some(redirect) = cause.downcast_ref::<InsecureRedirect>() {
      return FetchError::InsecureUrl {
        url: redirect.url.clone(),
      };
    }
    source = cause.source();
  }

  if err.is_timeout() {
    FetchError::Timeout { url: url.to_string() }
  } else {
    FetchError::Request {
      url: url.to_string(),
      message: err.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn returns_body_on_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/artifact.sh")
      .with_status(200)
      .with_body("#!/bin/sh\necho hi\n")
      .create_async()
      .await;

    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    let url = Url::parse(&format!("{}/artifact.sh", server.url())).unwrap();
    let body = transport.get(&url).await.unwrap();

    assert_eq!(body, b"#!/bin/sh\necho hi\n");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn non_success_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/missing").with_status(404).create_async().await;

    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    let url = Url::parse(&format!("{}/missing", server.url())).unwrap();

    assert!(matches!(
      transport.get(&url).await,
      Err(FetchError::Status { status: 404, .. })
    ));
  }

  #[tokio::test]
  async fn refuses_redirect_to_plain_http() {
    let mut server = mockito::Server::new_async().await;
    let target = format!("{}/plain", server.url());
    server
      .mock("GET", "/start")
      .with_status(302)
      .with_header("location", &target)
      .create_async()
      .await;
    let plain = server
      .mock("GET", "/plain")
      .with_status(200)
      .with_body("served over redirect")
      .expect(0)
      .create_async()
      .await;

    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    let url = Url::parse(&format!("{}/start", server.url())).unwrap();

    match transport.get(&url).await {
      Err(FetchError::InsecureUrl { url }) => assert_eq!(url, target),
      other => panic!("expected InsecureUrl, got {other:?}"),
    }
    plain.assert_async().await;
  }

  #[tokio::test]
  async fn connection_failure_is_a_request_error() {
    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    // Port 9 (discard) on localhost is not expected to accept connections.
    let url = Url::parse("http://127.0.0.1:9/nothing").unwrap();

    assert!(matches!(
      transport.get(&url).await,
      Err(FetchError::Request { .. } | FetchError::Timeout { .. })
    ));
  }
}
