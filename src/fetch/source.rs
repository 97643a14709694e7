//! Where namespace descriptions come from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tower_lsp::lsp_types::Url;

use super::FetchError;

/// Fetches the Turtle description of a namespace.
#[async_trait]
pub trait NamespaceSource: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, FetchError>;
}

/// Plain HTTP(S) GET asking for Turtle.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NamespaceSource for HttpSource {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let classify = |err: reqwest::Error| {
            if err.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Http(err.to_string())
            }
        };

        let response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, "text/turtle")
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.text().await.map_err(classify)
    }
}
