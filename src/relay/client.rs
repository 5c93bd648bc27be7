// HTTP client bound to the arena backend.

use std::time::Duration;

use reqwest::{Client, Url};

use super::error::RelayError;
use super::route::Outbound;
use crate::config::Config;

/// Raw backend reply: status code and unparsed body.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, RelayError> {
        let base_url =
            Url::parse(base_url).map_err(|e| RelayError::Url(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::Url(format!("{base_url}: not a base URL")));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        Self::new(&config.backend_url, config.backend_timeout)
    }

    /// Absolute URL for the given path segments. Segments are percent-encoded.
    pub fn url_for(&self, segments: &[String]) -> Result<Url, RelayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn send(&self, outbound: &Outbound) -> Result<BackendReply, RelayError> {
        let url = self.url_for(&outbound.segments)?;

        let mut request = self.http.request(outbound.method.clone(), url);
        if !outbound.query.is_empty() {
            request = request.query(&outbound.query);
        }
        if let Some(body) = &outbound.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(BackendReply { status, body })
    }
}
