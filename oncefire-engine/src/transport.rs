use std::time::Duration;

use reqwest::{blocking::Client, Method, Url};
use thiserror::Error;
use url::ParseError;

use crate::payload::WebhookRequest;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The URL could not be parsed before sending.
    #[error("invalid webhook url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: ParseError,
    },

    /// Connection, DNS, TLS or timeout failure.
    #[error("webhook request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// What came back from the webhook, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one HTTP request. Any status is a response; only faults that produce
/// no status are errors.
pub trait Transport {
    fn send(
        &self,
        request: &WebhookRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// Blocking transport that wraps `reqwest::blocking::Client`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: &WebhookRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let url = Url::parse(&request.url).map_err(|source| TransportError::InvalidUrl {
            url: request.url.clone(),
            source,
        })?;
        let builder = self
            .client
            .request(request.method.clone(), url)
            .timeout(timeout);
        let builder = if request.method == Method::GET {
            builder.query(&request.query_pairs())
        } else {
            builder.json(&request.payload)
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .unwrap_or_else(|_| "<unable to read body>".into());
        Ok(TransportResponse { status, body })
    }
}
