/// Message history endpoint client
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::types::ChatMessage;
use bytes::Bytes;
use http::Uri;
use http_body_util::{BodyExt, Empty};
use hyper::Request;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Source of the full message history
pub trait HistorySource: Clone + Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<ChatMessage>>> + Send;
}

/// `GET {server}/messages` over HTTP/1
#[derive(Clone)]
pub struct HttpHistory {
    client: Client<HttpConnector, Empty<Bytes>>,
    uri: Uri,
    request_timeout: Duration,
}

impl HttpHistory {
    pub fn new(config: &Config) -> Result<Self> {
        let uri = config
            .history_url()
            .parse::<Uri>()
            .map_err(|e| ChatError::Config(format!("Invalid server URL: {}", e)))?;
        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self {
            client,
            uri,
            request_timeout: config.request_timeout,
        })
    }

    async fn fetch(&self) -> Result<Vec<ChatMessage>> {
        let req = Request::get(self.uri.clone())
            .header("Accept", "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| ChatError::Http(e.to_string()))?;

        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| ChatError::Http(e.to_string()))?
            .to_bytes();

        if !status.is_success() {
            debug!(
                "History endpoint answered {}: {}",
                status,
                String::from_utf8_lossy(&body)
            );
            return Err(ChatError::Status(status.as_u16()));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

impl HistorySource for HttpHistory {
    async fn fetch_all(&self) -> Result<Vec<ChatMessage>> {
        debug!("GET {}", self.uri);
        timeout(self.request_timeout, self.fetch())
            .await
            .map_err(|_| ChatError::Timeout(format!("GET {}", self.uri)))?
    }
}
