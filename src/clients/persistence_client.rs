use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error};

use super::error::PersistenceError;
use crate::config::Config;

pub type SaveFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PersistenceError>> + Send + 'a>>;

/// Durable storage for document content, called by sync clients only.
pub trait Persistence: Send + Sync {
    fn save(&self, document_id: String, content: String) -> SaveFuture<'_>;
}

#[derive(Debug, Serialize)]
struct UpdateDocumentRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Saves through the wiki's document API: `PUT {base_url}/documents/{id}`
#[derive(Debug, Clone)]
pub struct HttpPersistence {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpPersistence {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, PersistenceError> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(PersistenceError::InvalidUrl(base_url))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url: parsed, token })
    }

    /// Build from `PERSISTENCE_URL`, `None` when it is not configured.
    pub fn from_config(config: &Config, token: Option<String>) -> Option<Result<Self, PersistenceError>> {
        config
            .persistence_url
            .as_ref()
            .map(|url| Self::new(url.clone(), token))
    }

    /// The id is one path segment, so `/`, `?` and `#` are percent-encoded.
    fn document_url(&self, document_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("documents").push(document_id);
        }
        url
    }
}

impl Persistence for HttpPersistence {
    fn save(&self, document_id: String, content: String) -> SaveFuture<'_> {
        Box::pin(async move {
            let url = self.document_url(&document_id);
            debug!("Saving document {} ({} bytes)", document_id, content.len());

            let mut request = self.client.put(url).json(&UpdateDocumentRequest { content });
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| "Unknown error".to_string());
            error!("Saving document {} failed with {}: {}", document_id, status, detail);
            Err(PersistenceError::Rejected { status: status.as_u16(), detail })
        })
    }
}
