//! HTTP client for the Rig Veda backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use super::VedaBackend;
use super::error::{BackendError, Result};
use super::types::{
    AudioClip, ChatIntentRequest, ChatIntentResponse, MandalaIndex, RandomResponse, SearchRequest,
    SearchResponse, Verse,
};
use crate::reference::VerseRef;

/// Header carrying the backend API key.
const API_KEY_HEADER: &str = "X-API-Key";

/// `reqwest` implementation of [`VedaBackend`].
///
/// # Example
///
/// ```rust,no_run
/// use veda_explorer::backend::{HttpBackend, VedaBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new("http://localhost:8008/api", None)?;
/// let results = backend.semantic_search("dawn goddess", 50).await?;
/// println!("{} verses", results.results.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for `base_url` (e.g. `http://localhost:8008/api`).
    pub fn new(base_url: impl AsRef<str>, api_key: Option<String>) -> Result<Self> {
        Self::with_client(base_url, api_key, reqwest::Client::new())
    }

    /// Create a client with a request timeout.
    pub fn with_timeout(
        base_url: impl AsRef<str>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, api_key, http)
    }

    /// Create a client with a custom `reqwest` client.
    pub fn with_client(
        base_url: impl AsRef<str>,
        api_key: Option<String>,
        http: reqwest::Client,
    ) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base(base_url.as_ref())?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.url(path)?;
        tracing::debug!(name: "backend.request", method = %method, url = %url, "Backend request");
        let builder = self.http.request(method, url);
        Ok(match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(reqwest::Method::GET, path)?.send().await?;
        Self::handle_response(response).await
    }

    async fn post_json<B: serde::Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, path)?
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            let value: serde_json::Value = serde_json::from_str(&text)?;
            if let Some(message) = error_field(&value) {
                return Err(BackendError::Remote(message));
            }
            Ok(serde_json::from_value(value)?)
        } else {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| error_field(&v))
                .unwrap_or_else(|| {
                    if text.trim().is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("Unknown error")
                            .to_string()
                    } else {
                        text
                    }
                });
            tracing::warn!(status = status.as_u16(), error = %message, "Backend returned error status");
            Err(BackendError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl VedaBackend for HttpBackend {
    async fn semantic_search(&self, query: &str, top_k: usize) -> Result<SearchResponse> {
        let body = SearchRequest {
            query: query.to_string(),
            top_k,
        };
        self.post_json("semantic/search", &body).await
    }

    async fn random_verses(&self) -> Result<RandomResponse> {
        self.get_json("semantic/random").await
    }

    async fn mandala_index(&self, mandala: u32) -> Result<MandalaIndex> {
        self.get_json(&format!("index/{mandala}")).await
    }

    async fn verse(&self, verse: VerseRef) -> Result<Verse> {
        self.get_json(&verse.sloka_path()).await
    }

    async fn audio(&self, verse: VerseRef) -> Result<AudioClip> {
        let response = self
            .request(reqwest::Method::GET, &verse.audio_path())?
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: format!("Audio not available for {verse}"),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let data = response.bytes().await?;
        Ok(AudioClip { content_type, data })
    }

    async fn chat_intent(&self, query: &str) -> Result<ChatIntentResponse> {
        let body = ChatIntentRequest {
            query: query.to_string(),
        };
        self.post_json("chat/intent", &body).await
    }
}

/// Parse the base URL and make sure relative joins append to its path.
fn normalize_base(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    Ok(Url::parse(&format!("{trimmed}/"))?)
}

/// The backend reports failures as `{"error": "..."}` (or `Message` from the
/// gateway in front of it).
fn error_field(value: &serde_json::Value) -> Option<String> {
    ["error", "Message"]
        .iter()
        .find_map(|key| value.get(key))
        .and_then(|v| match v {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Null | serde_json::Value::Bool(false) => None,
            serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        })
}
