//! HTTP implementation of the remote catalog.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::remote::{RemoteCatalog, RemoteError, RemoteResult};
use crate::models::{CatchId, CatchRecord, CatchSnapshot};
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Catalog served at `{base}/catches/{id}`.
#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Wire body for uploads: the snapshot plus its local id.
#[derive(Debug, Serialize)]
struct UploadBody<'a> {
    id: CatchId,
    #[serde(flatten)]
    snapshot: &'a CatchSnapshot,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url,
            token: normalize_text_option(token),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn catch_url(&self, id: CatchId) -> String {
        format!("{}/catches/{}", self.base_url, id.get())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl RemoteCatalog for HttpRemote {
    async fn upload(&self, record: &CatchRecord) -> RemoteResult<()> {
        let snapshot = record.snapshot();
        let body = UploadBody {
            id: record.id,
            snapshot: &snapshot,
        };

        let response = self
            .authorize(self.client.put(self.catch_url(record.id)))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }

    async fn pull(&self, id: CatchId) -> RemoteResult<Option<CatchSnapshot>> {
        let response = self
            .authorize(self.client.get(self.catch_url(id)))
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }

        Ok(Some(response.json::<CatchSnapshot>().await?))
    }
}

async fn rejected(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    RemoteError::Rejected {
        status: status.as_u16(),
        message: parse_error_message(&body),
    }
}

fn parse_error_message(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<RemoteErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("remote URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "remote URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrichment, InventoryStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn base_url_is_validated_and_trimmed() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/v1/ ".to_string()).unwrap(),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn catch_url_uses_raw_id() {
        let remote = HttpRemote::new("http://localhost:8080/", None).unwrap();
        assert_eq!(
            remote.catch_url(CatchId::new(42)),
            "http://localhost:8080/catches/42"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let remote =
            HttpRemote::new("https://api.example.com", Some("secret".to_string())).unwrap();
        let debug = format!("{remote:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn blank_token_is_dropped() {
        let remote = HttpRemote::new("https://api.example.com", Some("  ".to_string())).unwrap();
        assert!(remote.token.is_none());
    }

    #[test]
    fn upload_body_flattens_snapshot() {
        let snapshot = CatchSnapshot {
            species: "Mackerel".to_string(),
            weight: 3.2,
            timestamp: 1,
            last_updated: 2,
            inventory_status: InventoryStatus::OnIce,
            enrichment: Enrichment::default(),
        };
        let value = serde_json::to_value(UploadBody {
            id: CatchId::new(3),
            snapshot: &snapshot,
        })
        .unwrap();

        assert_eq!(value["id"], 3);
        assert_eq!(value["species"], "Mackerel");
        assert_eq!(value["inventory_status"], "on_ice");
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(parse_error_message(r#"{"message":"stale"}"#), "stale");
        assert_eq!(parse_error_message(r#"{"error":"nope"}"#), "nope");
        assert_eq!(parse_error_message("  "), "empty response body");
        assert_eq!(parse_error_message("bad gateway"), "bad gateway");
    }
}
