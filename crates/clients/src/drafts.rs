//! Draft persistence port and HTTP client.
//!
//! The client only moves snapshots; it never inspects or mutates the
//! provider records inside them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfare_core::snapshot::DraftSnapshot;

use crate::error::ApiError;
use crate::http::{ApiClient, DataResponse};

/// Result of a save call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDraftResponse {
    pub success: bool,
    #[serde(default)]
    pub draft_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Upsert a snapshot. `draft_id` is `None` for the first save.
    async fn save(
        &self,
        snapshot: &DraftSnapshot,
        draft_id: Option<&str>,
    ) -> Result<SaveDraftResponse, ApiError>;

    async fn load(&self, draft_id: &str) -> Result<DraftSnapshot, ApiError>;
}

#[derive(Serialize)]
struct SaveDraftRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    draft_id: Option<&'a str>,
    data: &'a DraftSnapshot,
}

/// `POST {base}/drafts`, `GET {base}/drafts/{id}`.
pub struct HttpDraftStore {
    api: ApiClient,
}

impl HttpDraftStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DraftStore for HttpDraftStore {
    async fn save(
        &self,
        snapshot: &DraftSnapshot,
        draft_id: Option<&str>,
    ) -> Result<SaveDraftResponse, ApiError> {
        let body = SaveDraftRequest {
            draft_id,
            data: snapshot,
        };
        let response: SaveDraftResponse = self.api.post_json("drafts", &body).await?;
        if !response.success {
            return Err(ApiError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "Draft save was rejected".to_string()),
            ));
        }
        tracing::debug!(draft_id = ?response.draft_id, "Draft stored");
        Ok(response)
    }

    async fn load(&self, draft_id: &str) -> Result<DraftSnapshot, ApiError> {
        let response: DataResponse<DraftSnapshot> =
            self.api.get_json(&format!("drafts/{draft_id}"), &[]).await?;
        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_save_omits_draft_id() {
        let snapshot = DraftSnapshot::new();
        let body = serde_json::to_value(SaveDraftRequest {
            draft_id: None,
            data: &snapshot,
        })
        .unwrap();
        assert!(body.get("draft_id").is_none());
        assert!(body["data"].is_object());
    }

    #[test]
    fn save_response_tolerates_missing_fields() {
        let response: SaveDraftResponse = serde_json::from_value(json!({ "success": false })).unwrap();
        assert!(!response.success);
        assert!(response.draft_id.is_none());
    }
}
