//! Batch enrichment port and HTTP client.
//!
//! Fetches authoritative catalog records for a list of ids in one call.
//! Merging with draft data happens in `wayfare_core::provider`.

use async_trait::async_trait;
use serde::Serialize;
use wayfare_core::provider::{CatalogRecord, ServiceType};
use wayfare_core::types::ProviderId;

use crate::error::ApiError;
use crate::http::{ApiClient, DataResponse};

#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    /// Records for the ids the catalog still knows. Unknown ids are simply
    /// absent from the result.
    async fn batch_fetch(
        &self,
        ids: &[ProviderId],
        service_type: ServiceType,
        include_service_requests: bool,
    ) -> Result<Vec<CatalogRecord>, ApiError>;
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    ids: &'a [ProviderId],
    service_type: ServiceType,
    include_service_requests: bool,
}

/// `POST {base}/catalog/batch`.
pub struct HttpEnrichmentSource {
    api: ApiClient,
}

impl HttpEnrichmentSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EnrichmentSource for HttpEnrichmentSource {
    async fn batch_fetch(
        &self,
        ids: &[ProviderId],
        service_type: ServiceType,
        include_service_requests: bool,
    ) -> Result<Vec<CatalogRecord>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = BatchRequest {
            ids,
            service_type,
            include_service_requests,
        };
        let response: DataResponse<Vec<CatalogRecord>> =
            self.api.post_json("catalog/batch", &body).await?;

        // Keep only records of the requested type; the endpoint is shared.
        Ok(response
            .data
            .into_iter()
            .filter(|record| record.service_type == service_type)
            .collect())
    }
}
