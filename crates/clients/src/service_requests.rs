//! Service request (provider approval) port and HTTP client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;
use wayfare_core::provider::{MinimalProviderRecord, ServiceType};
use wayfare_core::service_request::{validate_cancel_reason, ServiceRequest};
use wayfare_core::types::{ProviderId, ServiceRequestId};

use crate::error::ApiError;
use crate::http::{ApiClient, DataResponse};

/// Payload for creating a service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewServiceRequest {
    pub provider_id: ProviderId,
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_draft_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Requested quantity must be at least 1"))]
    pub requested_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "Special requirements are too long"))]
    pub special_requirements: Option<String>,
    #[validate(range(min = 1, max = 720, message = "expires_in_hours must be between 1 and 720"))]
    pub expires_in_hours: u32,
    /// Idempotency key generated by the caller.
    #[validate(length(min = 1, message = "A client reference is required"))]
    pub client_reference: String,
}

#[async_trait]
pub trait ServiceRequestApi: Send + Sync {
    async fn create(&self, request: &NewServiceRequest) -> Result<ServiceRequest, ApiError>;

    async fn get(&self, id: ServiceRequestId) -> Result<ServiceRequest, ApiError>;

    async fn cancel(&self, id: ServiceRequestId, reason: &str) -> Result<(), ApiError>;
}

/// Decides how many units to request when the caller does not say.
///
/// The rule (rooms × nights, seats, vehicles, ...) belongs to the host;
/// `None` leaves the quantity to the backend.
pub trait QuantityResolver: Send + Sync {
    fn resolve(&self, provider: &MinimalProviderRecord) -> Option<u32>;
}

/// Never resolves a quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferToBackend;

impl QuantityResolver for DeferToBackend {
    fn resolve(&self, _provider: &MinimalProviderRecord) -> Option<u32> {
        None
    }
}

#[derive(Serialize)]
struct CancelRequest<'a> {
    reason: &'a str,
}

/// `POST {base}/service-requests`, `GET {base}/service-requests/{id}`,
/// `POST {base}/service-requests/{id}/cancel`.
pub struct HttpServiceRequestApi {
    api: ApiClient,
}

impl HttpServiceRequestApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ServiceRequestApi for HttpServiceRequestApi {
    async fn create(&self, request: &NewServiceRequest) -> Result<ServiceRequest, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

        let response: DataResponse<ServiceRequest> =
            self.api.post_json("service-requests", request).await?;

        tracing::info!(
            service_request_id = response.data.id,
            provider_id = request.provider_id,
            service_type = request.service_type.as_str(),
            "Service request created",
        );
        Ok(response.data)
    }

    async fn get(&self, id: ServiceRequestId) -> Result<ServiceRequest, ApiError> {
        let response: DataResponse<ServiceRequest> = self
            .api
            .get_json(&format!("service-requests/{id}"), &[])
            .await?;
        Ok(response.data)
    }

    async fn cancel(&self, id: ServiceRequestId, reason: &str) -> Result<(), ApiError> {
        validate_cancel_reason(reason).map_err(|e| ApiError::InvalidInput(e.to_string()))?;

        let _: serde_json::Value = self
            .api
            .post_json(
                &format!("service-requests/{id}/cancel"),
                &CancelRequest { reason },
            )
            .await?;

        tracing::info!(service_request_id = id, "Service request cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::provider::ProviderKind;

    fn request() -> NewServiceRequest {
        NewServiceRequest {
            provider_id: 7,
            service_type: ServiceType::Hotel,
            package_draft_id: Some("draft-1".into()),
            requested_quantity: Some(2),
            special_requirements: None,
            expires_in_hours: 48,
            client_reference: "ref-1".into(),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn zero_quantity_and_long_expiry_are_rejected() {
        let mut bad = request();
        bad.requested_quantity = Some(0);
        bad.expires_in_hours = 721;
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("requested_quantity"));
        assert!(fields.contains_key("expires_in_hours"));
    }

    #[test]
    fn omitted_quantity_is_not_serialized() {
        let mut req = request();
        req.requested_quantity = None;
        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("requested_quantity").is_none());
        assert_eq!(body["service_type"], "hotel");
    }

    #[test]
    fn defer_to_backend_never_resolves() {
        let record = MinimalProviderRecord::new(7, ServiceType::Hotel, ProviderKind::Platform);
        assert_eq!(DeferToBackend.resolve(&record), None);
    }
}
