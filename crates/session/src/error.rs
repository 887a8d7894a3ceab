use wayfare_clients::ApiError;
use wayfare_core::error::CoreError;
use wayfare_core::provider::ServiceType;
use wayfare_core::service_request::ServiceRequestStatus;
use wayfare_core::types::{ProviderId, ServiceRequestId};
use wayfare_core::validation::StepValidation;
use wayfare_core::wizard::SessionStatus;

/// Errors from the provider selection manager.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// The provider is already selected for its service type.
    #[error("{} {id} is already selected", .service_type.as_str())]
    Duplicate {
        id: ProviderId,
        service_type: ServiceType,
    },

    /// A guarded operation is already running.
    #[error("A {0} is already in progress")]
    Processing(&'static str),

    #[error("{} {id} is not selected", .service_type.as_str())]
    NotSelected {
        id: ProviderId,
        service_type: ServiceType,
    },

    /// The provider already holds a pending or approved request.
    #[error("Provider {provider_id} already has a {} service request ({request_id})", .status.as_str())]
    ActiveRequest {
        provider_id: ProviderId,
        request_id: ServiceRequestId,
        status: ServiceRequestStatus,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Errors from the wizard session controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Navigation target below the first step.
    #[error("Step {0} does not exist")]
    InvalidStep(i64),

    /// Submission stopped at the first step that does not validate.
    #[error("Step {step} ({label}) is incomplete")]
    StepInvalid {
        step: u8,
        label: &'static str,
        validation: StepValidation,
    },

    /// The session was already submitted or abandoned.
    #[error("Session is {}", .0.as_str())]
    NotActive(SessionStatus),

    /// Required session context (CSRF token, user) is missing.
    #[error("Session context is missing {0}")]
    MissingContext(&'static str),

    #[error("Failed to save draft: {0}")]
    Save(#[source] ApiError),

    #[error("Failed to load draft: {0}")]
    Load(#[source] ApiError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
