//! Remote step validation.
//!
//! The backend may apply rules the client does not know about. Its verdict
//! is advisory: when the call itself fails the gateway reports a pass so a
//! flaky validation service never blocks the user.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfare_core::snapshot::DraftSnapshot;
use wayfare_core::validation::StepValidation;

use crate::error::ApiError;
use crate::http::ApiClient;

/// Backend verdict for one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteValidation {
    pub success: bool,
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl From<RemoteValidation> for StepValidation {
    fn from(remote: RemoteValidation) -> Self {
        let mut validation = StepValidation::passed();
        for (field, messages) in remote.errors {
            for message in messages {
                validation.add_error(field.clone(), message);
            }
        }
        // A bare `success: false` without field messages still fails.
        if !remote.success && validation.valid {
            validation.add_error("step", "The server rejected this step");
        }
        validation
    }
}

#[async_trait]
pub trait StepValidator: Send + Sync {
    async fn validate_step(
        &self,
        step: u8,
        snapshot: &DraftSnapshot,
    ) -> Result<RemoteValidation, ApiError>;
}

#[derive(Serialize)]
struct ValidateStepRequest<'a> {
    step: u8,
    data: &'a DraftSnapshot,
}

/// `POST {base}/validation/steps/{n}`.
pub struct HttpStepValidator {
    api: ApiClient,
}

impl HttpStepValidator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl StepValidator for HttpStepValidator {
    async fn validate_step(
        &self,
        step: u8,
        snapshot: &DraftSnapshot,
    ) -> Result<RemoteValidation, ApiError> {
        let body = ValidateStepRequest {
            step,
            data: snapshot,
        };
        self.api
            .post_json(&format!("validation/steps/{step}"), &body)
            .await
    }
}

/// Fail-open wrapper around a [`StepValidator`].
#[derive(Clone)]
pub struct ValidationGateway {
    validator: Arc<dyn StepValidator>,
}

impl ValidationGateway {
    pub fn new(validator: Arc<dyn StepValidator>) -> Self {
        Self { validator }
    }

    /// Validate `step` remotely. Transport and server errors degrade to a
    /// pass with a warning.
    pub async fn validate(&self, step: u8, snapshot: &DraftSnapshot) -> StepValidation {
        match self.validator.validate_step(step, snapshot).await {
            Ok(remote) => remote.into(),
            Err(e) => {
                tracing::warn!(step, error = %e, "Remote validation unavailable, allowing step");
                StepValidation::passed()
            }
        }
    }
}
