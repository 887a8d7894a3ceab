//! Service request (provider approval) status values and state machine.
//!
//! A request starts `pending` and moves to exactly one terminal state. A
//! provider whose request was rejected or expired may receive a fresh
//! request; the old one is never reopened.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::provider::ServiceType;
use crate::types::{ProviderId, ServiceRequestId, Timestamp};

/// Default validity window for a new request.
pub const DEFAULT_EXPIRES_IN_HOURS: u32 = 48;

/// Upper bound accepted for `expires_in_hours`.
pub const MAX_EXPIRES_IN_HOURS: u32 = 720;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Cancelled,
}

impl ServiceRequestStatus {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(CoreError::Validation(format!(
                "Invalid service request status '{s}'. \
                 Must be one of: pending, approved, rejected, expired, cancelled"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Approval pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Expired => "Request expired",
            Self::Cancelled => "Request cancelled",
        }
    }

    /// Every state other than `pending` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// A live request blocks creating another one for the same provider.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Whether a fresh request may be created for a provider whose current
    /// request is in this state.
    pub fn allows_new_request(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Cancelled)
    }
}

/// Valid target states reachable from `from`.
pub fn valid_transitions(from: ServiceRequestStatus) -> &'static [ServiceRequestStatus] {
    use ServiceRequestStatus::*;
    match from {
        Pending => &[Approved, Rejected, Expired, Cancelled],
        Approved | Rejected | Expired | Cancelled => &[],
    }
}

pub fn can_transition(from: ServiceRequestStatus, to: ServiceRequestStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a status change observed on the backend against the cached one.
///
/// An unchanged status is accepted as a no-op.
pub fn validate_transition(
    from: ServiceRequestStatus,
    to: ServiceRequestStatus,
) -> Result<(), CoreError> {
    if from == to || can_transition(from, to) {
        return Ok(());
    }
    Err(CoreError::Conflict(format!(
        "Service request cannot move from '{}' to '{}'",
        from.as_str(),
        to.as_str()
    )))
}

// ---------------------------------------------------------------------------
// Request record
// ---------------------------------------------------------------------------

/// Cached copy of a backend service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: ServiceRequestId,
    pub provider_id: ProviderId,
    pub service_type: ServiceType,
    pub status: ServiceRequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Validate a cancellation reason.
pub fn validate_cancel_reason(reason: &str) -> Result<(), CoreError> {
    if reason.trim().is_empty() {
        return Err(CoreError::Validation(
            "A reason is required to cancel a service request".to_string(),
        ));
    }
    Ok(())
}

/// Validate the requested validity window.
pub fn validate_expires_in_hours(hours: u32) -> Result<(), CoreError> {
    if hours == 0 || hours > MAX_EXPIRES_IN_HOURS {
        return Err(CoreError::Validation(format!(
            "expires_in_hours must be between 1 and {MAX_EXPIRES_IN_HOURS}, got {hours}"
        )));
    }
    Ok(())
}
