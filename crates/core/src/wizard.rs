//! Package wizard step definitions and step-counter rules.
//!
//! Defines the five wizard steps, the session lifecycle status, the form
//! field keys each step reads, and the navigation helpers used by the
//! session controller.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Session status
// ---------------------------------------------------------------------------

/// Lifecycle of a wizard session on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Submitted,
    Abandoned,
}

impl SessionStatus {
    /// Parse a status string as stored in a draft.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "submitted" => Ok(Self::Submitted),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(CoreError::Validation(format!(
                "Invalid session status '{s}'. Must be one of: in_progress, submitted, abandoned"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Abandoned => "abandoned",
        }
    }
}

// ---------------------------------------------------------------------------
// Wizard steps
// ---------------------------------------------------------------------------

/// The five steps of the package wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BasicInfo,
    Itinerary,
    Services,
    PricingAddOns,
    Review,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 5;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = TOTAL_STEPS;

/// Step whose add-on line items are hydrated only once it is mounted.
pub const ADD_ON_STEP: u8 = 4;

impl WizardStep {
    /// Convert a 1-based step number to a `WizardStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::BasicInfo),
            2 => Ok(Self::Itinerary),
            3 => Ok(Self::Services),
            4 => Ok(Self::PricingAddOns),
            5 => Ok(Self::Review),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::BasicInfo => 1,
            Self::Itinerary => 2,
            Self::Services => 3,
            Self::PricingAddOns => 4,
            Self::Review => 5,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Information",
            Self::Itinerary => "Itinerary",
            Self::Services => "Services",
            Self::PricingAddOns => "Pricing & Add-ons",
            Self::Review => "Review & Confirm",
        }
    }

    /// Iterate over all steps in order.
    pub fn all() -> impl Iterator<Item = WizardStep> {
        [
            Self::BasicInfo,
            Self::Itinerary,
            Self::Services,
            Self::PricingAddOns,
            Self::Review,
        ]
        .into_iter()
    }
}

// ---------------------------------------------------------------------------
// Form field keys
// ---------------------------------------------------------------------------

pub const FIELD_PACKAGE_NAME: &str = "package_name";
pub const FIELD_DESTINATION: &str = "destination";
pub const FIELD_START_DATE: &str = "start_date";
pub const FIELD_END_DATE: &str = "end_date";
pub const FIELD_TRAVELERS: &str = "travelers";
pub const FIELD_DESCRIPTION: &str = "description";

/// Pseudo-field used to report itinerary errors.
pub const FIELD_ACTIVITIES: &str = "activities";

pub const FIELD_BASE_PRICE: &str = "base_price";
pub const FIELD_MARKUP_PERCENT: &str = "markup_percent";
pub const FIELD_CURRENCY: &str = "currency";
pub const FIELD_DISCOUNT: &str = "discount";

/// Pseudo-field used to report add-on line item errors.
pub const FIELD_ADD_ONS: &str = "add_ons";

pub const FIELD_TERMS_ACCEPTED: &str = "terms_accepted";
pub const FIELD_PROVIDERS_CONFIRMED: &str = "providers_confirmed";
pub const FIELD_NOTIFY_CUSTOMER: &str = "notify_customer";

/// Pricing keys owned by the step-4 surface. Re-gathered wholesale on
/// every snapshot.
pub const PRICING_FIELDS: &[&str] = &[
    FIELD_BASE_PRICE,
    FIELD_MARKUP_PERCENT,
    FIELD_CURRENCY,
    FIELD_DISCOUNT,
];

/// Terminal-step confirmation flags.
pub const CONFIRMATION_FLAGS: &[&str] = &[
    FIELD_TERMS_ACCEPTED,
    FIELD_PROVIDERS_CONFIRMED,
    FIELD_NOTIFY_CUSTOMER,
];

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Resolve a navigation target.
///
/// Targets below [`MIN_STEP`] are rejected. Targets above [`MAX_STEP`] land
/// on the final step.
pub fn clamp_step_target(n: i64) -> Result<u8, CoreError> {
    if n < i64::from(MIN_STEP) {
        return Err(CoreError::Validation(format!(
            "Step {n} is out of range ({MIN_STEP}..{MAX_STEP})"
        )));
    }
    Ok(n.min(i64::from(MAX_STEP)) as u8)
}

/// Repair a completed-step counter read from a draft.
///
/// A counter beyond [`MAX_STEP`] is treated as corrupted and reset to the
/// current step. Returns the repaired value and whether a repair happened.
pub fn sanitize_max_completed(max_completed: i64, current: u8) -> (u8, bool) {
    if max_completed > i64::from(MAX_STEP) {
        return (current, true);
    }
    if max_completed < i64::from(MIN_STEP) {
        return (MIN_STEP, true);
    }
    (max_completed as u8, false)
}

/// Validate that a step number is within the valid range.
pub fn validate_step_number(step: u8) -> Result<(), CoreError> {
    if !(MIN_STEP..=MAX_STEP).contains(&step) {
        return Err(CoreError::Validation(format!(
            "Step {step} is out of range ({MIN_STEP}..{MAX_STEP})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
