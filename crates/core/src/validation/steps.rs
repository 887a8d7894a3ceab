//! Per-step rule tables and semantic checks.

use serde_json::{Map, Value};
use validator::Validate;

use super::rules::{FieldRule, RuleKind, StepValidation};
use crate::provider::{ProviderStatus, ServiceType};
use crate::service_request::ServiceRequestStatus;
use crate::snapshot::AddOnLineItem;
use crate::types::ProviderId;
use crate::wizard::{
    WizardStep, FIELD_ACTIVITIES, FIELD_ADD_ONS, FIELD_BASE_PRICE, FIELD_DESTINATION,
    FIELD_END_DATE, FIELD_PACKAGE_NAME, FIELD_START_DATE, FIELD_TERMS_ACCEPTED, FIELD_TRAVELERS,
};

const BASIC_INFO_RULES: &[FieldRule] = &[
    FieldRule::new(FIELD_PACKAGE_NAME, RuleKind::Required, "Package name is required"),
    FieldRule::new(
        FIELD_PACKAGE_NAME,
        RuleKind::MinLength(3),
        "Package name must be at least 3 characters",
    ),
    FieldRule::new(FIELD_DESTINATION, RuleKind::Required, "Destination is required"),
    FieldRule::new(FIELD_START_DATE, RuleKind::Required, "Start date is required"),
    FieldRule::new(FIELD_START_DATE, RuleKind::Date, "Start date must be YYYY-MM-DD"),
    FieldRule::new(FIELD_END_DATE, RuleKind::Required, "End date is required"),
    FieldRule::new(FIELD_END_DATE, RuleKind::Date, "End date must be YYYY-MM-DD"),
    FieldRule::new(FIELD_TRAVELERS, RuleKind::Required, "Number of travelers is required"),
    FieldRule::new(
        FIELD_TRAVELERS,
        RuleKind::IntegerAtLeast(1),
        "At least one traveler is required",
    ),
];

const PRICING_RULES: &[FieldRule] = &[
    FieldRule::new(FIELD_BASE_PRICE, RuleKind::Required, "Base price is required"),
    FieldRule::new(
        FIELD_BASE_PRICE,
        RuleKind::NumberAtLeast(0.0),
        "Base price must be a non-negative number",
    ),
];

const REVIEW_RULES: &[FieldRule] = &[FieldRule::new(
    FIELD_TERMS_ACCEPTED,
    RuleKind::Accepted,
    "The terms and conditions must be accepted",
)];

/// Primitive field rules for a step.
pub fn field_rules(step: WizardStep) -> &'static [FieldRule] {
    match step {
        WizardStep::BasicInfo => BASIC_INFO_RULES,
        WizardStep::Itinerary | WizardStep::Services => &[],
        WizardStep::PricingAddOns => PRICING_RULES,
        WizardStep::Review => REVIEW_RULES,
    }
}

/// Validation-relevant view of one selected provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCheck {
    pub id: ProviderId,
    pub service_type: ServiceType,
    pub name: String,
    pub status: ProviderStatus,
    pub service_request_status: Option<ServiceRequestStatus>,
}

/// Everything the semantic rules look at besides the flat fields.
#[derive(Debug, Clone, Default)]
pub struct StepContext<'a> {
    pub fields: Option<&'a Map<String, Value>>,
    /// Activities from the freshest available source.
    pub activity_count: usize,
    pub require_activities: bool,
    pub providers: &'a [ProviderCheck],
    pub add_ons: &'a [AddOnLineItem],
}

/// Step-specific business rules, evaluated once the field rules pass.
pub fn semantic_rules(step: WizardStep, ctx: &StepContext<'_>) -> StepValidation {
    let mut result = StepValidation::passed();
    match step {
        WizardStep::BasicInfo => check_date_order(ctx, &mut result),
        WizardStep::Itinerary => {
            if ctx.require_activities && ctx.activity_count == 0 {
                result.add_error(
                    FIELD_ACTIVITIES,
                    "Add at least one itinerary activity before continuing",
                );
            }
        }
        WizardStep::Services => check_providers(ctx.providers, &mut result),
        WizardStep::PricingAddOns => check_add_ons(ctx.add_ons, &mut result),
        WizardStep::Review => {}
    }
    result
}

fn check_date_order(ctx: &StepContext<'_>, result: &mut StepValidation) {
    let Some(fields) = ctx.fields else {
        return;
    };
    let parse = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    };
    if let (Some(start), Some(end)) = (parse(FIELD_START_DATE), parse(FIELD_END_DATE)) {
        if end < start {
            result.add_error(FIELD_END_DATE, "End date cannot be before the start date");
        }
    }
}

fn check_providers(providers: &[ProviderCheck], result: &mut StepValidation) {
    for provider in providers {
        let field = provider.service_type.list_key();
        if provider.status == ProviderStatus::DeletedOrUnavailable {
            result.add_error(
                field,
                format!(
                    "{} is no longer available; remove it or pick another {}",
                    provider.name,
                    provider.service_type.as_str()
                ),
            );
        }
        match provider.service_request_status {
            Some(ServiceRequestStatus::Rejected) => result.add_error(
                field,
                format!(
                    "The service request for {} was rejected; remove it or request again",
                    provider.name
                ),
            ),
            Some(ServiceRequestStatus::Expired) => result.add_error(
                field,
                format!(
                    "The service request for {} expired; remove it or request again",
                    provider.name
                ),
            ),
            _ => {}
        }
    }
}

fn check_add_ons(add_ons: &[AddOnLineItem], result: &mut StepValidation) {
    for (index, item) in add_ons.iter().enumerate() {
        if let Err(errors) = item.validate() {
            for field_errors in errors.field_errors().values() {
                for error in field_errors.iter() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    result.add_error(FIELD_ADD_ONS, format!("Add-on #{}: {message}", index + 1));
                }
            }
        }
    }
}
