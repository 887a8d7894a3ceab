//! Provider selection records and the enrichment merge.
//!
//! A selection exists in two shapes:
//!
//! - [`MinimalProviderRecord`] is the draft-safe projection. It carries the
//!   user's relationship to an offering (overrides, selection metadata,
//!   service-request linkage) and nothing describing the offering itself.
//! - [`EnrichedProviderRecord`] pairs a minimal record with the live catalog
//!   data for display. It is rebuilt on every load and never persisted.
//!
//! [`merge_enrichment`] is the single place where the two are reconciled.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::service_request::{ServiceRequest, ServiceRequestStatus};
use crate::types::{ProviderId, ServiceRequestId, Timestamp};

// ---------------------------------------------------------------------------
// Service type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Hotel,
    Flight,
    Transport,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [Self::Hotel, Self::Flight, Self::Transport];

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "hotel" | "hotels" => Ok(Self::Hotel),
            "flight" | "flights" => Ok(Self::Flight),
            "transport" => Ok(Self::Transport),
            _ => Err(CoreError::Validation(format!(
                "Invalid service type '{s}'. Must be one of: hotel, flight, transport"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotel => "hotel",
            Self::Flight => "flight",
            Self::Transport => "transport",
        }
    }

    /// Collection name used in URLs and draft keys.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Hotel => "hotels",
            Self::Flight => "flights",
            Self::Transport => "transport",
        }
    }

    /// Draft key holding this type's minimal records.
    pub fn list_key(&self) -> &'static str {
        match self {
            Self::Hotel => "selected_hotels",
            Self::Flight => "selected_flights",
            Self::Transport => "selected_transport",
        }
    }

    /// Draft key carrying the explicit "this list is empty" marker.
    pub fn empty_marker_key(&self) -> &'static str {
        match self {
            Self::Hotel => "hotels_empty",
            Self::Flight => "flights_empty",
            Self::Transport => "transport_empty",
        }
    }
}

/// Where an offering comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Listed on the platform catalog; bookable directly.
    #[default]
    Platform,
    /// Third-party supplier; needs an approved service request.
    External,
    /// The agency's own service.
    Own,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Platform => "Platform",
            Self::External => "External - approval required",
            Self::Own => "Own service",
        }
    }
}

/// Lifecycle of a selected provider as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    /// Placeholder while an enrichment batch is in flight.
    Loading,
    /// The catalog no longer knows this id.
    DeletedOrUnavailable,
    /// Enrichment could not reach the catalog; data is best-effort.
    #[serde(other)]
    Unknown,
}

impl ProviderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Suspended => "Suspended",
            Self::Loading => "Loading",
            Self::DeletedOrUnavailable => "No longer available",
            Self::Unknown => "Status unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Per-type user overrides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nights: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabin_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicles: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_date: Option<String>,
}

/// User-entered overrides, tagged by service type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service_type", rename_all = "snake_case")]
pub enum ProviderOverrides {
    Hotel(HotelOverrides),
    Flight(FlightOverrides),
    Transport(TransportOverrides),
}

impl ProviderOverrides {
    pub fn empty(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Hotel => Self::Hotel(HotelOverrides::default()),
            ServiceType::Flight => Self::Flight(FlightOverrides::default()),
            ServiceType::Transport => Self::Transport(TransportOverrides::default()),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::Hotel(_) => ServiceType::Hotel,
            Self::Flight(_) => ServiceType::Flight,
            Self::Transport(_) => ServiceType::Transport,
        }
    }

    /// Unit count implied by the overrides (rooms, seats, vehicles).
    pub fn unit_count(&self) -> Option<u32> {
        match self {
            Self::Hotel(h) => h.rooms,
            Self::Flight(f) => f.seats,
            Self::Transport(t) => t.vehicles,
        }
    }

    /// Parse the overrides for `service_type` out of a loosely-shaped draft
    /// object. Malformed overrides are dropped; the selection itself is kept.
    fn from_draft_object(service_type: ServiceType, value: &Value) -> Self {
        match service_type {
            ServiceType::Hotel => {
                Self::Hotel(serde_json::from_value(value.clone()).unwrap_or_default())
            }
            ServiceType::Flight => {
                Self::Flight(serde_json::from_value(value.clone()).unwrap_or_default())
            }
            ServiceType::Transport => {
                Self::Transport(serde_json::from_value(value.clone()).unwrap_or_default())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Minimal record
// ---------------------------------------------------------------------------

/// Key of the structured service-request block in draft entries.
pub const REQUEST_INFO_KEY: &str = "request_info";

/// The draft-safe projection of a provider selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimalProviderRecord {
    pub id: ProviderId,
    #[serde(default)]
    pub provider_kind: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_request_id: Option<ServiceRequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_request_status: Option<ServiceRequestStatus>,
    pub selected_at: Timestamp,
    #[serde(flatten)]
    pub overrides: ProviderOverrides,
}

impl MinimalProviderRecord {
    /// A fresh selection with no overrides and no service request.
    pub fn new(id: ProviderId, service_type: ServiceType, provider_kind: ProviderKind) -> Self {
        Self {
            id,
            provider_kind,
            service_request_id: None,
            service_request_status: None,
            selected_at: chrono::Utc::now(),
            overrides: ProviderOverrides::empty(service_type),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        self.overrides.service_type()
    }

    /// Parse one entry of a draft provider list.
    ///
    /// Drafts written by older clients use flat `service_request_id` /
    /// `service_request_status` fields; newer ones carry a structured
    /// [`REQUEST_INFO_KEY`] block, which wins when both are present. The
    /// list the entry came from decides its service type.
    pub fn from_draft_value(service_type: ServiceType, value: &Value) -> Result<Self, CoreError> {
        let obj = value.as_object().ok_or_else(|| {
            CoreError::Validation(format!(
                "Draft {} entry must be an object",
                service_type.as_str()
            ))
        })?;

        let id = obj.get("id").and_then(parse_id).ok_or_else(|| {
            CoreError::Validation(format!(
                "Draft {} entry is missing a numeric id",
                service_type.as_str()
            ))
        })?;

        let provider_kind = obj
            .get("provider_kind")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        let (service_request_id, service_request_status) = match obj.get(REQUEST_INFO_KEY) {
            Some(Value::Object(info)) => (
                info.get("id").and_then(parse_id),
                info.get("status").and_then(parse_request_status),
            ),
            _ => (
                obj.get("service_request_id").and_then(parse_id),
                obj.get("service_request_status").and_then(parse_request_status),
            ),
        };

        let selected_at = obj
            .get("selected_at")
            .and_then(|v| serde_json::from_value::<Timestamp>(v.clone()).ok())
            .unwrap_or_else(chrono::Utc::now);

        Ok(Self {
            id,
            provider_kind,
            service_request_id,
            service_request_status,
            selected_at,
            overrides: ProviderOverrides::from_draft_object(service_type, value),
        })
    }

    /// Serialize for a draft snapshot.
    pub fn to_draft_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "id": self.id }))
    }
}

fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_request_status(value: &Value) -> Option<ServiceRequestStatus> {
    value
        .as_str()
        .and_then(|s| ServiceRequestStatus::parse(s).ok())
}

// ---------------------------------------------------------------------------
// Catalog record
// ---------------------------------------------------------------------------

/// An offering as returned by the catalog search or batch endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: ProviderId,
    pub service_type: ServiceType,
    pub name: String,
    #[serde(default)]
    pub provider_kind: Option<ProviderKind>,
    #[serde(default)]
    pub status: Option<ProviderStatus>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    /// Present when the batch endpoint was asked to include requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_request: Option<ServiceRequest>,
    /// Type-specific attributes (airline, star rating, vehicle type, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// The catalog-owned half of an enriched record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogOffering {
    pub name: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub available: Option<bool>,
    pub amenities: Vec<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub rating: Option<f32>,
    pub details: Map<String, Value>,
}

impl From<&CatalogRecord> for CatalogOffering {
    fn from(record: &CatalogRecord) -> Self {
        Self {
            name: record.name.clone(),
            price: record.price,
            currency: record.currency.clone(),
            available: record.available,
            amenities: record.amenities.clone(),
            location: record.location.clone(),
            contact: record.contact.clone(),
            rating: record.rating,
            details: record.details.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enriched record
// ---------------------------------------------------------------------------

/// A display-ready selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedProviderRecord {
    /// Draft-owned data; the only part that is ever saved.
    pub minimal: MinimalProviderRecord,
    /// Catalog-owned data, absent for placeholders and unmatched ids.
    pub offering: Option<CatalogOffering>,
    pub status: ProviderStatus,
    pub service_request: Option<ServiceRequest>,
    pub error: Option<String>,
    pub loading: bool,
    /// The selection was restored from a draft rather than picked in this
    /// session.
    pub from_draft: bool,
}

impl EnrichedProviderRecord {
    /// Placeholder shown while the enrichment batch is in flight.
    pub fn placeholder(minimal: MinimalProviderRecord) -> Self {
        let service_request = linked_request(&minimal);
        Self {
            minimal,
            offering: None,
            status: ProviderStatus::Loading,
            service_request,
            error: None,
            loading: true,
            from_draft: true,
        }
    }

    /// A selection confirmed from a catalog result in this session.
    pub fn from_catalog(record: &CatalogRecord) -> Self {
        let mut minimal = MinimalProviderRecord::new(
            record.id,
            record.service_type,
            record.provider_kind.unwrap_or_default(),
        );
        if let Some(request) = &record.service_request {
            minimal.service_request_id = Some(request.id);
            minimal.service_request_status = Some(request.status);
        }
        Self {
            minimal,
            offering: Some(CatalogOffering::from(record)),
            status: normalize_status(record.status),
            service_request: record.service_request.clone(),
            error: None,
            loading: false,
            from_draft: false,
        }
    }

    pub fn id(&self) -> ProviderId {
        self.minimal.id
    }

    pub fn service_type(&self) -> ServiceType {
        self.minimal.service_type()
    }

    pub fn display_name(&self) -> String {
        match &self.offering {
            Some(offering) => offering.name.clone(),
            None => format!("{} #{}", self.service_type().as_str(), self.minimal.id),
        }
    }

    /// Project back to the draft-safe form.
    pub fn to_minimal(&self) -> MinimalProviderRecord {
        self.minimal.clone()
    }

    /// Link a service request to this selection.
    pub fn attach_service_request(&mut self, request: ServiceRequest) {
        self.minimal.service_request_id = Some(request.id);
        self.minimal.service_request_status = Some(request.status);
        self.service_request = Some(request);
    }

    /// Drop the service-request linkage; the provider shows as needing
    /// approval again.
    pub fn detach_service_request(&mut self) {
        self.minimal.service_request_id = None;
        self.minimal.service_request_status = None;
        self.service_request = None;
    }
}

/// Catalog status with loading/unknown never leaking from the catalog side.
fn normalize_status(status: Option<ProviderStatus>) -> ProviderStatus {
    match status {
        None | Some(ProviderStatus::Loading) => ProviderStatus::Active,
        Some(other) => other,
    }
}

/// Rebuild the cached request from the draft's linkage fields.
fn linked_request(minimal: &MinimalProviderRecord) -> Option<ServiceRequest> {
    minimal.service_request_id.map(|id| ServiceRequest {
        id,
        provider_id: minimal.id,
        service_type: minimal.service_type(),
        status: minimal
            .service_request_status
            .unwrap_or(ServiceRequestStatus::Pending),
        requested_quantity: None,
        expires_at: None,
        rejection_reason: None,
    })
}

// ---------------------------------------------------------------------------
// Enrichment merge
// ---------------------------------------------------------------------------

/// Merge draft references with the catalog records of one batch.
///
/// Output order follows `references`. For a match, catalog data describes
/// the offering and the draft reference keeps ownership of everything else.
/// The backend's copy of the linked request replaces the reconstructed one
/// only when it is the same request. References the catalog does not know
/// are kept and marked [`ProviderStatus::DeletedOrUnavailable`].
pub fn merge_enrichment(
    references: &[MinimalProviderRecord],
    catalog: &[CatalogRecord],
) -> Vec<EnrichedProviderRecord> {
    let by_id: HashMap<ProviderId, &CatalogRecord> =
        catalog.iter().map(|record| (record.id, record)).collect();

    references
        .iter()
        .map(|reference| match by_id.get(&reference.id) {
            Some(record) => {
                let mut minimal = reference.clone();
                let service_request = match (&record.service_request, linked_request(reference)) {
                    (Some(remote), Some(local)) if remote.id == local.id => {
                        minimal.service_request_status = Some(remote.status);
                        Some(remote.clone())
                    }
                    (_, local) => local,
                };
                EnrichedProviderRecord {
                    minimal,
                    offering: Some(CatalogOffering::from(*record)),
                    status: normalize_status(record.status),
                    service_request,
                    error: None,
                    loading: false,
                    from_draft: true,
                }
            }
            None => EnrichedProviderRecord {
                minimal: reference.clone(),
                offering: None,
                status: ProviderStatus::DeletedOrUnavailable,
                service_request: linked_request(reference),
                error: Some(format!(
                    "{} {} was not found in the catalog; it may have been deleted or is unavailable",
                    reference.service_type().as_str(),
                    reference.id
                )),
                loading: false,
                from_draft: true,
            },
        })
        .collect()
}

/// Best-effort records for a batch whose enrichment call failed outright.
pub fn offline_records(
    references: &[MinimalProviderRecord],
    reason: &str,
) -> Vec<EnrichedProviderRecord> {
    references
        .iter()
        .map(|reference| EnrichedProviderRecord {
            minimal: reference.clone(),
            offering: None,
            status: ProviderStatus::Unknown,
            service_request: linked_request(reference),
            error: Some(format!("Provider details could not be loaded: {reason}")),
            loading: false,
            from_draft: true,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Display priority
// ---------------------------------------------------------------------------

/// The single status badge shown for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "badge", content = "value", rename_all = "snake_case")]
pub enum DisplayBadge {
    ServiceRequest(ServiceRequestStatus),
    ProviderKind(ProviderKind),
    Lifecycle(ProviderStatus),
    FromDraft,
}

impl DisplayBadge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ServiceRequest(status) => status.label(),
            Self::ProviderKind(kind) => kind.label(),
            Self::Lifecycle(status) => status.label(),
            Self::FromDraft => "From draft",
        }
    }
}

/// Badges to render for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BadgeSet {
    pub primary: Option<DisplayBadge>,
    /// Shown alongside `primary`, never instead of it.
    pub loading: bool,
}

/// Resolve competing status signals into one badge.
///
/// Service-request status outranks the provider-kind badge, which outranks
/// the lifecycle badge, which outranks the "from draft" marker.
pub fn display_badges(record: &EnrichedProviderRecord) -> BadgeSet {
    let request_status = record
        .service_request
        .as_ref()
        .map(|r| r.status)
        .or(record.minimal.service_request_status);

    let primary = if let Some(status) = request_status {
        Some(DisplayBadge::ServiceRequest(status))
    } else if record.minimal.provider_kind != ProviderKind::Platform {
        Some(DisplayBadge::ProviderKind(record.minimal.provider_kind))
    } else if !matches!(record.status, ProviderStatus::Active | ProviderStatus::Loading) {
        Some(DisplayBadge::Lifecycle(record.status))
    } else if record.from_draft {
        Some(DisplayBadge::FromDraft)
    } else {
        None
    };

    BadgeSet {
        primary,
        loading: record.loading,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(id: ProviderId, service_type: ServiceType) -> CatalogRecord {
        CatalogRecord {
            id,
            service_type,
            name: format!("Offering {id}"),
            provider_kind: Some(ProviderKind::Platform),
            status: Some(ProviderStatus::Active),
            price: Some(120.0),
            currency: Some("EUR".into()),
            available: Some(true),
            amenities: vec!["wifi".into()],
            location: Some("Lisbon".into()),
            contact: None,
            rating: Some(4.5),
            service_request: None,
            details: Map::new(),
        }
    }

    // -- from_draft_value --

    #[test]
    fn draft_entry_with_flat_request_fields() {
        let value = json!({
            "id": 7,
            "service_request_id": 55,
            "service_request_status": "pending",
            "nights": 3,
        });
        let record = MinimalProviderRecord::from_draft_value(ServiceType::Hotel, &value).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.service_request_id, Some(55));
        assert_eq!(record.service_request_status, Some(ServiceRequestStatus::Pending));
        assert_eq!(
            record.overrides,
            ProviderOverrides::Hotel(HotelOverrides {
                nights: Some(3),
                ..Default::default()
            })
        );
    }

    #[test]
    fn structured_request_block_wins_over_flat_fields() {
        let value = json!({
            "id": "12",
            "service_request_id": 1,
            "service_request_status": "rejected",
            "request_info": { "id": 2, "status": "approved" },
        });
        let record = MinimalProviderRecord::from_draft_value(ServiceType::Flight, &value).unwrap();
        assert_eq!(record.id, 12);
        assert_eq!(record.service_request_id, Some(2));
        assert_eq!(record.service_request_status, Some(ServiceRequestStatus::Approved));
    }

    #[test]
    fn draft_entry_without_id_is_rejected() {
        let value = json!({ "pickup": "Airport" });
        assert!(MinimalProviderRecord::from_draft_value(ServiceType::Transport, &value).is_err());
        assert!(MinimalProviderRecord::from_draft_value(ServiceType::Transport, &json!(5)).is_err());
    }

    #[test]
    fn malformed_overrides_keep_the_selection() {
        let value = json!({ "id": 4, "seats": "many" });
        let record = MinimalProviderRecord::from_draft_value(ServiceType::Flight, &value).unwrap();
        assert_eq!(record.overrides, ProviderOverrides::empty(ServiceType::Flight));
    }

    #[test]
    fn minimal_record_serializes_flat_with_service_type() {
        let mut record = MinimalProviderRecord::new(3, ServiceType::Transport, ProviderKind::Own);
        record.overrides = ProviderOverrides::Transport(TransportOverrides {
            pickup: Some("Hotel lobby".into()),
            ..Default::default()
        });
        let value = record.to_draft_value();
        assert_eq!(value["service_type"], "transport");
        assert_eq!(value["pickup"], "Hotel lobby");
        assert_eq!(value["provider_kind"], "own");
        assert!(value.get("price").is_none());

        let parsed = MinimalProviderRecord::from_draft_value(ServiceType::Transport, &value).unwrap();
        assert_eq!(parsed, record);
    }

    // -- merge_enrichment --

    #[test]
    fn unmatched_reference_is_flagged_and_keeps_request_linkage() {
        let mut reference = MinimalProviderRecord::new(7, ServiceType::Hotel, ProviderKind::Platform);
        reference.service_request_id = Some(55);
        reference.service_request_status = Some(ServiceRequestStatus::Pending);

        let merged = merge_enrichment(&[reference], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, ProviderStatus::DeletedOrUnavailable);
        assert_eq!(merged[0].minimal.service_request_id, Some(55));
        assert!(merged[0].error.is_some());
        assert!(!merged[0].loading);
    }

    #[test]
    fn matched_reference_takes_offering_from_catalog_and_overrides_from_draft() {
        let mut reference = MinimalProviderRecord::new(1, ServiceType::Hotel, ProviderKind::Platform);
        reference.overrides = ProviderOverrides::Hotel(HotelOverrides {
            room_type: Some("suite".into()),
            ..Default::default()
        });
        let mut remote = catalog(1, ServiceType::Hotel);
        remote.details.insert("room_type".into(), json!("standard"));

        let merged = merge_enrichment(&[reference.clone()], &[remote]);
        let record = &merged[0];
        assert_eq!(record.status, ProviderStatus::Active);
        assert_eq!(record.offering.as_ref().unwrap().price, Some(120.0));
        assert_eq!(record.to_minimal(), reference);
        assert!(record.error.is_none());
    }

    #[test]
    fn backend_request_copy_used_only_for_the_same_request() {
        let mut reference = MinimalProviderRecord::new(2, ServiceType::Flight, ProviderKind::External);
        reference.service_request_id = Some(10);
        reference.service_request_status = Some(ServiceRequestStatus::Pending);

        let mut same = catalog(2, ServiceType::Flight);
        same.service_request = Some(ServiceRequest {
            id: 10,
            provider_id: 2,
            service_type: ServiceType::Flight,
            status: ServiceRequestStatus::Approved,
            requested_quantity: Some(4),
            expires_at: None,
            rejection_reason: None,
        });
        let merged = merge_enrichment(&[reference.clone()], &[same.clone()]);
        assert_eq!(merged[0].minimal.service_request_status, Some(ServiceRequestStatus::Approved));

        let mut other = same;
        if let Some(request) = other.service_request.as_mut() {
            request.id = 99;
        }
        let merged = merge_enrichment(&[reference], &[other]);
        assert_eq!(merged[0].service_request.as_ref().map(|r| r.id), Some(10));
        assert_eq!(merged[0].minimal.service_request_status, Some(ServiceRequestStatus::Pending));
    }

    #[test]
    fn offline_records_are_unknown_with_error() {
        let reference = MinimalProviderRecord::new(5, ServiceType::Transport, ProviderKind::Platform);
        let records = offline_records(&[reference], "connection refused");
        assert_eq!(records[0].status, ProviderStatus::Unknown);
        assert!(records[0].error.as_deref().unwrap().contains("connection refused"));
    }

    // -- display_badges --

    #[test]
    fn request_status_outranks_everything() {
        let mut record = EnrichedProviderRecord::from_catalog(&catalog(1, ServiceType::Hotel));
        record.minimal.provider_kind = ProviderKind::External;
        record.status = ProviderStatus::Suspended;
        record.from_draft = true;
        record.attach_service_request(ServiceRequest {
            id: 3,
            provider_id: 1,
            service_type: ServiceType::Hotel,
            status: ServiceRequestStatus::Approved,
            requested_quantity: None,
            expires_at: None,
            rejection_reason: None,
        });
        assert_eq!(
            display_badges(&record).primary,
            Some(DisplayBadge::ServiceRequest(ServiceRequestStatus::Approved))
        );

        record.detach_service_request();
        assert_eq!(
            display_badges(&record).primary,
            Some(DisplayBadge::ProviderKind(ProviderKind::External))
        );
    }

    #[test]
    fn lifecycle_outranks_from_draft_and_loading_is_additive() {
        let reference = MinimalProviderRecord::new(8, ServiceType::Hotel, ProviderKind::Platform);
        let placeholder = EnrichedProviderRecord::placeholder(reference.clone());
        let badges = display_badges(&placeholder);
        assert_eq!(badges.primary, Some(DisplayBadge::FromDraft));
        assert!(badges.loading);

        let missing = merge_enrichment(&[reference], &[]);
        assert_eq!(
            display_badges(&missing[0]).primary,
            Some(DisplayBadge::Lifecycle(ProviderStatus::DeletedOrUnavailable))
        );
    }

    #[test]
    fn unknown_catalog_status_deserializes_as_unknown() {
        let status: ProviderStatus = serde_json::from_value(json!("archived")).unwrap();
        assert_eq!(status, ProviderStatus::Unknown);
    }
}
