//! Draft snapshot wire shape.
//!
//! A snapshot is a flat key/value map of form fields plus a few nested
//! arrays: itinerary activities, one provider list per service type and the
//! add-on line items. An empty provider list is always written together
//! with an explicit `<type>_empty` marker so that loading it overwrites a
//! previously non-empty selection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::provider::{MinimalProviderRecord, ServiceType};

/// One itinerary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub day: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// A priced extra on the package (step 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AddOnLineItem {
    #[validate(length(min = 1, message = "Add-on name is required"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "Add-on price cannot be negative"))]
    pub price: f64,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "Add-on quantity must be at least 1"))]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// What a draft declares about one service type's selections.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftProviders {
    /// The draft says nothing; keep whatever is held.
    Absent,
    /// The draft explicitly declares no selections.
    Empty,
    /// Raw entries, parsed at the enrichment boundary.
    Listed(Vec<Value>),
}

/// Full session snapshot as exchanged with the draft store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    /// Base form, pricing and confirmation fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_hotels: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_flights: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_transport: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hotels_empty: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flights_empty: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub transport_empty: bool,
    #[serde(default)]
    pub add_ons: Vec<AddOnLineItem>,
}

impl DraftSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_slot(&mut self, service_type: ServiceType) -> (&mut Option<Vec<Value>>, &mut bool) {
        match service_type {
            ServiceType::Hotel => (&mut self.selected_hotels, &mut self.hotels_empty),
            ServiceType::Flight => (&mut self.selected_flights, &mut self.flights_empty),
            ServiceType::Transport => (&mut self.selected_transport, &mut self.transport_empty),
        }
    }

    /// Write one service type's selections, with the empty marker when
    /// there are none.
    pub fn set_providers(&mut self, service_type: ServiceType, records: &[MinimalProviderRecord]) {
        let (list, empty) = self.list_slot(service_type);
        *list = Some(records.iter().map(MinimalProviderRecord::to_draft_value).collect());
        *empty = records.is_empty();
    }

    /// Read what the draft declares for one service type.
    ///
    /// The empty marker wins over a stale non-empty list.
    pub fn providers(&self, service_type: ServiceType) -> DraftProviders {
        let (list, empty) = match service_type {
            ServiceType::Hotel => (&self.selected_hotels, self.hotels_empty),
            ServiceType::Flight => (&self.selected_flights, self.flights_empty),
            ServiceType::Transport => (&self.selected_transport, self.transport_empty),
        };
        if empty {
            return DraftProviders::Empty;
        }
        match list {
            None => DraftProviders::Absent,
            Some(entries) if entries.is_empty() => DraftProviders::Empty,
            Some(entries) => DraftProviders::Listed(entries.clone()),
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Replace a group of keys: every key in `keys` is removed first, then
    /// the supplied values are inserted. Keys absent from `values` stay
    /// removed.
    pub fn replace_fields<'a>(
        &mut self,
        keys: &[&str],
        values: impl IntoIterator<Item = (&'a str, Value)>,
    ) {
        for key in keys {
            self.fields.remove(*key);
        }
        for (key, value) in values {
            self.fields.insert(key.to_string(), value);
        }
    }

    /// Step counters stored alongside the fields.
    pub fn step_counters(&self) -> (Option<i64>, Option<i64>) {
        (
            self.fields.get(FIELD_CURRENT_STEP).and_then(Value::as_i64),
            self.fields.get(FIELD_MAX_COMPLETED_STEP).and_then(Value::as_i64),
        )
    }
}

/// Snapshot key of the step the user was on.
pub const FIELD_CURRENT_STEP: &str = "current_step";

/// Snapshot key of the furthest validated step.
pub const FIELD_MAX_COMPLETED_STEP: &str = "max_completed_step";
