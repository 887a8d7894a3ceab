//! Provider catalog search port and HTTP client.
//!
//! One endpoint per service type, each with its own filter fields. Searches
//! issued by the session are always restricted to platform offerings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfare_core::provider::{CatalogRecord, ServiceType};

use crate::error::ApiError;
use crate::http::{ApiClient, DataResponse};

/// Type-specific search filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service_type", rename_all = "snake_case")]
pub enum CatalogFilters {
    Hotel {
        location: Option<String>,
        check_in: Option<String>,
        check_out: Option<String>,
        guests: Option<u32>,
    },
    Flight {
        origin: Option<String>,
        destination: Option<String>,
        departure_date: Option<String>,
        passengers: Option<u32>,
    },
    Transport {
        origin: Option<String>,
        destination: Option<String>,
        date: Option<String>,
        vehicle_type: Option<String>,
    },
}

impl CatalogFilters {
    /// Filters with every field unset.
    pub fn none(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Hotel => Self::Hotel {
                location: None,
                check_in: None,
                check_out: None,
                guests: None,
            },
            ServiceType::Flight => Self::Flight {
                origin: None,
                destination: None,
                departure_date: None,
                passengers: None,
            },
            ServiceType::Transport => Self::Transport {
                origin: None,
                destination: None,
                date: None,
                vehicle_type: None,
            },
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::Hotel { .. } => ServiceType::Hotel,
            Self::Flight { .. } => ServiceType::Flight,
            Self::Transport { .. } => ServiceType::Transport,
        }
    }

    /// Set fields as query pairs.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                pairs.push((key, value));
            }
        };
        match self {
            Self::Hotel {
                location,
                check_in,
                check_out,
                guests,
            } => {
                push("location", location.clone());
                push("check_in", check_in.clone());
                push("check_out", check_out.clone());
                push("guests", guests.map(|g| g.to_string()));
            }
            Self::Flight {
                origin,
                destination,
                departure_date,
                passengers,
            } => {
                push("origin", origin.clone());
                push("destination", destination.clone());
                push("departure_date", departure_date.clone());
                push("passengers", passengers.map(|p| p.to_string()));
            }
            Self::Transport {
                origin,
                destination,
                date,
                vehicle_type,
            } => {
                push("origin", origin.clone());
                push("destination", destination.clone());
                push("date", date.clone());
                push("vehicle_type", vehicle_type.clone());
            }
        }
        pairs
    }
}

#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(
        &self,
        filters: &CatalogFilters,
        limit: usize,
    ) -> Result<Vec<CatalogRecord>, ApiError>;
}

/// `GET {base}/catalog/{hotels|flights|transport}/search`.
pub struct HttpCatalogSearch {
    api: ApiClient,
}

impl HttpCatalogSearch {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CatalogSearch for HttpCatalogSearch {
    async fn search(
        &self,
        filters: &CatalogFilters,
        limit: usize,
    ) -> Result<Vec<CatalogRecord>, ApiError> {
        let service_type = filters.service_type();
        let mut query = filters.to_query();
        query.push(("source", "platform".to_string()));
        query.push(("limit", limit.to_string()));

        let response: DataResponse<Vec<CatalogRecord>> = self
            .api
            .get_json(&format!("catalog/{}/search", service_type.plural()), &query)
            .await?;

        tracing::debug!(
            service_type = service_type.as_str(),
            count = response.data.len(),
            "Catalog search completed",
        );
        Ok(response.data)
    }
}
