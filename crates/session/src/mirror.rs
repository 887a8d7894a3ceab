//! Selection observers.
//!
//! Older pages read provider selections from a flat per-type store rather
//! than from the selection manager. [`LegacySelectionMirror`] keeps that
//! store in sync; it is only ever written through [`SelectionObserver`]
//! callbacks, which the manager issues after each mutation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use wayfare_core::provider::{EnrichedProviderRecord, ProviderStatus, ServiceType};
use wayfare_core::service_request::ServiceRequestStatus;
use wayfare_core::types::ProviderId;

/// Receives the full selection list of a service type after it changes.
#[async_trait]
pub trait SelectionObserver: Send + Sync {
    async fn selections_changed(&self, service_type: ServiceType, records: &[EnrichedProviderRecord]);
}

/// One entry of the legacy store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyEntry {
    pub id: ProviderId,
    pub name: String,
    pub status: ProviderStatus,
    pub service_request_status: Option<ServiceRequestStatus>,
}

impl From<&EnrichedProviderRecord> for LegacyEntry {
    fn from(record: &EnrichedProviderRecord) -> Self {
        Self {
            id: record.id(),
            name: record.display_name(),
            status: record.status,
            service_request_status: record
                .service_request
                .as_ref()
                .map(|r| r.status)
                .or(record.minimal.service_request_status),
        }
    }
}

/// Read-only mirror of the current selections, per service type.
#[derive(Default)]
pub struct LegacySelectionMirror {
    entries: RwLock<HashMap<ServiceType, Vec<LegacyEntry>>>,
}

impl LegacySelectionMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self, service_type: ServiceType) -> Vec<LegacyEntry> {
        self.entries
            .read()
            .await
            .get(&service_type)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn ids(&self, service_type: ServiceType) -> Vec<ProviderId> {
        self.entries(service_type)
            .await
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }
}

#[async_trait]
impl SelectionObserver for LegacySelectionMirror {
    async fn selections_changed(&self, service_type: ServiceType, records: &[EnrichedProviderRecord]) {
        let mirrored: Vec<LegacyEntry> = records.iter().map(LegacyEntry::from).collect();
        tracing::trace!(
            service_type = service_type.as_str(),
            count = mirrored.len(),
            "Legacy selection mirror updated",
        );
        self.entries.write().await.insert(service_type, mirrored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfare_core::provider::{MinimalProviderRecord, ProviderKind};

    #[tokio::test]
    async fn mirror_replaces_the_whole_list() {
        let mirror = LegacySelectionMirror::new();
        let first = EnrichedProviderRecord::placeholder(MinimalProviderRecord::new(
            1,
            ServiceType::Flight,
            ProviderKind::Platform,
        ));
        let second = EnrichedProviderRecord::placeholder(MinimalProviderRecord::new(
            2,
            ServiceType::Flight,
            ProviderKind::Platform,
        ));

        mirror
            .selections_changed(ServiceType::Flight, &[first, second.clone()])
            .await;
        assert_eq!(mirror.ids(ServiceType::Flight).await, vec![1, 2]);

        mirror.selections_changed(ServiceType::Flight, &[second]).await;
        assert_eq!(mirror.ids(ServiceType::Flight).await, vec![2]);
        assert!(mirror.entries(ServiceType::Hotel).await.is_empty());
    }
}
