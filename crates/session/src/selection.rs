//! Provider selection manager.
//!
//! [`ProviderSelectionManager`] owns the canonical provider selections of a
//! session, the temporary set of ids picked while browsing the catalog, and
//! the service-request linkage of every selected provider. It is shared as
//! an `Arc` between the controller and the host; all state sits behind
//! `tokio::sync` locks that are never held across a network call.
//!
//! Every mutation that changes what would be saved bumps a revision counter
//! published on a `watch` channel. The controller compares it with the
//! revision it captured at its last save to decide whether the session is
//! dirty.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, RwLock};
use wayfare_clients::{
    CatalogFilters, CatalogSearch, EnrichmentSource, NewServiceRequest, QuantityResolver,
    ServiceRequestApi, WizardConfig,
};
use wayfare_core::provider::{
    merge_enrichment, offline_records, CatalogRecord, EnrichedProviderRecord,
    MinimalProviderRecord, ProviderKind, ProviderStatus, ServiceType,
};
use wayfare_core::service_request::{
    validate_cancel_reason, validate_expires_in_hours, validate_transition, ServiceRequest,
    ServiceRequestStatus,
};
use wayfare_core::snapshot::{DraftProviders, DraftSnapshot};
use wayfare_core::types::{ProviderId, ServiceRequestId};
use wayfare_core::validation::ProviderCheck;
use wayfare_events::{Notice, SessionEvent, SessionEventBus};

use crate::error::SelectionError;
use crate::mirror::SelectionObserver;

// ---------------------------------------------------------------------------
// Collaborators and results
// ---------------------------------------------------------------------------

/// External services the selection manager talks to.
#[derive(Clone)]
pub struct SelectionPorts {
    pub catalog: Arc<dyn CatalogSearch>,
    pub enrichment: Arc<dyn EnrichmentSource>,
    pub service_requests: Arc<dyn ServiceRequestApi>,
    pub quantity: Arc<dyn QuantityResolver>,
}

/// Result of a catalog browse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseOutcome {
    /// Results were stored and are available through `page`.
    Loaded { total: usize },
    /// A newer browse started while this one was in flight; its response
    /// was discarded.
    Superseded,
}

/// What a `confirm_selections` call did with each temp id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmOutcome {
    /// Distinct ids that were considered.
    pub requested: usize,
    pub added: Vec<ProviderId>,
    /// Already selected; skipped and left in the temp set.
    pub duplicates: Vec<ProviderId>,
    /// Not found in the last catalog result; also left in the temp set.
    pub unresolved: Vec<ProviderId>,
}

impl ConfirmOutcome {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }
}

/// Optional inputs of a new service request.
#[derive(Debug, Clone, Default)]
pub struct ServiceRequestOptions {
    /// Units to request. Resolved by the [`QuantityResolver`] when unset.
    pub quantity: Option<u32>,
    pub special_requirements: Option<String>,
    /// Defaults to the configured expiry window.
    pub expires_in_hours: Option<u32>,
    pub package_draft_id: Option<String>,
}

/// How a refreshed service request was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Updated {
        from: ServiceRequestStatus,
        to: ServiceRequestStatus,
    },
    Unchanged(ServiceRequestStatus),
    /// The backend reported a status that cannot follow the cached one.
    Ignored {
        cached: ServiceRequestStatus,
        remote: ServiceRequestStatus,
    },
    /// No selected provider references the request.
    Untracked(ServiceRequest),
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SelectionState {
    records: HashMap<ServiceType, Vec<EnrichedProviderRecord>>,
    /// Ids picked while browsing, in pick order. May contain repeats.
    temp: Vec<ProviderId>,
    browsing: Option<ServiceType>,
    results: Vec<CatalogRecord>,
}

impl SelectionState {
    fn list(&self, service_type: ServiceType) -> &[EnrichedProviderRecord] {
        self.records
            .get(&service_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Store a browse result unless a newer browse owns the result slot.
    fn store_results(
        &mut self,
        service_type: ServiceType,
        results: Vec<CatalogRecord>,
        generation: u64,
        latest: u64,
    ) -> BrowseOutcome {
        if generation != latest || self.browsing != Some(service_type) {
            return BrowseOutcome::Superseded;
        }
        let total = results.len();
        self.results = results;
        BrowseOutcome::Loaded { total }
    }

    fn find_by_request_mut(
        &mut self,
        request_id: ServiceRequestId,
    ) -> Option<&mut EnrichedProviderRecord> {
        self.records
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|record| record.minimal.service_request_id == Some(request_id))
    }
}

/// Clears a processing flag when dropped.
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool, operation: &'static str) -> Result<Self, SelectionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SelectionError::Processing(operation))?;
        Ok(Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn request_status(record: &EnrichedProviderRecord) -> Option<ServiceRequestStatus> {
    record
        .service_request
        .as_ref()
        .map(|r| r.status)
        .or(record.minimal.service_request_status)
}

// ---------------------------------------------------------------------------
// ProviderSelectionManager
// ---------------------------------------------------------------------------

pub struct ProviderSelectionManager {
    ports: SelectionPorts,
    events: Arc<SessionEventBus>,
    page_size: usize,
    search_limit: usize,
    default_expiry_hours: u32,
    state: RwLock<SelectionState>,
    observers: RwLock<Vec<Arc<dyn SelectionObserver>>>,
    revision: watch::Sender<u64>,
    query_generation: AtomicU64,
    confirming: AtomicBool,
    creating_request: AtomicBool,
}

impl ProviderSelectionManager {
    pub fn new(ports: SelectionPorts, events: Arc<SessionEventBus>, config: &WizardConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            ports,
            events,
            page_size: config.catalog_page_size.max(1),
            search_limit: config.catalog_search_limit,
            default_expiry_hours: config.service_request_expiry_hours,
            state: RwLock::new(SelectionState::default()),
            observers: RwLock::new(Vec::new()),
            revision,
            query_generation: AtomicU64::new(0),
            confirming: AtomicBool::new(false),
            creating_request: AtomicBool::new(false),
        }
    }

    // ---- revision / observers ----

    /// Current selection revision.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Watch the selection revision; it changes whenever saved data changes.
    pub fn subscribe_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Register an observer. It immediately receives the current lists.
    pub async fn subscribe_observer(&self, observer: Arc<dyn SelectionObserver>) {
        let lists: Vec<(ServiceType, Vec<EnrichedProviderRecord>)> = {
            let state = self.state.read().await;
            ServiceType::ALL
                .iter()
                .map(|t| (*t, state.list(*t).to_vec()))
                .collect()
        };
        for (service_type, records) in &lists {
            observer.selections_changed(*service_type, records).await;
        }
        self.observers.write().await.push(observer);
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    async fn notify_observers(&self, service_type: ServiceType) {
        let records = self.records(service_type).await;
        let observers = self.observers.read().await.clone();
        for observer in observers {
            observer.selections_changed(service_type, &records).await;
        }
        self.events.publish(SessionEvent::SelectionsChanged);
    }

    // ---- catalog browsing ----

    /// Fetch the catalog for one service type and keep the whole result for
    /// client-side paging.
    ///
    /// Switching to another service type clears the temp selections. Only
    /// platform offerings are kept.
    pub async fn browse(&self, filters: CatalogFilters) -> Result<BrowseOutcome, SelectionError> {
        let service_type = filters.service_type();
        let generation = self.query_generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut state = self.state.write().await;
            if state.browsing != Some(service_type) {
                state.temp.clear();
                state.results.clear();
                state.browsing = Some(service_type);
            }
        }

        let result = self.ports.catalog.search(&filters, self.search_limit).await;

        if self.query_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Discarding stale catalog response");
            return Ok(BrowseOutcome::Superseded);
        }

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    service_type = service_type.as_str(),
                    error = %e,
                    "Catalog search failed",
                );
                self.events.notify(Notice::retryable(format!(
                    "Could not search {}; please try again",
                    service_type.plural()
                )));
                return Err(e.into());
            }
        };

        let results: Vec<CatalogRecord> = records
            .into_iter()
            .filter(|r| r.service_type == service_type)
            .filter(|r| matches!(r.provider_kind, None | Some(ProviderKind::Platform)))
            .collect();
        let total = results.len();

        let mut state = self.state.write().await;
        // A newer browse may have started while we waited for the lock.
        let latest = self.query_generation.load(Ordering::SeqCst);
        let outcome = state.store_results(service_type, results, generation, latest);
        match outcome {
            BrowseOutcome::Loaded { .. } => {
                tracing::debug!(service_type = service_type.as_str(), total, "Catalog results stored")
            }
            BrowseOutcome::Superseded => {
                tracing::debug!(generation, latest, "Discarding stale catalog response")
            }
        }
        Ok(outcome)
    }

    /// One page (1-based) of the last catalog result. Out-of-range pages
    /// are empty.
    pub async fn page(&self, n: usize) -> Vec<CatalogRecord> {
        if n == 0 {
            return Vec::new();
        }
        let state = self.state.read().await;
        state
            .results
            .iter()
            .skip((n - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect()
    }

    pub async fn page_count(&self) -> usize {
        self.state.read().await.results.len().div_ceil(self.page_size)
    }

    pub async fn catalog_results(&self) -> Vec<CatalogRecord> {
        self.state.read().await.results.clone()
    }

    pub async fn browsing(&self) -> Option<ServiceType> {
        self.state.read().await.browsing
    }

    // ---- temp selections ----

    /// Flip membership of `id` in the temp set. Returns the new membership.
    pub async fn toggle_temp_selection(&self, id: ProviderId) -> bool {
        let mut state = self.state.write().await;
        if state.temp.contains(&id) {
            state.temp.retain(|t| *t != id);
            false
        } else {
            state.temp.push(id);
            true
        }
    }

    /// Add ids to the temp set without toggling. Repeats are tolerated and
    /// collapsed when confirming.
    pub async fn add_temp_selections(&self, ids: &[ProviderId]) {
        self.state.write().await.temp.extend_from_slice(ids);
    }

    pub async fn temp_selections(&self) -> Vec<ProviderId> {
        self.state.read().await.temp.clone()
    }

    pub async fn clear_temp_selections(&self) {
        self.state.write().await.temp.clear();
    }

    /// Turn the temp selections into real selections.
    ///
    /// Only one confirm runs at a time; a concurrent call fails with
    /// [`SelectionError::Processing`].
    pub async fn confirm_selections(&self) -> Result<ConfirmOutcome, SelectionError> {
        let _guard = ProcessingGuard::acquire(&self.confirming, "selection confirm")?;

        let (ids, candidates) = {
            let state = self.state.read().await;
            let mut seen = HashSet::new();
            let ids: Vec<ProviderId> = state
                .temp
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect();
            let candidates: Vec<CatalogRecord> = state
                .results
                .iter()
                .filter(|r| seen.contains(&r.id))
                .cloned()
                .collect();
            (ids, candidates)
        };

        let mut outcome = ConfirmOutcome {
            requested: ids.len(),
            ..ConfirmOutcome::default()
        };

        for id in ids {
            let Some(record) = candidates.iter().find(|r| r.id == id) else {
                tracing::warn!(provider_id = id, "Temp selection not in catalog results");
                outcome.unresolved.push(id);
                continue;
            };
            let mut normalized = record.clone();
            normalized.provider_kind = Some(ProviderKind::Platform);
            normalized.status = Some(normalized.status.unwrap_or(ProviderStatus::Active));

            match self.insert(EnrichedProviderRecord::from_catalog(&normalized)).await {
                Ok(()) => outcome.added.push(id),
                Err(SelectionError::Duplicate { .. }) => outcome.duplicates.push(id),
                Err(e) => return Err(e),
            }
        }

        {
            let mut state = self.state.write().await;
            state.temp.retain(|id| !outcome.added.contains(id));
        }

        if !outcome.added.is_empty() {
            self.events.notify(Notice::info(format!(
                "Added {} of {} selected providers",
                outcome.added.len(),
                outcome.requested
            )));
        }
        if !outcome.unresolved.is_empty() {
            self.events.notify(Notice::warning(format!(
                "{} selected providers are no longer in the results",
                outcome.unresolved.len()
            )));
        }

        tracing::info!(
            requested = outcome.requested,
            added = outcome.added.len(),
            duplicates = outcome.duplicates.len(),
            unresolved = outcome.unresolved.len(),
            "Temp selections confirmed",
        );
        Ok(outcome)
    }

    // ---- canonical selections ----

    /// Add a selection. Fails with [`SelectionError::Duplicate`] when the
    /// id is already selected for its service type.
    pub async fn add_provider(&self, record: EnrichedProviderRecord) -> Result<(), SelectionError> {
        let name = record.display_name();
        let result = self.insert(record).await;
        if let Err(SelectionError::Duplicate { .. }) = &result {
            self.events
                .notify(Notice::warning(format!("{name} is already selected")));
        }
        result
    }

    async fn insert(&self, record: EnrichedProviderRecord) -> Result<(), SelectionError> {
        let service_type = record.service_type();
        let id = record.id();
        {
            let mut state = self.state.write().await;
            let list = state.records.entry(service_type).or_default();
            if list.iter().any(|r| r.id() == id) {
                return Err(SelectionError::Duplicate { id, service_type });
            }
            list.push(record);
        }
        tracing::debug!(provider_id = id, service_type = service_type.as_str(), "Provider added");
        self.bump_revision();
        self.notify_observers(service_type).await;
        Ok(())
    }

    /// Remove a selection. Returns whether anything was removed.
    pub async fn remove_provider(&self, id: ProviderId, service_type: ServiceType) -> bool {
        let removed = {
            let mut state = self.state.write().await;
            let list = state.records.entry(service_type).or_default();
            let before = list.len();
            list.retain(|r| r.id() != id);
            list.len() != before
        };
        if removed {
            tracing::debug!(provider_id = id, service_type = service_type.as_str(), "Provider removed");
            self.bump_revision();
            self.notify_observers(service_type).await;
        }
        removed
    }

    pub async fn records(&self, service_type: ServiceType) -> Vec<EnrichedProviderRecord> {
        self.state.read().await.list(service_type).to_vec()
    }

    /// Draft-safe projection of every selection, keyed by service type.
    /// Every type is present, possibly with an empty list.
    pub async fn minimal_records_for_save(&self) -> HashMap<ServiceType, Vec<MinimalProviderRecord>> {
        let state = self.state.read().await;
        ServiceType::ALL
            .iter()
            .map(|t| {
                (
                    *t,
                    state
                        .list(*t)
                        .iter()
                        .map(EnrichedProviderRecord::to_minimal)
                        .collect(),
                )
            })
            .collect()
    }

    /// Step-3 view of every selection.
    pub async fn provider_checks(&self) -> Vec<ProviderCheck> {
        let state = self.state.read().await;
        ServiceType::ALL
            .iter()
            .flat_map(|t| state.list(*t).iter())
            .map(|record| ProviderCheck {
                id: record.id(),
                service_type: record.service_type(),
                name: record.display_name(),
                status: record.status,
                service_request_status: request_status(record),
            })
            .collect()
    }

    // ---- draft hydration / enrichment ----

    /// Restore selections from a draft.
    ///
    /// Per service type: a listed type gets loading placeholders at once and
    /// is then enriched in one batch; an explicitly empty type is cleared
    /// without a network call; an absent type is left untouched. Hydration
    /// does not change the revision.
    pub async fn load_from_draft(&self, draft: &DraftSnapshot) {
        for service_type in ServiceType::ALL {
            match draft.providers(service_type) {
                DraftProviders::Absent => {}
                DraftProviders::Empty => {
                    self.state
                        .write()
                        .await
                        .records
                        .insert(service_type, Vec::new());
                    self.notify_observers(service_type).await;
                }
                DraftProviders::Listed(entries) => {
                    self.hydrate(service_type, &entries).await;
                }
            }
        }
    }

    async fn hydrate(&self, service_type: ServiceType, entries: &[serde_json::Value]) {
        let mut references: Vec<MinimalProviderRecord> = Vec::with_capacity(entries.len());
        let mut skipped = 0usize;
        for entry in entries {
            match MinimalProviderRecord::from_draft_value(service_type, entry) {
                Ok(reference) if references.iter().any(|r| r.id == reference.id) => {
                    tracing::warn!(provider_id = reference.id, "Duplicate draft selection skipped");
                }
                Ok(reference) => references.push(reference),
                Err(e) => {
                    tracing::warn!(service_type = service_type.as_str(), error = %e, "Unreadable draft selection skipped");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            self.events.notify(Notice::warning(format!(
                "{skipped} saved {} could not be read and were skipped",
                service_type.plural()
            )));
        }

        let placeholders: Vec<EnrichedProviderRecord> = references
            .iter()
            .cloned()
            .map(EnrichedProviderRecord::placeholder)
            .collect();
        self.state
            .write()
            .await
            .records
            .insert(service_type, placeholders);
        self.notify_observers(service_type).await;

        if references.is_empty() {
            return;
        }

        let ids: Vec<ProviderId> = references.iter().map(|r| r.id).collect();
        let enriched = match self
            .ports
            .enrichment
            .batch_fetch(&ids, service_type, true)
            .await
        {
            Ok(catalog) => merge_enrichment(&references, &catalog),
            Err(e) => {
                tracing::warn!(
                    service_type = service_type.as_str(),
                    count = ids.len(),
                    error = %e,
                    "Enrichment batch failed",
                );
                self.events.notify(Notice::retryable(format!(
                    "Details for saved {} could not be loaded",
                    service_type.plural()
                )));
                offline_records(&references, &e.to_string())
            }
        };

        {
            let mut state = self.state.write().await;
            let list = state.records.entry(service_type).or_default();
            // Replace only placeholders still present; the user may have
            // removed some while the batch was in flight.
            for record in enriched {
                if let Some(slot) = list
                    .iter_mut()
                    .find(|held| held.id() == record.id() && held.loading)
                {
                    *slot = record;
                }
            }
        }
        tracing::debug!(service_type = service_type.as_str(), count = ids.len(), "Draft selections enriched");
        self.notify_observers(service_type).await;
    }

    /// Fresh detail for one provider, merged the same way as draft
    /// enrichment. Works for providers that are not selected.
    pub async fn enriched_detail(
        &self,
        id: ProviderId,
        service_type: ServiceType,
    ) -> Result<EnrichedProviderRecord, SelectionError> {
        let reference = {
            let state = self.state.read().await;
            state
                .list(service_type)
                .iter()
                .find(|r| r.id() == id)
                .map(EnrichedProviderRecord::to_minimal)
        };
        let selected = reference.is_some();
        let reference = reference
            .unwrap_or_else(|| MinimalProviderRecord::new(id, service_type, ProviderKind::Platform));

        let catalog = self
            .ports
            .enrichment
            .batch_fetch(&[id], service_type, true)
            .await?;

        let mut merged = merge_enrichment(std::slice::from_ref(&reference), &catalog);
        let mut record = merged
            .pop()
            .unwrap_or_else(|| EnrichedProviderRecord::placeholder(reference));
        record.from_draft = selected && record.from_draft;
        Ok(record)
    }

    // ---- service requests ----

    /// Ask the provider to approve its part of the package.
    ///
    /// Refused when the provider is not selected, when it already holds a
    /// pending or approved request, and while another creation is running.
    pub async fn create_service_request(
        &self,
        provider_id: ProviderId,
        service_type: ServiceType,
        options: ServiceRequestOptions,
    ) -> Result<ServiceRequest, SelectionError> {
        let _guard = ProcessingGuard::acquire(&self.creating_request, "service request")?;

        let minimal = {
            let state = self.state.read().await;
            let record = state
                .list(service_type)
                .iter()
                .find(|r| r.id() == provider_id)
                .ok_or(SelectionError::NotSelected {
                    id: provider_id,
                    service_type,
                })?;
            if let (Some(status), Some(request_id)) =
                (request_status(record), record.minimal.service_request_id)
            {
                if status.is_live() {
                    return Err(SelectionError::ActiveRequest {
                        provider_id,
                        request_id,
                        status,
                    });
                }
            }
            record.to_minimal()
        };

        let expires_in_hours = options.expires_in_hours.unwrap_or(self.default_expiry_hours);
        validate_expires_in_hours(expires_in_hours)?;

        let payload = NewServiceRequest {
            provider_id,
            service_type,
            package_draft_id: options.package_draft_id,
            requested_quantity: options
                .quantity
                .or_else(|| self.ports.quantity.resolve(&minimal)),
            special_requirements: options.special_requirements,
            expires_in_hours,
            client_reference: uuid::Uuid::new_v4().to_string(),
        };

        let request = match self.ports.service_requests.create(&payload).await {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(provider_id, error = %e, "Service request creation failed");
                self.events
                    .notify(Notice::retryable("Could not send the approval request"));
                return Err(e.into());
            }
        };

        let attached = {
            let mut state = self.state.write().await;
            match state
                .records
                .get_mut(&service_type)
                .and_then(|list| list.iter_mut().find(|r| r.id() == provider_id))
            {
                Some(record) => {
                    record.attach_service_request(request.clone());
                    true
                }
                None => false,
            }
        };
        if attached {
            self.bump_revision();
            self.notify_observers(service_type).await;
        } else {
            tracing::warn!(
                provider_id,
                service_request_id = request.id,
                "Provider was removed while its service request was being created",
            );
        }
        Ok(request)
    }

    /// Cancel a request and unlink it from its provider.
    pub async fn cancel_service_request(
        &self,
        request_id: ServiceRequestId,
        reason: &str,
    ) -> Result<(), SelectionError> {
        validate_cancel_reason(reason)?;

        if let Err(e) = self.ports.service_requests.cancel(request_id, reason).await {
            tracing::warn!(service_request_id = request_id, error = %e, "Service request cancel failed");
            self.events
                .notify(Notice::retryable("Could not cancel the approval request"));
            return Err(e.into());
        }

        let service_type = {
            let mut state = self.state.write().await;
            state.find_by_request_mut(request_id).map(|record| {
                record.detach_service_request();
                record.service_type()
            })
        };
        if let Some(service_type) = service_type {
            self.bump_revision();
            self.notify_observers(service_type).await;
        }
        Ok(())
    }

    /// Re-read a request from the backend and apply its status if it is a
    /// legal transition from the cached one.
    pub async fn refresh_service_request(
        &self,
        request_id: ServiceRequestId,
    ) -> Result<RefreshOutcome, SelectionError> {
        let remote = self.ports.service_requests.get(request_id).await?;

        let (outcome, service_type) = {
            let mut state = self.state.write().await;
            let Some(record) = state.find_by_request_mut(request_id) else {
                return Ok(RefreshOutcome::Untracked(remote));
            };
            let cached = request_status(record).unwrap_or(ServiceRequestStatus::Pending);
            if cached == remote.status {
                record.attach_service_request(remote);
                return Ok(RefreshOutcome::Unchanged(cached));
            }
            match validate_transition(cached, remote.status) {
                Ok(()) => {
                    let to = remote.status;
                    record.attach_service_request(remote);
                    (RefreshOutcome::Updated { from: cached, to }, record.service_type())
                }
                Err(e) => {
                    tracing::warn!(
                        service_request_id = request_id,
                        error = %e,
                        "Ignoring illegal service request status change",
                    );
                    return Ok(RefreshOutcome::Ignored {
                        cached,
                        remote: remote.status,
                    });
                }
            }
        };

        if let RefreshOutcome::Updated { from, to } = &outcome {
            tracing::info!(
                service_request_id = request_id,
                from = from.as_str(),
                to = to.as_str(),
                "Service request status changed",
            );
        }
        self.bump_revision();
        self.notify_observers(service_type).await;
        Ok(outcome)
    }
}
