//! In-memory collaborators and a session harness shared by the integration
//! tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map};
use tokio::sync::{broadcast, Notify};
use wayfare_clients::{
    ApiError, CatalogFilters, CatalogSearch, DeferToBackend, DraftStore, EnrichmentSource,
    NewServiceRequest, QuantityResolver, RemoteValidation, SaveDraftResponse, ServiceRequestApi,
    StepValidator, WizardConfig,
};
use wayfare_core::provider::{
    CatalogRecord, EnrichedProviderRecord, MinimalProviderRecord, ProviderKind, ServiceType,
};
use wayfare_core::service_request::{ServiceRequest, ServiceRequestStatus};
use wayfare_core::snapshot::{Activity, DraftSnapshot};
use wayfare_core::types::{ProviderId, ServiceRequestId};
use wayfare_events::{SessionEvent, SessionEventBus};
use wayfare_session::{
    ProviderSelectionManager, SelectionObserver, SelectionPorts, SessionContext, SessionPorts,
    WizardSessionController,
};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn catalog_record(id: ProviderId, service_type: ServiceType) -> CatalogRecord {
    CatalogRecord {
        id,
        service_type,
        name: format!("{} {id}", service_type.as_str()),
        provider_kind: None,
        status: None,
        price: Some(100.0 + id as f64),
        currency: Some("EUR".into()),
        available: Some(true),
        amenities: Vec::new(),
        location: Some("Lisbon".into()),
        contact: None,
        rating: None,
        service_request: None,
        details: Map::new(),
    }
}

pub fn selected(id: ProviderId, service_type: ServiceType) -> EnrichedProviderRecord {
    EnrichedProviderRecord::from_catalog(&catalog_record(id, service_type))
}

pub fn minimal(id: ProviderId, service_type: ServiceType) -> MinimalProviderRecord {
    MinimalProviderRecord::new(id, service_type, ProviderKind::Platform)
}

pub fn service_request(
    id: ServiceRequestId,
    provider_id: ProviderId,
    service_type: ServiceType,
    status: ServiceRequestStatus,
) -> ServiceRequest {
    ServiceRequest {
        id,
        provider_id,
        service_type,
        status,
        requested_quantity: None,
        expires_at: None,
        rejection_reason: None,
    }
}

pub fn activity(day: u32, title: &str) -> Activity {
    Activity {
        day,
        title: title.into(),
        description: None,
        location: None,
        time: None,
    }
}

/// Collect every event currently buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Holds the next call of a fake until the test releases it. Only the
/// first call after `arm` is held.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    pub entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Called by the fake; blocks the call that disarms the gate.
    pub async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCatalog {
    pub records: Mutex<HashMap<ServiceType, Vec<CatalogRecord>>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub gate: Gate,
}

impl FakeCatalog {
    pub fn set(&self, service_type: ServiceType, records: Vec<CatalogRecord>) {
        self.records.lock().unwrap().insert(service_type, records);
    }
}

#[async_trait]
impl CatalogSearch for FakeCatalog {
    async fn search(
        &self,
        filters: &CatalogFilters,
        _limit: usize,
    ) -> Result<Vec<CatalogRecord>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 503,
                body: "catalog down".into(),
            });
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&filters.service_type())
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeEnrichment {
    pub records: Mutex<Vec<CatalogRecord>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeEnrichment {
    pub fn add(&self, record: CatalogRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[async_trait]
impl EnrichmentSource for FakeEnrichment {
    async fn batch_fetch(
        &self,
        ids: &[ProviderId],
        service_type: ServiceType,
        _include_service_requests: bool,
    ) -> Result<Vec<CatalogRecord>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 502,
                body: "bad gateway".into(),
            });
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.service_type == service_type && ids.contains(&r.id))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Service requests
// ---------------------------------------------------------------------------

pub struct FakeServiceRequests {
    pub next_id: Mutex<ServiceRequestId>,
    pub created: Mutex<Vec<NewServiceRequest>>,
    pub cancelled: Mutex<Vec<(ServiceRequestId, String)>>,
    pub remote: Mutex<HashMap<ServiceRequestId, ServiceRequest>>,
    pub fail: AtomicBool,
    pub gate: Gate,
}

impl Default for FakeServiceRequests {
    fn default() -> Self {
        Self {
            next_id: Mutex::new(100),
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            remote: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            gate: Gate::default(),
        }
    }
}

impl FakeServiceRequests {
    pub fn set_remote_status(&self, id: ServiceRequestId, status: ServiceRequestStatus) {
        if let Some(request) = self.remote.lock().unwrap().get_mut(&id) {
            request.status = status;
        }
    }
}

#[async_trait]
impl ServiceRequestApi for FakeServiceRequests {
    async fn create(&self, request: &NewServiceRequest) -> Result<ServiceRequest, ApiError> {
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 500,
                body: "boom".into(),
            });
        }
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let mut created = service_request(
            id,
            request.provider_id,
            request.service_type,
            ServiceRequestStatus::Pending,
        );
        created.requested_quantity = request.requested_quantity;
        self.created.lock().unwrap().push(request.clone());
        self.remote.lock().unwrap().insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: ServiceRequestId) -> Result<ServiceRequest, ApiError> {
        self.remote
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ApiError::Api {
                status: 404,
                body: "not found".into(),
            })
    }

    async fn cancel(&self, id: ServiceRequestId, reason: &str) -> Result<(), ApiError> {
        self.cancelled.lock().unwrap().push((id, reason.to_string()));
        self.set_remote_status(id, ServiceRequestStatus::Cancelled);
        Ok(())
    }
}

/// Resolves a fixed quantity for every provider.
pub struct FixedQuantity(pub u32);

impl QuantityResolver for FixedQuantity {
    fn resolve(&self, _provider: &MinimalProviderRecord) -> Option<u32> {
        Some(self.0)
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDraftStore {
    pub saves: Mutex<Vec<(Option<String>, DraftSnapshot)>>,
    pub drafts: Mutex<HashMap<String, DraftSnapshot>>,
    pub fail: AtomicBool,
    /// Answer success without a draft id.
    pub omit_id: AtomicBool,
    pub gate: Gate,
}

impl FakeDraftStore {
    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<DraftSnapshot> {
        self.saves.lock().unwrap().last().map(|(_, s)| s.clone())
    }
}

#[async_trait]
impl DraftStore for FakeDraftStore {
    async fn save(
        &self,
        snapshot: &DraftSnapshot,
        draft_id: Option<&str>,
    ) -> Result<SaveDraftResponse, ApiError> {
        self.gate.pass().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        let mut saves = self.saves.lock().unwrap();
        saves.push((draft_id.map(str::to_string), snapshot.clone()));
        let id = draft_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("draft-{}", saves.len()));
        self.drafts
            .lock()
            .unwrap()
            .insert(id.clone(), snapshot.clone());
        Ok(SaveDraftResponse {
            success: true,
            draft_id: (!self.omit_id.load(Ordering::SeqCst)).then_some(id),
            message: None,
        })
    }

    async fn load(&self, draft_id: &str) -> Result<DraftSnapshot, ApiError> {
        self.drafts
            .lock()
            .unwrap()
            .get(draft_id)
            .cloned()
            .ok_or(ApiError::Api {
                status: 404,
                body: "no such draft".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeValidator {
    pub errors: Mutex<BTreeMap<String, Vec<String>>>,
    pub unreachable: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl StepValidator for FakeValidator {
    async fn validate_step(
        &self,
        _step: u8,
        _snapshot: &DraftSnapshot,
    ) -> Result<RemoteValidation, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 504,
                body: "timeout".into(),
            });
        }
        let errors = self.errors.lock().unwrap().clone();
        Ok(RemoteValidation {
            success: errors.is_empty(),
            errors,
        })
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Observer that can hold the notifying call.
#[derive(Default)]
pub struct GatedObserver {
    pub gate: Gate,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SelectionObserver for GatedObserver {
    async fn selections_changed(&self, _service_type: ServiceType, _records: &[EnrichedProviderRecord]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub catalog: Arc<FakeCatalog>,
    pub enrichment: Arc<FakeEnrichment>,
    pub service_requests: Arc<FakeServiceRequests>,
    pub drafts: Arc<FakeDraftStore>,
    pub validator: Arc<FakeValidator>,
    pub events: Arc<SessionEventBus>,
    pub selection: Arc<ProviderSelectionManager>,
    pub controller: Arc<WizardSessionController>,
    pub config: WizardConfig,
}

pub fn test_config() -> WizardConfig {
    WizardConfig {
        api_url: "http://api.test".into(),
        request_timeout: Duration::from_secs(1),
        autosave_interval: Duration::from_secs(30),
        critical_save_debounce: Duration::from_secs(1),
        catalog_page_size: 2,
        catalog_search_limit: 50,
        require_activities: true,
        service_request_expiry_hours: 48,
    }
}

pub fn harness() -> Harness {
    build(
        test_config(),
        SessionContext::new("csrf-token", 1),
        Arc::new(DeferToBackend),
    )
}

pub fn harness_with_context(context: SessionContext) -> Harness {
    build(test_config(), context, Arc::new(DeferToBackend))
}

pub fn harness_with_quantity(quantity: Arc<dyn QuantityResolver>) -> Harness {
    build(test_config(), SessionContext::new("csrf-token", 1), quantity)
}

pub fn build(
    config: WizardConfig,
    context: SessionContext,
    quantity: Arc<dyn QuantityResolver>,
) -> Harness {
    let catalog = Arc::new(FakeCatalog::default());
    let enrichment = Arc::new(FakeEnrichment::default());
    let service_requests = Arc::new(FakeServiceRequests::default());
    let drafts = Arc::new(FakeDraftStore::default());
    let validator = Arc::new(FakeValidator::default());
    let events = Arc::new(SessionEventBus::default());

    let selection = Arc::new(ProviderSelectionManager::new(
        SelectionPorts {
            catalog: catalog.clone(),
            enrichment: enrichment.clone(),
            service_requests: service_requests.clone(),
            quantity,
        },
        events.clone(),
        &config,
    ));
    let controller = Arc::new(WizardSessionController::new(
        selection.clone(),
        SessionPorts {
            drafts: drafts.clone(),
            validator: validator.clone(),
        },
        events.clone(),
        context,
        &config,
    ));

    Harness {
        catalog,
        enrichment,
        service_requests,
        drafts,
        validator,
        events,
        selection,
        controller,
        config,
    }
}

impl Harness {
    /// Fill every step with data that passes validation.
    pub async fn fill_valid_session(&self) {
        let c = &self.controller;
        c.set_field("package_name", json!("Azores Escape")).await.unwrap();
        c.set_field("destination", json!("Ponta Delgada")).await.unwrap();
        c.set_field("start_date", json!("2026-05-01")).await.unwrap();
        c.set_field("end_date", json!("2026-05-08")).await.unwrap();
        c.set_field("travelers", json!(2)).await.unwrap();
        c.add_activity(activity(1, "Whale watching")).await.unwrap();
        c.set_field("base_price", json!(1450)).await.unwrap();
        c.set_confirmation("terms_accepted", true).await.unwrap();
    }

    /// Make `records` the current catalog result for their service type.
    pub async fn browse_with(&self, service_type: ServiceType, records: Vec<CatalogRecord>) {
        self.catalog.set(service_type, records);
        self.selection
            .browse(CatalogFilters::none(service_type))
            .await
            .unwrap();
    }
}
