//! Wizard session controller.
//!
//! [`WizardSessionController`] drives step progression, validation, dirty
//! tracking, draft save/load and final submission for one package-creation
//! session. Provider selections live in the shared
//! [`ProviderSelectionManager`]; the controller only reads them when it
//! validates step 3 or gathers a snapshot.
//!
//! Dirty tracking compares revisions rather than flags: every edit bumps the
//! edit revision, and a successful save records the edit and selection
//! revisions its snapshot was gathered at. Edits that land while a save is
//! in flight therefore keep the session dirty.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use wayfare_clients::{ApiError, DraftStore, StepValidator, ValidationGateway, WizardConfig};
use wayfare_core::error::CoreError;
use wayfare_core::provider::{MinimalProviderRecord, ServiceType};
use wayfare_core::service_request::ServiceRequest;
use wayfare_core::snapshot::{
    Activity, AddOnLineItem, DraftSnapshot, FIELD_CURRENT_STEP, FIELD_MAX_COMPLETED_STEP,
};
use wayfare_core::types::ProviderId;
use wayfare_core::validation::{evaluate_rules, field_rules, semantic_rules, StepContext, StepValidation};
use wayfare_core::wizard::{
    clamp_step_target, sanitize_max_completed, validate_step_number, SessionStatus, WizardStep,
    ADD_ON_STEP, CONFIRMATION_FLAGS, FIELD_ACTIVITIES, FIELD_ADD_ONS, MAX_STEP, MIN_STEP,
    PRICING_FIELDS,
};
use wayfare_events::{Notice, SessionEvent, SessionEventBus};

use crate::error::{SelectionError, SessionError};
use crate::selection::{ProviderSelectionManager, ServiceRequestOptions};

// ---------------------------------------------------------------------------
// Construction inputs
// ---------------------------------------------------------------------------

/// Host-provided authentication context.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub csrf_token: Option<String>,
    pub user_id: Option<i64>,
}

impl SessionContext {
    pub fn new(csrf_token: impl Into<String>, user_id: i64) -> Self {
        Self {
            csrf_token: Some(csrf_token.into()),
            user_id: Some(user_id),
        }
    }

    pub fn has_csrf_token(&self) -> bool {
        self.csrf_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// External services the controller talks to directly.
#[derive(Clone)]
pub struct SessionPorts {
    pub drafts: Arc<dyn DraftStore>,
    pub validator: Arc<dyn StepValidator>,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// Step-4 data: pricing fields and add-on line items.
#[derive(Debug, Clone, Default)]
struct PricingSurface {
    fields: Map<String, Value>,
    add_ons: Vec<AddOnLineItem>,
}

/// Which copy of the step-4 data is authoritative.
///
/// Draft data for step 4 waits in `deferred` until the step is mounted;
/// from then on `live` owns it.
#[derive(Debug, Default)]
struct PricingState {
    mounted: bool,
    live: PricingSurface,
    deferred: Option<PricingSurface>,
}

impl PricingState {
    fn owner(&self) -> &PricingSurface {
        match (&self.deferred, self.mounted) {
            (Some(deferred), false) => deferred,
            _ => &self.live,
        }
    }

    fn owner_mut(&mut self) -> &mut PricingSurface {
        if !self.mounted {
            if let Some(deferred) = self.deferred.as_mut() {
                return deferred;
            }
        }
        &mut self.live
    }

    fn hydrate(&mut self, surface: PricingSurface) {
        if self.mounted {
            self.live = surface;
            self.deferred = None;
        } else {
            self.deferred = Some(surface);
        }
    }

    fn mount(&mut self) {
        self.mounted = true;
        if let Some(deferred) = self.deferred.take() {
            self.live = deferred;
        }
    }
}

struct SessionState {
    status: SessionStatus,
    current_step: u8,
    max_completed_step: u8,
    draft_id: Option<String>,
    /// Base form fields.
    fields: Map<String, Value>,
    /// Terminal-step confirmation flags.
    confirmations: Map<String, Value>,
    /// Itinerary as edited in this session; `None` until rebuilt after a
    /// load.
    activities: Option<Vec<Activity>>,
    /// Itinerary of the last loaded draft.
    loaded_activities: Vec<Activity>,
    pricing: PricingState,
    edit_revision: u64,
    saved_edit_revision: u64,
    saved_selection_revision: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: SessionStatus::InProgress,
            current_step: MIN_STEP,
            max_completed_step: MIN_STEP,
            draft_id: None,
            fields: Map::new(),
            confirmations: Map::new(),
            activities: None,
            loaded_activities: Vec::new(),
            pricing: PricingState::default(),
            edit_revision: 0,
            saved_edit_revision: 0,
            saved_selection_revision: 0,
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            other => Err(SessionError::NotActive(other)),
        }
    }

    fn freshest_activities(&self) -> &[Activity] {
        self.activities.as_deref().unwrap_or(&self.loaded_activities)
    }
}

/// Keys with a dedicated place in the snapshot; never settable as fields.
fn is_reserved_key(key: &str) -> bool {
    [FIELD_CURRENT_STEP, FIELD_MAX_COMPLETED_STEP, FIELD_ACTIVITIES, FIELD_ADD_ONS].contains(&key)
        || ServiceType::ALL
            .iter()
            .any(|t| t.list_key() == key || t.empty_marker_key() == key)
}

fn take_keys(fields: &mut Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| fields.remove(*key).map(|value| (key.to_string(), value)))
        .collect()
}

// ---------------------------------------------------------------------------
// Snapshot gathering
// ---------------------------------------------------------------------------

fn build_snapshot(
    state: &SessionState,
    selections: &HashMap<ServiceType, Vec<MinimalProviderRecord>>,
) -> DraftSnapshot {
    let mut snapshot = DraftSnapshot::new();
    snapshot.fields = state.fields.clone();
    snapshot
        .fields
        .insert(FIELD_CURRENT_STEP.to_string(), json!(state.current_step));
    snapshot
        .fields
        .insert(FIELD_MAX_COMPLETED_STEP.to_string(), json!(state.max_completed_step));

    snapshot.activities = state.freshest_activities().to_vec();

    for service_type in ServiceType::ALL {
        let records = selections
            .get(&service_type)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        snapshot.set_providers(service_type, records);
    }

    gather_section("pricing", &mut snapshot, |s| {
        gather_pricing(state.pricing.owner(), s)
    });
    gather_section("confirmation", &mut snapshot, |s| {
        gather_confirmations(&state.confirmations, s)
    });

    snapshot
}

/// Run one snapshot section; a failing section is skipped and logged.
fn gather_section(
    section: &'static str,
    snapshot: &mut DraftSnapshot,
    gather: impl FnOnce(&mut DraftSnapshot) -> Result<(), CoreError>,
) {
    if let Err(e) = gather(snapshot) {
        tracing::warn!(section, error = %e, "Snapshot section skipped");
    }
}

fn gather_pricing(surface: &PricingSurface, snapshot: &mut DraftSnapshot) -> Result<(), CoreError> {
    if let Some(item) = surface.add_ons.iter().find(|item| !item.price.is_finite()) {
        return Err(CoreError::Validation(format!(
            "Add-on '{}' has a price that cannot be stored",
            item.name
        )));
    }
    snapshot.replace_fields(
        PRICING_FIELDS,
        surface
            .fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone())),
    );
    snapshot.add_ons = surface.add_ons.clone();
    Ok(())
}

fn gather_confirmations(
    confirmations: &Map<String, Value>,
    snapshot: &mut DraftSnapshot,
) -> Result<(), CoreError> {
    if let Some((key, _)) = confirmations.iter().find(|(_, value)| !value.is_boolean()) {
        return Err(CoreError::Validation(format!(
            "Confirmation flag '{key}' is not a boolean"
        )));
    }
    snapshot.replace_fields(
        CONFIRMATION_FLAGS,
        confirmations
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone())),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// WizardSessionController
// ---------------------------------------------------------------------------

pub struct WizardSessionController {
    selection: Arc<ProviderSelectionManager>,
    drafts: Arc<dyn DraftStore>,
    validation: ValidationGateway,
    events: Arc<SessionEventBus>,
    context: SessionContext,
    require_activities: bool,
    state: RwLock<SessionState>,
    /// Serializes draft saves so every save gathers after the previous one
    /// finished.
    save_lock: Mutex<()>,
    /// Steps the presentation layer has mounted.
    mounted: watch::Sender<BTreeSet<u8>>,
    /// Cancelled once the session is submitted or abandoned.
    lifecycle: CancellationToken,
}

impl WizardSessionController {
    pub fn new(
        selection: Arc<ProviderSelectionManager>,
        ports: SessionPorts,
        events: Arc<SessionEventBus>,
        context: SessionContext,
        config: &WizardConfig,
    ) -> Self {
        let (mounted, _) = watch::channel(BTreeSet::new());
        Self {
            selection,
            drafts: ports.drafts,
            validation: ValidationGateway::new(ports.validator),
            events,
            context,
            require_activities: config.require_activities,
            state: RwLock::new(SessionState::new()),
            save_lock: Mutex::new(()),
            mounted,
            lifecycle: CancellationToken::new(),
        }
    }

    pub fn selection(&self) -> &Arc<ProviderSelectionManager> {
        &self.selection
    }

    pub fn events(&self) -> &Arc<SessionEventBus> {
        &self.events
    }

    /// Token cancelled when the session ends (submitted or abandoned).
    pub fn lifecycle(&self) -> CancellationToken {
        self.lifecycle.clone()
    }

    // ---- read access ----

    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status
    }

    pub async fn current_step(&self) -> u8 {
        self.state.read().await.current_step
    }

    pub async fn max_completed_step(&self) -> u8 {
        self.state.read().await.max_completed_step
    }

    pub async fn draft_id(&self) -> Option<String> {
        self.state.read().await.draft_id.clone()
    }

    /// Whether anything changed since the last successful save or load.
    pub async fn is_dirty(&self) -> bool {
        let selection_revision = self.selection.revision();
        let state = self.state.read().await;
        state.edit_revision != state.saved_edit_revision
            || selection_revision != state.saved_selection_revision
    }

    /// Current value of a form, pricing or confirmation field.
    pub async fn field(&self, key: &str) -> Option<Value> {
        let state = self.state.read().await;
        state
            .fields
            .get(key)
            .or_else(|| state.pricing.owner().fields.get(key))
            .or_else(|| state.confirmations.get(key))
            .cloned()
    }

    /// Activities from the freshest source.
    pub async fn activities(&self) -> Vec<Activity> {
        self.state.read().await.freshest_activities().to_vec()
    }

    pub async fn add_ons(&self) -> Vec<AddOnLineItem> {
        self.state.read().await.pricing.owner().add_ons.clone()
    }

    // ---- editing ----

    async fn edit<R>(&self, apply: impl FnOnce(&mut SessionState) -> R) -> Result<R, SessionError> {
        let mut state = self.state.write().await;
        state.ensure_active()?;
        let result = apply(&mut *state);
        state.edit_revision += 1;
        Ok(result)
    }

    /// Set a base form, pricing or confirmation field.
    pub async fn set_field(&self, key: &str, value: Value) -> Result<(), SessionError> {
        if is_reserved_key(key) {
            return Err(CoreError::Validation(format!("'{key}' cannot be set as a form field")).into());
        }
        self.edit(|state| {
            if PRICING_FIELDS.contains(&key) {
                state.pricing.owner_mut().fields.insert(key.to_string(), value);
            } else if CONFIRMATION_FLAGS.contains(&key) {
                state.confirmations.insert(key.to_string(), value);
            } else {
                state.fields.insert(key.to_string(), value);
            }
        })
        .await
    }

    pub async fn set_activities(&self, activities: Vec<Activity>) -> Result<(), SessionError> {
        self.edit(|state| state.activities = Some(activities)).await
    }

    /// Append to the itinerary. The first edit starts from the loaded
    /// draft's activities.
    pub async fn add_activity(&self, activity: Activity) -> Result<(), SessionError> {
        self.edit(|state| {
            let loaded = &state.loaded_activities;
            state
                .activities
                .get_or_insert_with(|| loaded.clone())
                .push(activity);
        })
        .await
    }

    pub async fn set_add_ons(&self, add_ons: Vec<AddOnLineItem>) -> Result<(), SessionError> {
        self.edit(|state| state.pricing.owner_mut().add_ons = add_ons).await
    }

    pub async fn set_confirmation(&self, flag: &str, accepted: bool) -> Result<(), SessionError> {
        if !CONFIRMATION_FLAGS.contains(&flag) {
            return Err(CoreError::Validation(format!("Unknown confirmation flag '{flag}'")).into());
        }
        self.edit(|state| {
            state
                .confirmations
                .insert(flag.to_string(), Value::Bool(accepted));
        })
        .await
    }

    // ---- readiness ----

    /// Readiness signal from the presentation layer. Mounting the add-on
    /// step applies any draft data deferred for it.
    pub async fn mark_step_mounted(&self, step: u8) -> Result<(), SessionError> {
        validate_step_number(step)?;
        if step == ADD_ON_STEP {
            let mut state = self.state.write().await;
            let had_deferred = state.pricing.deferred.is_some();
            state.pricing.mount();
            if had_deferred {
                tracing::debug!(step, "Deferred add-on data applied");
            }
        }
        self.mounted.send_modify(|steps| {
            steps.insert(step);
        });
        Ok(())
    }

    /// Resolve once `step` has been mounted.
    pub async fn wait_until_mounted(&self, step: u8) {
        let mut rx = self.mounted.subscribe();
        // The sender lives as long as `self`, so this only ends on a match.
        let _ = rx.wait_for(|steps| steps.contains(&step)).await;
    }

    // ---- navigation ----

    /// Jump to step `n`. Targets below the first step are rejected; targets
    /// past the last step land on it.
    pub async fn go_to_step(&self, n: i64) -> Result<u8, SessionError> {
        let target = clamp_step_target(n).map_err(|_| SessionError::InvalidStep(n))?;
        let from = {
            let mut state = self.state.write().await;
            state.ensure_active()?;
            let from = state.current_step;
            if from == target {
                return Ok(target);
            }
            state.current_step = target;
            state.edit_revision += 1;
            from
        };
        tracing::debug!(from, to = target, "Step changed");
        self.events
            .publish(SessionEvent::StepChanged { from, to: target });
        Ok(target)
    }

    /// Validate the current step and advance when it passes. Returns the
    /// validation outcome either way.
    pub async fn next_step(&self) -> Result<StepValidation, SessionError> {
        let current = {
            let state = self.state.read().await;
            state.ensure_active()?;
            state.current_step
        };

        let validation = self.validate_step(current).await?;
        if !validation.valid {
            tracing::debug!(step = current, fields = validation.errors.len(), "Step validation failed");
            return Ok(validation);
        }

        let target = (current + 1).min(MAX_STEP);
        {
            let mut state = self.state.write().await;
            state.ensure_active()?;
            if state.current_step != current {
                // Navigated elsewhere while validating.
                return Ok(validation);
            }
            state.max_completed_step = state.max_completed_step.max(target);
            state.current_step = target;
            state.edit_revision += 1;
        }
        if target != current {
            tracing::debug!(from = current, to = target, "Step changed");
            self.events.publish(SessionEvent::StepChanged {
                from: current,
                to: target,
            });
        }

        if let Err(e) = self.save_if_dirty().await {
            tracing::debug!(error = %e, "Progress save after step change failed");
        }
        Ok(validation)
    }

    /// Go back one step. Returns whether the step changed.
    pub async fn prev_step(&self) -> Result<bool, SessionError> {
        let from = {
            let mut state = self.state.write().await;
            state.ensure_active()?;
            if state.current_step <= MIN_STEP {
                return Ok(false);
            }
            let from = state.current_step;
            state.current_step -= 1;
            state.edit_revision += 1;
            from
        };
        self.events.publish(SessionEvent::StepChanged {
            from,
            to: from - 1,
        });
        Ok(true)
    }

    // ---- validation ----

    pub async fn validate_current_step(&self) -> Result<StepValidation, SessionError> {
        let step = self.current_step().await;
        self.validate_step(step).await
    }

    /// Validate one step: field rules first, then the step's business
    /// rules, then the remote validator. Later stages only run when the
    /// earlier ones pass.
    pub async fn validate_step(&self, step: u8) -> Result<StepValidation, SessionError> {
        let wizard_step = WizardStep::from_number(step)?;
        let snapshot = self.gather_snapshot().await;

        let mut result = evaluate_rules(field_rules(wizard_step), &snapshot.fields);
        if !result.valid {
            return Ok(result);
        }

        let providers = if matches!(wizard_step, WizardStep::Services) {
            self.selection.provider_checks().await
        } else {
            Vec::new()
        };
        let ctx = StepContext {
            fields: Some(&snapshot.fields),
            activity_count: snapshot.activities.len(),
            require_activities: self.require_activities,
            providers: &providers,
            add_ons: &snapshot.add_ons,
        };
        result.merge(semantic_rules(wizard_step, &ctx));
        if !result.valid {
            return Ok(result);
        }

        result.merge(self.validation.validate(step, &snapshot).await);
        Ok(result)
    }

    // ---- drafts ----

    /// Full snapshot of the session as it would be saved now.
    pub async fn gather_snapshot(&self) -> DraftSnapshot {
        let selections = self.selection.minimal_records_for_save().await;
        let state = self.state.read().await;
        build_snapshot(&state, &selections)
    }

    /// Save the session. Returns the draft id.
    ///
    /// Saves run one at a time and each gathers its snapshot only once it
    /// holds the save lock. On failure nothing changes and the session stays
    /// dirty.
    pub async fn save_draft(&self) -> Result<String, SessionError> {
        self.state.read().await.ensure_active()?;
        if !self.context.has_csrf_token() {
            tracing::warn!("Draft save refused: session context has no CSRF token");
            self.events.notify(Notice::warning(
                "Your session is missing its security token; reload the page to keep saving",
            ));
            return Err(SessionError::MissingContext("csrf_token"));
        }

        let _guard = self.save_lock.lock().await;

        // Read the revision before the records so a concurrent change is
        // never attributed to this save.
        let selection_revision = self.selection.revision();
        let selections = self.selection.minimal_records_for_save().await;
        let (snapshot, edit_revision, draft_id) = {
            let state = self.state.read().await;
            (
                build_snapshot(&state, &selections),
                state.edit_revision,
                state.draft_id.clone(),
            )
        };

        let response = match self.drafts.save(&snapshot, draft_id.as_deref()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, draft_id = ?draft_id, "Draft save failed");
                let message = "Your draft could not be saved; your changes are kept";
                self.events.notify(if e.is_transient() {
                    Notice::retryable(message)
                } else {
                    Notice::warning(message)
                });
                return Err(SessionError::Save(e));
            }
        };

        let saved_id = {
            let mut state = self.state.write().await;
            let Some(id) = response.draft_id.or_else(|| state.draft_id.clone()) else {
                drop(state);
                tracing::warn!("Draft save failed: store returned no draft id");
                self.events.notify(Notice::warning(
                    "Your draft could not be saved; your changes are kept",
                ));
                return Err(SessionError::Save(ApiError::Rejected(
                    "Draft store returned no draft id".to_string(),
                )));
            };
            state.draft_id = Some(id.clone());
            state.saved_edit_revision = edit_revision;
            state.saved_selection_revision = selection_revision;
            id
        };

        tracing::info!(draft_id = %saved_id, "Draft saved");
        self.events.publish(SessionEvent::DraftSaved {
            draft_id: saved_id.clone(),
        });
        Ok(saved_id)
    }

    /// Save only when the session is active and dirty.
    pub async fn save_if_dirty(&self) -> Result<Option<String>, SessionError> {
        if self.status().await != SessionStatus::InProgress || !self.is_dirty().await {
            return Ok(None);
        }
        self.save_draft().await.map(Some)
    }

    /// Fetch a draft and hydrate the session from it.
    pub async fn load_draft(&self, draft_id: &str) -> Result<(), SessionError> {
        self.state.read().await.ensure_active()?;
        let snapshot = match self.drafts.load(draft_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(draft_id, error = %e, "Draft load failed");
                self.events.notify(if e.is_not_found() {
                    Notice::warning("The saved draft no longer exists")
                } else {
                    Notice::retryable("The saved draft could not be loaded")
                });
                return Err(SessionError::Load(e));
            }
        };
        self.state.write().await.draft_id = Some(draft_id.to_string());
        self.load_draft_data(snapshot).await
    }

    /// Hydrate the session from a snapshot.
    ///
    /// Selections are restored through the selection manager. Step-4 data
    /// waits until that step is mounted. Corrupted step counters are
    /// repaired with a notice. The session is clean afterwards.
    pub async fn load_draft_data(&self, snapshot: DraftSnapshot) -> Result<(), SessionError> {
        self.state.read().await.ensure_active()?;

        self.selection.load_from_draft(&snapshot).await;

        let mut notices = Vec::new();
        let (current_raw, max_raw) = snapshot.step_counters();
        let current = match current_raw {
            None => MIN_STEP,
            Some(raw) => match clamp_step_target(raw) {
                Ok(step) => {
                    if raw > i64::from(MAX_STEP) {
                        notices.push(Notice::warning("Saved progress pointed past the last step"));
                    }
                    step
                }
                Err(_) => {
                    notices.push(Notice::warning("Saved progress was invalid and was reset"));
                    MIN_STEP
                }
            },
        };
        let max_completed = match max_raw {
            None => current,
            Some(raw) => {
                let (value, repaired) = sanitize_max_completed(raw, current);
                if repaired {
                    tracing::warn!(raw, repaired_to = value, "Repaired max completed step");
                    notices.push(Notice::warning("Saved progress was corrected"));
                }
                value
            }
        };

        let DraftSnapshot {
            mut fields,
            activities,
            add_ons,
            ..
        } = snapshot;
        fields.remove(FIELD_CURRENT_STEP);
        fields.remove(FIELD_MAX_COMPLETED_STEP);
        let pricing = PricingSurface {
            fields: take_keys(&mut fields, PRICING_FIELDS),
            add_ons,
        };
        let confirmations = take_keys(&mut fields, CONFIRMATION_FLAGS);

        let selection_revision = self.selection.revision();
        let (from, draft_id) = {
            let mut state = self.state.write().await;
            state.ensure_active()?;
            let from = state.current_step;
            state.fields = fields;
            state.confirmations = confirmations;
            state.activities = None;
            state.loaded_activities = activities;
            state.pricing.hydrate(pricing);
            state.current_step = current;
            state.max_completed_step = max_completed;
            state.saved_edit_revision = state.edit_revision;
            state.saved_selection_revision = selection_revision;
            (from, state.draft_id.clone())
        };

        for notice in notices {
            self.events.notify(notice);
        }
        if from != current {
            self.events
                .publish(SessionEvent::StepChanged { from, to: current });
        }
        tracing::info!(draft_id = ?draft_id, step = current, "Draft loaded");
        self.events.publish(SessionEvent::DraftLoaded { draft_id });
        Ok(())
    }

    // ---- submission / lifecycle ----

    /// Validate every step and hand the snapshot to the host.
    ///
    /// Stops at the first failing step, navigates there and returns
    /// [`SessionError::StepInvalid`].
    pub async fn submit_form(&self) -> Result<DraftSnapshot, SessionError> {
        self.state.read().await.ensure_active()?;

        for step in WizardStep::all() {
            let number = step.to_number();
            let validation = self.validate_step(number).await?;
            if validation.valid {
                continue;
            }
            let from = {
                let mut state = self.state.write().await;
                let from = state.current_step;
                if from != number {
                    state.current_step = number;
                    state.edit_revision += 1;
                }
                from
            };
            if from != number {
                self.events
                    .publish(SessionEvent::StepChanged { from, to: number });
            }
            tracing::info!(step = number, "Submission blocked by invalid step");
            self.events.notify(Notice::warning(format!(
                "{} needs attention before the package can be submitted",
                step.label()
            )));
            return Err(SessionError::StepInvalid {
                step: number,
                label: step.label(),
                validation,
            });
        }

        self.state.write().await.max_completed_step = MAX_STEP;
        let snapshot = self.gather_snapshot().await;
        {
            let mut state = self.state.write().await;
            state.ensure_active()?;
            state.status = SessionStatus::Submitted;
        }
        self.lifecycle.cancel();

        tracing::info!("Package submitted");
        self.events.publish(SessionEvent::SubmitRequested {
            snapshot: Box::new(snapshot.clone()),
        });
        Ok(snapshot)
    }

    /// Discard the session without saving.
    pub async fn abandon(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state.write().await;
            state.ensure_active()?;
            state.status = SessionStatus::Abandoned;
        }
        self.lifecycle.cancel();
        tracing::info!("Session abandoned");
        self.events.publish(SessionEvent::SessionAbandoned);
        Ok(())
    }

    /// Create a service request for a selected provider, linking it to this
    /// session's draft when none is given.
    pub async fn request_provider_approval(
        &self,
        provider_id: ProviderId,
        service_type: ServiceType,
        mut options: ServiceRequestOptions,
    ) -> Result<ServiceRequest, SelectionError> {
        if options.package_draft_id.is_none() {
            options.package_draft_id = self.state.read().await.draft_id.clone();
        }
        self.selection
            .create_service_request(provider_id, service_type, options)
            .await
    }
}
