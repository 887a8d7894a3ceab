//! Package-creation session core.
//!
//! A session is a [`WizardSessionController`] driving five validated steps,
//! sharing a [`ProviderSelectionManager`] that owns the hotel, flight and
//! transport selections. Hosts talk to both through async methods and
//! listen to [`wayfare_events::SessionEventBus`] for step changes, saves
//! and notices. [`Autosave`] keeps the draft persisted in the background.

pub mod autosave;
pub mod controller;
pub mod error;
pub mod mirror;
pub mod selection;
pub mod telemetry;

pub use autosave::Autosave;
pub use controller::{SessionContext, SessionPorts, WizardSessionController};
pub use error::{SelectionError, SessionError};
pub use mirror::{LegacyEntry, LegacySelectionMirror, SelectionObserver};
pub use selection::{
    BrowseOutcome, ConfirmOutcome, ProviderSelectionManager, RefreshOutcome, SelectionPorts,
    ServiceRequestOptions,
};
