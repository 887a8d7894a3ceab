//! Collaborator ports and their HTTP implementations.
//!
//! Each external service the session talks to is an `async_trait` port so
//! the session crate can be driven by in-memory fakes in tests. The
//! `Http*` types implement the ports over [`reqwest`] through the shared
//! [`ApiClient`].

pub mod catalog;
pub mod config;
pub mod drafts;
pub mod enrichment;
pub mod error;
pub mod http;
pub mod service_requests;
pub mod validation;

pub use catalog::{CatalogFilters, CatalogSearch, HttpCatalogSearch};
pub use config::WizardConfig;
pub use drafts::{DraftStore, HttpDraftStore, SaveDraftResponse};
pub use enrichment::{EnrichmentSource, HttpEnrichmentSource};
pub use error::ApiError;
pub use http::{ApiClient, DataResponse};
pub use service_requests::{
    DeferToBackend, HttpServiceRequestApi, NewServiceRequest, QuantityResolver,
    ServiceRequestApi,
};
pub use validation::{HttpStepValidator, RemoteValidation, StepValidator, ValidationGateway};
