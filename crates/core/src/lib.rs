//! Domain types and pure logic for the package-creation session.
//!
//! Nothing in this crate performs I/O. The session crate feeds it data
//! fetched through the client ports and acts on the results.

pub mod error;
pub mod provider;
pub mod service_request;
pub mod snapshot;
pub mod types;
pub mod validation;
pub mod wizard;
