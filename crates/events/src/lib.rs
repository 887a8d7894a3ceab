//! Session event bus.
//!
//! The session core never talks to a rendering surface directly. Everything
//! the presentation layer needs to react to is published here:
//!
//! - [`SessionEventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SessionEvent`]: the typed event envelope.
//! - [`Notice`]: user-visible, non-blocking notifications.

pub mod bus;

pub use bus::{Notice, NoticeLevel, SessionEvent, SessionEventBus};
