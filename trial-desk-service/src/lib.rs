//! trial-desk-service
//!
//! HTTP host for clinical trial coordination: studies, patient screening,
//! adverse-event reporting, and protocol extraction backed by
//! `protocol-extract`.

pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use config::{LogFormat, ServiceConfig};
pub use error::{ConfigError, StoreError};
pub use service::{AppState, ExtractionSlots, build_router, create_app};
pub use store::TrialStore;
