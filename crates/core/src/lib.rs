//! APICURON action core library.
//!
//! This crate turns a CI push event into APICURON attribution records:
//! configuration, event parsing, ORCID identity resolution, report
//! assembly, and batched submission.

pub mod apicuron;
pub mod assembler;
pub mod config;
pub mod errors;
pub mod event;
pub mod identity;
pub mod models;
pub mod pipeline;

// Re-exports for convenience.
pub use apicuron::ApicuronClient;
pub use assembler::{ReportAssembler, ReportSettings};
pub use config::ActionConfig;
pub use event::PushEvent;
pub use identity::{IdentityResolver, Resolution};
pub use models::AttributionRecord;
pub use pipeline::ReportPipeline;
