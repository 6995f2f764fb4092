//! Road distance precomputation between municipalities and taxi service hubs.
//!
//! A single-threaded batch pipeline: the place registry feeds the candidate
//! selector, identities and routes come from external providers behind a
//! shared rate limiter, and results are checkpointed so a run can stop and
//! resume without paying for the same pair twice. A separate verification
//! pass re-checks stored distances with district-qualified identities.

pub mod audit;
pub mod candidates;
pub mod config;
pub mod error;
pub mod geo;
mod http;
pub mod job;
pub mod logging;
pub mod pair;
pub mod pipeline;
pub mod place;
pub mod registry;
pub mod routing;
pub mod store;
pub mod verify;

pub use error::{PipelineError, ProviderError, Result};
