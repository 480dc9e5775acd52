//! Storyline Backend - narrative generation seam
//!
//! The synthesizer asks a [`NarrativeBackend`] for a raw candidate and
//! never trusts the answer. Implementations:
//! - [`HttpNarrativeBackend`] for OpenAI-compatible chat completion APIs
//! - [`FixtureBackend`] for tests and offline replay
//!
//! A backend makes exactly one attempt per call. Retries, deadlines and
//! repair are handled by the caller.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod fixture;
pub mod http;
pub mod request;

pub use fixture::FixtureBackend;
pub use http::{BackendConfig, BuildError, HttpNarrativeBackend};
pub use request::{candidate_schema, parse_candidate, NarrativeRequest, OUTPUT_CONTRACT};

use storyline_core::{BackendError, NormalizedEvent, ProjectContext, RawCandidate};

/// Generates a raw narrative candidate from normalized events
///
/// # Errors
/// - `BackendError::Unavailable` when the service cannot be reached or
///   answers with an error status
/// - `BackendError::Malformed` when the answer cannot be read as a
///   candidate
#[async_trait::async_trait]
pub trait NarrativeBackend: Send + Sync {
    /// Produce one candidate for the given project and ordered events
    async fn synthesize(
        &self,
        context: &ProjectContext,
        events: &[NormalizedEvent],
    ) -> Result<RawCandidate, BackendError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
