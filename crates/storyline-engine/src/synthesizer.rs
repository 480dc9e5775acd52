//! Timeline synthesis orchestrator
//!
//! Runs one request end to end:
//! 1. Normalize events
//! 2. Short-circuit when nothing survives
//! 3. Check the project context
//! 4. Call the backend and validate, at most `max_attempts` times
//!
//! The synthesizer holds no mutable state. Concurrent requests share only
//! configuration and the backend handle.

use crate::config::{StorylineConfig, SynthesisConfig};
use std::future::Future;
use std::sync::Arc;
use storyline_backend::{BuildError, HttpNarrativeBackend, NarrativeBackend};
use storyline_core::{
    normalize, BackendError, BackendErrorKind, CreationEvent, NormalizedEvent, ProjectContext,
    RawCandidate, SynthesisError, SynthesisWarning, TimelineResult, TimelineValidator,
    ValidationError,
};
use tracing::Instrument;
use ulid::Ulid;

/// Why a single attempt failed
#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error(transparent)]
    Backend(BackendError),
    #[error(transparent)]
    Validation(ValidationError),
}

impl AttemptFailure {
    fn needs_backoff(&self) -> bool {
        matches!(self, Self::Backend(e) if e.kind() == BackendErrorKind::Unavailable)
    }

    fn into_error(self, attempts: u32, warnings: Vec<SynthesisWarning>) -> SynthesisError {
        match self {
            Self::Backend(source) => SynthesisError::Backend {
                attempts,
                source,
                warnings,
            },
            Self::Validation(source) => SynthesisError::Validation {
                attempts,
                source,
                warnings,
            },
        }
    }
}

/// Turns creation events into a validated narrative timeline
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use storyline_backend::FixtureBackend;
/// use storyline_core::CreationEvent;
/// use storyline_engine::TimelineSynthesizer;
///
/// # async fn demo() {
/// let synthesizer = TimelineSynthesizer::new(Arc::new(FixtureBackend::new()));
/// let result = synthesizer
///     .synthesize_timeline("A mural", vec![CreationEvent::new("2023-01-01", "Sketch")])
///     .await;
/// # }
/// ```
pub struct TimelineSynthesizer {
    config: SynthesisConfig,
    validator: TimelineValidator,
    backend: Arc<dyn NarrativeBackend>,
}

impl TimelineSynthesizer {
    /// Create synthesizer with default settings
    #[must_use]
    pub fn new(backend: Arc<dyn NarrativeBackend>) -> Self {
        Self::with_backend(&StorylineConfig::default(), backend)
    }

    /// Create synthesizer from configuration and an explicit backend
    #[must_use]
    pub fn with_backend(config: &StorylineConfig, backend: Arc<dyn NarrativeBackend>) -> Self {
        Self {
            config: config.synthesis.clone(),
            validator: TimelineValidator::new(config.validation.clone()),
            backend,
        }
    }

    /// Create synthesizer backed by [`HttpNarrativeBackend`]
    ///
    /// # Errors
    /// `BuildError` if the backend endpoint or client is unusable
    pub fn from_config(config: &StorylineConfig) -> Result<Self, BuildError> {
        let backend = HttpNarrativeBackend::new(config.backend.clone())?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Get orchestrator settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesize a timeline from a plain project description
    ///
    /// # Errors
    /// See [`TimelineSynthesizer::run`]
    pub async fn synthesize_timeline(
        &self,
        project_description: &str,
        events: Vec<CreationEvent>,
    ) -> Result<TimelineResult, SynthesisError> {
        self.run(&ProjectContext::new(project_description), &events)
            .await
    }

    /// Synthesize a timeline
    ///
    /// Dropping the returned future abandons the pending backend call.
    ///
    /// # Errors
    /// - `SynthesisError::InvalidContext` if events survive normalization
    ///   but the project description is blank
    /// - `SynthesisError::Backend` if the final attempt failed in the backend
    /// - `SynthesisError::Validation` if the final candidate was rejected
    pub async fn run(
        &self,
        context: &ProjectContext,
        events: &[CreationEvent],
    ) -> Result<TimelineResult, SynthesisError> {
        let request_id = Ulid::new();
        let span = tracing::info_span!("synthesize", %request_id, backend = self.backend.name());
        self.run_pipeline(context, events).instrument(span).await
    }

    /// Synthesize a timeline unless `cancel` completes first
    ///
    /// # Errors
    /// `SynthesisError::Cancelled` when `cancel` wins, otherwise as
    /// [`TimelineSynthesizer::run`]
    pub async fn run_until<F>(
        &self,
        context: &ProjectContext,
        events: &[CreationEvent],
        cancel: F,
    ) -> Result<TimelineResult, SynthesisError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run(context, events) => result,
            () = cancel => {
                tracing::info!("synthesis cancelled by caller");
                Err(SynthesisError::Cancelled)
            }
        }
    }

    async fn run_pipeline(
        &self,
        context: &ProjectContext,
        events: &[CreationEvent],
    ) -> Result<TimelineResult, SynthesisError> {
        let normalized = normalize(events);
        let mut warnings: Vec<SynthesisWarning> =
            normalized.warnings.into_iter().map(Into::into).collect();

        if normalized.events.is_empty() {
            tracing::info!(
                received = events.len(),
                "no usable events, returning empty timeline"
            );
            let mut result = TimelineResult::empty(&self.config.empty_timeline_description);
            result.warnings = warnings;
            return Ok(result);
        }

        if context.is_blank() {
            return Err(SynthesisError::InvalidContext(
                "project description is empty".to_string(),
            ));
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match self.call_backend(context, &normalized.events).await {
                Ok(candidate) => match self.validator.validate(candidate, &normalized.events) {
                    Ok(mut result) => {
                        tracing::info!(
                            attempt,
                            nodes = result.timeline_nodes.len(),
                            repairs = result.warnings.len(),
                            "timeline synthesized"
                        );
                        warnings.append(&mut result.warnings);
                        result.warnings = warnings;
                        return Ok(result);
                    }
                    Err(e) => AttemptFailure::Validation(e),
                },
                Err(e) => AttemptFailure::Backend(e),
            };

            if attempt >= max_attempts {
                tracing::error!(attempt, error = %failure, "synthesis failed");
                return Err(failure.into_error(attempt, warnings));
            }

            tracing::warn!(attempt, error = %failure, "attempt failed, retrying");
            if failure.needs_backoff() {
                tokio::time::sleep(self.config.retry_backoff()).await;
            }
        }
    }

    async fn call_backend(
        &self,
        context: &ProjectContext,
        events: &[NormalizedEvent],
    ) -> Result<RawCandidate, BackendError> {
        let deadline = self.config.backend_timeout();
        match tokio::time::timeout(deadline, self.backend.synthesize(context, events)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::unavailable(format!(
                "no response within {}s",
                deadline.as_secs()
            ))),
        }
    }
}

impl std::fmt::Debug for TimelineSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineSynthesizer")
            .field("config", &self.config)
            .field("validator", &self.validator)
            .field("backend", &self.backend.name())
            .finish()
    }
}
