//! Scripted backend for tests and offline replay

use crate::request::NarrativeRequest;
use crate::NarrativeBackend;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use storyline_core::{BackendError, NormalizedEvent, ProjectContext, RawCandidate};

/// Backend that replays queued responses in order
///
/// Every call is recorded. Once the queue is exhausted each call fails with
/// `BackendError::Unavailable`.
#[derive(Debug, Default)]
pub struct FixtureBackend {
    responses: Mutex<VecDeque<Result<RawCandidate, BackendError>>>,
    calls: Mutex<Vec<NarrativeRequest>>,
    delay: Option<Duration>,
}

impl FixtureBackend {
    /// Create empty fixture
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create fixture that answers every queued call with `responses`
    #[must_use]
    pub fn from_responses(
        responses: impl IntoIterator<Item = Result<RawCandidate, BackendError>>,
    ) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Sleep before answering each call
    #[inline]
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub fn push_ok(&self, candidate: RawCandidate) {
        self.responses.lock().push_back(Ok(candidate));
    }

    /// Queue a failure
    pub fn push_err(&self, error: BackendError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Requests received so far
    #[must_use]
    pub fn calls(&self) -> Vec<NarrativeRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests received
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Responses still queued
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait::async_trait]
impl NarrativeBackend for FixtureBackend {
    async fn synthesize(
        &self,
        context: &ProjectContext,
        events: &[NormalizedEvent],
    ) -> Result<RawCandidate, BackendError> {
        self.calls.lock().push(NarrativeRequest::build(context, events));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().pop_front();
        next.unwrap_or_else(|| Err(BackendError::unavailable("fixture exhausted")))
    }

    fn name(&self) -> &str {
        "fixture"
    }
}
