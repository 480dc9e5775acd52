//! Testing utilities for Storyline workspace
//!
//! Shared event sets, candidates, and fixture backends.

#![allow(missing_docs)]

use std::sync::Arc;
use storyline_backend::FixtureBackend;
use storyline_core::{
    normalize, BackendError, CreationEvent, NormalizedEvent, RawCandidate, RawNode,
};

pub const PROJECT: &str = "A hand-painted mural for the community library";

pub fn event(timestamp: &str, description: &str) -> CreationEvent {
    CreationEvent::new(timestamp, description)
}

pub fn media_event(timestamp: &str, description: &str, media_url: &str) -> CreationEvent {
    CreationEvent::new(timestamp, description).with_media(media_url)
}

/// Three events spread over a month, the first carrying a sketch
pub fn sample_events() -> Vec<CreationEvent> {
    vec![
        media_event("2023-01-01T09:00:00Z", "Sketched the first idea", "s3://mural/sketch.png"),
        event("2023-01-10T14:30:00Z", "Primed the wall"),
        event("2023-02-01T18:00:00Z", "Finished the last panel"),
    ]
}

pub fn normalized_sample_events() -> Vec<NormalizedEvent> {
    normalize(&sample_events()).events
}

/// Well-formed chain a -> b -> c over [`sample_events`]
pub fn linear_candidate() -> RawCandidate {
    RawCandidate::new(
        "From a pencil sketch to a finished wall",
        vec![
            RawNode::new("a", "The idea takes shape on paper")
                .at("2023-01-01T09:00:00Z")
                .with_media("s3://mural/sketch.png")
                .with_children(["b"]),
            RawNode::new("b", "The wall is prepared")
                .at("2023-01-10T14:30:00Z")
                .with_children(["c"]),
            RawNode::new("c", "The mural is complete").at("2023-02-01T18:00:00Z"),
        ],
    )
}

/// Two nodes pointing at each other
pub fn cyclic_candidate() -> RawCandidate {
    RawCandidate::new(
        "A story that loops",
        vec![
            RawNode::new("a", "Start")
                .at("2023-01-01T09:00:00Z")
                .with_children(["b"]),
            RawNode::new("b", "Middle")
                .at("2023-01-10T14:30:00Z")
                .with_children(["a"]),
        ],
    )
}

/// Candidate whose narrative is blank, rejected by validation
pub fn blank_narrative_candidate() -> RawCandidate {
    RawCandidate::new(
        "   ",
        vec![RawNode::new("a", "Start").at("2023-01-01T09:00:00Z")],
    )
}

pub fn fixture_backend(
    responses: impl IntoIterator<Item = Result<RawCandidate, BackendError>>,
) -> Arc<FixtureBackend> {
    Arc::new(FixtureBackend::from_responses(responses))
}

/// Backend that fails with `Unavailable` on every call
pub fn unavailable_backend() -> Arc<FixtureBackend> {
    Arc::new(FixtureBackend::new())
}

/// Backend that answers with [`linear_candidate`] once
pub fn linear_backend() -> Arc<FixtureBackend> {
    fixture_backend([Ok(linear_candidate())])
}
