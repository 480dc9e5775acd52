//! Error and warning types for Storyline Core
//!
//! Provides the full synthesis taxonomy:
//! - Non-fatal normalization and validation warnings
//! - Backend failures (unavailable vs malformed)
//! - Structural defects that repair cannot fix
//! - The typed failure returned to callers

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Warning raised for a caller event that was dropped during normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationWarning {
    /// Description was empty after trimming
    #[error("event {index} dropped: description is empty")]
    EmptyDescription {
        /// Position in the caller's event list
        index: usize,
    },

    /// Timestamp did not parse to an instant
    #[error("event {index} dropped: unparsable timestamp {raw:?}")]
    UnparsableTimestamp {
        /// Position in the caller's event list
        index: usize,
        /// Timestamp as supplied
        raw: String,
    },
}

/// Why the validator removed a candidate node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeDropReason {
    /// Narrative summary was empty
    EmptyDescription,
    /// No timestamp and no source event to infer one from
    NoTimestamp,
}

impl std::fmt::Display for NodeDropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => f.write_str("empty description"),
            Self::NoTimestamp => f.write_str("no resolvable timestamp"),
        }
    }
}

/// Repair applied to a backend candidate, attached to the accepted result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Node had no id and received a synthetic one
    #[error("node at position {position} had no id, assigned {assigned:?}")]
    MissingIdAssigned { position: usize, assigned: String },

    /// Node was removed from the candidate
    #[error("node {id:?} dropped: {reason}")]
    NodeDropped { id: String, reason: NodeDropReason },

    /// Narrative summary exceeded the length cap
    #[error("node {id:?} description truncated from {original_chars} to {limit} chars")]
    DescriptionTruncated {
        id: String,
        original_chars: usize,
        limit: usize,
    },

    /// Node timestamp was missing or unparsable and was taken from a source event
    #[error("node {id:?} timestamp inferred from event {event_index}")]
    TimestampInferred { id: String, event_index: usize },

    /// Media reference did not belong to any source event
    #[error("node {id:?} media {media_url:?} does not match any event, cleared")]
    UnknownMediaCleared { id: String, media_url: String },

    /// Media reference copied from the originating event
    #[error("node {id:?} media copied from event {event_index}")]
    MediaInherited { id: String, event_index: usize },

    /// Later duplicate id renamed to a fresh one
    #[error("duplicate id {original:?} renamed to {renamed:?}")]
    DuplicateIdRenamed { original: String, renamed: String },

    /// Child reference redirected to a renamed duplicate
    #[error("node {parent:?} child {from:?} rewritten to {to:?}")]
    ReferenceRewritten {
        parent: String,
        from: String,
        to: String,
    },

    /// Child reference did not resolve
    #[error("node {parent:?} child {child:?} does not exist, dropped")]
    DanglingChildDropped { parent: String, child: String },

    /// Same child listed twice by one node
    #[error("node {parent:?} lists child {child:?} more than once, extra dropped")]
    DuplicateChildDropped { parent: String, child: String },

    /// Child already claimed by an earlier parent
    #[error(
        "node {child:?} already a child of {kept_parent:?}, claim by {dropped_parent:?} dropped"
    )]
    SecondParentDropped {
        child: String,
        kept_parent: String,
        dropped_parent: String,
    },

    /// Edge removed to break a cycle
    #[error("cycle cut at edge {parent:?} -> {child:?}")]
    CycleEdgeCut { parent: String, child: String },

    /// Child predates its parent by more than the tolerance
    #[error("node {child:?} precedes parent {parent:?} by {lead_secs}s")]
    ChronologyAnomaly {
        parent: String,
        child: String,
        lead_secs: i64,
    },
}

/// Any non-fatal observation made while synthesizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, thiserror::Error)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SynthesisWarning {
    /// Raised by the event normalizer
    #[error("{0}")]
    Normalization(NormalizationWarning),
    /// Raised by the validator
    #[error("{0}")]
    Validation(ValidationWarning),
}

impl From<NormalizationWarning> for SynthesisWarning {
    fn from(value: NormalizationWarning) -> Self {
        Self::Normalization(value)
    }
}

impl From<ValidationWarning> for SynthesisWarning {
    fn from(value: ValidationWarning) -> Self {
        Self::Validation(value)
    }
}

/// Coarse classification of backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// Unreachable, timed out or refused
    Unavailable,
    /// Responded without a usable payload
    Malformed,
}

impl BackendErrorKind {
    /// Stable label for logs
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrative backend failure for a single attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend unreachable, returned an error status, or timed out
    #[error("narrative backend unavailable: {reason}")]
    Unavailable { reason: String },

    /// Backend answered but the payload is unusable
    #[error("narrative backend returned malformed output: {reason}")]
    Malformed { reason: String },
}

impl BackendError {
    /// Create an unavailable error
    #[inline]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a malformed error
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Classify the failure
    #[inline]
    #[must_use]
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            Self::Unavailable { .. } => BackendErrorKind::Unavailable,
            Self::Malformed { .. } => BackendErrorKind::Malformed,
        }
    }
}

/// Structural defects the validator does not repair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Overall timeline description is empty
    #[error("timeline description is empty")]
    EmptyNarrative,

    /// Non-empty node set without an in-degree-zero node
    #[error("no root among {node_count} nodes")]
    NoRoot { node_count: usize },
}

/// Typed failure returned by the orchestrator
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// Project context unusable for a non-empty event list
    #[error("invalid project context: {0}")]
    InvalidContext(String),

    /// Backend failed on the final attempt
    #[error("backend failed after {attempts} attempt(s): {source}")]
    Backend {
        attempts: u32,
        source: BackendError,
        warnings: Vec<SynthesisWarning>,
    },

    /// Candidate rejected on the final attempt
    #[error("timeline rejected after {attempts} attempt(s): {source}")]
    Validation {
        attempts: u32,
        source: ValidationError,
        warnings: Vec<SynthesisWarning>,
    },

    /// Caller cancelled the request
    #[error("synthesis cancelled")]
    Cancelled,
}

impl SynthesisError {
    /// Stable label for logs and user-facing messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidContext(_) => "invalid_context",
            Self::Backend { source, .. } => match source.kind() {
                BackendErrorKind::Unavailable => "backend_unavailable",
                BackendErrorKind::Malformed => "backend_malformed",
            },
            Self::Validation { source, .. } => match source {
                ValidationError::EmptyNarrative => "empty_narrative",
                ValidationError::NoRoot { .. } => "no_root",
            },
            Self::Cancelled => "cancelled",
        }
    }

    /// Backend attempts made before giving up
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Backend { attempts, .. } | Self::Validation { attempts, .. } => *attempts,
            Self::InvalidContext(_) | Self::Cancelled => 0,
        }
    }

    /// Warnings gathered before the failure
    #[inline]
    #[must_use]
    pub fn warnings(&self) -> &[SynthesisWarning] {
        match self {
            Self::Backend { warnings, .. } | Self::Validation { warnings, .. } => warnings,
            Self::InvalidContext(_) | Self::Cancelled => &[],
        }
    }

    /// Whether a fresh request could reasonably succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Validation { .. })
    }
}

/// Forest invariant violated by a node set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestViolation {
    #[error("node at position {position} has an empty id")]
    EmptyId { position: usize },

    #[error("node at position {position} has an empty description")]
    EmptyDescription { position: usize },

    #[error("duplicate id {id:?}")]
    DuplicateId { id: String },

    #[error("node {parent:?} references missing child {child:?}")]
    DanglingChild { parent: String, child: String },

    #[error("node {parent:?} lists child {child:?} twice")]
    DuplicateChild { parent: String, child: String },

    #[error("node {child:?} has more than one parent")]
    MultipleParents { child: String },

    #[error("node {id:?} is its own descendant")]
    Cycle { id: String },

    #[error("no root node")]
    NoRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_kind() {
        assert_eq!(
            BackendError::unavailable("connection refused").kind(),
            BackendErrorKind::Unavailable
        );
        assert_eq!(BackendError::malformed("no content").kind(), BackendErrorKind::Malformed);
    }

    #[test]
    fn synthesis_error_kind_labels() {
        let err = SynthesisError::Backend {
            attempts: 2,
            source: BackendError::unavailable("timeout"),
            warnings: vec![],
        };
        assert_eq!(err.kind(), "backend_unavailable");
        assert_eq!(err.attempts(), 2);
        assert!(err.is_retryable());

        let err = SynthesisError::Validation {
            attempts: 2,
            source: ValidationError::NoRoot { node_count: 3 },
            warnings: vec![NormalizationWarning::EmptyDescription { index: 0 }.into()],
        };
        assert_eq!(err.kind(), "no_root");
        assert_eq!(err.warnings().len(), 1);

        assert!(!SynthesisError::Cancelled.is_retryable());
        assert_eq!(SynthesisError::InvalidContext("blank".into()).attempts(), 0);
    }

    #[test]
    fn synthesis_error_display_includes_source() {
        let err = SynthesisError::Validation {
            attempts: 2,
            source: ValidationError::EmptyNarrative,
            warnings: vec![],
        };
        let text = err.to_string();
        assert!(text.contains("2 attempt"));
        assert!(text.contains("timeline description is empty"));
    }

    #[test]
    fn warning_serializes_with_stage_and_kind() {
        let warning: SynthesisWarning = ValidationWarning::DanglingChildDropped {
            parent: "a".into(),
            child: "ghost".into(),
        }
        .into();
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["stage"], "validation");
        assert_eq!(json["kind"], "dangling_child_dropped");
        assert_eq!(json["child"], "ghost");
    }
}
