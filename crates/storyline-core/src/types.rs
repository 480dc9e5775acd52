//! Core types for Storyline
//!
//! Defines the request-scoped values that flow through synthesis:
//! - Caller input (creation events, project context)
//! - Normalized events handed to the narrative backend
//! - Raw backend candidates
//! - The validated timeline returned to callers
//!
//! Field names serialize in camelCase so the JSON contract matches the
//! surrounding application (`timelineDescription`, `mediaUrl`, ...).

use crate::error::SynthesisWarning;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step in a project's creation, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreationEvent {
    /// Point in time, unparsed
    pub timestamp: String,
    /// Free text
    pub description: String,
    /// Optional media reference, never dereferenced here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl CreationEvent {
    /// Create new event
    #[inline]
    #[must_use]
    pub fn new(timestamp: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            description: description.into(),
            media_url: None,
        }
    }

    /// With media reference
    #[inline]
    #[must_use]
    pub fn with_media(mut self, media_url: impl Into<String>) -> Self {
        self.media_url = Some(media_url.into());
        self
    }
}

/// Project the timeline is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    /// Free text, required for backend synthesis
    pub project_description: String,
}

impl ProjectContext {
    /// Create new context
    #[inline]
    #[must_use]
    pub fn new(project_description: impl Into<String>) -> Self {
        Self {
            project_description: project_description.into(),
        }
    }

    /// Check whether the description is empty after trimming
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.project_description.trim().is_empty()
    }
}

/// Creation event after trimming and timestamp parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Position in the caller's original list
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

/// Node as returned by the narrative backend, not yet trusted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    /// Identifier, expected unique within the candidate
    pub id: String,
    /// ISO-8601 instant, ideally copied from a source event
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Narrative summary of this point in the story
    pub description: String,
    /// Media reference copied from the originating event
    #[serde(default)]
    pub media_url: Option<String>,
    /// Ids of the nodes that branch from this one
    #[serde(default)]
    pub children: Vec<String>,
}

impl RawNode {
    /// Create new raw node
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: None,
            description: description.into(),
            media_url: None,
            children: Vec::new(),
        }
    }

    /// With timestamp
    #[inline]
    #[must_use]
    pub fn at(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// With child ids
    #[inline]
    #[must_use]
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    /// With media reference
    #[inline]
    #[must_use]
    pub fn with_media(mut self, media_url: impl Into<String>) -> Self {
        self.media_url = Some(media_url.into());
        self
    }
}

/// Candidate timeline as returned by the narrative backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    /// Prose summarizing the whole arc
    pub timeline_description: String,
    /// Nodes forming a rooted forest through their `children` lists
    pub timeline_nodes: Vec<RawNode>,
}

impl RawCandidate {
    /// Create new candidate
    #[inline]
    #[must_use]
    pub fn new(timeline_description: impl Into<String>, timeline_nodes: Vec<RawNode>) -> Self {
        Self {
            timeline_description: timeline_description.into(),
            timeline_nodes,
        }
    }
}

/// Validated node of the narrative forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNode {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Validated timeline returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResult {
    pub timeline_description: String,
    pub timeline_nodes: Vec<TimelineNode>,
    /// Dropped events and applied repairs, in the order they happened
    #[serde(default)]
    pub warnings: Vec<SynthesisWarning>,
}

impl TimelineResult {
    /// Timeline with no nodes
    #[inline]
    #[must_use]
    pub fn empty(timeline_description: impl Into<String>) -> Self {
        Self {
            timeline_description: timeline_description.into(),
            timeline_nodes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check whether the timeline has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timeline_nodes.is_empty()
    }

    /// Look up a node by id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&TimelineNode> {
        self.timeline_nodes.iter().find(|n| n.id == id)
    }

    /// Number of child references pointing at `id`
    #[must_use]
    pub fn in_degree(&self, id: &str) -> usize {
        self.timeline_nodes
            .iter()
            .flat_map(|n| n.children.iter())
            .filter(|c| c.as_str() == id)
            .count()
    }

    /// Nodes nothing points at, in timeline order
    pub fn roots(&self) -> impl Iterator<Item = &TimelineNode> + '_ {
        self.timeline_nodes
            .iter()
            .filter(move |n| self.in_degree(&n.id) == 0)
    }
}
