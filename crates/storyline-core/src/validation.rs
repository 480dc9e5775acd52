//! Timeline validation and repair
//!
//! The narrative backend is asked for a rooted forest but its compliance is
//! never assumed. Candidates pass through a fixed repair pipeline:
//!
//! 1. Narrative check (fatal when empty)
//! 2. Shape repair: ids, descriptions, timestamps, media
//! 3. Duplicate id renaming with positional reference rewriting
//! 4. Dangling, repeated and self references dropped
//! 5. First parent claim wins
//! 6. Back edges cut by depth-first traversal
//! 7. Root existence (fatal when missing)
//! 8. Chronological plausibility (warning only)
//!
//! Every repair is reported as a [`ValidationWarning`] on the result.

use crate::error::{NodeDropReason, ValidationError, ValidationWarning};
use crate::forest::verify_forest;
use crate::normalize::parse_timestamp;
use crate::types::{NormalizedEvent, RawCandidate, RawNode, TimelineNode, TimelineResult};
use chrono::{DateTime, Utc};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{depth_first_search, DfsEvent};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Validator limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Narrative summaries longer than this are truncated; 0 is treated as 1
    pub max_description_chars: usize,
    /// How far a child may precede its parent before a warning is raised
    pub chronology_tolerance_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_description_chars: 500,
            chronology_tolerance_secs: 3600,
        }
    }
}

/// Checks backend candidates against the forest invariants and repairs
/// what can be repaired
#[derive(Debug, Clone, Default)]
pub struct TimelineValidator {
    config: ValidationConfig,
}

impl TimelineValidator {
    /// Create validator with custom limits
    #[inline]
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate and repair a candidate
    ///
    /// # Arguments
    /// * `candidate` - Raw backend output
    /// * `source` - Normalized events the candidate was generated from
    ///
    /// # Returns
    /// A timeline satisfying every forest invariant, with the applied repairs
    /// as warnings
    ///
    /// # Errors
    /// - `ValidationError::EmptyNarrative` if the timeline description is empty
    /// - `ValidationError::NoRoot` if no in-degree-zero node survives repair
    pub fn validate(
        &self,
        candidate: RawCandidate,
        source: &[NormalizedEvent],
    ) -> Result<TimelineResult, ValidationError> {
        let narrative = candidate.timeline_description.trim();
        if narrative.is_empty() {
            return Err(ValidationError::EmptyNarrative);
        }
        let narrative = narrative.to_string();

        let mut session = RepairSession::new(&self.config, source, &candidate.timeline_nodes);
        let mut drafts = session.shape(candidate.timeline_nodes);
        session.dedupe_ids(&mut drafts);
        session.resolve_children(&mut drafts);
        session.enforce_single_parent(&mut drafts);
        session.cut_cycles(&mut drafts);
        session.require_root(&drafts)?;
        session.check_chronology(&drafts);

        let nodes: Vec<TimelineNode> = drafts.into_iter().map(Draft::into_node).collect();
        debug_assert_eq!(verify_forest(&nodes), Ok(()));

        tracing::debug!(
            nodes = nodes.len(),
            repairs = session.warnings.len(),
            "candidate timeline accepted"
        );

        Ok(TimelineResult {
            timeline_description: narrative,
            timeline_nodes: nodes,
            warnings: session.warnings.into_iter().map(Into::into).collect(),
        })
    }
}

/// Node under repair
#[derive(Debug, Clone)]
struct Draft {
    id: String,
    timestamp: DateTime<Utc>,
    description: String,
    media_url: Option<String>,
    children: Vec<String>,
}

impl Draft {
    fn into_node(self) -> TimelineNode {
        TimelineNode {
            id: self.id,
            timestamp: self.timestamp,
            description: self.description,
            media_url: self.media_url,
            children: self.children,
        }
    }
}

/// State for one validation pass
struct RepairSession<'a> {
    config: &'a ValidationConfig,
    source: &'a [NormalizedEvent],
    /// Every id in use, original or synthetic
    taken: HashSet<String>,
    warnings: Vec<ValidationWarning>,
}

impl<'a> RepairSession<'a> {
    fn new(config: &'a ValidationConfig, source: &'a [NormalizedEvent], raw: &[RawNode]) -> Self {
        let taken = raw
            .iter()
            .map(|n| n.id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            config,
            source,
            taken,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, warning: ValidationWarning) {
        tracing::warn!(repair = %warning, "repairing candidate timeline");
        self.warnings.push(warning);
    }

    /// Reserve `{base}-{infix}{k}` for the lowest free k
    fn fresh_id(&mut self, base: &str, infix: &str) -> String {
        let mut k = 1usize;
        loop {
            let candidate = format!("{base}-{infix}{k}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            k += 1;
        }
    }

    /// Trim fields, assign missing ids, cap descriptions, resolve timestamps
    /// and media
    fn shape(&mut self, raw: Vec<RawNode>) -> Vec<Draft> {
        let source = self.source;
        let known_media: HashSet<&str> = source
            .iter()
            .filter_map(|e| e.media_url.as_deref())
            .collect();

        let mut drafts = Vec::with_capacity(raw.len());

        for (position, node) in raw.into_iter().enumerate() {
            let description = node.description.trim();
            if description.is_empty() {
                self.warn(ValidationWarning::NodeDropped {
                    id: node.id.trim().to_string(),
                    reason: NodeDropReason::EmptyDescription,
                });
                continue;
            }

            let mut id = node.id.trim().to_string();
            if id.is_empty() {
                id = self.fresh_id("node", "");
                self.warn(ValidationWarning::MissingIdAssigned {
                    position,
                    assigned: id.clone(),
                });
            }

            let limit = self.config.max_description_chars.max(1);
            let original_chars = description.chars().count();
            let description = if original_chars > limit {
                self.warn(ValidationWarning::DescriptionTruncated {
                    id: id.clone(),
                    original_chars,
                    limit,
                });
                description.chars().take(limit).collect()
            } else {
                description.to_string()
            };

            let mut media_url = node
                .media_url
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            if let Some(media) = media_url.take() {
                if known_media.contains(media.as_str()) {
                    media_url = Some(media);
                } else {
                    self.warn(ValidationWarning::UnknownMediaCleared {
                        id: id.clone(),
                        media_url: media,
                    });
                }
            }

            let parsed = node.timestamp.as_deref().and_then(parse_timestamp);
            let timestamp = match parsed {
                Some(ts) => ts,
                None => match self.infer_event(position, media_url.as_deref()) {
                    Some(event) => {
                        let (ts, event_index) = (event.timestamp, event.index);
                        self.warn(ValidationWarning::TimestampInferred {
                            id: id.clone(),
                            event_index,
                        });
                        ts
                    }
                    None => {
                        self.warn(ValidationWarning::NodeDropped {
                            id,
                            reason: NodeDropReason::NoTimestamp,
                        });
                        continue;
                    }
                },
            };

            if media_url.is_none() {
                if let Some((event_index, media)) = self.originating_media(timestamp) {
                    self.warn(ValidationWarning::MediaInherited {
                        id: id.clone(),
                        event_index,
                    });
                    media_url = Some(media);
                }
            }

            let children = node
                .children
                .iter()
                .map(|c| c.trim().to_string())
                .collect();

            drafts.push(Draft {
                id,
                timestamp,
                description,
                media_url,
                children,
            });
        }

        drafts
    }

    /// Source event a node without a usable timestamp most likely came from
    fn infer_event(&self, position: usize, media_url: Option<&str>) -> Option<&'a NormalizedEvent> {
        let source = self.source;
        if let Some(media) = media_url {
            if let Some(event) = source.iter().find(|e| e.media_url.as_deref() == Some(media)) {
                return Some(event);
            }
        }
        source.get(position.min(source.len().saturating_sub(1)))
    }

    /// Media of the single source event at exactly `timestamp`, if any
    fn originating_media(&self, timestamp: DateTime<Utc>) -> Option<(usize, String)> {
        let mut matches = self
            .source
            .iter()
            .filter(|e| e.timestamp == timestamp)
            .filter_map(|e| e.media_url.as_ref().map(|m| (e.index, m.clone())));

        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Rename later duplicates and redirect references to them positionally
    fn dedupe_ids(&mut self, drafts: &mut [Draft]) {
        let mut seen: HashSet<String> = HashSet::with_capacity(drafts.len());
        // original id -> [(position of renamed node, new id)]
        let mut renames: HashMap<String, Vec<(usize, String)>> = HashMap::new();

        for position in 0..drafts.len() {
            let id = drafts[position].id.clone();
            if seen.insert(id.clone()) {
                continue;
            }
            let renamed = self.fresh_id(&id, "dup");
            self.warn(ValidationWarning::DuplicateIdRenamed {
                original: id.clone(),
                renamed: renamed.clone(),
            });
            drafts[position].id = renamed.clone();
            renames.entry(id).or_default().push((position, renamed));
        }

        if renames.is_empty() {
            return;
        }

        // First reference keeps the original, the j-th later one goes to the
        // j-th rename
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        let mut next_rename: HashMap<String, usize> = HashMap::new();

        for position in 0..drafts.len() {
            let parent = drafts[position].id.clone();
            for slot in 0..drafts[position].children.len() {
                let child = drafts[position].children[slot].clone();
                let Some(targets) = renames.get(&child) else {
                    continue;
                };

                let count = occurrences.entry(child.clone()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    continue;
                }

                let next = next_rename.entry(child.clone()).or_insert(0);
                let Some((target_position, target_id)) = targets.get(*next) else {
                    continue;
                };
                if *target_position == position {
                    continue;
                }

                let target_id = target_id.clone();
                *next += 1;
                drafts[position].children[slot] = target_id.clone();
                self.warn(ValidationWarning::ReferenceRewritten {
                    parent: parent.clone(),
                    from: child,
                    to: target_id,
                });
            }
        }
    }

    /// Drop dangling, repeated and self references
    fn resolve_children(&mut self, drafts: &mut [Draft]) {
        let ids: HashSet<String> = drafts.iter().map(|d| d.id.clone()).collect();

        for draft in drafts.iter_mut() {
            let parent = draft.id.clone();
            let mut seen: HashSet<String> = HashSet::new();
            let children = std::mem::take(&mut draft.children);

            for child in children {
                if child == parent {
                    self.warn(ValidationWarning::CycleEdgeCut {
                        parent: parent.clone(),
                        child,
                    });
                } else if !ids.contains(&child) {
                    self.warn(ValidationWarning::DanglingChildDropped {
                        parent: parent.clone(),
                        child,
                    });
                } else if !seen.insert(child.clone()) {
                    self.warn(ValidationWarning::DuplicateChildDropped {
                        parent: parent.clone(),
                        child,
                    });
                } else {
                    draft.children.push(child);
                }
            }
        }
    }

    /// Keep the first parent claim on each child, in node order
    fn enforce_single_parent(&mut self, drafts: &mut [Draft]) {
        let mut parent_of: HashMap<String, String> = HashMap::new();

        for draft in drafts.iter_mut() {
            let parent = draft.id.clone();
            let children = std::mem::take(&mut draft.children);

            for child in children {
                match parent_of.entry(child.clone()) {
                    Entry::Occupied(kept) => {
                        let kept_parent = kept.get().clone();
                        self.warn(ValidationWarning::SecondParentDropped {
                            child,
                            kept_parent,
                            dropped_parent: parent.clone(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(parent.clone());
                        draft.children.push(child);
                    }
                }
            }
        }
    }

    /// Cut every back edge found by a depth-first traversal started from the
    /// roots, then from any node left undiscovered
    fn cut_cycles(&mut self, drafts: &mut [Draft]) {
        let index: HashMap<&str, usize> = drafts
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.as_str(), i))
            .collect();

        let mut graph: DiGraphMap<usize, ()> =
            DiGraphMap::with_capacity(drafts.len(), drafts.len());
        for position in 0..drafts.len() {
            graph.add_node(position);
        }
        for (position, draft) in drafts.iter().enumerate() {
            for child in &draft.children {
                if let Some(&target) = index.get(child.as_str()) {
                    graph.add_edge(position, target, ());
                }
            }
        }

        let starts: Vec<usize> = (0..drafts.len())
            .filter(|&n| graph.neighbors_directed(n, Direction::Incoming).next().is_none())
            .chain(0..drafts.len())
            .collect();

        let mut back_edges = Vec::new();
        depth_first_search(&graph, starts, |event| {
            if let DfsEvent::BackEdge(from, to) = event {
                back_edges.push((from, to));
            }
        });

        for (from, to) in back_edges {
            let child = drafts[to].id.clone();
            let parent = drafts[from].id.clone();
            drafts[from].children.retain(|c| *c != child);
            self.warn(ValidationWarning::CycleEdgeCut { parent, child });
        }
    }

    fn require_root(&self, drafts: &[Draft]) -> Result<(), ValidationError> {
        if drafts.is_empty() {
            return Ok(());
        }

        let claimed: HashSet<&str> = drafts
            .iter()
            .flat_map(|d| d.children.iter().map(String::as_str))
            .collect();

        if drafts.iter().any(|d| !claimed.contains(d.id.as_str())) {
            Ok(())
        } else {
            tracing::error!(nodes = drafts.len(), "no root after repair");
            Err(ValidationError::NoRoot {
                node_count: drafts.len(),
            })
        }
    }

    /// Flag children that precede their parent by more than the tolerance
    fn check_chronology(&mut self, drafts: &[Draft]) {
        let tolerance = i64::try_from(self.config.chronology_tolerance_secs).unwrap_or(i64::MAX);
        let by_id: HashMap<&str, &Draft> = drafts.iter().map(|d| (d.id.as_str(), d)).collect();

        for parent in drafts {
            for child_id in &parent.children {
                let Some(child) = by_id.get(child_id.as_str()) else {
                    continue;
                };
                let lead_secs = (parent.timestamp - child.timestamp).num_seconds();
                if lead_secs > tolerance {
                    self.warn(ValidationWarning::ChronologyAnomaly {
                        parent: parent.id.clone(),
                        child: child.id.clone(),
                        lead_secs,
                    });
                }
            }
        }
    }
}
