//! Narrative request payload
//!
//! Builds what the backend sees for one synthesis attempt:
//! - The output contract, as prose and as a JSON Schema of `RawCandidate`
//! - The project description and the ordered event list
//!
//! Also parses backend text back into a `RawCandidate`.

use serde_json::{json, Value};
use std::sync::OnceLock;
use storyline_core::{BackendError, NormalizedEvent, ProjectContext, RawCandidate};

/// Output contract declared to the backend
///
/// Compliance is not trusted; the validator enforces it.
pub const OUTPUT_CONTRACT: &str = "\
You turn a project's creation history into a branching narrative timeline.

Return a single JSON object with exactly these fields:
- timelineDescription: narrative prose summarizing the whole creative arc.
- timelineNodes: an array of nodes, each with
  - id: a short identifier. Every node MUST have a unique id.
  - timestamp: the ISO-8601 timestamp of the event the node is based on.
  - description: a narrative summary of that moment, under 500 characters.
  - mediaUrl: the mediaUrl of the originating event, if it has one.
  - children: ids of the nodes that follow from this one. Every entry MUST
    be the id of another node in the array.

The nodes MUST form a forest: a node is never its own descendant and
appears in at most one other node's children. At least one node has no
parent. Base every node on the supplied events; do not invent media.";

/// Payload for one backend call
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeRequest {
    /// Project description, trimmed
    pub project_description: String,
    /// Events in ascending time order
    pub events: Vec<NormalizedEvent>,
}

impl NarrativeRequest {
    /// Build request from context and normalized events
    #[must_use]
    pub fn build(context: &ProjectContext, events: &[NormalizedEvent]) -> Self {
        Self {
            project_description: context.project_description.trim().to_string(),
            events: events.to_vec(),
        }
    }

    /// Instructions carrying the output contract
    #[inline]
    #[must_use]
    pub fn system_prompt(&self) -> &'static str {
        OUTPUT_CONTRACT
    }

    /// Project and events rendered as JSON for the user turn
    #[must_use]
    pub fn user_prompt(&self) -> String {
        let events: Vec<Value> = self
            .events
            .iter()
            .map(|e| {
                let mut event = json!({
                    "timestamp": e.timestamp.to_rfc3339(),
                    "description": e.description,
                });
                if let Some(media) = &e.media_url {
                    event["mediaUrl"] = Value::String(media.clone());
                }
                event
            })
            .collect();

        json!({
            "projectDescription": self.project_description,
            "creationEvents": events,
        })
        .to_string()
    }

    /// JSON Schema of the expected output
    #[inline]
    #[must_use]
    pub fn output_schema(&self) -> &'static Value {
        candidate_schema()
    }
}

/// JSON Schema of [`RawCandidate`], generated once
pub fn candidate_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        serde_json::to_value(schemars::schema_for!(RawCandidate)).unwrap_or(Value::Null)
    })
}

/// Parse backend text into a candidate
///
/// Tolerates surrounding whitespace and a Markdown code fence.
///
/// # Errors
/// `BackendError::Malformed` if the text is empty or does not match the
/// candidate shape
pub fn parse_candidate(text: &str) -> Result<RawCandidate, BackendError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(BackendError::malformed("empty payload"));
    }

    serde_json::from_str(body).map_err(|e| {
        BackendError::malformed(format!("payload does not match candidate shape: {e}"))
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // Info string (`json`) ends at the first newline, or at the payload when
    // the whole fence sits on one line
    let body = match rest.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with(['{', '[']) => body,
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyline_core::{normalize, CreationEvent};

    fn request() -> NarrativeRequest {
        let events = normalize(&[
            CreationEvent::new("2023-01-05", "First draft"),
            CreationEvent::new("2023-01-01", "Sketch idea").with_media("s3://sketch.png"),
        ]);
        NarrativeRequest::build(&ProjectContext::new("  A mural  "), &events.events)
    }

    #[test]
    fn user_prompt_embeds_ordered_events() {
        let prompt: Value = serde_json::from_str(&request().user_prompt()).unwrap();

        assert_eq!(prompt["projectDescription"], "A mural");
        assert_eq!(prompt["creationEvents"][0]["description"], "Sketch idea");
        assert_eq!(prompt["creationEvents"][0]["mediaUrl"], "s3://sketch.png");
        assert_eq!(prompt["creationEvents"][1]["timestamp"], "2023-01-05T00:00:00+00:00");
        assert!(prompt["creationEvents"][1].get("mediaUrl").is_none());
    }

    #[test]
    fn schema_declares_required_fields() {
        let schema = request().output_schema().clone();
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("timelineDescription")));
        assert!(required.contains(&json!("timelineNodes")));
    }

    #[test]
    fn parse_candidate_plain_and_fenced() {
        let plain = r#"{"timelineDescription":"arc","timelineNodes":[]}"#;
        assert_eq!(parse_candidate(plain).unwrap().timeline_description, "arc");

        let fenced = "```json\n{\"timelineDescription\":\"arc\",\"timelineNodes\":[]}\n```";
        assert_eq!(parse_candidate(fenced).unwrap().timeline_description, "arc");
    }

    #[test]
    fn parse_candidate_single_line_fence() {
        let tagged = "```json {\"timelineDescription\":\"arc\",\"timelineNodes\":[]}```";
        assert_eq!(parse_candidate(tagged).unwrap().timeline_description, "arc");

        let bare = "```{\"timelineDescription\":\"arc\",\n\"timelineNodes\":[]}```";
        assert_eq!(parse_candidate(bare).unwrap().timeline_description, "arc");
    }

    #[test]
    fn parse_candidate_rejects_bad_shape() {
        assert!(matches!(
            parse_candidate("   "),
            Err(BackendError::Malformed { .. })
        ));
        assert!(matches!(
            parse_candidate(r#"{"timelineNodes": []}"#),
            Err(BackendError::Malformed { .. })
        ));
        assert!(matches!(
            parse_candidate("Sorry, I cannot help with that."),
            Err(BackendError::Malformed { .. })
        ));
    }
}
