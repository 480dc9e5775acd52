//! Repair scenarios for well-known backend mistakes.
//!
//! Each test feeds the validator a candidate exhibiting one defect and checks
//! both the repaired shape and the reported warning.

use pretty_assertions::assert_eq;
use storyline_core::{
    normalize, verify_forest, CreationEvent, NormalizedEvent, RawCandidate, RawNode,
    SynthesisWarning, TimelineValidator, ValidationWarning,
};

fn source_events() -> Vec<NormalizedEvent> {
    normalize(&[
        CreationEvent::new("2023-01-01", "Sketch idea"),
        CreationEvent::new("2023-01-05", "First draft"),
    ])
    .events
}

fn has_warning(warnings: &[SynthesisWarning], expected: &ValidationWarning) -> bool {
    warnings
        .iter()
        .any(|w| matches!(w, SynthesisWarning::Validation(v) if v == expected))
}

#[test]
fn linear_two_node_timeline_accepted_as_is() {
    let candidate = RawCandidate::new(
        "From sketch to draft",
        vec![
            RawNode::new("A", "The idea takes shape")
                .at("2023-01-01")
                .with_children(["B"]),
            RawNode::new("B", "A first draft").at("2023-01-05"),
        ],
    );

    let result = TimelineValidator::default()
        .validate(candidate, &source_events())
        .unwrap();

    assert_eq!(result.timeline_nodes.len(), 2);
    let roots: Vec<_> = result.roots().map(|n| n.id.as_str()).collect();
    assert_eq!(roots, vec!["A"]);
    assert_eq!(result.in_degree("B"), 1);
    assert!(result.warnings.is_empty());
}

#[test]
fn duplicate_ids_renamed() {
    let candidate = RawCandidate::new(
        "Two beginnings",
        vec![
            RawNode::new("n1", "One").at("2023-01-01"),
            RawNode::new("n1", "Two").at("2023-01-05"),
        ],
    );

    let result = TimelineValidator::default()
        .validate(candidate, &source_events())
        .unwrap();

    let ids: Vec<_> = result.timeline_nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["n1", "n1-dup1"]);
    assert!(has_warning(
        &result.warnings,
        &ValidationWarning::DuplicateIdRenamed {
            original: "n1".into(),
            renamed: "n1-dup1".into(),
        }
    ));
}

#[test]
fn dangling_reference_dropped() {
    let candidate = RawCandidate::new(
        "A lonely idea",
        vec![RawNode::new("A", "The idea")
            .at("2023-01-01")
            .with_children(["does-not-exist"])],
    );

    let result = TimelineValidator::default()
        .validate(candidate, &source_events())
        .unwrap();

    assert!(result.timeline_nodes[0].children.is_empty());
    assert!(has_warning(
        &result.warnings,
        &ValidationWarning::DanglingChildDropped {
            parent: "A".into(),
            child: "does-not-exist".into(),
        }
    ));
}

#[test]
fn mutual_children_cycle_cut() {
    let candidate = RawCandidate::new(
        "Going in circles",
        vec![
            RawNode::new("A", "Idea").at("2023-01-01").with_children(["B"]),
            RawNode::new("B", "Draft").at("2023-01-05").with_children(["A"]),
        ],
    );

    let result = TimelineValidator::default()
        .validate(candidate, &source_events())
        .unwrap();

    let roots: Vec<_> = result.roots().map(|n| n.id.as_str()).collect();
    assert_eq!(roots, vec!["A"]);
    assert_eq!(result.node("A").unwrap().children, vec!["B".to_string()]);
    assert!(result.node("B").unwrap().children.is_empty());
    assert!(has_warning(
        &result.warnings,
        &ValidationWarning::CycleEdgeCut {
            parent: "B".into(),
            child: "A".into(),
        }
    ));
    assert_eq!(verify_forest(&result.timeline_nodes), Ok(()));
}

#[test]
fn result_serializes_with_camel_case_contract() {
    let candidate = RawCandidate::new(
        "Arc",
        vec![RawNode::new("A", "Idea").at("2023-01-01")],
    );
    let result = TimelineValidator::default()
        .validate(candidate, &source_events())
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["timelineDescription"], "Arc");
    assert_eq!(json["timelineNodes"][0]["id"], "A");
    assert_eq!(json["timelineNodes"][0]["timestamp"], "2023-01-01T00:00:00Z");
}
