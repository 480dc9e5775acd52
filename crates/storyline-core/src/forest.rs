//! Forest invariant checks
//!
//! Independent of the repairer: answers whether a node set is a rooted
//! forest, without modifying it.

use crate::error::ForestViolation;
use crate::types::TimelineNode;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};

/// Verify that `nodes` form a rooted forest
///
/// Checks, in order:
/// 1. ids and descriptions are non-empty, ids pairwise distinct
/// 2. every child resolves, no child listed twice by one parent
/// 3. every node has at most one parent
/// 4. no node is its own descendant
/// 5. a root exists when the set is non-empty
pub fn verify_forest(nodes: &[TimelineNode]) -> Result<(), ForestViolation> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());

    for (position, node) in nodes.iter().enumerate() {
        if node.id.is_empty() {
            return Err(ForestViolation::EmptyId { position });
        }
        if node.description.trim().is_empty() {
            return Err(ForestViolation::EmptyDescription { position });
        }
        if index.insert(node.id.as_str(), position).is_some() {
            return Err(ForestViolation::DuplicateId {
                id: node.id.clone(),
            });
        }
    }

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::with_capacity(nodes.len(), nodes.len());
    let mut has_parent: HashSet<usize> = HashSet::new();

    for (position, node) in nodes.iter().enumerate() {
        graph.add_node(position);
        let mut seen = HashSet::new();

        for child in &node.children {
            let Some(&target) = index.get(child.as_str()) else {
                return Err(ForestViolation::DanglingChild {
                    parent: node.id.clone(),
                    child: child.clone(),
                });
            };
            if !seen.insert(target) {
                return Err(ForestViolation::DuplicateChild {
                    parent: node.id.clone(),
                    child: child.clone(),
                });
            }
            if !has_parent.insert(target) {
                return Err(ForestViolation::MultipleParents {
                    child: child.clone(),
                });
            }
            graph.add_edge(position, target, ());
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        return Err(ForestViolation::Cycle {
            id: nodes[cycle.node_id()].id.clone(),
        });
    }

    if !nodes.is_empty() && has_parent.len() == nodes.len() {
        return Err(ForestViolation::NoRoot);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(id: &str, children: &[&str]) -> TimelineNode {
        TimelineNode {
            id: id.to_string(),
            timestamp: Utc::now(),
            description: format!("node {id}"),
            media_url: None,
            children: children.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    #[test]
    fn accepts_forest() {
        let nodes = vec![
            node("a", &["b", "c"]),
            node("b", &[]),
            node("c", &["d"]),
            node("d", &[]),
            node("e", &[]),
        ];
        assert_eq!(verify_forest(&nodes), Ok(()));
        assert_eq!(verify_forest(&[]), Ok(()));
    }

    #[test]
    fn rejects_duplicate_id() {
        let nodes = vec![node("a", &[]), node("a", &[])];
        assert_eq!(
            verify_forest(&nodes),
            Err(ForestViolation::DuplicateId { id: "a".into() })
        );
    }

    #[test]
    fn rejects_dangling_and_duplicate_children() {
        let nodes = vec![node("a", &["ghost"])];
        assert!(matches!(
            verify_forest(&nodes),
            Err(ForestViolation::DanglingChild { .. })
        ));

        let nodes = vec![node("a", &["b", "b"]), node("b", &[])];
        assert!(matches!(
            verify_forest(&nodes),
            Err(ForestViolation::DuplicateChild { .. })
        ));
    }

    #[test]
    fn rejects_second_parent() {
        let nodes = vec![node("a", &["c"]), node("b", &["c"]), node("c", &[])];
        assert_eq!(
            verify_forest(&nodes),
            Err(ForestViolation::MultipleParents { child: "c".into() })
        );
    }

    #[test]
    fn rejects_cycles() {
        let nodes = vec![node("a", &["b"]), node("b", &["a"])];
        assert!(matches!(verify_forest(&nodes), Err(ForestViolation::Cycle { .. })));

        let nodes = vec![node("a", &["a"])];
        assert!(matches!(verify_forest(&nodes), Err(ForestViolation::Cycle { .. })));
    }
}
