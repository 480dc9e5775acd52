//! Storyline Core - timeline types and integrity layer
//!
//! Everything in synthesis that does not talk to the network:
//! - Caller, backend and result types
//! - Event normalization
//! - Candidate validation and repair into a rooted forest
//! - Independent forest invariant checks
//!
//! # Example
//!
//! ```rust
//! use storyline_core::{normalize, CreationEvent, RawCandidate, RawNode, TimelineValidator};
//!
//! let events = normalize(&[
//!     CreationEvent::new("2023-01-01", "Sketch idea"),
//!     CreationEvent::new("2023-01-05", "First draft"),
//! ]);
//!
//! let candidate = RawCandidate::new(
//!     "From a sketch to a draft",
//!     vec![
//!         RawNode::new("a", "The idea").at("2023-01-01").with_children(["b"]),
//!         RawNode::new("b", "The draft").at("2023-01-05"),
//!     ],
//! );
//!
//! let timeline = TimelineValidator::default()
//!     .validate(candidate, &events.events)
//!     .unwrap();
//! assert_eq!(timeline.roots().count(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod forest;
pub mod normalize;
pub mod types;
pub mod validation;

pub use error::{
    BackendError, BackendErrorKind, ForestViolation, NodeDropReason, NormalizationWarning,
    SynthesisError, SynthesisWarning, ValidationError, ValidationWarning,
};
pub use forest::verify_forest;
pub use normalize::{normalize, parse_timestamp, Normalized};
pub use types::{
    CreationEvent, NormalizedEvent, ProjectContext, RawCandidate, RawNode, TimelineNode,
    TimelineResult,
};
pub use validation::{TimelineValidator, ValidationConfig};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Storyline Core
    pub use crate::{
        normalize, CreationEvent, ProjectContext, RawCandidate, RawNode, SynthesisError,
        TimelineNode, TimelineResult, TimelineValidator,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
