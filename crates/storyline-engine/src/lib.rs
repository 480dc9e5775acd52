//! Storyline Engine - configuration and orchestration
//!
//! Wires the core validator to a narrative backend:
//! - [`StorylineConfig`] loaded from TOML
//! - [`TimelineSynthesizer`] with bounded retries, per-call deadlines and
//!   cancellation
//!
//! # Example
//!
//! ```rust,no_run
//! use storyline_engine::{StorylineConfig, TimelineSynthesizer};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StorylineConfig::load(std::path::Path::new("storyline.toml"))?;
//! let synthesizer = TimelineSynthesizer::from_config(&config)?;
//! let timeline = synthesizer.synthesize_timeline("A mural", Vec::new()).await?;
//! assert!(timeline.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod synthesizer;

pub use config::{ConfigError, StorylineConfig, SynthesisConfig};
pub use synthesizer::TimelineSynthesizer;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running synthesis
    pub use crate::{StorylineConfig, TimelineSynthesizer};
    pub use storyline_core::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
