// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Weave crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`dag`] - Commit sequence fixtures (linear, forked, random, stacked)
//! - [`frames`] - Frame replay helpers for comparing graphs

pub mod config;
pub mod dag;
pub mod frames;

// Re-export commonly used items at crate root for convenience
pub use config::InMemoryConfigStore;
pub use dag::{
    commit, forked_history, heads_of, ids, linear_history, random_history, stack_on, XorShift64,
};
pub use frames::{keyframe_replays, replay_frames, replay_summaries};
