// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared defaults.

/// Rows between keyframes saved while weaving.
pub const DEFAULT_KEYFRAME_INTERVAL: usize = 5000;
