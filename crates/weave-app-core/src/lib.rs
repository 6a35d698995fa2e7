// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Weave history views (config, refs, sessions).
//! Keeps UI/repository adapters thin: callers supply commit sequences and ref
//! tips, and read back lane graphs and commit flags.

pub mod config;
pub mod refs;
pub mod session;
pub mod settings;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use refs::{RefKind, RefSet, RefTip};
pub use session::{BuildReport, RefreshReport, WeaveSession};
pub use settings::WeaveConfig;
pub use weave_core::CommitRecord;
