//! Matchwatch — Football Monitor
//!
//! Sportmonks → klasifikace → Telegram. Provider adapter, configuration,
//! the poll loop and the daily digest; the pure rules live in `match_engine`.

pub mod config;
pub mod digest;
pub mod error;
pub mod orchestrator;
pub mod source;
pub mod sportmonks;

pub use config::{HttpConfig, MonitorConfig, PollMode};
pub use digest::{build_digest, render_digest, DailyDigest};
pub use error::{ProviderError, ProviderResult};
pub use orchestrator::{FeedOutcome, MonitorState, Orchestrator, TickReport};
pub use source::{FixtureFeed, FixtureSource};
pub use sportmonks::SportmonksClient;
