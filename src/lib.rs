//! Streaming transcript aggregation for remote computer-use agents.
//!
//! A [`Session`] owns the conversation with one remote instance. Each turn
//! folds the records of one streamed response into the transcript:
//!
//! ```text
//! bytes -> LineDecoder -> classify_line -> fold (step | message) -> RetentionPolicy
//! ```
//!
//! Framing and classification live in `chat_api`; this crate owns the fold,
//! screenshot retention, cancellation, and the two ends that produce records
//! without HTTP: [`EpisodeRecords`] (in-process runtime) and [`Relay`]
//! (NDJSON writer for a runtime).
//!
//! ## Configuration
//!
//! [`SessionConfig::apply_env`] reads:
//!
//! - `AGENT_TRANSCRIPT_MODE`: `step` (default) or `message`
//! - `AGENT_TRANSCRIPT_RETAINED_IMAGES`: screenshots kept, default 4
//! - `AGENT_TRANSCRIPT_HEALTH_CHECK`: `disabled` (default) or `every_step`

pub mod cancel;
pub mod config;
pub mod episode;
pub mod error;
pub mod relay;
pub mod retention;
pub mod session;
pub mod transcript;

pub use cancel::{CancellationCoordinator, HealthCheckPolicy};
pub use config::SessionConfig;
pub use episode::EpisodeRecords;
pub use error::{ConfigError, SessionError};
pub use relay::{Relay, RelayEnd, RelaySummary};
pub use retention::{RetentionPolicy, DEFAULT_RETAINED_IMAGES};
pub use session::{Notice, Session, SessionEvent, Submission, Turn, TurnEnd, TurnOutcome};
pub use transcript::{fold_message_record, fold_step_record, IngestMode, Transcript};
