//! rollcall-core: Face matching and attendance deduplication engine.
//!
//! Matches probe face embeddings against a roster of labeled reference
//! embeddings and keeps an append-only ledger with at most one attendance
//! record per identity per calendar date. Face detection, embedding, frame
//! capture and output persistence are pluggable collaborators.

pub mod ledger;
pub mod matcher;
pub mod provider;
pub mod roster;
pub mod sink;
pub mod source;
pub mod types;

pub use ledger::{AttendanceRecord, Ledger, RecordOutcome, SharedLedger, SkipReason};
pub use matcher::{EuclideanMatcher, MatchError, Matcher};
pub use provider::{EmbeddingProvider, ProviderError};
pub use roster::{Roster, RosterEntry, RosterLoadError};
pub use sink::{AttendanceSink, PersistenceError};
pub use source::{Frame, FrameSource, SourceError};
pub use types::{BoundingBox, Embedding, MatchResult, UNKNOWN};
