//! Turns raw Tennessee General Assembly exports into one outcome-labelled
//! dataset per legislative era.
//!
//! Bill metadata, procedural actions and extracted bill text are read from
//! the exports left by the fetch and conversion tools, actions are classified
//! into outcome flags, text is stripped of statutory boilerplate, and the
//! tables are joined 1:1 on (session, bill_id) before being written as JSON.

pub mod classifier;
pub mod config;
pub mod emitter;
pub mod error;
pub mod joiner;
pub mod normalizer;
pub mod patterns;
pub mod pipeline;
pub mod sources;
pub mod types;

pub use classifier::ActionClassifier;
pub use config::{Config, ConfigBuilder};
pub use emitter::Emitter;
pub use error::{Error, JoinSide, JoinStage, Result, Stage};
pub use joiner::{JoinInputs, RecordJoiner};
pub use normalizer::{canonical_bill_id, parse_session_label, TextNormalizer};
pub use patterns::{load_patterns, ActionPatterns, PatternSet, TextPatterns};
pub use pipeline::{PipelineProcessor, RunReport};
pub use types::{
    Action, Bill, BillId, BillKey, BillRecord, BillText, Chamber, Era, FlagTable, FlagTables,
    OutcomeFlags, SponsorRow, UnanimousTable,
};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, ConfigBuilder};
    pub use crate::error::{Error, Result};
    pub use crate::pipeline::{PipelineProcessor, RunReport};
    pub use crate::types::{BillRecord, Era};
    pub use futures::StreamExt;
}
