//! Activity log: a best-effort JSONL record of engine invocations from the
//! CLI and the web dashboard, plus the aggregation behind `horizon activity`.

pub mod logger;
pub mod reporter;

pub use logger::{ActivityEntry, ActivityLog};
