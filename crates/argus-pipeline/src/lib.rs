//! Pipeline orchestration: fetch → parse → dedup → enqueue per source, and
//! claim → classify → advance per queue entry, plus the review command
//! handlers.
//!
//! Failures are isolated at the narrowest sensible unit — one bad item
//! never aborts its source, one bad source never aborts the rest.

pub mod error;
pub mod ingest;
pub mod process;
pub mod retry;
pub mod review;

pub use error::PipelineError;
pub use ingest::{
    ingest_canonical, ingest_csv, ingest_manual, ingest_source, run_source_fetch, FetchRun,
    IngestOutcome, DEFAULT_PRIORITY, MANUAL_PRIORITY,
};
pub use process::{drain_queue, process_next, DrainSummary, ProcessDisposition, ProcessOutcome};
pub use review::{decide, decide_all, publish_approved, DecisionOutcome};
