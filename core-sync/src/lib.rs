//! # Gallery Sync Core
//!
//! Keeps the persisted media index converged with an external media source
//! through repeated full-enumeration scans.
//!
//! ## Responsibilities
//!
//! - **Diff engine**: O(n) set reconciliation between a source snapshot and
//!   the index, a time-based staleness gate between full and differential
//!   modes, and an order-independent fingerprint of the observed identity
//!   set ([`engine`]).
//! - **Sync task**: the sequential enumerate/diff/apply/persist pipeline,
//!   collapsing every failure to a retryable outcome ([`task`]).
//! - **Scheduler**: periodic and ad-hoc triggering with keep-existing
//!   periodic policy and bounded exponential backoff ([`scheduler`]).
//!
//! ## Non-Responsibilities
//!
//! - Source enumeration (bridge implementations own that)
//! - Persistence (`core-index` owns the repositories)
//! - UI-facing query surfaces

pub mod engine;
pub mod error;
pub mod scheduler;
pub mod task;

pub use engine::{DiffEngine, SyncResult, DEFAULT_STALENESS_WINDOW_MS};
pub use error::{Result, SyncError};
pub use scheduler::{BackoffPolicy, PeriodicSchedule, SchedulerStatus, SyncScheduler};
pub use task::{SyncRunner, SyncTask, TaskOutcome};
