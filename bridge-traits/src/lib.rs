//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host the
//! gallery index core runs on.
//!
//! ## Overview
//!
//! This crate defines the contract between the core and platform-specific
//! implementations. Each trait represents a capability the core requires but
//! that differs per host:
//!
//! - [`MediaSource`](source::MediaSource): full enumeration of the media
//!   visible to the host (content index, directory tree)
//! - [`HostConditions`](background::HostConditions): whether declared
//!   execution constraints (battery, idle, network) currently hold
//! - [`Clock`](time::Clock): time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert their native errors into it and include
//! enough context (paths, permission names) to act on.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across
//! async tasks.

pub mod background;
pub mod error;
pub mod source;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{HostConditions, TaskConstraints};
pub use source::{MediaItem, MediaSource};
pub use time::{Clock, SystemClock};
