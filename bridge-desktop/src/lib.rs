//! # Desktop Bridge Implementations
//!
//! Desktop-native implementations of the platform contracts in
//! `bridge-traits`: a recursive file-system media source and a host
//! condition probe.

pub mod background;
pub mod media_source;

pub use background::DesktopConditions;
pub use media_source::FileSystemMediaSource;
