//! Background Execution Constraints
//!
//! Declarative constraints for background sync runs, plus the probe trait
//! the scheduler uses to ask the host whether they are currently satisfied.

use async_trait::async_trait;

use crate::error::Result;

/// Execution constraints for a scheduled sync run.
///
/// Constraints are declarative: the scheduler evaluates them through a
/// [`HostConditions`] probe before each periodic run and skips the run when
/// they are not met. Immediate runs carry no constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConstraints {
    /// Require any network connection
    pub requires_network: bool,
    /// Require the battery to not be critically low
    pub battery_not_low: bool,
    /// Require the device to be otherwise idle
    pub requires_idle: bool,
}

impl TaskConstraints {
    /// Constraints of an immediate, user-triggered run: none.
    pub fn none() -> Self {
        Self {
            requires_network: false,
            battery_not_low: false,
            requires_idle: false,
        }
    }
}

impl Default for TaskConstraints {
    /// Defaults for the periodic slot: local scan needs no network, but
    /// should only run when the battery is healthy and the device is idle.
    fn default() -> Self {
        Self {
            requires_network: false,
            battery_not_low: true,
            requires_idle: true,
        }
    }
}

/// Host conditions probe
///
/// Answers whether a set of [`TaskConstraints`] is currently satisfied.
/// Hosts back this with their battery/idle/connectivity signals; when no
/// probe is wired, the scheduler assumes constraints hold.
#[async_trait]
pub trait HostConditions: Send + Sync {
    /// Check whether all of the given constraints currently hold.
    async fn satisfied(&self, constraints: &TaskConstraints) -> Result<bool>;
}
