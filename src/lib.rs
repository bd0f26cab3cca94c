//! USB PD policy engine.
//!
//! Implements the protocol state machine of a USB-C PD port: power contract negotiation as source
//! or sink, data role, power role and VCONN swaps, and structured VDM alternate mode discovery.
//!
//! The physical and protocol layers are reached through the [`transport::Transport`] trait,
//! device policy through the [`device_policy_manager::DevicePolicyManager`] trait.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

// This must go first, so that the logging macros are visible to all other modules.
mod fmt;

pub mod config;
pub mod counters;
pub mod device_policy_manager;
pub mod message;
pub mod policy_engine;
pub mod port;
pub mod timers;
pub mod transport;
pub mod units;

#[cfg(test)]
mod dummy;

/// The power role of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerRole {
    /// The port provides power on VBUS.
    Source,
    /// The port consumes power from VBUS.
    Sink,
}

impl From<bool> for PowerRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Sink,
            true => Self::Source,
        }
    }
}

impl From<PowerRole> for bool {
    fn from(role: PowerRole) -> bool {
        match role {
            PowerRole::Sink => false,
            PowerRole::Source => true,
        }
    }
}

/// The data role of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataRole {
    /// Upstream facing port (device).
    Ufp,
    /// Downstream facing port (host).
    Dfp,
}

impl From<bool> for DataRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Ufp,
            true => Self::Dfp,
        }
    }
}

impl From<DataRole> for bool {
    fn from(role: DataRole) -> bool {
        match role {
            DataRole::Ufp => false,
            DataRole::Dfp => true,
        }
    }
}
