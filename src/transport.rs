//! The transport, through which the policy engine reaches the protocol and physical layers.
//!
//! A transport frames messages, handles GoodCRC, retries and message IDs, and actuates the port
//! hardware (CC termination, VBUS and VCONN switches).
use core::future::Future;

use crate::message::Message;
use crate::{DataRole, PowerRole};

/// Receive errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// Received message discarded, e.g. due to CRC errors or a malformed message.
    Discarded,
    /// A recoverable transport condition.
    ///
    /// The policy engine re-enters its current waiting state, without advancing any counter.
    Abnormal,
}

/// CC line termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcControl {
    /// Pull-up, presented by a source.
    Rp,
    /// Pull-down, presented by a sink.
    Rd,
    /// No termination.
    Open,
}

/// VCONN supply state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VconnSource {
    /// This port supplies VCONN.
    On,
    /// This port does not supply VCONN.
    Off,
}

/// The transport trait to implement by the user application.
pub trait Transport {
    /// Transmit a message.
    ///
    /// Resolves to `true`, if the message was transmitted and acknowledged with GoodCRC.
    fn send(&mut self, message: &Message) -> impl Future<Output = bool>;

    /// Receive the next message.
    ///
    /// GoodCRC messages may be reported, and are ignored by the policy engine.
    /// Must be cancel-safe, since the policy engine races it against timers.
    fn receive(&mut self) -> impl Future<Output = Result<Message, RxError>>;

    /// Transmit hard reset signalling.
    fn hard_reset(&mut self) -> impl Future<Output = ()>;

    /// Wait for VBUS to become available.
    fn wait_for_vbus(&mut self) -> impl Future<Output = ()>;

    /// Reset the protocol layer (message IDs and retry state).
    fn protocol_reset(&mut self);

    /// Reset the physical driver to its default state.
    fn driver_reset(&mut self);

    /// Configure the CC line termination.
    fn set_cc_control(&mut self, cc_control: CcControl);

    /// Set the port's power role.
    fn set_power_role(&mut self, role: PowerRole);

    /// The port's power role.
    fn power_role(&self) -> PowerRole;

    /// Set the port's data role.
    fn set_data_role(&mut self, role: DataRole);

    /// The port's data role.
    fn data_role(&self) -> DataRole;

    /// Enable or disable the VCONN supply.
    fn set_vconn_source(&mut self, vconn_source: VconnSource);

    /// The VCONN supply state.
    fn vconn_source(&self) -> VconnSource;

    /// Switch the VBUS supply of this port on or off.
    fn set_otg_control(&mut self, on: bool);
}
