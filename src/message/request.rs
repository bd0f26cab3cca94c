//! Definitions of request data objects, which a sink uses to select a supply.
use proc_bitfield::bitfield;
use uom::si::electric_current::milliampere;
use uom::si::electric_potential::millivolt;

use super::pdo::{Capabilities, PowerDataObject};
use crate::units::{ElectricCurrent, ElectricPotential};

bitfield! {
    /// A request data object, with the fields that are common to all supply kinds.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct RequestDataObject(pub u32): Debug, FromStorage, IntoStorage {
        /// Valid range 1..=14
        pub object_position: u8 @ 28..=31,
        /// GiveBack flag
        pub giveback_flag: bool @ 27,
        /// Capability mismatch
        pub capability_mismatch: bool @ 26,
        /// USB communications capable
        pub usb_communications_capable: bool @ 25,
        /// No USB Suspend
        pub no_usb_suspend: bool @ 24,
        /// Unchunked extended messages supported
        pub unchunked_extended_messages_supported: bool @ 23,
    }
}

impl RequestDataObject {
    /// View as a request for a fixed or variable supply.
    pub fn fixed_variable(self) -> FixedVariableRequest {
        FixedVariableRequest(self.0)
    }

    /// View as a request for a programmable supply.
    pub fn pps(self) -> PpsRequest {
        PpsRequest(self.0)
    }

    /// The power data object that this request refers to.
    pub fn pdo(self, capabilities: &Capabilities) -> Option<PowerDataObject> {
        capabilities.get(self.object_position()).copied()
    }
}

bitfield! {
    /// A request for a fixed or variable supply.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct FixedVariableRequest(pub u32): Debug, FromStorage, IntoStorage {
        /// Valid range 1..=14
        pub object_position: u8 @ 28..=31,
        /// GiveBack flag
        pub giveback_flag: bool @ 27,
        /// Capability mismatch
        pub capability_mismatch: bool @ 26,
        /// USB communications capable
        pub usb_communications_capable: bool @ 25,
        /// No USB Suspend
        pub no_usb_suspend: bool @ 24,
        /// Unchunked extended messages supported
        pub unchunked_extended_messages_supported: bool @ 23,
        /// Operating current in 10mA units
        pub raw_operating_current: u16 @ 10..=19,
        /// Maximum operating current in 10mA units
        pub raw_max_operating_current: u16 @ 0..=9,
    }
}

impl FixedVariableRequest {
    /// Create a request for the supply at `object_position`, with currents in 10 mA units.
    pub fn new(object_position: u8, raw_operating_current: u16, raw_max_operating_current: u16) -> Self {
        Self(0)
            .with_object_position(object_position)
            .with_raw_operating_current(raw_operating_current)
            .with_raw_max_operating_current(raw_max_operating_current)
    }

    /// The operating current.
    pub fn operating_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<milliampere>(f32::from(self.raw_operating_current()) * 10.0)
    }

    /// The maximum operating current.
    pub fn max_operating_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<milliampere>(f32::from(self.raw_max_operating_current()) * 10.0)
    }
}

impl From<FixedVariableRequest> for RequestDataObject {
    fn from(request: FixedVariableRequest) -> Self {
        Self(request.0)
    }
}

bitfield! {
    /// A request for a programmable power supply.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PpsRequest(pub u32): Debug, FromStorage, IntoStorage {
        /// Valid range 1..=14
        pub object_position: u8 @ 28..=31,
        /// Capability mismatch
        pub capability_mismatch: bool @ 26,
        /// USB communications capable
        pub usb_communications_capable: bool @ 25,
        /// No USB Suspend
        pub no_usb_suspend: bool @ 24,
        /// Unchunked extended messages supported
        pub unchunked_extended_messages_supported: bool @ 23,
        /// Output voltage in 20mV units
        pub raw_output_voltage: u16 @ 9..=20,
        /// Operating current in 50mA units
        pub raw_operating_current: u8 @ 0..=6,
    }
}

impl PpsRequest {
    /// The requested output voltage.
    pub fn output_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_output_voltage()) * 20.0)
    }

    /// The operating current.
    pub fn operating_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<milliampere>(f32::from(self.raw_operating_current()) * 50.0)
    }
}

impl From<PpsRequest> for RequestDataObject {
    fn from(request: PpsRequest) -> Self {
        Self(request.0)
    }
}
