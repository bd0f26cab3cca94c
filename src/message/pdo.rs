//! Definitions of power data objects, as carried by source and sink capabilities.
use heapless::Vec;
use proc_bitfield::bitfield;
use uom::si::electric_current::milliampere;
use uom::si::electric_potential::millivolt;
use uom::si::power::milliwatt;

use super::MAX_DATA_OBJECTS;
use crate::units::{ElectricCurrent, ElectricPotential, Power};

/// A power data object holds information about one type of supply.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerDataObject {
    /// Fixed voltage supply.
    FixedSupply(FixedSupply),
    /// Battery supply.
    Battery(Battery),
    /// Variable voltage supply.
    VariableSupply(VariableSupply),
    /// Programmable power supply.
    Pps(SprProgrammablePowerSupply),
    /// Unknown kind of power data object.
    Unknown(RawPowerDataObject),
}

impl From<u32> for PowerDataObject {
    fn from(raw: u32) -> Self {
        let pdo = RawPowerDataObject(raw);
        match pdo.kind() {
            0b00 => Self::FixedSupply(FixedSupply(raw)),
            0b01 => Self::Battery(Battery(raw)),
            0b10 => Self::VariableSupply(VariableSupply(raw)),
            // Only SPR PPS is supported among augmented supplies.
            0b11 if SprProgrammablePowerSupply(raw).supply() == 0b00 => {
                Self::Pps(SprProgrammablePowerSupply(raw))
            }
            _ => Self::Unknown(pdo),
        }
    }
}

impl From<PowerDataObject> for u32 {
    fn from(pdo: PowerDataObject) -> Self {
        match pdo {
            PowerDataObject::FixedSupply(p) => p.0,
            PowerDataObject::Battery(p) => p.0,
            PowerDataObject::VariableSupply(p) => p.0,
            PowerDataObject::Pps(p) => p.0,
            PowerDataObject::Unknown(p) => p.0,
        }
    }
}

bitfield! {
    /// A raw power data object.
    ///
    /// Used as a fallback for encoding unknown supply types.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct RawPowerDataObject(pub u32): Debug, FromStorage, IntoStorage {
        /// The kind of power data object.
        pub kind: u8 @ 30..=31,
    }
}

bitfield! {
    /// A fixed voltage supply PDO.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct FixedSupply(pub u32): Debug, FromStorage, IntoStorage {
        /// Fixed supply
        pub kind: u8 @ 30..=31,
        /// Dual-role power
        pub dual_role_power: bool @ 29,
        /// USB suspend supported (source), or higher capability (sink)
        pub usb_suspend_supported: bool @ 28,
        /// Unconstrained power
        pub unconstrained_power: bool @ 27,
        /// USB communications capable
        pub usb_communications_capable: bool @ 26,
        /// Dual-role data
        pub dual_role_data: bool @ 25,
        /// Peak current
        pub peak_current: u8 @ 20..=21,
        /// Voltage in 50 mV units
        pub raw_voltage: u16 @ 10..=19,
        /// Maximum current in 10 mA units
        pub raw_max_current: u16 @ 0..=9,
    }
}

#[allow(clippy::derivable_impls)]
impl Default for FixedSupply {
    fn default() -> Self {
        Self(0)
    }
}

impl FixedSupply {
    /// Create a fixed supply PDO from a voltage in 50 mV units, and a current in 10 mA units.
    pub fn new(raw_voltage: u16, raw_max_current: u16) -> Self {
        Self::default()
            .with_raw_voltage(raw_voltage)
            .with_raw_max_current(raw_max_current)
    }

    /// The vSafe5V supply, with a current in 10 mA units.
    pub fn new_vsafe5v(raw_max_current: u16) -> Self {
        Self::new(100, raw_max_current)
    }

    /// The supply voltage.
    pub fn voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_voltage()) * 50.0)
    }

    /// The maximum supply current.
    pub fn max_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<milliampere>(f32::from(self.raw_max_current()) * 10.0)
    }
}

bitfield! {
    /// A battery supply PDO.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Battery(pub u32): Debug, FromStorage, IntoStorage {
        /// Battery
        pub kind: u8 @ 30..=31,
        /// Maximum Voltage in 50 mV units
        pub raw_max_voltage: u16 @ 20..=29,
        /// Minimum Voltage in 50 mV units
        pub raw_min_voltage: u16 @ 10..=19,
        /// Maximum Allowable Power in 250 mW units
        pub raw_max_power: u16 @ 0..=9,
    }
}

impl Battery {
    /// The maximum battery voltage.
    pub fn max_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_max_voltage()) * 50.0)
    }

    /// The minimum battery voltage.
    pub fn min_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_min_voltage()) * 50.0)
    }

    /// The maximum allowable power.
    pub fn max_power(&self) -> Power {
        Power::new::<milliwatt>(f32::from(self.raw_max_power()) * 250.0)
    }
}

bitfield! {
    /// A variable supply PDO.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct VariableSupply(pub u32): Debug, FromStorage, IntoStorage {
        /// Variable supply (non-battery)
        pub kind: u8 @ 30..=31,
        /// Maximum Voltage in 50mV units
        pub raw_max_voltage: u16 @ 20..=29,
        /// Minimum Voltage in 50mV units
        pub raw_min_voltage: u16 @ 10..=19,
        /// Maximum current in 10mA units
        pub raw_max_current: u16 @ 0..=9,
    }
}

impl VariableSupply {
    /// The maximum supply voltage.
    pub fn max_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_max_voltage()) * 50.0)
    }

    /// The minimum supply voltage.
    pub fn min_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_min_voltage()) * 50.0)
    }

    /// The maximum supply current.
    pub fn max_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<milliampere>(f32::from(self.raw_max_current()) * 10.0)
    }
}

bitfield! {
    /// An SPR programmable power supply PDO.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SprProgrammablePowerSupply(pub u32): Debug, FromStorage, IntoStorage {
        /// Augmented power data object
        pub kind: u8 @ 30..=31,
        /// SPR programmable power supply
        pub supply: u8 @ 28..=29,
        /// PPS power limited
        pub pps_power_limited: bool @ 27,
        /// Maximum voltage in 100mV increments
        pub raw_max_voltage: u8 @ 17..=24,
        /// Minimum Voltage in 100mV increments
        pub raw_min_voltage: u8 @ 8..=15,
        /// Maximum Current in 50mA increments
        pub raw_max_current: u8 @ 0..=6,
    }
}

impl Default for SprProgrammablePowerSupply {
    fn default() -> Self {
        Self(0).with_kind(0b11).with_supply(0b00)
    }
}

impl SprProgrammablePowerSupply {
    /// The maximum output voltage.
    pub fn max_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_max_voltage()) * 100.0)
    }

    /// The minimum output voltage.
    pub fn min_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<millivolt>(f32::from(self.raw_min_voltage()) * 100.0)
    }

    /// The maximum output current.
    pub fn max_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<milliampere>(f32::from(self.raw_max_current()) * 50.0)
    }
}

/// A list of power data objects, as advertised in a capabilities message.
///
/// Object positions are one-based, as in request data objects.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities(pub Vec<PowerDataObject, MAX_DATA_OBJECTS>);

/// Capabilities of a source, as carried by a Source_Capabilities message.
pub type SourceCapabilities = Capabilities;

/// Capabilities of a sink, as carried by a Sink_Capabilities message.
pub type SinkCapabilities = Capabilities;

impl Capabilities {
    /// Parse capabilities from raw data objects.
    pub fn from_objects(objects: &[u32]) -> Self {
        Self(
            objects
                .iter()
                .copied()
                .take(MAX_DATA_OBJECTS)
                .map(PowerDataObject::from)
                .collect(),
        )
    }

    /// Serialize capabilities to raw data objects.
    pub fn to_objects(&self) -> Vec<u32, MAX_DATA_OBJECTS> {
        self.0.iter().copied().map(u32::from).collect()
    }

    /// All power data objects.
    pub fn pdos(&self) -> &[PowerDataObject] {
        &self.0
    }

    /// The power data object at a one-based object position.
    pub fn get(&self, position: u8) -> Option<&PowerDataObject> {
        usize::from(position).checked_sub(1).and_then(|index| self.0.get(index))
    }

    /// The vSafe5V supply, which shall always be the first PDO.
    pub fn vsafe_5v(&self) -> Option<&FixedSupply> {
        self.0.first().and_then(|supply| {
            if let PowerDataObject::FixedSupply(supply) = supply {
                Some(supply)
            } else {
                None
            }
        })
    }

    /// Whether the port is dual-role power capable, as announced by the vSafe5V PDO.
    pub fn dual_role_power(&self) -> bool {
        self.vsafe_5v().map(FixedSupply::dual_role_power).unwrap_or_default()
    }

    /// Whether no PDO is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use uom::si::electric_current::milliampere;
    use uom::si::electric_potential::millivolt;

    use super::{Capabilities, FixedSupply, PowerDataObject};

    fn approx(value: f32, expected: f32) -> bool {
        (value - expected).abs() < 0.5
    }

    #[test]
    fn test_parse_source_capabilities() {
        // 5 V @ 3 A (dual-role power), 9 V @ 3 A, PPS 3.3-11 V @ 3 A
        let caps = Capabilities::from_objects(&[0x2A01_912C, 0x0002_D12C, 0xC0DC_213C]);

        assert_eq!(caps.pdos().len(), 3);
        assert!(caps.dual_role_power());

        let vsafe_5v = caps.vsafe_5v().unwrap();
        assert!(approx(vsafe_5v.voltage().get::<millivolt>(), 5000.0));
        assert!(approx(vsafe_5v.max_current().get::<milliampere>(), 3000.0));

        let Some(PowerDataObject::FixedSupply(supply)) = caps.get(2) else {
            panic!("expected a fixed supply");
        };
        assert!(approx(supply.voltage().get::<millivolt>(), 9000.0));

        let Some(PowerDataObject::Pps(pps)) = caps.get(3) else {
            panic!("expected a programmable supply");
        };
        assert!(approx(pps.max_voltage().get::<millivolt>(), 11000.0));
        assert!(approx(pps.min_voltage().get::<millivolt>(), 3300.0));
        assert!(approx(pps.max_current().get::<milliampere>(), 3000.0));

        assert!(caps.get(0).is_none());
        assert!(caps.get(4).is_none());
    }

    #[test]
    fn test_objects_are_preserved() {
        let objects = [FixedSupply::new_vsafe5v(150).0, 0x4000_0000, 0xF000_0000];
        let caps = Capabilities::from_objects(&objects);

        // Battery and unknown augmented kinds are kept verbatim.
        assert!(matches!(caps.get(2), Some(PowerDataObject::Battery(_))));
        assert!(matches!(caps.get(3), Some(PowerDataObject::Unknown(_))));
        assert_eq!(caps.to_objects().as_slice(), &objects);
    }
}
