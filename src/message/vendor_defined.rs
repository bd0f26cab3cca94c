//! Definitions of vendor defined message content.
//!
//! Covers structured VDM headers, the discover identity response VDOs, and the DisplayPort
//! alternate mode objects.
use proc_bitfield::bitfield;

/// The PD standard ID, used for discovery commands.
pub const PD_SID: u16 = 0xFF00;

/// The DisplayPort standard ID.
pub const DISPLAYPORT_SID: u16 = 0xFF01;

/// Structured VDM command types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VdmCommandType {
    /// A request by the initiator.
    InitiatorREQ,
    /// A positive response.
    ResponderACK,
    /// A negative response.
    ResponderNAK,
    /// The responder is busy.
    ResponderBSY,
}

impl From<VdmCommandType> for u8 {
    fn from(value: VdmCommandType) -> Self {
        match value {
            VdmCommandType::InitiatorREQ => 0,
            VdmCommandType::ResponderACK => 1,
            VdmCommandType::ResponderNAK => 2,
            VdmCommandType::ResponderBSY => 3,
        }
    }
}

impl From<u8> for VdmCommandType {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => VdmCommandType::InitiatorREQ,
            1 => VdmCommandType::ResponderACK,
            2 => VdmCommandType::ResponderNAK,
            _ => VdmCommandType::ResponderBSY,
        }
    }
}

/// Structured VDM commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VdmCommand {
    /// Discover the partner's identity.
    DiscoverIdentity,
    /// Discover the partner's SVIDs.
    DiscoverSVIDS,
    /// Discover the modes of an SVID.
    DiscoverModes,
    /// Enter an alternate mode.
    EnterMode,
    /// Exit an alternate mode.
    ExitMode,
    /// Attention, sent by the UFP.
    Attention,
    /// DisplayPort status update.
    DisplayPortStatus,
    /// DisplayPort configuration.
    DisplayPortConfig,
    /// Any other SVID specific command.
    Unknown(u8),
}

impl From<VdmCommand> for u8 {
    fn from(value: VdmCommand) -> Self {
        match value {
            VdmCommand::DiscoverIdentity => 0x1,
            VdmCommand::DiscoverSVIDS => 0x2,
            VdmCommand::DiscoverModes => 0x3,
            VdmCommand::EnterMode => 0x4,
            VdmCommand::ExitMode => 0x5,
            VdmCommand::Attention => 0x6,
            VdmCommand::DisplayPortStatus => 0x10,
            VdmCommand::DisplayPortConfig => 0x11,
            VdmCommand::Unknown(command) => command & 0x1F,
        }
    }
}

impl From<u8> for VdmCommand {
    fn from(value: u8) -> Self {
        match value {
            0x01 => VdmCommand::DiscoverIdentity,
            0x02 => VdmCommand::DiscoverSVIDS,
            0x03 => VdmCommand::DiscoverModes,
            0x04 => VdmCommand::EnterMode,
            0x05 => VdmCommand::ExitMode,
            0x06 => VdmCommand::Attention,
            0x10 => VdmCommand::DisplayPortStatus,
            0x11 => VdmCommand::DisplayPortConfig,
            other => VdmCommand::Unknown(other),
        }
    }
}

/// The type of a VDM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VdmType {
    /// Unstructured, vendor specific VDM.
    Unstructured,
    /// Structured VDM.
    Structured,
}

impl From<VdmType> for bool {
    fn from(value: VdmType) -> Self {
        match value {
            VdmType::Unstructured => false,
            VdmType::Structured => true,
        }
    }
}

impl From<bool> for VdmType {
    fn from(value: bool) -> Self {
        match value {
            true => VdmType::Structured,
            false => VdmType::Unstructured,
        }
    }
}

/// Structured VDM versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VdmVersion {
    /// Version 1.0
    V1_0,
    /// Version 2.0
    V2_0,
    /// Version 2.1
    V2_1,
}

impl VdmVersion {
    const fn major(self) -> u8 {
        match self {
            VdmVersion::V1_0 => 0b00,
            VdmVersion::V2_0 | VdmVersion::V2_1 => 0b01,
        }
    }

    const fn minor(self) -> u8 {
        match self {
            VdmVersion::V1_0 | VdmVersion::V2_0 => 0b00,
            VdmVersion::V2_1 => 0b01,
        }
    }
}

/// A VDM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VdmHeader {
    /// A structured VDM header.
    Structured(VdmHeaderStructured),
    /// An unstructured VDM header.
    Unstructured(VdmHeaderUnstructured),
}

impl From<VdmHeader> for u32 {
    fn from(value: VdmHeader) -> Self {
        match value {
            VdmHeader::Structured(header) => header.into(),
            VdmHeader::Unstructured(header) => header.into(),
        }
    }
}

impl From<u32> for VdmHeader {
    fn from(value: u32) -> Self {
        match VdmHeaderRaw(value).vdm_type() {
            VdmType::Structured => VdmHeader::Structured(VdmHeaderStructured(value)),
            VdmType::Unstructured => VdmHeader::Unstructured(VdmHeaderUnstructured(value)),
        }
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    struct VdmHeaderRaw(pub u32): Debug, FromStorage, IntoStorage {
        pub vdm_type: bool [get VdmType] @ 15,
    }
}

bitfield! {
    /// A structured VDM header.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct VdmHeaderStructured(pub u32): Debug, FromStorage, IntoStorage {
        /// VDM Standard or Vendor ID
        pub standard_or_vid: u16 @ 16..=31,
        /// VDM Type (Unstructured/Structured)
        pub vdm_type: bool [get VdmType, set VdmType] @ 15,
        /// Structured VDM version, major
        pub vdm_version_major: u8 @ 13..=14,
        /// Structured VDM version, minor
        pub vdm_version_minor: u8 @ 11..=12,
        /// Object Position
        pub object_position: u8 @ 8..=10,
        /// Command Type
        pub command_type: u8 [get VdmCommandType, set VdmCommandType] @ 6..=7,
        /// Command
        pub command: u8 [get VdmCommand, set VdmCommand] @ 0..=4,
    }
}

impl Default for VdmHeaderStructured {
    fn default() -> Self {
        VdmHeaderStructured(0).with_vdm_type(VdmType::Structured)
    }
}

impl VdmHeaderStructured {
    /// Create a structured VDM header.
    pub fn new(svid: u16, version: VdmVersion, command: VdmCommand, command_type: VdmCommandType) -> Self {
        Self::default()
            .with_standard_or_vid(svid)
            .with_version(version)
            .with_command(command)
            .with_command_type(command_type)
    }

    /// Set the structured VDM version.
    pub fn with_version(self, version: VdmVersion) -> Self {
        self.with_vdm_version_major(version.major())
            .with_vdm_version_minor(version.minor())
    }

    /// Whether this is a request by an initiator.
    pub fn is_request(&self) -> bool {
        self.command_type() == VdmCommandType::InitiatorREQ
    }

    /// Whether this is a positive response.
    pub fn is_ack(&self) -> bool {
        self.command_type() == VdmCommandType::ResponderACK
    }
}

bitfield! {
    /// An unstructured VDM header.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct VdmHeaderUnstructured(pub u32): Debug, FromStorage, IntoStorage {
        /// Vdm Standard or Vendor ID
        pub standard_or_vid: u16 @ 16..=31,
        /// Vdm Type (Unstructured/Structured)
        pub vdm_type: bool [get VdmType, set VdmType] @ 15,
        /// Message defined
        pub data: u16 @ 0..=14
    }
}

bitfield! {
    /// The ID header VDO of a discover identity response.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct VdmIdentityHeader(pub u32): Debug, FromStorage, IntoStorage {
        /// Host data capable
        pub host_data: bool @ 31,
        /// Device data capable
        pub device_data: bool @ 30,
        /// Product type UFP
        pub product_type_ufp: u8 [get SopProductTypeUfp, set SopProductTypeUfp] @ 27..=29,
        /// Modal Operation Supported
        pub modal_supported: bool @ 26,
        /// Product type DFP
        pub product_type_dfp: u8 [get SopProductTypeDfp, set SopProductTypeDfp] @ 23..=25,
        /// Connector type
        pub connector_type: u8 @ 21..=22,
        /// VID
        pub vid: u16 @ 0..=15,
    }
}

/// Product types of a UFP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SopProductTypeUfp {
    /// Not a UFP.
    NotUFP,
    /// PDUSB hub.
    PdUsbHub,
    /// PDUSB peripheral.
    PdUsbPeripheral,
    /// Power sink device.
    Psd,
    /// Reserved value.
    Reserved(u8),
}

impl From<SopProductTypeUfp> for u8 {
    fn from(value: SopProductTypeUfp) -> Self {
        match value {
            SopProductTypeUfp::NotUFP => 0b000,
            SopProductTypeUfp::PdUsbHub => 0b001,
            SopProductTypeUfp::PdUsbPeripheral => 0b010,
            SopProductTypeUfp::Psd => 0b011,
            SopProductTypeUfp::Reserved(value) => value & 0b111,
        }
    }
}

impl From<u8> for SopProductTypeUfp {
    fn from(value: u8) -> Self {
        match value {
            0b000 => SopProductTypeUfp::NotUFP,
            0b001 => SopProductTypeUfp::PdUsbHub,
            0b010 => SopProductTypeUfp::PdUsbPeripheral,
            0b011 => SopProductTypeUfp::Psd,
            other => SopProductTypeUfp::Reserved(other),
        }
    }
}

/// Product types of a DFP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SopProductTypeDfp {
    /// Not a DFP.
    NotDFP,
    /// PDUSB hub.
    PdUsbHub,
    /// PDUSB host.
    PdUsbHost,
    /// Power brick.
    PowerBrick,
    /// Reserved value.
    Reserved(u8),
}

impl From<SopProductTypeDfp> for u8 {
    fn from(value: SopProductTypeDfp) -> Self {
        match value {
            SopProductTypeDfp::NotDFP => 0b000,
            SopProductTypeDfp::PdUsbHub => 0b001,
            SopProductTypeDfp::PdUsbHost => 0b010,
            SopProductTypeDfp::PowerBrick => 0b011,
            SopProductTypeDfp::Reserved(value) => value & 0b111,
        }
    }
}

impl From<u8> for SopProductTypeDfp {
    fn from(value: u8) -> Self {
        match value {
            0b000 => SopProductTypeDfp::NotDFP,
            0b001 => SopProductTypeDfp::PdUsbHub,
            0b010 => SopProductTypeDfp::PdUsbHost,
            0b011 => SopProductTypeDfp::PowerBrick,
            other => SopProductTypeDfp::Reserved(other),
        }
    }
}

bitfield! {
    /// The cert stat VDO of a discover identity response.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CertStatVdo(pub u32): Debug, FromStorage, IntoStorage {
        /// XID
        pub xid: u32 @ 0..=31,
    }
}

bitfield! {
    /// The product VDO of a discover identity response.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ProductVdo(pub u32): Debug, FromStorage, IntoStorage {
        /// USB Product ID
        pub pid: u16 @ 16..=31,
        /// Device release number
        pub bcd_device: u16 @ 0..=15,
    }
}

bitfield! {
    /// DisplayPort capabilities, the mode VDO of the DisplayPort SVID.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DisplayPortCapabilities(pub u32): Debug, FromStorage, IntoStorage {
        /// UFP_D Pin Assignments Supported
        pub ufp_d_pin_assignments: u8 @ 16..=23,
        /// DFP_D Pin Assignments Supported
        pub dfp_d_pin_assignments: u8 @ 8..=15,
        /// USB r2.0 Signalling Not Used
        pub usb20_signalling_not_used: bool @ 7,
        /// Receptacle Indication
        pub receptacle_indication: bool @ 6,
        /// Signalling for Transport of DisplayPort Protocol
        pub signaling_rate: u8 @ 2..=5,
        /// Port Capability (01b: UFP_D, 10b: DFP_D, 11b: both)
        pub capability: u8 @ 0..=1,
    }
}

bitfield! {
    /// DisplayPort status, exchanged with the status update and attention commands.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DisplayPortStatus(pub u32): Debug, FromStorage, IntoStorage {
        /// IRQ_HPD
        pub irq_hpd: bool @ 8,
        /// HPD state
        pub hpd_state: bool @ 7,
        /// Exit DisplayPort mode request
        pub exit_mode_request: bool @ 6,
        /// USB configuration request
        pub usb_configuration_request: bool @ 5,
        /// Multi-function preferred
        pub multi_function_preferred: bool @ 4,
        /// Enabled
        pub enabled: bool @ 3,
        /// Power low
        pub power_low: bool @ 2,
        /// Connected (01b: DFP_D, 10b: UFP_D, 11b: both)
        pub connected: u8 @ 0..=1,
    }
}

bitfield! {
    /// DisplayPort configuration, sent with the configure command.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DisplayPortConfigure(pub u32): Debug, FromStorage, IntoStorage {
        /// Configure UFP_U pin assignment
        pub ufp_u_pin_assignment: u8 @ 16..=23,
        /// Configure DFP_D pin assignment
        pub dfp_d_pin_assignment: u8 @ 8..=15,
        /// Signalling for transport of DisplayPort protocol
        pub signaling: u8 @ 2..=5,
        /// Select configuration (00b: USB, 01b: UFP_U as DFP_D, 10b: UFP_U as UFP_D)
        pub select: u8 @ 0..=1,
    }
}
