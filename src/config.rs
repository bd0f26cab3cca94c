//! Configuration of the policy engine.
use crate::message::header::SpecificationRevision;
use crate::message::vendor_defined::{DISPLAYPORT_SID, VdmVersion};

/// Static configuration of a port.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Start alternate mode discovery as a DFP, once a contract is established.
    pub alternate_mode_discovery: bool,
    /// The port can act as source and sink.
    ///
    /// If not set, requests for the capabilities of the other power role are answered with Not_Supported.
    pub dual_role_power: bool,
    /// The structured VDM version that is used in VDM headers.
    pub vdm_version: VdmVersion,
    /// The SVID of the alternate mode that is discovered and entered.
    pub displayport_svid: u16,
    /// The specification revision that is used in message headers.
    pub spec_revision: SpecificationRevision,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alternate_mode_discovery: true,
            dual_role_power: false,
            vdm_version: VdmVersion::V2_0,
            displayport_svid: DISPLAYPORT_SID,
            spec_revision: SpecificationRevision::R3_X,
        }
    }
}
