//! The device policy manager (DPM) allows a device to control the policy engine, and be informed about status changes.
//!
//! Through the DPM, a device provides its capabilities, decides on power contracts and role swaps,
//! and supplies the content of structured VDM responses. Commands are delivered to the policy
//! engine through [`crate::port::PortEvents::command`].
use core::future::Future;

use heapless::Vec;

use crate::message::pdo::{Capabilities, FixedSupply, PowerDataObject};
use crate::message::request::{FixedVariableRequest, RequestDataObject};
use crate::message::vendor_defined::{
    CertStatVdo, DisplayPortCapabilities, DisplayPortConfigure, DisplayPortStatus, ProductVdo, VdmCommand,
    VdmIdentityHeader,
};
use crate::transport::VconnSource;
use crate::{DataRole, PowerRole};

/// The maximum number of VDOs that follow a VDM header.
pub const MAX_VDOS: usize = 6;

/// Commands that the device policy manager can send to the policy engine.
///
/// Commands are evaluated in the ready state of the current power role. Commands that do not
/// apply to the current role are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Source: send (updated) source capabilities.
    SendSourceCapabilities,
    /// Source: request the partner's sink capabilities.
    GetSinkCapabilities,
    /// Sink: request the partner's source capabilities.
    GetSourceCapabilities,
    /// Sink: evaluate the cached source capabilities again, and request power.
    RequestPower,
    /// Initiate a data role swap.
    DataRoleSwap,
    /// Initiate a power role swap.
    PowerRoleSwap,
    /// Initiate a VCONN swap.
    VconnSwap,
    /// Initiate a soft reset.
    SoftReset,
    /// Initiate a hard reset.
    HardReset,
    /// DFP: discover the partner's identity.
    DiscoverIdentity,
    /// DFP: discover the partner's SVIDs.
    DiscoverSvids,
    /// DFP: discover the modes of the configured SVID.
    DiscoverModes,
    /// DFP: enter the discovered mode.
    EnterMode,
    /// DFP: exit the entered mode.
    ExitMode,
    /// DFP: request a DisplayPort status update.
    DisplayPortStatus,
    /// DFP: configure DisplayPort.
    DisplayPortConfigure,
    /// UFP: send an attention message with the local DisplayPort status.
    Attention,
}

/// Notifications from the policy engine to the device policy manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// The partner's identity was discovered.
    IdentityAcked(VdmIdentityHeader),
    /// The partner's SVIDs were discovered. Holds the number of SVIDs.
    SvidsAcked(u8),
    /// The partner's modes were discovered. Holds the number of modes.
    ModesAcked(u8),
    /// A mode was entered.
    ModeEntryAcked {
        /// The SVID of the mode.
        svid: u16,
        /// The object position of the mode.
        position: u8,
    },
    /// A mode was exited.
    ModeExitAcked {
        /// The SVID of the mode.
        svid: u16,
        /// The object position of the mode.
        position: u8,
    },
    /// The partner's DisplayPort status was received.
    StatusUpdateAcked(DisplayPortStatus),
    /// DisplayPort was configured.
    ConfigureAcked(DisplayPortConfigure),
    /// A VDM request was not acknowledged.
    VdmNaked(VdmCommand),
    /// The partner sent an attention message.
    Attention(DisplayPortStatus),
    /// The partner does not support a message that was sent.
    NotSupportedReceived,
    /// The data role changed.
    DataRoleChanged(DataRole),
    /// The power role changed.
    PowerRoleChanged(PowerRole),
    /// The VCONN supply changed.
    VconnChanged(VconnSource),
    /// A retry ceiling was exceeded. The port stays inactive until it is attached again.
    ErrorRecovery,
}

/// The response to a discover identity request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    /// The ID header VDO.
    pub header: VdmIdentityHeader,
    /// The cert stat VDO.
    pub cert_stat: CertStatVdo,
    /// The product VDO.
    pub product: ProductVdo,
    /// Product type specific VDOs.
    pub product_type: Vec<u32, 3>,
}

impl Identity {
    /// Serialize to VDOs.
    pub fn to_vdos(&self) -> Vec<u32, MAX_VDOS> {
        [self.header.0, self.cert_stat.0, self.product.0]
            .into_iter()
            .chain(self.product_type.iter().copied())
            .collect()
    }

    /// Parse from VDOs. Requires at least the ID header, cert stat and product VDOs.
    pub fn from_vdos(vdos: &[u32]) -> Option<Self> {
        match vdos {
            [header, cert_stat, product, product_type @ ..] => Some(Self {
                header: VdmIdentityHeader(*header),
                cert_stat: CertStatVdo(*cert_stat),
                product: ProductVdo(*product),
                product_type: product_type.iter().copied().take(3).collect(),
            }),
            _ => None,
        }
    }
}

/// The response to a discover SVIDs request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Svids(pub Vec<u16, { 2 * MAX_VDOS }>);

impl Svids {
    /// Serialize to VDOs, two SVIDs per VDO.
    ///
    /// The list is terminated by a zero SVID. An additional zero VDO is appended, if there is room.
    pub fn to_vdos(&self) -> Vec<u32, MAX_VDOS> {
        let mut vdos: Vec<u32, MAX_VDOS> = self
            .0
            .chunks(2)
            .map(|pair| {
                let upper = u32::from(pair[0]) << 16;
                let lower = pair.get(1).copied().map(u32::from).unwrap_or_default();
                upper | lower
            })
            .take(MAX_VDOS)
            .collect();

        if self.0.len() % 2 == 0 {
            let _ = vdos.push(0);
        }
        vdos
    }

    /// Parse from VDOs, up to the first zero SVID.
    pub fn from_vdos(vdos: &[u32]) -> Self {
        Self(
            vdos.iter()
                .flat_map(|vdo| [(vdo >> 16) as u16, *vdo as u16])
                .take_while(|svid| *svid != 0)
                .take(2 * MAX_VDOS)
                .collect(),
        )
    }

    /// Whether an SVID is contained.
    pub fn contains(&self, svid: u16) -> bool {
        self.0.contains(&svid)
    }
}

/// The response to a discover modes request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Modes(pub Vec<u32, MAX_VDOS>);

impl Modes {
    /// Parse from VDOs.
    pub fn from_vdos(vdos: &[u32]) -> Self {
        Self(vdos.iter().copied().take(MAX_VDOS).collect())
    }

    /// The mode VDO at a one-based object position.
    pub fn get(&self, position: u8) -> Option<u32> {
        usize::from(position)
            .checked_sub(1)
            .and_then(|index| self.0.get(index).copied())
    }
}

fn vsafe_5v_capabilities() -> Capabilities {
    let mut pdos = Vec::new();
    let _ = pdos.push(PowerDataObject::FixedSupply(FixedSupply::new_vsafe5v(150)));
    Capabilities(pdos)
}

/// Trait for the device policy manager.
///
/// This entity commands the policy engine and enforces device policy. All methods have defaults,
/// which offer and request 5 V only, reject all swaps, and NAK all VDM requests.
pub trait DevicePolicyManager {
    /// The capabilities that are advertised as a source.
    ///
    /// Defaults to 5 V at 1.5 A.
    fn source_capabilities(&mut self) -> impl Future<Output = Capabilities> {
        async { vsafe_5v_capabilities() }
    }

    /// The capabilities that are reported as a sink.
    ///
    /// Defaults to 5 V at 1.5 A.
    fn sink_capabilities(&mut self) -> impl Future<Output = Capabilities> {
        async { vsafe_5v_capabilities() }
    }

    /// Decide, whether a sink's request can be met.
    ///
    /// By default, the referenced supply must exist, and provide the requested current.
    fn match_request(&mut self, request: &RequestDataObject, capabilities: &Capabilities) -> impl Future<Output = bool> {
        let request = request.fixed_variable();
        let matches = match capabilities.get(request.object_position()) {
            Some(PowerDataObject::FixedSupply(supply)) => request.operating_current() <= supply.max_current(),
            Some(PowerDataObject::VariableSupply(supply)) => request.operating_current() <= supply.max_current(),
            _ => false,
        };

        async move { matches }
    }

    /// Evaluate a source's capabilities, and pick the object position to request.
    ///
    /// Returning zero means that no supply is acceptable. Defaults to the vSafe5V supply.
    fn evaluate_capability(&mut self, capabilities: &Capabilities) -> impl Future<Output = u8> {
        let position = if capabilities.vsafe_5v().is_some() { 1 } else { 0 };
        async move { position }
    }

    /// Build the request for the chosen object position.
    ///
    /// Defaults to the maximum current of the chosen supply.
    fn select_capability(&mut self, position: u8, capabilities: &Capabilities) -> impl Future<Output = RequestDataObject> {
        let current = match capabilities.get(position) {
            Some(PowerDataObject::FixedSupply(supply)) => supply.raw_max_current(),
            Some(PowerDataObject::VariableSupply(supply)) => supply.raw_max_current(),
            _ => 0,
        };

        async move { FixedVariableRequest::new(position, current, current).into() }
    }

    /// Notify the device that it shall transition its supply to the accepted request.
    fn transition_supply(&mut self, _request: &RequestDataObject) -> impl Future<Output = ()> {
        async {}
    }

    /// Notify the device that it shall transition to a new power level.
    ///
    /// The device is informed about the request that was accepted by the source.
    fn transition_power(&mut self, _request: &RequestDataObject) -> impl Future<Output = ()> {
        async {}
    }

    /// Notify the device about a hard reset. The port returns to its default state.
    fn hard_reset(&mut self) -> impl Future<Output = ()> {
        async {}
    }

    /// Evaluate a data role swap request by the partner.
    fn data_role_swap(&mut self) -> impl Future<Output = bool> {
        async { false }
    }

    /// Evaluate a power role swap request by the partner.
    fn power_role_swap(&mut self) -> impl Future<Output = bool> {
        async { false }
    }

    /// Evaluate a VCONN swap request by the partner.
    fn vconn_source_swap(&mut self) -> impl Future<Output = bool> {
        async { false }
    }

    /// The local identity, for a discover identity response. `None` results in a NAK.
    fn get_identity(&mut self) -> impl Future<Output = Option<Identity>> {
        async { None }
    }

    /// The local SVIDs, for a discover SVIDs response. `None` results in a NAK.
    fn get_svids(&mut self) -> impl Future<Output = Option<Svids>> {
        async { None }
    }

    /// The local modes of an SVID, for a discover modes response. `None` results in a NAK.
    fn get_modes(&mut self, _svid: u16) -> impl Future<Output = Option<Modes>> {
        async { None }
    }

    /// Enter a mode, as requested by the partner.
    fn enter_mode(&mut self, _svid: u16, _position: u8, _vdo: Option<u32>) -> impl Future<Output = bool> {
        async { false }
    }

    /// Exit a mode, as requested by the partner.
    fn exit_mode(&mut self, _svid: u16, _position: u8) -> impl Future<Output = bool> {
        async { false }
    }

    /// Process the partner's DisplayPort status, and provide the local status. `None` results in a NAK.
    fn displayport_status(&mut self, _partner: DisplayPortStatus) -> impl Future<Output = Option<DisplayPortStatus>> {
        async { None }
    }

    /// Apply a DisplayPort configuration, as requested by the partner.
    fn displayport_configure(&mut self, _configuration: DisplayPortConfigure) -> impl Future<Output = bool> {
        async { false }
    }

    /// The DisplayPort configuration to request from the partner, based on its modes.
    ///
    /// Defaults to pin assignment C, if supported, or the lowest supported pin assignment otherwise.
    fn displayport_configuration(&mut self, modes: &Modes) -> impl Future<Output = DisplayPortConfigure> {
        let capabilities = DisplayPortCapabilities(modes.get(1).unwrap_or_default());

        // Pin assignments are reported from the receptacle's point of view.
        let pins = if capabilities.receptacle_indication() {
            capabilities.ufp_d_pin_assignments()
        } else {
            capabilities.dfp_d_pin_assignments()
        };
        let pin = if pins & 0b0000_0100 != 0 { 0b0000_0100 } else { pins & pins.wrapping_neg() };

        async move {
            DisplayPortConfigure::default()
                .with_select(0b10)
                .with_signaling(0b0001)
                .with_ufp_u_pin_assignment(pin)
        }
    }

    /// The local DisplayPort status, sent with an attention message.
    fn attention_status(&mut self) -> impl Future<Output = DisplayPortStatus> {
        async { DisplayPortStatus::default().with_connected(0b10).with_enabled(true) }
    }

    /// Inform the device about an event.
    fn inform_event(&mut self, _notification: Notification) -> impl Future<Output = ()> {
        async {}
    }
}
