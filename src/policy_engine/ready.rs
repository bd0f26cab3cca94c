//! Dispatch tables of the ready states.
//!
//! On entry, a ready state walks its table in order, and jumps to the target of the first route
//! whose trigger matches the pending inbound message or the pending command.
use super::session::Discovery;
use super::State;
use crate::DataRole;
use crate::counters::Counter;
use crate::device_policy_manager::Command;
use crate::message::Message;
use crate::message::header::{ControlMessageType, DataMessageType, MessageType};
use crate::message::vendor_defined::VdmCommand;

/// What a route reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// A pending inbound message of a type.
    Received(MessageType),
    /// A pending inbound structured VDM request with a command.
    Vdm(VdmCommand),
    /// A pending command of the device policy manager.
    Command(Command),
}

impl Trigger {
    /// Whether the trigger matches the pending message or command.
    pub fn matches(&self, message: Option<&Message>, command: Option<Command>) -> bool {
        match *self {
            Trigger::Received(message_type) => message.is_some_and(|m| m.message_type() == message_type),
            Trigger::Vdm(vdm_command) => message
                .and_then(Message::structured_vdm)
                .is_some_and(|header| header.is_request() && header.command() == vdm_command),
            Trigger::Command(expected) => command == Some(expected),
        }
    }
}

/// Where a route leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// A fixed state.
    Fixed(State),
    /// A state that depends on the current data role.
    ByDataRole {
        /// The state as a DFP.
        dfp: State,
        /// The state as a UFP.
        ufp: State,
    },
}

impl Target {
    /// Resolve the target state for a data role.
    pub fn resolve(&self, data_role: DataRole) -> State {
        match (*self, data_role) {
            (Target::Fixed(state), _) => state,
            (Target::ByDataRole { dfp, .. }, DataRole::Dfp) => dfp,
            (Target::ByDataRole { ufp, .. }, DataRole::Ufp) => ufp,
        }
    }
}

/// An entry of a ready dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Route {
    /// The trigger.
    pub on: Trigger,
    /// The target.
    pub to: Target,
}

const fn control(message_type: ControlMessageType, to: State) -> Route {
    Route {
        on: Trigger::Received(MessageType::Control(message_type)),
        to: Target::Fixed(to),
    }
}

const fn data(message_type: DataMessageType, to: State) -> Route {
    Route {
        on: Trigger::Received(MessageType::Data(message_type)),
        to: Target::Fixed(to),
    }
}

const fn received(message_type: MessageType, to: Target) -> Route {
    Route {
        on: Trigger::Received(message_type),
        to,
    }
}

const fn vdm(command: VdmCommand, to: State) -> Route {
    Route {
        on: Trigger::Vdm(command),
        to: Target::Fixed(to),
    }
}

const fn command(command: Command, to: Target) -> Route {
    Route {
        on: Trigger::Command(command),
        to,
    }
}

const DR_SWAP_EVALUATE: Target = Target::ByDataRole {
    dfp: State::DrsDfpUfpEvaluateSwap,
    ufp: State::DrsUfpDfpEvaluateSwap,
};

const DR_SWAP_SEND: Target = Target::ByDataRole {
    dfp: State::DrsDfpUfpSendSwap,
    ufp: State::DrsUfpDfpSendSwap,
};

macro_rules! vdm_routes {
    ($ready:expr) => {
        [
            vdm(VdmCommand::DiscoverIdentity, State::UfpVdmGetIdentity),
            vdm(VdmCommand::DiscoverSVIDS, State::UfpVdmGetSvids),
            vdm(VdmCommand::DiscoverModes, State::UfpVdmGetModes),
            vdm(VdmCommand::EnterMode, State::UfpVdmEvaluateModeEntry),
            vdm(VdmCommand::ExitMode, State::UfpVdmModeExit),
            vdm(VdmCommand::DisplayPortStatus, State::UfpVdmEvaluateStatus),
            vdm(VdmCommand::DisplayPortConfig, State::UfpVdmEvaluateConfigure),
            vdm(VdmCommand::Attention, State::DfpVdmAttentionRequest),
            command(Command::DiscoverIdentity, Target::ByDataRole { dfp: State::DfpVdmIdentityRequest, ufp: $ready }),
            command(Command::DiscoverSvids, Target::ByDataRole { dfp: State::DfpVdmSvidsRequest, ufp: $ready }),
            command(Command::DiscoverModes, Target::ByDataRole { dfp: State::DfpVdmModesRequest, ufp: $ready }),
            command(Command::EnterMode, Target::ByDataRole { dfp: State::DfpVdmModeEntryRequest, ufp: $ready }),
            command(Command::ExitMode, Target::ByDataRole { dfp: State::DfpVdmModeExitRequest, ufp: $ready }),
            command(Command::DisplayPortStatus, Target::ByDataRole { dfp: State::DfpVdmStatusUpdate, ufp: $ready }),
            command(Command::DisplayPortConfigure, Target::ByDataRole { dfp: State::DfpVdmConfigure, ufp: $ready }),
            command(Command::Attention, Target::ByDataRole { dfp: $ready, ufp: State::UfpVdmAttentionRequest }),
        ]
    };
}

const SOURCE_VDM: [Route; 16] = vdm_routes!(State::SrcReady);
const SINK_VDM: [Route; 16] = vdm_routes!(State::SnkReady);

/// The dispatch table of the source's ready state.
pub static SOURCE_READY: [Route; 31] = {
    let own = [
        data(DataMessageType::Request, State::SrcNegotiateCapability),
        control(ControlMessageType::GetSourceCap, State::SrcGiveSourceCap),
        control(ControlMessageType::GetSinkCap, State::SrcGiveSinkCap),
        received(MessageType::Control(ControlMessageType::DrSwap), DR_SWAP_EVALUATE),
        control(ControlMessageType::PrSwap, State::PrsSrcSnkEvaluateSwap),
        control(ControlMessageType::VconnSwap, State::VcsEvaluateSwap),
        control(ControlMessageType::SoftReset, State::SrcSoftReset),
        control(ControlMessageType::NotSupported, State::SrcNotSupportedReceived),
        command(Command::SendSourceCapabilities, Target::Fixed(State::SrcSendCapabilities)),
        command(Command::GetSinkCapabilities, Target::Fixed(State::SrcGetSinkCap)),
        command(Command::DataRoleSwap, DR_SWAP_SEND),
        command(Command::PowerRoleSwap, Target::Fixed(State::PrsSrcSnkSendSwap)),
        command(Command::VconnSwap, Target::Fixed(State::VcsSendSwap)),
        command(Command::SoftReset, Target::Fixed(State::SrcSendSoftReset)),
        command(Command::HardReset, Target::Fixed(State::SrcHardReset)),
    ];
    concat(own, SOURCE_VDM)
};

/// The dispatch table of the sink's ready state.
pub static SINK_READY: [Route; 31] = {
    let own = [
        data(DataMessageType::SourceCapabilities, State::SnkEvaluateCapability),
        control(ControlMessageType::GetSinkCap, State::SnkGiveSinkCap),
        control(ControlMessageType::GetSourceCap, State::SnkGiveSourceCap),
        received(MessageType::Control(ControlMessageType::DrSwap), DR_SWAP_EVALUATE),
        control(ControlMessageType::PrSwap, State::PrsSnkSrcEvaluateSwap),
        control(ControlMessageType::VconnSwap, State::VcsEvaluateSwap),
        control(ControlMessageType::SoftReset, State::SnkSoftReset),
        control(ControlMessageType::NotSupported, State::SnkNotSupportedReceived),
        command(Command::GetSourceCapabilities, Target::Fixed(State::SnkGetSourceCap)),
        command(Command::RequestPower, Target::Fixed(State::SnkEvaluateCapability)),
        command(Command::DataRoleSwap, DR_SWAP_SEND),
        command(Command::PowerRoleSwap, Target::Fixed(State::PrsSnkSrcSendSwap)),
        command(Command::VconnSwap, Target::Fixed(State::VcsSendSwap)),
        command(Command::SoftReset, Target::Fixed(State::SnkSendSoftReset)),
        command(Command::HardReset, Target::Fixed(State::SnkHardReset)),
    ];
    concat(own, SINK_VDM)
};

const fn concat(own: [Route; 15], vdm: [Route; 16]) -> [Route; 31] {
    let mut table = [own[0]; 31];

    let mut index = 0;
    while index < own.len() {
        table[index] = own[index];
        index += 1;
    }

    let mut index = 0;
    while index < vdm.len() {
        table[own.len() + index] = vdm[index];
        index += 1;
    }

    table
}

/// Find the first route that matches the pending message or command.
pub fn route(table: &[Route], message: Option<&Message>, command: Option<Command>) -> Option<Route> {
    table.iter().copied().find(|route| route.on.matches(message, command))
}

/// Whether a pending message that no route matched may be ignored, instead of answering it
/// with Not_Supported.
pub fn is_ignored(message: &Message) -> bool {
    message.is_control(ControlMessageType::Ping)
        || message.is_control(ControlMessageType::GoodCRC)
        || message.structured_vdm().is_some_and(|header| !header.is_request())
}

/// Pick the next step of alternate mode discovery, as a DFP.
///
/// Discovery proceeds from identity over SVIDs, modes and mode entry, to the DisplayPort status
/// update and configuration. It stops at the first step that did not succeed.
pub fn next_discovery_step(discovery: &Discovery, discover_identity: &Counter, svid: u16) -> Option<State> {
    let Some(identity) = &discovery.identity else {
        return (!discover_identity.exceeded()).then_some(State::DfpVdmIdentityRequest);
    };

    if !identity.header.modal_supported() {
        return None;
    }

    if !discovery.svids_attempted {
        return Some(State::DfpVdmSvidsRequest);
    }
    if !discovery.svids.as_ref().is_some_and(|svids| svids.contains(svid)) {
        return None;
    }

    if !discovery.modes_attempted {
        return Some(State::DfpVdmModesRequest);
    }
    discovery.modes.as_ref()?;

    if !discovery.mode_entry_attempted {
        return Some(State::DfpVdmModeEntryRequest);
    }
    if discovery.mode_position == 0 {
        return None;
    }

    if !discovery.status_attempted {
        return Some(State::DfpVdmStatusUpdate);
    }
    discovery.partner_status?;

    if !discovery.configure_attempted {
        return Some(State::DfpVdmConfigure);
    }

    None
}
