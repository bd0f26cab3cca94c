//! Per-port session data of the policy engine.
use super::State;
use crate::counters::{Counter, CounterType};
use heapless::{Deque, Vec};

use crate::device_policy_manager::{Command, Identity, MAX_VDOS, Modes, Svids};
use crate::message::Message;
use crate::message::pdo::Capabilities;
use crate::message::request::RequestDataObject;
use crate::message::vendor_defined::{DisplayPortConfigure, DisplayPortStatus};
use crate::port::PendingEvents;

/// Maximum number of unexpected messages that are kept for the ready state.
pub const MAX_UNHANDLED: usize = 4;

/// Results of alternate mode discovery, as a DFP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// The partner's identity.
    pub identity: Option<Identity>,
    /// The partner's SVIDs.
    pub svids: Option<Svids>,
    /// The partner's modes of the configured SVID.
    pub modes: Option<Modes>,
    /// The object position of the entered mode, zero if none. Also tracked as a UFP.
    pub mode_position: u8,
    /// The partner's DisplayPort status.
    pub partner_status: Option<DisplayPortStatus>,
    /// The accepted DisplayPort configuration.
    pub configuration: Option<DisplayPortConfigure>,
    /// SVID discovery was attempted.
    pub svids_attempted: bool,
    /// Mode discovery was attempted.
    pub modes_attempted: bool,
    /// Mode entry was attempted.
    pub mode_entry_attempted: bool,
    /// A status update was attempted.
    pub status_attempted: bool,
    /// Configuration was attempted.
    pub configure_attempted: bool,
}

/// The session of a port.
///
/// Owned by the policy engine, and only mutated by state transitions and the dispatcher.
#[derive(Debug, Clone)]
pub struct Session {
    /// The current state.
    pub state: State,
    /// Events that were latched at the start of the current run.
    pub events: PendingEvents,
    /// The pending command of the device policy manager.
    pub command: Option<Command>,

    /// Number of sent source capabilities messages.
    pub caps: Counter,
    /// Number of hard resets.
    pub hard_reset: Counter,
    /// Number of hard resets due to failed power role swaps.
    pub swap_hard_reset: Counter,
    /// Number of sent discover identity requests.
    pub discover_identity: Counter,

    /// The last sent message.
    pub last_sent: Message,
    /// The last received message.
    pub last_received: Message,
    /// Messages that arrived during a wait, but were not expected. Oldest first.
    pub unhandled: Deque<Message, MAX_UNHANDLED>,

    /// A recoverable transport condition occurred during the last wait.
    pub abnormal_transport: bool,
    /// An alternate mode is active.
    pub modal_operation: bool,
    /// An explicit contract is in place.
    pub explicit_contract: bool,

    /// Cached source capabilities (own, as a source, or the partner's, as a sink).
    pub source_capabilities: Capabilities,
    /// Cached sink capabilities of the partner.
    pub sink_capabilities: Capabilities,

    /// The object position, chosen by capability evaluation.
    pub requested_position: u8,
    /// The request that is being negotiated.
    pub pending_request: RequestDataObject,
    /// The request of the explicit contract.
    pub selected_request: Option<RequestDataObject>,

    /// VDOs of the structured VDM response that is about to be sent.
    pub response_vdos: Vec<u32, MAX_VDOS>,

    /// Alternate mode discovery results.
    pub discovery: Discovery,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a new session, with all data zeroed and an unset state.
    pub fn new() -> Self {
        Self {
            state: State::Unset,
            events: PendingEvents::NONE,
            command: None,
            caps: Counter::new(CounterType::Caps),
            hard_reset: Counter::new(CounterType::HardReset),
            swap_hard_reset: Counter::new(CounterType::SwapHardReset),
            discover_identity: Counter::new(CounterType::DiscoverIdentity),
            last_sent: Message::default(),
            last_received: Message::default(),
            unhandled: Deque::new(),
            abnormal_transport: false,
            modal_operation: false,
            explicit_contract: false,
            source_capabilities: Capabilities::default(),
            sink_capabilities: Capabilities::default(),
            requested_position: 0,
            pending_request: RequestDataObject::default(),
            selected_request: None,
            response_vdos: Vec::new(),
            discovery: Discovery::default(),
        }
    }

    /// Zero all session data, and set an unset state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Zero all session data, except for the hard reset counters and the state.
    ///
    /// Used when transitioning to default after a hard reset, so that the hard reset ceiling can be reached.
    pub fn reset_to_default(&mut self) {
        let state = self.state;
        let hard_reset = self.hard_reset;
        let swap_hard_reset = self.swap_hard_reset;

        self.reset();

        self.state = state;
        self.hard_reset = hard_reset;
        self.swap_hard_reset = swap_hard_reset;
    }
}
