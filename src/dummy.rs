//! Implements a dummy transport, timer and device policy manager for testing.
use std::collections::VecDeque;
use std::vec::Vec;

use crate::device_policy_manager::{DevicePolicyManager, Identity, Modes, Notification, Svids};
use crate::message::header::{
    ControlMessageType, DataMessageType, Header, MessageType, SpecificationRevision,
};
use crate::message::pdo::{Capabilities, FixedSupply, PowerDataObject};
use crate::message::request::{FixedVariableRequest, RequestDataObject};
use crate::message::vendor_defined::{
    DisplayPortConfigure, DisplayPortStatus, VdmCommand, VdmCommandType, VdmHeaderStructured, VdmVersion,
};
use crate::message::Message;
use crate::timers::Timer;
use crate::transport::{CcControl, RxError, Transport, VconnSource};
use crate::{DataRole, PowerRole};

/// A dummy timer for testing.
#[derive(Debug)]
pub struct DummyTimer {}

impl Timer for DummyTimer {
    async fn after_millis(_milliseconds: u64) {
        // Return immediately.
    }
}

/// A dummy transport for testing.
///
/// Received messages are queued in advance, or in response to sent messages. Receiving from an
/// empty queue never completes, so that bounded waits time out.
#[derive(Debug)]
pub struct DummyTransport {
    pub rx: VecDeque<Result<Message, RxError>>,
    pub responses: VecDeque<(MessageType, Vec<Message>)>,
    pub send_results: VecDeque<bool>,
    pub sent: Vec<Message>,

    pub power_role: PowerRole,
    pub data_role: DataRole,
    pub vconn_source: VconnSource,
    pub cc_control: CcControl,
    pub otg: bool,

    pub hard_resets: usize,
    pub protocol_resets: usize,
    pub driver_resets: usize,
}

impl DummyTransport {
    /// Create a new dummy transport with the default roles of a power role.
    pub fn new(power_role: PowerRole) -> Self {
        let data_role = match power_role {
            PowerRole::Source => DataRole::Dfp,
            PowerRole::Sink => DataRole::Ufp,
        };

        Self {
            rx: VecDeque::new(),
            responses: VecDeque::new(),
            send_results: VecDeque::new(),
            sent: Vec::new(),
            power_role,
            data_role,
            vconn_source: VconnSource::Off,
            cc_control: CcControl::Open,
            otg: false,
            hard_resets: 0,
            protocol_resets: 0,
            driver_resets: 0,
        }
    }

    /// Inject a message that can be received right away.
    pub fn inject(&mut self, message: Message) {
        self.rx.push_back(Ok(message));
    }

    /// Inject a receive error.
    pub fn inject_error(&mut self, error: RxError) {
        self.rx.push_back(Err(error));
    }

    /// Queue messages that are received after a message of type `trigger` was sent.
    ///
    /// Each registration answers a single sent message.
    pub fn respond(&mut self, trigger: MessageType, responses: &[Message]) {
        self.responses.push_back((trigger, responses.to_vec()));
    }

    /// Let the next sends fail, or succeed.
    pub fn script_sends(&mut self, results: &[bool]) {
        self.send_results.extend(results.iter().copied());
    }

    /// Types of all sent messages.
    pub fn sent_types(&self) -> Vec<MessageType> {
        self.sent.iter().map(Message::message_type).collect()
    }

    /// Sent structured VDM headers.
    pub fn sent_vdms(&self) -> Vec<VdmHeaderStructured> {
        self.sent.iter().filter_map(Message::structured_vdm).collect()
    }
}

impl Transport for DummyTransport {
    async fn send(&mut self, message: &Message) -> bool {
        self.sent.push(message.clone());

        let sent = self.send_results.pop_front().unwrap_or(true);
        if sent {
            let message_type = message.message_type();
            if let Some(index) = self.responses.iter().position(|(trigger, _)| *trigger == message_type) {
                if let Some((_, responses)) = self.responses.remove(index) {
                    self.rx.extend(responses.into_iter().map(Ok));
                }
            }
        }

        sent
    }

    async fn receive(&mut self) -> Result<Message, RxError> {
        match self.rx.pop_front() {
            Some(result) => result,
            None => core::future::pending().await,
        }
    }

    async fn hard_reset(&mut self) {
        self.hard_resets += 1;
    }

    async fn wait_for_vbus(&mut self) {
        // Do nothing.
    }

    fn protocol_reset(&mut self) {
        self.protocol_resets += 1;
    }

    fn driver_reset(&mut self) {
        self.driver_resets += 1;
    }

    fn set_cc_control(&mut self, cc_control: CcControl) {
        self.cc_control = cc_control;
    }

    fn set_power_role(&mut self, role: PowerRole) {
        self.power_role = role;
    }

    fn power_role(&self) -> PowerRole {
        self.power_role
    }

    fn set_data_role(&mut self, role: DataRole) {
        self.data_role = role;
    }

    fn data_role(&self) -> DataRole {
        self.data_role
    }

    fn set_vconn_source(&mut self, vconn_source: VconnSource) {
        self.vconn_source = vconn_source;
    }

    fn vconn_source(&self) -> VconnSource {
        self.vconn_source
    }

    fn set_otg_control(&mut self, on: bool) {
        self.otg = on;
    }
}

/// A dummy device policy manager for testing.
///
/// Answers swap requests and VDM requests as configured, and records notifications.
#[derive(Debug, Default)]
pub struct DummyDevice {
    pub accept_data_role_swap: bool,
    pub accept_power_role_swap: bool,
    pub accept_vconn_swap: bool,
    pub accept_mode_entry: bool,
    pub identity: Option<Identity>,
    pub svids: Option<Svids>,
    pub modes: Option<Modes>,
    pub status: Option<DisplayPortStatus>,

    pub notifications: Vec<Notification>,
    pub contracts: Vec<RequestDataObject>,
    pub supplied: Vec<RequestDataObject>,
    pub hard_resets: usize,
    pub swap_requests: usize,
}

impl DevicePolicyManager for DummyDevice {
    async fn transition_supply(&mut self, request: &RequestDataObject) {
        self.supplied.push(*request);
    }

    async fn transition_power(&mut self, request: &RequestDataObject) {
        self.contracts.push(*request);
    }

    async fn hard_reset(&mut self) {
        self.hard_resets += 1;
    }

    async fn data_role_swap(&mut self) -> bool {
        self.swap_requests += 1;
        self.accept_data_role_swap
    }

    async fn power_role_swap(&mut self) -> bool {
        self.swap_requests += 1;
        self.accept_power_role_swap
    }

    async fn vconn_source_swap(&mut self) -> bool {
        self.swap_requests += 1;
        self.accept_vconn_swap
    }

    async fn get_identity(&mut self) -> Option<Identity> {
        self.identity.clone()
    }

    async fn get_svids(&mut self) -> Option<Svids> {
        self.svids.clone()
    }

    async fn get_modes(&mut self, _svid: u16) -> Option<Modes> {
        self.modes.clone()
    }

    async fn enter_mode(&mut self, _svid: u16, _position: u8, _vdo: Option<u32>) -> bool {
        self.accept_mode_entry
    }

    async fn exit_mode(&mut self, _svid: u16, _position: u8) -> bool {
        true
    }

    async fn displayport_status(&mut self, _partner: DisplayPortStatus) -> Option<DisplayPortStatus> {
        self.status
    }

    async fn displayport_configure(&mut self, _configuration: DisplayPortConfigure) -> bool {
        true
    }

    async fn inform_event(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

/// The header template of a partner with the given roles.
pub fn partner_template(data_role: DataRole, power_role: PowerRole) -> Header {
    Header::new_template(data_role, power_role, SpecificationRevision::R3_X)
}

/// A control message of the partner.
pub fn control(template: Header, message_type: ControlMessageType) -> Message {
    Message::new(Header::new_control(template, message_type))
}

/// A data message of the partner.
pub fn data(template: Header, message_type: DataMessageType, objects: &[u32]) -> Message {
    Message::new_with_objects(Header::new_data(template, message_type, 0), objects)
}

/// A structured VDM of the partner.
pub fn vdm(
    template: Header,
    svid: u16,
    command: VdmCommand,
    command_type: VdmCommandType,
    position: u8,
    vdos: &[u32],
) -> Message {
    let header = VdmHeaderStructured::new(svid, VdmVersion::V2_0, command, command_type).with_object_position(position);

    let mut objects = Vec::new();
    objects.push(header.0);
    objects.extend_from_slice(vdos);

    data(template, DataMessageType::VendorDefined, &objects)
}

/// Dummy source capabilities.
///
/// - Fixed 5 V at 3 A
/// - Fixed 9 V at 3 A
/// - Fixed 20 V at 2.25 A
pub fn dummy_source_capabilities() -> Capabilities {
    let mut pdos = heapless::Vec::new();
    let _ = pdos.push(PowerDataObject::FixedSupply(
        FixedSupply::new_vsafe5v(300).with_unconstrained_power(true),
    ));
    let _ = pdos.push(PowerDataObject::FixedSupply(FixedSupply::new(180, 300)));
    let _ = pdos.push(PowerDataObject::FixedSupply(FixedSupply::new(400, 225)));

    Capabilities(pdos)
}

/// A request for the fixed supply at `position`, with operating and maximum currents in 10 mA units.
pub fn dummy_request(position: u8, raw_operating_current: u16, raw_max_current: u16) -> RequestDataObject {
    FixedVariableRequest::new(position, raw_operating_current, raw_max_current).into()
}
