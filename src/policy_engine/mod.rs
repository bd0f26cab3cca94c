//! Policy engine of a USB PD port.
//!
//! Each protocol state has one transition function, which performs bounded side effects and
//! returns the next state. The dispatcher feeds states back into their transition functions,
//! until a state returns itself (a fixed point). A new run is started by a kick of the port's
//! [`PortEvents`].
//!
//! See USB PD R3.2, [8.3.3].
use core::marker::PhantomData;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use crate::config::Config;
use crate::device_policy_manager::{Command, DevicePolicyManager, Notification};
use crate::message::header::{ControlMessageType, DataMessageType, Header};
use crate::message::pdo::Capabilities;
use crate::message::request::RequestDataObject;
use crate::message::vendor_defined::VdmHeaderStructured;
use crate::message::{MAX_DATA_OBJECTS, Message, MessageMask};
use crate::port::{PendingEvents, PortEvents};
use crate::timers::{Timer, TimerType};
use crate::transport::{RxError, Transport};
use crate::{DataRole, PowerRole};

mod data_role_swap;
pub mod outcome;
mod power_role_swap;
pub mod ready;
mod session;
mod sink;
mod source;
mod state;
mod vconn_swap;
mod vdm_dfp;
mod vdm_ufp;

#[cfg(test)]
mod tests;

pub use session::{Discovery, MAX_UNHANDLED, Session};
pub use state::State;

/// Implementation of the policy engine.
#[derive(Debug)]
pub struct PolicyEngine<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> {
    transport: TRANSPORT,
    device_policy_manager: DPM,
    config: Config,
    session: Session,

    _timer: PhantomData<TIMER>,
}

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    /// Create a new policy engine with a given `transport`.
    pub fn new(transport: TRANSPORT, device_policy_manager: DPM, config: Config) -> Self {
        Self {
            transport,
            device_policy_manager,
            config,
            session: Session::new(),
            _timer: PhantomData,
        }
    }

    /// Set a new transport when re-attached.
    ///
    /// The session starts over, as after detach and attach.
    pub fn re_attach(&mut self, transport: TRANSPORT) {
        self.transport = transport;
        self.session.reset();
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.session.state
    }

    /// The session data.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The transport.
    pub fn transport(&self) -> &TRANSPORT {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut TRANSPORT {
        &mut self.transport
    }

    /// The device policy manager.
    pub fn device_policy_manager(&self) -> &DPM {
        &self.device_policy_manager
    }

    /// The device policy manager, mutably.
    pub fn device_policy_manager_mut(&mut self) -> &mut DPM {
        &mut self.device_policy_manager
    }

    /// Run the port's worker loop.
    ///
    /// Waits for a kick, takes the pending events, and dispatches. Never returns.
    pub async fn run<M: RawMutex>(&mut self, events: &PortEvents<M>) {
        loop {
            events.wait().await;

            let (pending, command) = events.take();
            self.dispatch(pending, command).await;
        }
    }

    /// Run the state machine until it reaches a fixed point, and return the final state.
    ///
    /// Pending events are only consulted at the start of the run. A plug attach starts a new
    /// session. A command replaces a pending command that was not yet consumed.
    pub async fn dispatch(&mut self, events: PendingEvents, command: Option<Command>) -> State {
        if events.plug_attach {
            // A new attach starts a new session, which also leaves error recovery.
            let state = self.session.state;
            self.session.reset();
            self.session.state = state;
        }

        self.session.events = events;
        if command.is_some() {
            self.session.command = command;
        }

        let mut state = self.session.state;
        let resolve = match state {
            State::ErrorRecovery => events.plug_attach,
            State::Unset => true,
            _ => events.any(),
        };

        if resolve {
            let entry = self.resolve_entry();
            debug!("Resolve {:?} -> {:?} ({:?})", state, entry, events);
            state = entry;
        }
        self.session.events = PendingEvents::NONE;
        self.session.state = state;

        loop {
            let next = self.transition(state).await;
            if next == state {
                break;
            }

            debug!("{:?} -> {:?}", state, next);
            if next == State::ErrorRecovery {
                error!("Retry ceiling exceeded, entering error recovery");
                self.device_policy_manager
                    .inform_event(Notification::ErrorRecovery)
                    .await;
            }

            self.session.state = next;
            state = next;
        }

        state
    }

    /// Select the entry state for pending events, based on the current power role.
    fn resolve_entry(&self) -> State {
        let events = self.session.events;
        let source = self.transport.power_role() == PowerRole::Source;

        match (source, events) {
            (true, PendingEvents { plug_attach: true, .. }) => State::SrcStartup,
            (false, PendingEvents { plug_attach: true, .. }) => State::SnkStartup,
            (true, PendingEvents { hard_reset_received: true, .. }) => State::SrcHardResetReceived,
            (false, PendingEvents { hard_reset_received: true, .. }) => State::SnkTransitionToDefault,
            (true, PendingEvents { soft_reset_received: true, .. }) => State::SrcSoftReset,
            (false, PendingEvents { soft_reset_received: true, .. }) => State::SnkSoftReset,
            (true, _) => State::SrcStartup,
            (false, _) => State::SnkStartup,
        }
    }

    /// Run the transition function of a state.
    async fn transition(&mut self, state: State) -> State {
        match state {
            State::Unset => self.resolve_entry(),
            State::ErrorRecovery => State::ErrorRecovery,

            State::SrcStartup => self.src_startup(),
            State::SrcDiscovery => self.src_discovery().await,
            State::SrcSendCapabilities => self.src_send_capabilities().await,
            State::SrcNegotiateCapability => self.src_negotiate_capability().await,
            State::SrcTransitionSupply => self.src_transition_supply().await,
            State::SrcReady => self.ready(&ready::SOURCE_READY, State::SrcReady, State::SrcSendNotSupported).await,
            State::SrcDisabled => State::SrcDisabled,
            State::SrcCapabilityResponse => self.src_capability_response().await,
            State::SrcHardReset => self.src_hard_reset().await,
            State::SrcHardResetReceived => self.src_hard_reset_received().await,
            State::SrcTransitionToDefault => self.src_transition_to_default().await,
            State::SrcGiveSourceCap => self.give_source_cap(State::SrcSendSoftReset).await,
            State::SrcGiveSinkCap => self.give_sink_cap_if_dual_role().await,
            State::SrcGetSinkCap => self.src_get_sink_cap().await,
            State::SrcWaitNewCapabilities => self.src_wait_new_capabilities(),
            State::SrcSendSoftReset => self.send_soft_reset(State::SrcSendCapabilities, State::SrcHardReset).await,
            State::SrcSoftReset => self.soft_reset(State::SrcSendCapabilities, State::SrcHardReset).await,
            State::SrcSendNotSupported | State::SnkSendNotSupported => self.send_not_supported().await,
            State::SrcNotSupportedReceived | State::SnkNotSupportedReceived => self.not_supported_received().await,

            State::SnkStartup => self.snk_startup(),
            State::SnkDiscovery => self.snk_discovery().await,
            State::SnkWaitForCapabilities => self.snk_wait_for_capabilities().await,
            State::SnkEvaluateCapability => self.snk_evaluate_capability().await,
            State::SnkSelectCapability => self.snk_select_capability().await,
            State::SnkTransitionSink => self.snk_transition_sink().await,
            State::SnkReady => self.ready(&ready::SINK_READY, State::SnkReady, State::SnkSendNotSupported).await,
            State::SnkHardReset => self.snk_hard_reset().await,
            State::SnkTransitionToDefault => self.snk_transition_to_default().await,
            State::SnkGiveSinkCap => self.snk_give_sink_cap().await,
            State::SnkGiveSourceCap => self.snk_give_source_cap().await,
            State::SnkGetSourceCap => self.snk_get_source_cap().await,
            State::SnkSendSoftReset => self.send_soft_reset(State::SnkWaitForCapabilities, State::SnkHardReset).await,
            State::SnkSoftReset => self.soft_reset(State::SnkWaitForCapabilities, State::SnkHardReset).await,

            State::DrsDfpUfpEvaluateSwap => {
                self.drs_evaluate_swap(State::DrsDfpUfpAcceptSwap, State::DrsDfpUfpRejectSwap)
                    .await
            }
            State::DrsDfpUfpAcceptSwap => self.drs_accept_swap(State::DrsDfpUfpChangeToUfp).await,
            State::DrsDfpUfpChangeToUfp => self.drs_change_data_role(DataRole::Ufp).await,
            State::DrsDfpUfpSendSwap => self.drs_send_swap(State::DrsDfpUfpChangeToUfp).await,
            State::DrsDfpUfpRejectSwap | State::DrsUfpDfpRejectSwap => self.reject_swap().await,
            State::DrsUfpDfpEvaluateSwap => {
                self.drs_evaluate_swap(State::DrsUfpDfpAcceptSwap, State::DrsUfpDfpRejectSwap)
                    .await
            }
            State::DrsUfpDfpAcceptSwap => self.drs_accept_swap(State::DrsUfpDfpChangeToDfp).await,
            State::DrsUfpDfpChangeToDfp => self.drs_change_data_role(DataRole::Dfp).await,
            State::DrsUfpDfpSendSwap => self.drs_send_swap(State::DrsUfpDfpChangeToDfp).await,

            State::PrsSrcSnkEvaluateSwap => {
                self.prs_evaluate_swap(State::PrsSrcSnkAcceptSwap, State::PrsSrcSnkRejectSwap)
                    .await
            }
            State::PrsSrcSnkAcceptSwap => self.prs_accept_swap(State::PrsSrcSnkTransitionToOff).await,
            State::PrsSrcSnkTransitionToOff => self.prs_src_snk_transition_to_off().await,
            State::PrsSrcSnkAssertRd => self.prs_src_snk_assert_rd(),
            State::PrsSrcSnkWaitSourceOn => self.prs_src_snk_wait_source_on().await,
            State::PrsSrcSnkSendSwap => self.prs_send_swap(State::PrsSrcSnkTransitionToOff).await,
            State::PrsSrcSnkRejectSwap | State::PrsSnkSrcRejectSwap => self.reject_swap().await,
            State::PrsSnkSrcEvaluateSwap => {
                self.prs_evaluate_swap(State::PrsSnkSrcAcceptSwap, State::PrsSnkSrcRejectSwap)
                    .await
            }
            State::PrsSnkSrcAcceptSwap => self.prs_accept_swap(State::PrsSnkSrcTransitionToOff).await,
            State::PrsSnkSrcTransitionToOff => self.prs_snk_src_transition_to_off().await,
            State::PrsSnkSrcAssertRp => self.prs_snk_src_assert_rp(),
            State::PrsSnkSrcSourceOn => self.prs_snk_src_source_on().await,
            State::PrsSnkSrcSendSwap => self.prs_send_swap(State::PrsSnkSrcTransitionToOff).await,

            State::VcsEvaluateSwap => self.vcs_evaluate_swap().await,
            State::VcsAcceptSwap => self.vcs_accept_swap().await,
            State::VcsWaitForVconn => self.vcs_wait_for_vconn().await,
            State::VcsTurnOffVconn => self.vcs_turn_off_vconn().await,
            State::VcsTurnOnVconn => self.vcs_turn_on_vconn().await,
            State::VcsSendPsRdy => self.vcs_send_ps_rdy().await,
            State::VcsSendSwap => self.vcs_send_swap().await,
            State::VcsRejectSwap => self.reject_swap().await,

            State::UfpVdmGetIdentity => self.ufp_vdm_get_identity().await,
            State::UfpVdmSendIdentity
            | State::UfpVdmSendSvids
            | State::UfpVdmSendModes
            | State::UfpVdmStatusAck
            | State::UfpVdmConfigureAck => self.ufp_vdm_ack(state).await,
            State::UfpVdmGetIdentityNak
            | State::UfpVdmGetSvidsNak
            | State::UfpVdmGetModesNak
            | State::UfpVdmModeEntryNak
            | State::UfpVdmModeExitNak
            | State::UfpVdmStatusNak
            | State::UfpVdmConfigureNak => self.ufp_vdm_nak(state).await,
            State::UfpVdmGetSvids => self.ufp_vdm_get_svids().await,
            State::UfpVdmGetModes => self.ufp_vdm_get_modes().await,
            State::UfpVdmEvaluateModeEntry => self.ufp_vdm_evaluate_mode_entry().await,
            State::UfpVdmModeEntryAck => self.ufp_vdm_mode_entry_ack().await,
            State::UfpVdmModeExit => self.ufp_vdm_mode_exit().await,
            State::UfpVdmModeExitAck => self.ufp_vdm_mode_exit_ack().await,
            State::UfpVdmAttentionRequest => self.ufp_vdm_attention_request().await,
            State::UfpVdmEvaluateStatus => self.ufp_vdm_evaluate_status().await,
            State::UfpVdmEvaluateConfigure => self.ufp_vdm_evaluate_configure().await,

            State::DfpVdmIdentityRequest => self.dfp_vdm_identity_request().await,
            State::DfpVdmIdentityAcked => self.dfp_vdm_identity_acked().await,
            State::DfpVdmSvidsRequest => self.dfp_vdm_svids_request().await,
            State::DfpVdmSvidsAcked => self.dfp_vdm_svids_acked().await,
            State::DfpVdmModesRequest => self.dfp_vdm_modes_request().await,
            State::DfpVdmModesAcked => self.dfp_vdm_modes_acked().await,
            State::DfpVdmModeEntryRequest => self.dfp_vdm_mode_entry_request().await,
            State::DfpVdmModeEntryAcked => self.dfp_vdm_mode_entry_acked().await,
            State::DfpVdmModeExitRequest => self.dfp_vdm_mode_exit_request().await,
            State::DfpVdmModeExitAcked => self.dfp_vdm_mode_exit_acked().await,
            State::DfpVdmAttentionRequest => self.dfp_vdm_attention_request().await,
            State::DfpVdmStatusUpdate => self.dfp_vdm_status_update().await,
            State::DfpVdmStatusUpdateAcked => self.dfp_vdm_status_update_acked().await,
            State::DfpVdmConfigure => self.dfp_vdm_configure().await,
            State::DfpVdmConfigureAcked => self.dfp_vdm_configure_acked().await,
            State::DfpVdmIdentityNaked
            | State::DfpVdmSvidsNaked
            | State::DfpVdmModesNaked
            | State::DfpVdmModeEntryNaked
            | State::DfpVdmModeExitNaked
            | State::DfpVdmStatusUpdateNaked
            | State::DfpVdmConfigureNaked => self.dfp_vdm_naked(state).await,
        }
    }

    /// The ready state of the current power role.
    fn role_ready(&self) -> State {
        match self.transport.power_role() {
            PowerRole::Source => State::SrcReady,
            PowerRole::Sink => State::SnkReady,
        }
    }

    /// The hard reset state of the current power role.
    fn role_hard_reset(&self) -> State {
        match self.transport.power_role() {
            PowerRole::Source => State::SrcHardReset,
            PowerRole::Sink => State::SnkHardReset,
        }
    }

    fn header_template(&self) -> Header {
        Header::new_template(
            self.transport.data_role(),
            self.transport.power_role(),
            self.config.spec_revision,
        )
    }

    /// Send a message, and remember it as the last sent message.
    ///
    /// Returns `true`, if the message was acknowledged with GoodCRC.
    async fn send(&mut self, message: Message) -> bool {
        let sent = self.transport.send(&message).await;

        if sent {
            trace!("Sent {:?}", message.message_type());
        } else {
            trace!("Failed to send {:?}", message.message_type());
        }

        self.session.last_sent = message;
        sent
    }

    async fn send_control(&mut self, message_type: ControlMessageType) -> bool {
        let header = Header::new_control(self.header_template(), message_type);
        self.send(Message::new(header)).await
    }

    async fn send_data(&mut self, message_type: DataMessageType, objects: &[u32]) -> bool {
        let header = Header::new_data(self.header_template(), message_type, 0);
        self.send(Message::new_with_objects(header, objects)).await
    }

    async fn send_capabilities(&mut self, message_type: DataMessageType, capabilities: &Capabilities) -> bool {
        let objects = capabilities.to_objects();
        self.send_data(message_type, &objects).await
    }

    async fn send_vdm(&mut self, header: VdmHeaderStructured, vdos: &[u32]) -> bool {
        let mut objects: Vec<u32, MAX_DATA_OBJECTS> = Vec::new();
        let _ = objects.push(header.0);
        for vdo in vdos.iter().take(MAX_DATA_OBJECTS - 1) {
            let _ = objects.push(*vdo);
        }

        self.send_data(DataMessageType::VendorDefined, &objects).await
    }

    /// Wait for a message of one of the expected types, bounded by a timer.
    ///
    /// Other messages are kept as unhandled, for evaluation in the ready state. An abnormal
    /// transport condition ends the wait, and is reported through the session.
    async fn wait_msg(&mut self, expected: MessageMask, timer_type: TimerType) -> Option<Message> {
        self.session.abnormal_transport = false;

        let transport = &mut self.transport;
        let session = &mut self.session;

        let receive_fut = async {
            loop {
                match transport.receive().await {
                    Ok(message) if expected.contains(message.message_type()) => {
                        trace!("Received {:?}", message.message_type());
                        session.last_received = message.clone();
                        break Some(message);
                    }
                    Ok(message) if message.is_control(ControlMessageType::GoodCRC) => (),
                    Ok(message) => {
                        debug!("Unexpected {:?}, keep for later", message.message_type());
                        if let Err(message) = session.unhandled.push_back(message) {
                            warn!("Too many unhandled messages, drop {:?}", message.message_type());
                        }
                    }
                    Err(RxError::Discarded) => (),
                    Err(RxError::Abnormal) => {
                        warn!("Abnormal transport condition");
                        session.abnormal_transport = true;
                        break None;
                    }
                }
            }
        };

        match select(receive_fut, TimerType::new::<TIMER>(timer_type)).await {
            Either::First(message) => message,
            Either::Second(_) => {
                trace!("Timeout {:?}", timer_type);
                None
            }
        }
    }

    /// Take a pending inbound message without blocking.
    ///
    /// Messages that were kept during earlier waits come first, in order of arrival.
    async fn poll_message(&mut self) -> Option<Message> {
        if let Some(message) = self.session.unhandled.pop_front() {
            return Some(message);
        }

        loop {
            match select(self.transport.receive(), core::future::ready(())).await {
                Either::First(Ok(message)) if message.is_control(ControlMessageType::GoodCRC) => (),
                Either::First(Ok(message)) => {
                    trace!("Received {:?}", message.message_type());
                    return Some(message);
                }
                Either::First(Err(RxError::Discarded)) => (),
                Either::First(Err(RxError::Abnormal)) => {
                    warn!("Abnormal transport condition");
                    self.session.abnormal_transport = true;
                    return None;
                }
                Either::Second(_) => return None,
            }
        }
    }

    /// Take over a message that leads out of the ready state.
    fn accept_message(&mut self, message: Message) {
        if message.is_data(DataMessageType::Request) {
            self.session.pending_request = RequestDataObject(message.object(0).unwrap_or_default());
        } else if message.is_data(DataMessageType::SourceCapabilities) {
            self.session.source_capabilities = Capabilities::from_objects(&message.objects);
        }

        self.session.last_received = message;
    }

    /// The ready state of either power role.
    ///
    /// Pending inbound messages take precedence over the pending command. Without either, a DFP
    /// proceeds with alternate mode discovery.
    async fn ready(&mut self, table: &[ready::Route], stay: State, not_supported: State) -> State {
        let data_role = self.transport.data_role();

        while let Some(message) = self.poll_message().await {
            if let Some(route) = ready::route(table, Some(&message), None) {
                self.accept_message(message);
                return route.to.resolve(data_role);
            }

            if !ready::is_ignored(&message) {
                warn!("Not supported: {:?}", message.message_type());
                self.session.last_received = message;
                return not_supported;
            }
        }

        if let Some(command) = self.session.command.take() {
            match ready::route(table, None, Some(command)) {
                Some(route) => return route.to.resolve(data_role),
                None => warn!("Command {:?} does not apply in {:?}", command, stay),
            }
        }

        self.discovery_step().unwrap_or(stay)
    }

    /// The next alternate mode discovery step, if discovery is enabled and the port is a DFP.
    fn discovery_step(&self) -> Option<State> {
        if !self.config.alternate_mode_discovery
            || !self.session.explicit_contract
            || self.transport.data_role() != DataRole::Dfp
        {
            return None;
        }

        ready::next_discovery_step(
            &self.session.discovery,
            &self.session.discover_identity,
            self.config.displayport_svid,
        )
    }

    /// Send source capabilities from the device policy manager.
    async fn give_source_cap(&mut self, on_failure: State) -> State {
        let capabilities = self.device_policy_manager.source_capabilities().await;

        if self
            .send_capabilities(DataMessageType::SourceCapabilities, &capabilities)
            .await
        {
            self.role_ready()
        } else {
            on_failure
        }
    }

    /// Answer a request for the capabilities of the other power role.
    async fn give_sink_cap_if_dual_role(&mut self) -> State {
        if self.config.dual_role_power {
            let capabilities = self.device_policy_manager.sink_capabilities().await;
            self.send_capabilities(DataMessageType::SinkCapabilities, &capabilities)
                .await;
        } else {
            self.send_control(ControlMessageType::NotSupported).await;
        }

        self.role_ready()
    }

    async fn send_soft_reset(&mut self, on_success: State, on_failure: State) -> State {
        self.transport.protocol_reset();

        if !self.send_control(ControlMessageType::SoftReset).await {
            warn!("Soft reset not acknowledged");
            return on_failure;
        }

        match self
            .wait_msg(MessageMask::control(ControlMessageType::Accept), TimerType::SenderResponse)
            .await
        {
            Some(_) => on_success,
            None if self.session.abnormal_transport => self.session.state,
            None => on_failure,
        }
    }

    async fn soft_reset(&mut self, on_success: State, on_failure: State) -> State {
        self.transport.protocol_reset();

        if self.send_control(ControlMessageType::Accept).await {
            on_success
        } else {
            on_failure
        }
    }

    async fn send_not_supported(&mut self) -> State {
        self.send_control(ControlMessageType::NotSupported).await;
        self.role_ready()
    }

    async fn not_supported_received(&mut self) -> State {
        self.device_policy_manager
            .inform_event(Notification::NotSupportedReceived)
            .await;
        self.role_ready()
    }

    /// Send Reject in answer to a swap request.
    async fn reject_swap(&mut self) -> State {
        self.send_control(ControlMessageType::Reject).await;
        self.role_ready()
    }

    /// Wait for the answer to a swap request.
    ///
    /// Returns `true`, if the partner accepted.
    async fn wait_for_swap_answer(&mut self) -> bool {
        let expected = MessageMask::control(ControlMessageType::Accept)
            | MessageMask::control(ControlMessageType::Reject)
            | MessageMask::control(ControlMessageType::Wait);

        self.wait_msg(expected, TimerType::SenderResponse)
            .await
            .is_some_and(|message| message.is_control(ControlMessageType::Accept))
    }
}
