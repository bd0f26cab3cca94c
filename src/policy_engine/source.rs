//! Transitions of the source's own states.
use super::outcome::{self, CapsOutcome};
use super::{PolicyEngine, State};
use crate::DataRole;
use crate::device_policy_manager::{Command, DevicePolicyManager};
use crate::message::MessageMask;
use crate::message::header::{ControlMessageType, DataMessageType};
use crate::message::pdo::Capabilities;
use crate::message::request::RequestDataObject;
use crate::timers::{Timer, TimerType};
use crate::transport::{CcControl, Transport, VconnSource};

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    pub(super) fn src_startup(&mut self) -> State {
        self.session.caps.reset();
        self.session.explicit_contract = false;

        self.transport.protocol_reset();
        self.transport.set_cc_control(CcControl::Rp);

        State::SrcDiscovery
    }

    pub(super) async fn src_discovery(&mut self) -> State {
        TimerType::new::<TIMER>(TimerType::SourceCapability).await;

        if self.session.caps.exceeded() {
            warn!("No response to source capabilities, disable");
            State::SrcDisabled
        } else {
            State::SrcSendCapabilities
        }
    }

    pub(super) async fn src_send_capabilities(&mut self) -> State {
        let capabilities = self.device_policy_manager.source_capabilities().await;
        let sent = self
            .send_capabilities(DataMessageType::SourceCapabilities, &capabilities)
            .await;
        self.session.source_capabilities = capabilities;

        let outcome = if !sent {
            CapsOutcome::TransportFailure
        } else {
            match self
                .wait_msg(MessageMask::data(DataMessageType::Request), TimerType::SenderResponse)
                .await
            {
                Some(message) => {
                    let request = RequestDataObject(message.object(0).unwrap_or_default());

                    if request.object_position() == 0 {
                        CapsOutcome::Rejected
                    } else {
                        self.session.pending_request = request;
                        CapsOutcome::Accepted
                    }
                }
                None if self.session.abnormal_transport => CapsOutcome::Abnormal,
                None => CapsOutcome::NoResponse,
            }
        };

        let decision = outcome::after_send_capabilities(outcome, &self.session.caps, &self.session.hard_reset);
        trace!("Capabilities outcome {:?}: {:?}", outcome, decision);

        decision.caps.apply(&mut self.session.caps);
        decision.hard_reset.apply(&mut self.session.hard_reset);
        decision.next
    }

    pub(super) async fn src_negotiate_capability(&mut self) -> State {
        let request = self.session.pending_request;

        if self
            .device_policy_manager
            .match_request(&request, &self.session.source_capabilities)
            .await
        {
            State::SrcTransitionSupply
        } else {
            State::SrcCapabilityResponse
        }
    }

    pub(super) async fn src_transition_supply(&mut self) -> State {
        if !self.send_control(ControlMessageType::Accept).await {
            return State::SrcSendSoftReset;
        }

        TimerType::new::<TIMER>(TimerType::SrcTransition).await;

        let request = self.session.pending_request;
        self.device_policy_manager.transition_supply(&request).await;

        if !self.send_control(ControlMessageType::PsRdy).await {
            return State::SrcHardReset;
        }

        info!("Explicit contract for position {}", request.object_position());
        self.session.explicit_contract = true;
        self.session.selected_request = Some(request);
        self.session.hard_reset.reset();
        self.session.swap_hard_reset.reset();

        State::SrcReady
    }

    pub(super) async fn src_capability_response(&mut self) -> State {
        self.send_control(ControlMessageType::Reject).await;

        if self.session.explicit_contract {
            State::SrcReady
        } else {
            State::SrcWaitNewCapabilities
        }
    }

    pub(super) fn src_wait_new_capabilities(&mut self) -> State {
        match self.session.command {
            Some(Command::SendSourceCapabilities) => {
                self.session.command = None;
                State::SrcSendCapabilities
            }
            _ => State::SrcWaitNewCapabilities,
        }
    }

    pub(super) async fn src_hard_reset(&mut self) -> State {
        if self.session.hard_reset.increment().is_err() {
            return State::ErrorRecovery;
        }

        warn!("Hard reset {}", self.session.hard_reset.value());
        self.transport.hard_reset().await;
        TimerType::new::<TIMER>(TimerType::PSHardReset).await;

        State::SrcTransitionToDefault
    }

    pub(super) async fn src_hard_reset_received(&mut self) -> State {
        TimerType::new::<TIMER>(TimerType::PSHardReset).await;
        State::SrcTransitionToDefault
    }

    pub(super) async fn src_transition_to_default(&mut self) -> State {
        self.session.reset_to_default();

        self.transport.driver_reset();
        self.transport.set_vconn_source(VconnSource::Off);
        self.transport.set_data_role(DataRole::Dfp);
        self.device_policy_manager.hard_reset().await;

        State::SrcStartup
    }

    pub(super) async fn src_get_sink_cap(&mut self) -> State {
        if !self.send_control(ControlMessageType::GetSinkCap).await {
            return State::SrcReady;
        }

        if let Some(message) = self
            .wait_msg(MessageMask::data(DataMessageType::SinkCapabilities), TimerType::SenderResponse)
            .await
        {
            self.session.sink_capabilities = Capabilities::from_objects(&message.objects);
        }

        State::SrcReady
    }
}
