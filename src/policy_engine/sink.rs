//! Transitions of the sink's own states.
use super::{PolicyEngine, State};
use crate::DataRole;
use crate::device_policy_manager::DevicePolicyManager;
use crate::message::MessageMask;
use crate::message::header::{ControlMessageType, DataMessageType};
use crate::message::pdo::Capabilities;
use crate::timers::{Timer, TimerType};
use crate::transport::{CcControl, Transport, VconnSource};

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    pub(super) fn snk_startup(&mut self) -> State {
        self.session.explicit_contract = false;

        self.transport.protocol_reset();
        self.transport.set_cc_control(CcControl::Rd);

        State::SnkDiscovery
    }

    pub(super) async fn snk_discovery(&mut self) -> State {
        self.transport.wait_for_vbus().await;
        State::SnkWaitForCapabilities
    }

    pub(super) async fn snk_wait_for_capabilities(&mut self) -> State {
        match self
            .wait_msg(MessageMask::data(DataMessageType::SourceCapabilities), TimerType::SinkWaitCap)
            .await
        {
            Some(message) => {
                self.session.source_capabilities = Capabilities::from_objects(&message.objects);
                State::SnkEvaluateCapability
            }
            None if self.session.abnormal_transport => State::SnkWaitForCapabilities,
            None if !self.session.hard_reset.exceeded() => {
                warn!("No source capabilities received");
                State::SnkHardReset
            }
            None => State::ErrorRecovery,
        }
    }

    pub(super) async fn snk_evaluate_capability(&mut self) -> State {
        let position = self
            .device_policy_manager
            .evaluate_capability(&self.session.source_capabilities)
            .await;

        if position == 0 {
            warn!("No acceptable capability");
            State::SnkHardReset
        } else {
            self.session.requested_position = position;
            State::SnkSelectCapability
        }
    }

    pub(super) async fn snk_select_capability(&mut self) -> State {
        let request = self
            .device_policy_manager
            .select_capability(self.session.requested_position, &self.session.source_capabilities)
            .await;
        self.session.pending_request = request;

        if !self.send_data(DataMessageType::Request, &[request.0]).await {
            return State::SnkSendSoftReset;
        }

        let expected = MessageMask::control(ControlMessageType::Accept)
            | MessageMask::control(ControlMessageType::Reject)
            | MessageMask::control(ControlMessageType::Wait);

        match self.wait_msg(expected, TimerType::SenderResponse).await {
            Some(message) if message.is_control(ControlMessageType::Accept) => State::SnkTransitionSink,
            Some(message) => {
                debug!("Request answered with {:?}", message.message_type());
                State::SnkReady
            }
            None if self.session.abnormal_transport => State::SnkSelectCapability,
            None => State::SnkHardReset,
        }
    }

    pub(super) async fn snk_transition_sink(&mut self) -> State {
        match self
            .wait_msg(MessageMask::control(ControlMessageType::PsRdy), TimerType::PSTransition)
            .await
        {
            Some(_) => {
                let request = self.session.pending_request;

                info!("Explicit contract for position {}", request.object_position());
                self.session.explicit_contract = true;
                self.session.selected_request = Some(request);
                self.session.hard_reset.reset();
                self.session.swap_hard_reset.reset();

                self.device_policy_manager.transition_power(&request).await;
                State::SnkReady
            }
            None if self.session.abnormal_transport => State::SnkTransitionSink,
            None => State::SnkHardReset,
        }
    }

    pub(super) async fn snk_hard_reset(&mut self) -> State {
        if self.session.hard_reset.increment().is_err() {
            return State::ErrorRecovery;
        }

        warn!("Hard reset {}", self.session.hard_reset.value());
        self.transport.hard_reset().await;

        State::SnkTransitionToDefault
    }

    pub(super) async fn snk_transition_to_default(&mut self) -> State {
        self.session.reset_to_default();

        self.transport.driver_reset();
        self.transport.set_vconn_source(VconnSource::Off);
        self.transport.set_data_role(DataRole::Ufp);
        self.device_policy_manager.hard_reset().await;

        State::SnkStartup
    }

    pub(super) async fn snk_give_sink_cap(&mut self) -> State {
        let capabilities = self.device_policy_manager.sink_capabilities().await;

        if self
            .send_capabilities(DataMessageType::SinkCapabilities, &capabilities)
            .await
        {
            State::SnkReady
        } else {
            State::SnkSendSoftReset
        }
    }

    pub(super) async fn snk_give_source_cap(&mut self) -> State {
        if self.config.dual_role_power {
            self.give_source_cap(State::SnkReady).await
        } else {
            self.send_not_supported().await
        }
    }

    pub(super) async fn snk_get_source_cap(&mut self) -> State {
        if !self.send_control(ControlMessageType::GetSourceCap).await {
            return State::SnkReady;
        }

        match self
            .wait_msg(MessageMask::data(DataMessageType::SourceCapabilities), TimerType::SenderResponse)
            .await
        {
            Some(message) => {
                self.session.source_capabilities = Capabilities::from_objects(&message.objects);
                State::SnkEvaluateCapability
            }
            None => State::SnkReady,
        }
    }
}
