//! Transitions of the VCONN swap states.
use super::{PolicyEngine, State};
use crate::device_policy_manager::{DevicePolicyManager, Notification};
use crate::message::MessageMask;
use crate::message::header::ControlMessageType;
use crate::timers::{Timer, TimerType};
use crate::transport::{Transport, VconnSource};

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    /// The next state after an accepted swap depends on who supplies VCONN now.
    fn vcs_accepted(&self) -> State {
        match self.transport.vconn_source() {
            VconnSource::On => State::VcsWaitForVconn,
            VconnSource::Off => State::VcsTurnOnVconn,
        }
    }

    pub(super) async fn vcs_evaluate_swap(&mut self) -> State {
        if self.device_policy_manager.vconn_source_swap().await {
            State::VcsAcceptSwap
        } else {
            State::VcsRejectSwap
        }
    }

    pub(super) async fn vcs_accept_swap(&mut self) -> State {
        if self.send_control(ControlMessageType::Accept).await {
            self.vcs_accepted()
        } else {
            self.role_ready()
        }
    }

    pub(super) async fn vcs_send_swap(&mut self) -> State {
        if self.send_control(ControlMessageType::VconnSwap).await && self.wait_for_swap_answer().await {
            self.vcs_accepted()
        } else {
            self.role_ready()
        }
    }

    pub(super) async fn vcs_wait_for_vconn(&mut self) -> State {
        match self
            .wait_msg(MessageMask::control(ControlMessageType::PsRdy), TimerType::VCONNOn)
            .await
        {
            Some(_) => State::VcsTurnOffVconn,
            None if self.session.abnormal_transport => State::VcsWaitForVconn,
            None => {
                warn!("Partner did not turn on VCONN");
                self.role_hard_reset()
            }
        }
    }

    pub(super) async fn vcs_turn_off_vconn(&mut self) -> State {
        self.transport.set_vconn_source(VconnSource::Off);
        self.device_policy_manager
            .inform_event(Notification::VconnChanged(VconnSource::Off))
            .await;

        self.role_ready()
    }

    pub(super) async fn vcs_turn_on_vconn(&mut self) -> State {
        self.transport.set_vconn_source(VconnSource::On);
        TimerType::new::<TIMER>(TimerType::VCONNOn).await;

        self.device_policy_manager
            .inform_event(Notification::VconnChanged(VconnSource::On))
            .await;

        State::VcsSendPsRdy
    }

    pub(super) async fn vcs_send_ps_rdy(&mut self) -> State {
        self.send_control(ControlMessageType::PsRdy).await;
        self.role_ready()
    }
}
