//! Transitions of the power role swap states.
//!
//! See USB PD R3.2, [8.3.3.19].
use super::{PolicyEngine, State};
use crate::PowerRole;
use crate::device_policy_manager::{DevicePolicyManager, Notification};
use crate::message::MessageMask;
use crate::message::header::ControlMessageType;
use crate::timers::{Timer, TimerType};
use crate::transport::{CcControl, Transport};

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    pub(super) async fn prs_evaluate_swap(&mut self, accept: State, reject: State) -> State {
        if self.device_policy_manager.power_role_swap().await {
            accept
        } else {
            reject
        }
    }

    pub(super) async fn prs_accept_swap(&mut self, transition: State) -> State {
        if self.send_control(ControlMessageType::Accept).await {
            transition
        } else {
            self.role_ready()
        }
    }

    pub(super) async fn prs_send_swap(&mut self, transition: State) -> State {
        if self.send_control(ControlMessageType::PrSwap).await && self.wait_for_swap_answer().await {
            transition
        } else {
            self.role_ready()
        }
    }

    /// A failed power role swap ends in a hard reset of the current power role, or in error
    /// recovery, once the swap hard reset ceiling is exceeded.
    fn prs_failure(&mut self) -> State {
        if self.session.swap_hard_reset.increment().is_err() {
            return State::ErrorRecovery;
        }

        warn!("Power role swap failed");
        self.role_hard_reset()
    }

    pub(super) async fn prs_src_snk_transition_to_off(&mut self) -> State {
        TimerType::new::<TIMER>(TimerType::SrcTransition).await;
        self.transport.set_otg_control(false);

        State::PrsSrcSnkAssertRd
    }

    pub(super) fn prs_src_snk_assert_rd(&mut self) -> State {
        self.transport.set_cc_control(CcControl::Rd);
        self.transport.set_power_role(PowerRole::Sink);

        State::PrsSrcSnkWaitSourceOn
    }

    pub(super) async fn prs_src_snk_wait_source_on(&mut self) -> State {
        if !self.send_control(ControlMessageType::PsRdy).await {
            return self.prs_failure();
        }

        match self
            .wait_msg(MessageMask::control(ControlMessageType::PsRdy), TimerType::PSSourceOn)
            .await
        {
            Some(_) => {
                info!("Power role changed to sink");
                self.device_policy_manager
                    .inform_event(Notification::PowerRoleChanged(PowerRole::Sink))
                    .await;

                State::SnkStartup
            }
            None if self.session.abnormal_transport => State::PrsSrcSnkWaitSourceOn,
            None => self.prs_failure(),
        }
    }

    pub(super) async fn prs_snk_src_transition_to_off(&mut self) -> State {
        match self
            .wait_msg(MessageMask::control(ControlMessageType::PsRdy), TimerType::PSSourceOff)
            .await
        {
            Some(_) => State::PrsSnkSrcAssertRp,
            None if self.session.abnormal_transport => State::PrsSnkSrcTransitionToOff,
            None => self.prs_failure(),
        }
    }

    pub(super) fn prs_snk_src_assert_rp(&mut self) -> State {
        self.transport.set_cc_control(CcControl::Rp);
        self.transport.set_power_role(PowerRole::Source);

        State::PrsSnkSrcSourceOn
    }

    pub(super) async fn prs_snk_src_source_on(&mut self) -> State {
        self.transport.set_otg_control(true);
        TimerType::new::<TIMER>(TimerType::SwapSourceStart).await;

        if !self.send_control(ControlMessageType::PsRdy).await {
            return self.prs_failure();
        }

        info!("Power role changed to source");
        self.device_policy_manager
            .inform_event(Notification::PowerRoleChanged(PowerRole::Source))
            .await;

        State::SrcStartup
    }
}
