//! Transitions of the data role swap states.
//!
//! Both directions share their transitions, the direction is given by the target states.
use super::{PolicyEngine, State};
use crate::DataRole;
use crate::device_policy_manager::{DevicePolicyManager, Notification};
use crate::message::header::ControlMessageType;
use crate::timers::Timer;
use crate::transport::Transport;

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    /// Evaluate a data role swap request of the partner.
    ///
    /// A swap request during modal operation is answered with a hard reset.
    pub(super) async fn drs_evaluate_swap(&mut self, accept: State, reject: State) -> State {
        if self.session.modal_operation {
            warn!("Data role swap request during modal operation");
            return self.role_hard_reset();
        }

        if self.device_policy_manager.data_role_swap().await {
            accept
        } else {
            reject
        }
    }

    /// Accept the swap, and change the data role only after the reply was sent.
    pub(super) async fn drs_accept_swap(&mut self, change: State) -> State {
        if self.send_control(ControlMessageType::Accept).await {
            change
        } else {
            self.role_ready()
        }
    }

    pub(super) async fn drs_change_data_role(&mut self, data_role: DataRole) -> State {
        self.transport.set_data_role(data_role);
        self.session.discovery = Default::default();

        info!("Data role changed to {:?}", data_role);
        self.device_policy_manager
            .inform_event(Notification::DataRoleChanged(data_role))
            .await;

        self.role_ready()
    }

    /// Request a data role swap from the partner.
    ///
    /// Refused locally during modal operation.
    pub(super) async fn drs_send_swap(&mut self, change: State) -> State {
        if self.session.modal_operation {
            warn!("No data role swap during modal operation");
            return self.role_ready();
        }

        if self.send_control(ControlMessageType::DrSwap).await && self.wait_for_swap_answer().await {
            change
        } else {
            self.role_ready()
        }
    }
}
