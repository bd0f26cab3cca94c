//! Transitions of the structured VDM responder states.
//!
//! The request is the last received message. Responses echo its SVID, object position and command.
use heapless::Vec;

use super::{PolicyEngine, State};
use crate::device_policy_manager::DevicePolicyManager;
use crate::message::vendor_defined::{
    DisplayPortConfigure, DisplayPortStatus, VdmCommand, VdmCommandType, VdmHeaderStructured,
};
use crate::timers::Timer;
use crate::transport::Transport;

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    fn vdm_request(&self) -> VdmHeaderStructured {
        self.session.last_received.structured_vdm().unwrap_or_default()
    }

    fn first_request_vdo(&self) -> Option<u32> {
        self.session.last_received.vdos().first().copied()
    }

    /// Respond to the pending request.
    ///
    /// Stays in the current state if the response was not sent.
    async fn ufp_vdm_respond(&mut self, state: State, command_type: VdmCommandType) -> bool {
        let request = self.vdm_request();
        let header = VdmHeaderStructured::new(
            request.standard_or_vid(),
            self.config.vdm_version,
            request.command(),
            command_type,
        )
        .with_object_position(request.object_position());

        let vdos = match command_type {
            VdmCommandType::ResponderACK => core::mem::take(&mut self.session.response_vdos),
            _ => Vec::new(),
        };

        if self.send_vdm(header, &vdos).await {
            true
        } else {
            debug!("Response in {:?} not sent", state);
            if command_type == VdmCommandType::ResponderACK {
                self.session.response_vdos = vdos;
            }
            false
        }
    }

    /// Send an ACK with the prepared response VDOs.
    pub(super) async fn ufp_vdm_ack(&mut self, state: State) -> State {
        if self.ufp_vdm_respond(state, VdmCommandType::ResponderACK).await {
            self.role_ready()
        } else {
            state
        }
    }

    pub(super) async fn ufp_vdm_nak(&mut self, state: State) -> State {
        if self.ufp_vdm_respond(state, VdmCommandType::ResponderNAK).await {
            self.role_ready()
        } else {
            state
        }
    }

    pub(super) async fn ufp_vdm_get_identity(&mut self) -> State {
        match self.device_policy_manager.get_identity().await {
            Some(identity) => {
                self.session.response_vdos = identity.to_vdos();
                State::UfpVdmSendIdentity
            }
            None => State::UfpVdmGetIdentityNak,
        }
    }

    pub(super) async fn ufp_vdm_get_svids(&mut self) -> State {
        match self.device_policy_manager.get_svids().await {
            Some(svids) => {
                self.session.response_vdos = svids.to_vdos();
                State::UfpVdmSendSvids
            }
            None => State::UfpVdmGetSvidsNak,
        }
    }

    pub(super) async fn ufp_vdm_get_modes(&mut self) -> State {
        let svid = self.vdm_request().standard_or_vid();

        match self.device_policy_manager.get_modes(svid).await {
            Some(modes) => {
                self.session.response_vdos = modes.0;
                State::UfpVdmSendModes
            }
            None => State::UfpVdmGetModesNak,
        }
    }

    pub(super) async fn ufp_vdm_evaluate_mode_entry(&mut self) -> State {
        let request = self.vdm_request();
        let vdo = self.first_request_vdo();

        if self
            .device_policy_manager
            .enter_mode(request.standard_or_vid(), request.object_position(), vdo)
            .await
        {
            State::UfpVdmModeEntryAck
        } else {
            State::UfpVdmModeEntryNak
        }
    }

    pub(super) async fn ufp_vdm_mode_entry_ack(&mut self) -> State {
        if !self
            .ufp_vdm_respond(State::UfpVdmModeEntryAck, VdmCommandType::ResponderACK)
            .await
        {
            return State::UfpVdmModeEntryAck;
        }

        let request = self.vdm_request();
        info!("Entered mode {} of SVID {:x}", request.object_position(), request.standard_or_vid());
        self.session.modal_operation = true;
        self.session.discovery.mode_position = request.object_position();

        self.role_ready()
    }

    pub(super) async fn ufp_vdm_mode_exit(&mut self) -> State {
        let request = self.vdm_request();

        if self
            .device_policy_manager
            .exit_mode(request.standard_or_vid(), request.object_position())
            .await
        {
            State::UfpVdmModeExitAck
        } else {
            State::UfpVdmModeExitNak
        }
    }

    pub(super) async fn ufp_vdm_mode_exit_ack(&mut self) -> State {
        if !self
            .ufp_vdm_respond(State::UfpVdmModeExitAck, VdmCommandType::ResponderACK)
            .await
        {
            return State::UfpVdmModeExitAck;
        }

        info!("Exited mode");
        self.session.modal_operation = false;
        self.session.discovery.mode_position = 0;

        self.role_ready()
    }

    /// Send an Attention request with the local DisplayPort status.
    pub(super) async fn ufp_vdm_attention_request(&mut self) -> State {
        let status = self.device_policy_manager.attention_status().await;
        let header = VdmHeaderStructured::new(
            self.config.displayport_svid,
            self.config.vdm_version,
            VdmCommand::Attention,
            VdmCommandType::InitiatorREQ,
        )
        .with_object_position(self.session.discovery.mode_position.max(1));

        if self.send_vdm(header, &[status.0]).await {
            self.role_ready()
        } else {
            State::UfpVdmAttentionRequest
        }
    }

    pub(super) async fn ufp_vdm_evaluate_status(&mut self) -> State {
        let partner = DisplayPortStatus(self.first_request_vdo().unwrap_or_default());

        match self.device_policy_manager.displayport_status(partner).await {
            Some(status) => {
                self.session.response_vdos.clear();
                let _ = self.session.response_vdos.push(status.0);
                State::UfpVdmStatusAck
            }
            None => State::UfpVdmStatusNak,
        }
    }

    pub(super) async fn ufp_vdm_evaluate_configure(&mut self) -> State {
        let configuration = DisplayPortConfigure(self.first_request_vdo().unwrap_or_default());

        if self
            .device_policy_manager
            .displayport_configure(configuration)
            .await
        {
            self.session.response_vdos.clear();
            State::UfpVdmConfigureAck
        } else {
            State::UfpVdmConfigureNak
        }
    }
}
