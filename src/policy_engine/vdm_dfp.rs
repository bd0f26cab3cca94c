//! Transitions of the structured VDM initiator states, which drive alternate mode discovery.
use super::{PolicyEngine, State};
use crate::device_policy_manager::{DevicePolicyManager, Identity, Modes, Notification, Svids};
use crate::message::header::DataMessageType;
use crate::message::vendor_defined::{
    DisplayPortConfigure, DisplayPortStatus, PD_SID, VdmCommand, VdmCommandType, VdmHeaderStructured,
};
use crate::message::{Message, MessageMask};
use crate::timers::{Timer, TimerType};
use crate::transport::Transport;

impl<TRANSPORT: Transport, TIMER: Timer, DPM: DevicePolicyManager> PolicyEngine<TRANSPORT, TIMER, DPM> {
    /// Send a structured VDM request, and wait for the response.
    ///
    /// Returns the response, if it is an ACK of the requested command.
    async fn dfp_vdm_request(
        &mut self,
        svid: u16,
        command: VdmCommand,
        position: u8,
        vdos: &[u32],
        timer_type: TimerType,
    ) -> Option<Message> {
        let header = VdmHeaderStructured::new(svid, self.config.vdm_version, command, VdmCommandType::InitiatorREQ)
            .with_object_position(position);

        if !self.send_vdm(header, vdos).await {
            return None;
        }

        let response = self
            .wait_msg(MessageMask::data(DataMessageType::VendorDefined), timer_type)
            .await?;

        match response.structured_vdm() {
            Some(header) if header.is_ack() && header.command() == command => Some(response),
            Some(header) => {
                debug!("{:?} answered with {:?}", command, header.command_type());
                None
            }
            None => None,
        }
    }

    /// The object position for DisplayPort commands, within the entered mode.
    fn dfp_mode_position(&self) -> u8 {
        self.session.discovery.mode_position.max(1)
    }

    fn first_response_vdo(&self) -> u32 {
        self.session.last_received.vdos().first().copied().unwrap_or_default()
    }

    pub(super) async fn dfp_vdm_identity_request(&mut self) -> State {
        let _ = self.session.discover_identity.increment();

        match self
            .dfp_vdm_request(PD_SID, VdmCommand::DiscoverIdentity, 0, &[], TimerType::VDMResponse)
            .await
        {
            Some(_) => State::DfpVdmIdentityAcked,
            None => State::DfpVdmIdentityNaked,
        }
    }

    pub(super) async fn dfp_vdm_identity_acked(&mut self) -> State {
        let Some(identity) = Identity::from_vdos(self.session.last_received.vdos()) else {
            warn!("Malformed identity");
            return State::DfpVdmIdentityNaked;
        };

        let header = identity.header;
        self.session.discovery.identity = Some(identity);
        self.device_policy_manager
            .inform_event(Notification::IdentityAcked(header))
            .await;

        self.role_ready()
    }

    pub(super) async fn dfp_vdm_svids_request(&mut self) -> State {
        self.session.discovery.svids_attempted = true;

        match self
            .dfp_vdm_request(PD_SID, VdmCommand::DiscoverSVIDS, 0, &[], TimerType::VDMResponse)
            .await
        {
            Some(_) => State::DfpVdmSvidsAcked,
            None => State::DfpVdmSvidsNaked,
        }
    }

    pub(super) async fn dfp_vdm_svids_acked(&mut self) -> State {
        let svids = Svids::from_vdos(self.session.last_received.vdos());
        let count = svids.0.len() as u8;

        self.session.discovery.svids = Some(svids);
        self.device_policy_manager
            .inform_event(Notification::SvidsAcked(count))
            .await;

        self.role_ready()
    }

    pub(super) async fn dfp_vdm_modes_request(&mut self) -> State {
        self.session.discovery.modes_attempted = true;
        let svid = self.config.displayport_svid;

        match self
            .dfp_vdm_request(svid, VdmCommand::DiscoverModes, 0, &[], TimerType::VDMResponse)
            .await
        {
            Some(_) => State::DfpVdmModesAcked,
            None => State::DfpVdmModesNaked,
        }
    }

    pub(super) async fn dfp_vdm_modes_acked(&mut self) -> State {
        let modes = Modes::from_vdos(self.session.last_received.vdos());
        let count = modes.0.len() as u8;

        self.session.discovery.modes = Some(modes);
        self.device_policy_manager
            .inform_event(Notification::ModesAcked(count))
            .await;

        self.role_ready()
    }

    /// Enter the first discovered mode.
    pub(super) async fn dfp_vdm_mode_entry_request(&mut self) -> State {
        self.session.discovery.mode_entry_attempted = true;
        let svid = self.config.displayport_svid;

        match self
            .dfp_vdm_request(svid, VdmCommand::EnterMode, 1, &[], TimerType::VDMModeEntry)
            .await
        {
            Some(_) => State::DfpVdmModeEntryAcked,
            None => State::DfpVdmModeEntryNaked,
        }
    }

    pub(super) async fn dfp_vdm_mode_entry_acked(&mut self) -> State {
        let svid = self.config.displayport_svid;
        let position = self
            .session
            .last_sent
            .structured_vdm()
            .map(|header| header.object_position())
            .unwrap_or(1);

        info!("Entered mode {} of SVID {:x}", position, svid);
        self.session.modal_operation = true;
        self.session.discovery.mode_position = position;
        self.device_policy_manager
            .inform_event(Notification::ModeEntryAcked { svid, position })
            .await;

        self.role_ready()
    }

    pub(super) async fn dfp_vdm_mode_exit_request(&mut self) -> State {
        let svid = self.config.displayport_svid;
        let position = self.dfp_mode_position();

        match self
            .dfp_vdm_request(svid, VdmCommand::ExitMode, position, &[], TimerType::VDMModeExit)
            .await
        {
            Some(_) => State::DfpVdmModeExitAcked,
            None => State::DfpVdmModeExitNaked,
        }
    }

    pub(super) async fn dfp_vdm_mode_exit_acked(&mut self) -> State {
        let svid = self.config.displayport_svid;
        let position = self.dfp_mode_position();

        info!("Exited mode {} of SVID {:x}", position, svid);
        self.session.modal_operation = false;
        self.session.discovery.mode_position = 0;
        self.device_policy_manager
            .inform_event(Notification::ModeExitAcked { svid, position })
            .await;

        self.role_ready()
    }

    /// Take over the status that the partner reported with Attention.
    pub(super) async fn dfp_vdm_attention_request(&mut self) -> State {
        let status = DisplayPortStatus(self.first_response_vdo());

        self.session.discovery.partner_status = Some(status);
        self.device_policy_manager
            .inform_event(Notification::Attention(status))
            .await;

        self.role_ready()
    }

    pub(super) async fn dfp_vdm_status_update(&mut self) -> State {
        self.session.discovery.status_attempted = true;
        let svid = self.config.displayport_svid;
        let position = self.dfp_mode_position();
        let status = self.device_policy_manager.attention_status().await;

        match self
            .dfp_vdm_request(
                svid,
                VdmCommand::DisplayPortStatus,
                position,
                &[status.0],
                TimerType::VDMResponse,
            )
            .await
        {
            Some(_) => State::DfpVdmStatusUpdateAcked,
            None => State::DfpVdmStatusUpdateNaked,
        }
    }

    pub(super) async fn dfp_vdm_status_update_acked(&mut self) -> State {
        let status = DisplayPortStatus(self.first_response_vdo());

        self.session.discovery.partner_status = Some(status);
        self.device_policy_manager
            .inform_event(Notification::StatusUpdateAcked(status))
            .await;

        self.role_ready()
    }

    pub(super) async fn dfp_vdm_configure(&mut self) -> State {
        self.session.discovery.configure_attempted = true;
        let svid = self.config.displayport_svid;
        let position = self.dfp_mode_position();

        let modes = self.session.discovery.modes.clone().unwrap_or_default();
        let configuration = self
            .device_policy_manager
            .displayport_configuration(&modes)
            .await;

        match self
            .dfp_vdm_request(
                svid,
                VdmCommand::DisplayPortConfig,
                position,
                &[configuration.0],
                TimerType::VDMResponse,
            )
            .await
        {
            Some(_) => State::DfpVdmConfigureAcked,
            None => State::DfpVdmConfigureNaked,
        }
    }

    pub(super) async fn dfp_vdm_configure_acked(&mut self) -> State {
        let configuration = DisplayPortConfigure(
            self.session
                .last_sent
                .vdos()
                .first()
                .copied()
                .unwrap_or_default(),
        );

        self.session.discovery.configuration = Some(configuration);
        self.device_policy_manager
            .inform_event(Notification::ConfigureAcked(configuration))
            .await;

        self.role_ready()
    }

    pub(super) async fn dfp_vdm_naked(&mut self, state: State) -> State {
        let command = match state {
            State::DfpVdmIdentityNaked => VdmCommand::DiscoverIdentity,
            State::DfpVdmSvidsNaked => VdmCommand::DiscoverSVIDS,
            State::DfpVdmModesNaked => VdmCommand::DiscoverModes,
            State::DfpVdmModeEntryNaked => VdmCommand::EnterMode,
            State::DfpVdmModeExitNaked => VdmCommand::ExitMode,
            State::DfpVdmStatusUpdateNaked => VdmCommand::DisplayPortStatus,
            _ => VdmCommand::DisplayPortConfig,
        };

        debug!("{:?} not acknowledged", command);
        self.device_policy_manager
            .inform_event(Notification::VdmNaked(command))
            .await;

        self.role_ready()
    }
}
