//! Tests for the policy engine.
use super::{PolicyEngine, State};
use crate::config::Config;
use crate::counters::CounterType;
use crate::device_policy_manager::{Command, Identity, Modes, Notification, Svids};
use crate::dummy::{
    DummyDevice, DummyTimer, DummyTransport, control, data, dummy_request, dummy_source_capabilities,
    partner_template, vdm,
};
use crate::message::Message;
use crate::message::header::{ControlMessageType, DataMessageType, Header, MessageType};
use crate::message::vendor_defined::{
    CertStatVdo, DISPLAYPORT_SID, DisplayPortCapabilities, DisplayPortStatus, PD_SID, ProductVdo, VdmCommand,
    VdmCommandType, VdmIdentityHeader,
};
use crate::port::PendingEvents;
use crate::transport::{CcControl, RxError, VconnSource};
use crate::{DataRole, PowerRole};

type Engine = PolicyEngine<DummyTransport, DummyTimer, DummyDevice>;

const ATTACH: PendingEvents = PendingEvents {
    plug_attach: true,
    ..PendingEvents::NONE
};

fn no_discovery() -> Config {
    Config {
        alternate_mode_discovery: false,
        ..Default::default()
    }
}

fn get_policy_engine(power_role: PowerRole, config: Config) -> Engine {
    PolicyEngine::new(DummyTransport::new(power_role), DummyDevice::default(), config)
}

/// Header template of a sink partner, as seen by a source.
fn sink_partner() -> Header {
    partner_template(DataRole::Ufp, PowerRole::Sink)
}

/// Header template of a source partner, as seen by a sink.
fn source_partner() -> Header {
    partner_template(DataRole::Dfp, PowerRole::Source)
}

fn ctrl(message_type: ControlMessageType) -> MessageType {
    MessageType::Control(message_type)
}

fn data_type(message_type: DataMessageType) -> MessageType {
    MessageType::Data(message_type)
}

fn source_capabilities_message() -> Message {
    data(
        source_partner(),
        DataMessageType::SourceCapabilities,
        &dummy_source_capabilities().to_objects(),
    )
}

/// A source with an explicit contract, and an empty record of sent messages.
async fn source_with_contract(config: Config) -> Engine {
    let mut policy_engine = get_policy_engine(PowerRole::Source, config);
    let request = dummy_request(1, 100, 150);

    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(sink_partner(), DataMessageType::Request, &[request.0])],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcReady);
    policy_engine.transport_mut().sent.clear();
    policy_engine
}

/// A sink with an explicit contract, and an empty record of sent messages.
async fn sink_with_contract(config: Config) -> Engine {
    let mut policy_engine = get_policy_engine(PowerRole::Sink, config);

    policy_engine.transport_mut().inject(source_capabilities_message());
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[
            control(source_partner(), ControlMessageType::Accept),
            control(source_partner(), ControlMessageType::PsRdy),
        ],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SnkReady);
    policy_engine.transport_mut().sent.clear();
    policy_engine
}

#[tokio::test]
async fn test_source_contract() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, no_discovery());
    let request = dummy_request(1, 100, 150);

    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(sink_partner(), DataMessageType::Request, &[request.0])],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcReady);

    let transport = policy_engine.transport();
    assert_eq!(
        transport.sent_types(),
        [
            data_type(DataMessageType::SourceCapabilities),
            ctrl(ControlMessageType::Accept),
            ctrl(ControlMessageType::PsRdy),
        ]
    );
    assert_eq!(transport.cc_control, CcControl::Rp);

    let session = policy_engine.session();
    assert!(session.explicit_contract);
    assert_eq!(session.selected_request, Some(request));
    assert_eq!(session.caps.value(), 0);
    assert_eq!(session.hard_reset.value(), 0);
    assert_eq!(policy_engine.device_policy_manager().supplied, [request]);
}

#[tokio::test]
async fn test_source_fixed_point() {
    let mut policy_engine = source_with_contract(no_discovery()).await;

    // Without events or messages, the run ends right away.
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert!(policy_engine.transport().sent.is_empty());
}

#[tokio::test]
async fn test_source_unacknowledged_capabilities() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, no_discovery());
    policy_engine.transport_mut().script_sends(&[false; 64]);

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcDisabled);

    let session = policy_engine.session();
    assert!(session.caps.exceeded());
    assert_eq!(session.hard_reset.value(), 0);
    assert_eq!(policy_engine.transport().hard_resets, 0);
}

#[tokio::test]
async fn test_source_repeats_capabilities_within_one_run() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, no_discovery());

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::ErrorRecovery);

    // Each of the three attempts (initial, and after two hard resets) sends capabilities until the
    // caps ceiling is exceeded.
    let attempts = 3 * (CounterType::Caps.max_value() as usize + 1);
    let sent = policy_engine.transport().sent_types();
    assert_eq!(sent.len(), attempts);
    assert!(
        sent.iter()
            .all(|message_type| *message_type == data_type(DataMessageType::SourceCapabilities))
    );
}

#[tokio::test]
async fn test_source_no_request_ends_in_error_recovery() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, no_discovery());

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::ErrorRecovery);
    assert_eq!(policy_engine.transport().hard_resets, 2);
    assert_eq!(policy_engine.device_policy_manager().hard_resets, 2);
    assert_eq!(
        policy_engine.device_policy_manager().notifications.last(),
        Some(&Notification::ErrorRecovery)
    );

    // Sticky, until attached again.
    let sent = policy_engine.transport().sent.len();
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::ErrorRecovery);

    let hard_reset = PendingEvents {
        hard_reset_received: true,
        ..PendingEvents::NONE
    };
    assert_eq!(policy_engine.dispatch(hard_reset, None).await, State::ErrorRecovery);
    assert_eq!(policy_engine.transport().sent.len(), sent);

    let request = dummy_request(1, 100, 150);
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(sink_partner(), DataMessageType::Request, &[request.0])],
    );
    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcReady);
}

#[tokio::test]
async fn test_source_rejects_request() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, no_discovery());

    // More current than the 5 V supply offers.
    let request = dummy_request(1, 200, 200);
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(sink_partner(), DataMessageType::Request, &[request.0])],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcWaitNewCapabilities);
    assert_eq!(
        policy_engine.transport().sent_types().last(),
        Some(&ctrl(ControlMessageType::Reject))
    );
    assert!(policy_engine.device_policy_manager().supplied.is_empty());

    // New capabilities on request of the device policy manager.
    let request = dummy_request(1, 100, 150);
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(sink_partner(), DataMessageType::Request, &[request.0])],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::SendSourceCapabilities))
            .await,
        State::SrcReady
    );
    assert_eq!(policy_engine.device_policy_manager().supplied, [request]);
    assert_eq!(policy_engine.session().command, None);
}

#[tokio::test]
async fn test_source_hard_reset_received() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    let request = dummy_request(1, 50, 100);

    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(sink_partner(), DataMessageType::Request, &[request.0])],
    );

    let hard_reset = PendingEvents {
        hard_reset_received: true,
        ..PendingEvents::NONE
    };
    assert_eq!(policy_engine.dispatch(hard_reset, None).await, State::SrcReady);

    let transport = policy_engine.transport();
    assert_eq!(transport.driver_resets, 1);
    assert_eq!(transport.hard_resets, 0);
    assert_eq!(policy_engine.device_policy_manager().hard_resets, 1);
    assert_eq!(policy_engine.session().selected_request, Some(request));
}

#[tokio::test]
async fn test_source_get_sink_capabilities() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    let sink_capabilities = dummy_source_capabilities().to_objects();

    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::GetSinkCap),
        &[data(sink_partner(), DataMessageType::SinkCapabilities, &sink_capabilities)],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::GetSinkCapabilities))
            .await,
        State::SrcReady
    );
    assert_eq!(policy_engine.session().sink_capabilities, dummy_source_capabilities());
}

#[tokio::test]
async fn test_source_keeps_unexpected_messages_in_order() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().accept_data_role_swap = true;

    // Both arrive while waiting for sink capabilities.
    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::GetSinkCap),
        &[
            control(sink_partner(), ControlMessageType::DrSwap),
            control(sink_partner(), ControlMessageType::GetStatus),
        ],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::GetSinkCapabilities))
            .await,
        State::SrcReady
    );
    assert_eq!(policy_engine.transport().data_role, DataRole::Ufp);
    assert_eq!(
        policy_engine.transport().sent_types(),
        [
            ctrl(ControlMessageType::GetSinkCap),
            ctrl(ControlMessageType::Accept),
            ctrl(ControlMessageType::NotSupported),
        ]
    );
    assert!(policy_engine.session().unhandled.is_empty());
}

#[tokio::test]
async fn test_source_abnormal_transport_in_ready() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    policy_engine.transport_mut().inject_error(RxError::Abnormal);
    policy_engine
        .transport_mut()
        .inject(control(sink_partner(), ControlMessageType::GetSourceCap));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert!(policy_engine.session().abnormal_transport);
    assert!(policy_engine.transport().sent.is_empty());

    // The message behind the condition is handled on the next run.
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert_eq!(
        policy_engine.transport().sent_types(),
        [data_type(DataMessageType::SourceCapabilities)]
    );
}

#[tokio::test]
async fn test_source_gives_source_capabilities() {
    let mut policy_engine = source_with_contract(no_discovery()).await;

    policy_engine
        .transport_mut()
        .inject(control(sink_partner(), ControlMessageType::GetSourceCap));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert_eq!(
        policy_engine.transport().sent_types(),
        [data_type(DataMessageType::SourceCapabilities)]
    );
}

#[tokio::test]
async fn test_sink_contract() {
    let mut policy_engine = get_policy_engine(PowerRole::Sink, no_discovery());

    policy_engine.transport_mut().inject(source_capabilities_message());
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[
            control(source_partner(), ControlMessageType::Accept),
            control(source_partner(), ControlMessageType::PsRdy),
        ],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SnkReady);

    let transport = policy_engine.transport();
    assert_eq!(transport.cc_control, CcControl::Rd);
    assert_eq!(transport.sent_types(), [data_type(DataMessageType::Request)]);

    let contracts = &policy_engine.device_policy_manager().contracts;
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].object_position(), 1);
    assert_eq!(contracts[0].fixed_variable().raw_max_operating_current(), 300);

    assert_eq!(policy_engine.session().source_capabilities, dummy_source_capabilities());
    assert!(policy_engine.session().explicit_contract);
}

#[tokio::test]
async fn test_sink_request_rejected() {
    let mut policy_engine = get_policy_engine(PowerRole::Sink, no_discovery());

    policy_engine.transport_mut().inject(source_capabilities_message());
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[control(source_partner(), ControlMessageType::Reject)],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SnkReady);
    assert!(policy_engine.device_policy_manager().contracts.is_empty());
    assert_eq!(policy_engine.session().selected_request, None);
    assert!(!policy_engine.session().explicit_contract);
}

#[tokio::test]
async fn test_no_discovery_without_contract() {
    let mut policy_engine = get_policy_engine(PowerRole::Sink, Config::default());
    policy_engine.device_policy_manager_mut().accept_data_role_swap = true;

    policy_engine.transport_mut().inject(source_capabilities_message());
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[control(source_partner(), ControlMessageType::Wait)],
    );
    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SnkReady);

    // Now a DFP, but still without a contract.
    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::DrSwap));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert_eq!(policy_engine.transport().data_role, DataRole::Dfp);
    assert!(!policy_engine.session().explicit_contract);
    assert!(policy_engine.transport().sent_vdms().is_empty());
    assert_eq!(
        policy_engine.transport().sent_types(),
        [data_type(DataMessageType::Request), ctrl(ControlMessageType::Accept)]
    );
}

#[tokio::test]
async fn test_sink_no_capabilities_ends_in_error_recovery() {
    let mut policy_engine = get_policy_engine(PowerRole::Sink, no_discovery());

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::ErrorRecovery);
    assert_eq!(policy_engine.transport().hard_resets, 2);
    assert!(policy_engine.session().hard_reset.exceeded());

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::ErrorRecovery);
    assert_eq!(policy_engine.transport().hard_resets, 2);
    assert!(policy_engine.transport().sent.is_empty());
}

#[tokio::test]
async fn test_sink_abnormal_transport_retries() {
    let mut policy_engine = get_policy_engine(PowerRole::Sink, no_discovery());
    policy_engine.transport_mut().inject_error(RxError::Abnormal);

    // The wait ends without advancing any counter.
    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SnkWaitForCapabilities);
    assert_eq!(policy_engine.session().hard_reset.value(), 0);
    assert_eq!(policy_engine.transport().hard_resets, 0);

    policy_engine.transport_mut().inject(source_capabilities_message());
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[
            control(source_partner(), ControlMessageType::Accept),
            control(source_partner(), ControlMessageType::PsRdy),
        ],
    );
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
}

#[tokio::test]
async fn test_sink_soft_reset_received() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;
    let protocol_resets = policy_engine.transport().protocol_resets;

    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::Accept),
        &[source_capabilities_message()],
    );
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[
            control(source_partner(), ControlMessageType::Accept),
            control(source_partner(), ControlMessageType::PsRdy),
        ],
    );

    let soft_reset = PendingEvents {
        soft_reset_received: true,
        ..PendingEvents::NONE
    };
    assert_eq!(policy_engine.dispatch(soft_reset, None).await, State::SnkReady);
    assert_eq!(policy_engine.transport().protocol_resets, protocol_resets + 1);
    assert_eq!(
        policy_engine.transport().sent_types(),
        [ctrl(ControlMessageType::Accept), data_type(DataMessageType::Request)]
    );
}

#[tokio::test]
async fn test_sink_ready_messages() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::Ping));
    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::GetSinkCap));
    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::GetStatus));
    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::NotSupported));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);

    // Ping is ignored, unknown messages are answered with Not_Supported.
    assert_eq!(
        policy_engine.transport().sent_types(),
        [
            data_type(DataMessageType::SinkCapabilities),
            ctrl(ControlMessageType::NotSupported),
        ]
    );
    assert_eq!(
        policy_engine.device_policy_manager().notifications,
        [Notification::NotSupportedReceived]
    );
}

#[tokio::test]
async fn test_sink_new_capabilities_in_ready() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    policy_engine.transport_mut().inject(source_capabilities_message());
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[
            control(source_partner(), ControlMessageType::Accept),
            control(source_partner(), ControlMessageType::PsRdy),
        ],
    );

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert_eq!(policy_engine.device_policy_manager().contracts.len(), 2);
}

#[tokio::test]
async fn test_sink_inapplicable_command_is_dropped() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::SendSourceCapabilities))
            .await,
        State::SnkReady
    );
    assert!(policy_engine.transport().sent.is_empty());
    assert_eq!(policy_engine.session().command, None);
}

#[tokio::test]
async fn test_data_role_swap_accepted() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().accept_data_role_swap = true;

    policy_engine
        .transport_mut()
        .inject(control(sink_partner(), ControlMessageType::DrSwap));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert_eq!(policy_engine.transport().data_role, DataRole::Ufp);
    assert_eq!(policy_engine.transport().sent_types(), [ctrl(ControlMessageType::Accept)]);
    assert_eq!(
        policy_engine.device_policy_manager().notifications,
        [Notification::DataRoleChanged(DataRole::Ufp)]
    );
}

#[tokio::test]
async fn test_data_role_swap_rejected() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::DrSwap));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert_eq!(policy_engine.transport().data_role, DataRole::Ufp);
    assert_eq!(policy_engine.transport().sent_types(), [ctrl(ControlMessageType::Reject)]);
    assert_eq!(policy_engine.device_policy_manager().swap_requests, 1);
}

#[tokio::test]
async fn test_data_role_swap_command() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::DrSwap),
        &[control(source_partner(), ControlMessageType::Accept)],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::DataRoleSwap))
            .await,
        State::SnkReady
    );
    assert_eq!(policy_engine.transport().data_role, DataRole::Dfp);
}

#[tokio::test]
async fn test_data_role_swap_in_modal_operation() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().accept_mode_entry = true;

    policy_engine.transport_mut().inject(vdm(
        source_partner(),
        DISPLAYPORT_SID,
        VdmCommand::EnterMode,
        VdmCommandType::InitiatorREQ,
        1,
        &[],
    ));
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert!(policy_engine.session().modal_operation);

    // Own requests are refused locally.
    policy_engine.transport_mut().sent.clear();
    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::DataRoleSwap))
            .await,
        State::SnkReady
    );
    assert!(policy_engine.transport().sent.is_empty());

    // Partner requests lead to a hard reset, after which a new contract is negotiated.
    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::DrSwap));
    policy_engine.transport_mut().inject(source_capabilities_message());
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[
            control(source_partner(), ControlMessageType::Accept),
            control(source_partner(), ControlMessageType::PsRdy),
        ],
    );

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert_eq!(policy_engine.transport().hard_resets, 1);
    assert_eq!(policy_engine.device_policy_manager().swap_requests, 0);
    assert!(!policy_engine.session().modal_operation);
    assert_eq!(policy_engine.transport().data_role, DataRole::Ufp);
}

#[tokio::test]
async fn test_power_role_swap_source_to_sink() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().accept_power_role_swap = true;
    policy_engine.transport_mut().otg = true;

    policy_engine
        .transport_mut()
        .inject(control(sink_partner(), ControlMessageType::PrSwap));

    let new_source = partner_template(DataRole::Ufp, PowerRole::Source);
    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::PsRdy),
        &[
            control(new_source, ControlMessageType::PsRdy),
            data(
                new_source,
                DataMessageType::SourceCapabilities,
                &dummy_source_capabilities().to_objects(),
            ),
        ],
    );
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::Request),
        &[
            control(new_source, ControlMessageType::Accept),
            control(new_source, ControlMessageType::PsRdy),
        ],
    );

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);

    let transport = policy_engine.transport();
    assert_eq!(transport.power_role, PowerRole::Sink);
    assert_eq!(transport.data_role, DataRole::Dfp);
    assert_eq!(transport.cc_control, CcControl::Rd);
    assert!(!transport.otg);
    assert_eq!(
        transport.sent_types(),
        [
            ctrl(ControlMessageType::Accept),
            ctrl(ControlMessageType::PsRdy),
            data_type(DataMessageType::Request),
        ]
    );
    assert_eq!(
        policy_engine.device_policy_manager().notifications,
        [Notification::PowerRoleChanged(PowerRole::Sink)]
    );
}

#[tokio::test]
async fn test_power_role_swap_sink_to_source() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    let old_source = source_partner();
    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::PrSwap),
        &[
            control(old_source, ControlMessageType::Accept),
            control(old_source, ControlMessageType::PsRdy),
        ],
    );

    let request = dummy_request(1, 100, 150);
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(
            partner_template(DataRole::Dfp, PowerRole::Sink),
            DataMessageType::Request,
            &[request.0],
        )],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::PowerRoleSwap))
            .await,
        State::SrcReady
    );

    let transport = policy_engine.transport();
    assert_eq!(transport.power_role, PowerRole::Source);
    assert_eq!(transport.cc_control, CcControl::Rp);
    assert!(transport.otg);
    assert_eq!(policy_engine.device_policy_manager().supplied, [request]);
    assert_eq!(
        policy_engine.device_policy_manager().notifications,
        [Notification::PowerRoleChanged(PowerRole::Source)]
    );
}

#[tokio::test]
async fn test_power_role_swap_without_new_source() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().accept_power_role_swap = true;

    policy_engine
        .transport_mut()
        .inject(control(sink_partner(), ControlMessageType::PrSwap));

    // The partner never turns on its supply, and never sends capabilities.
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::ErrorRecovery);

    assert_eq!(policy_engine.session().swap_hard_reset.value(), 1);
    assert_eq!(policy_engine.transport().power_role, PowerRole::Sink);
    assert!(
        !policy_engine
            .device_policy_manager()
            .notifications
            .iter()
            .any(|notification| matches!(notification, Notification::PowerRoleChanged(_)))
    );
}

#[tokio::test]
async fn test_power_role_swap_rejected() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::PrSwap),
        &[control(source_partner(), ControlMessageType::Wait)],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::PowerRoleSwap))
            .await,
        State::SnkReady
    );
    assert_eq!(policy_engine.transport().power_role, PowerRole::Sink);
}

#[tokio::test]
async fn test_vconn_swap_turn_on() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().accept_vconn_swap = true;

    policy_engine
        .transport_mut()
        .inject(control(source_partner(), ControlMessageType::VconnSwap));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert_eq!(policy_engine.transport().vconn_source, VconnSource::On);
    assert_eq!(
        policy_engine.transport().sent_types(),
        [ctrl(ControlMessageType::Accept), ctrl(ControlMessageType::PsRdy)]
    );
    assert_eq!(
        policy_engine.device_policy_manager().notifications,
        [Notification::VconnChanged(VconnSource::On)]
    );
}

#[tokio::test]
async fn test_vconn_swap_turn_off() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    policy_engine.transport_mut().vconn_source = VconnSource::On;

    policy_engine.transport_mut().respond(
        ctrl(ControlMessageType::VconnSwap),
        &[
            control(sink_partner(), ControlMessageType::Accept),
            control(sink_partner(), ControlMessageType::PsRdy),
        ],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::VconnSwap))
            .await,
        State::SrcReady
    );
    assert_eq!(policy_engine.transport().vconn_source, VconnSource::Off);
    assert_eq!(
        policy_engine.device_policy_manager().notifications,
        [Notification::VconnChanged(VconnSource::Off)]
    );
}

#[tokio::test]
async fn test_vconn_swap_rejected() {
    let mut policy_engine = source_with_contract(no_discovery()).await;

    policy_engine
        .transport_mut()
        .inject(control(sink_partner(), ControlMessageType::VconnSwap));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert_eq!(policy_engine.transport().vconn_source, VconnSource::Off);
    assert_eq!(policy_engine.transport().sent_types(), [ctrl(ControlMessageType::Reject)]);
}

fn identity() -> Identity {
    Identity {
        header: VdmIdentityHeader::default()
            .with_device_data(true)
            .with_modal_supported(true)
            .with_vid(0x1234),
        cert_stat: CertStatVdo::default(),
        product: ProductVdo::default().with_pid(0x5678),
        product_type: Default::default(),
    }
}

#[tokio::test]
async fn test_ufp_discover_identity() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().identity = Some(identity());

    policy_engine.transport_mut().inject(vdm(
        source_partner(),
        PD_SID,
        VdmCommand::DiscoverIdentity,
        VdmCommandType::InitiatorREQ,
        0,
        &[],
    ));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);

    let response = &policy_engine.transport().sent[0];
    let header = response.structured_vdm().unwrap();
    assert_eq!(header.command(), VdmCommand::DiscoverIdentity);
    assert_eq!(header.command_type(), VdmCommandType::ResponderACK);
    assert_eq!(header.standard_or_vid(), PD_SID);
    assert_eq!(response.vdos(), identity().to_vdos().as_slice());
}

#[tokio::test]
async fn test_ufp_naks_unknown_requests() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    policy_engine.transport_mut().inject(vdm(
        source_partner(),
        PD_SID,
        VdmCommand::DiscoverSVIDS,
        VdmCommandType::InitiatorREQ,
        0,
        &[],
    ));
    policy_engine.transport_mut().inject(vdm(
        source_partner(),
        DISPLAYPORT_SID,
        VdmCommand::EnterMode,
        VdmCommandType::InitiatorREQ,
        1,
        &[],
    ));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);

    let responses = policy_engine.transport().sent_vdms();
    assert_eq!(responses.len(), 2);
    assert!(
        responses
            .iter()
            .all(|header| header.command_type() == VdmCommandType::ResponderNAK)
    );
    assert_eq!(responses[1].object_position(), 1);
    assert!(!policy_engine.session().modal_operation);
}

#[tokio::test]
async fn test_ufp_displayport_flow() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;
    let status = DisplayPortStatus::default().with_connected(0b10).with_enabled(true);

    {
        let device = policy_engine.device_policy_manager_mut();
        device.accept_mode_entry = true;
        device.svids = Some(Svids(heapless::Vec::from_slice(&[DISPLAYPORT_SID]).unwrap()));
        device.modes = Some(Modes(heapless::Vec::from_slice(&[0x0000_0C05]).unwrap()));
        device.status = Some(status);
    }

    let partner = source_partner();
    let request = |command, position, vdos: &[u32]| {
        vdm(partner, DISPLAYPORT_SID, command, VdmCommandType::InitiatorREQ, position, vdos)
    };

    let transport = policy_engine.transport_mut();
    transport.inject(vdm(
        partner,
        PD_SID,
        VdmCommand::DiscoverSVIDS,
        VdmCommandType::InitiatorREQ,
        0,
        &[],
    ));
    transport.inject(request(VdmCommand::DiscoverModes, 0, &[]));
    transport.inject(request(VdmCommand::EnterMode, 1, &[]));
    transport.inject(request(VdmCommand::DisplayPortStatus, 1, &[0x1]));
    transport.inject(request(VdmCommand::DisplayPortConfig, 1, &[0x0000_0406]));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert!(policy_engine.session().modal_operation);

    let sent = &policy_engine.transport().sent;
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[0].vdos(), &[0xFF01_0000]);
    assert_eq!(sent[1].vdos(), &[0x0000_0C05]);
    assert!(sent[2].vdos().is_empty());
    assert_eq!(sent[3].vdos(), &[status.0]);
    assert!(sent[4].vdos().is_empty());
    assert!(
        policy_engine
            .transport()
            .sent_vdms()
            .iter()
            .all(|header| header.is_ack())
    );

    // Attention on request of the device policy manager.
    policy_engine.transport_mut().sent.clear();
    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::Attention))
            .await,
        State::SnkReady
    );

    let attention = &policy_engine.transport().sent[0];
    let header = attention.structured_vdm().unwrap();
    assert_eq!(header.command(), VdmCommand::Attention);
    assert!(header.is_request());
    assert_eq!(header.object_position(), 1);

    // Exit mode.
    policy_engine
        .transport_mut()
        .inject(request(VdmCommand::ExitMode, 1, &[]));
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);
    assert!(!policy_engine.session().modal_operation);
}

#[tokio::test]
async fn test_ufp_response_retried_after_transport_failure() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;
    policy_engine.device_policy_manager_mut().identity = Some(identity());
    policy_engine.transport_mut().script_sends(&[false]);

    policy_engine.transport_mut().inject(vdm(
        source_partner(),
        PD_SID,
        VdmCommand::DiscoverIdentity,
        VdmCommandType::InitiatorREQ,
        0,
        &[],
    ));

    assert_eq!(
        policy_engine.dispatch(PendingEvents::NONE, None).await,
        State::UfpVdmSendIdentity
    );
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SnkReady);

    let sent = &policy_engine.transport().sent;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].vdos(), identity().to_vdos().as_slice());
}

#[tokio::test]
async fn test_dfp_discovery() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, Config::default());

    let partner = sink_partner();
    let ack = |svid, command, position, vdos: &[u32]| {
        vdm(partner, svid, command, VdmCommandType::ResponderACK, position, vdos)
    };

    let capabilities = DisplayPortCapabilities::default()
        .with_capability(0b01)
        .with_signaling_rate(0b0001)
        .with_ufp_d_pin_assignments(0b0000_1100);
    let partner_status = DisplayPortStatus::default().with_connected(0b10).with_hpd_state(true);

    let request = dummy_request(1, 100, 150);
    let transport = policy_engine.transport_mut();
    transport.respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(partner, DataMessageType::Request, &[request.0])],
    );

    let vendor_defined = data_type(DataMessageType::VendorDefined);
    transport.respond(
        vendor_defined,
        &[ack(PD_SID, VdmCommand::DiscoverIdentity, 0, identity().to_vdos().as_slice())],
    );
    transport.respond(vendor_defined, &[ack(PD_SID, VdmCommand::DiscoverSVIDS, 0, &[0xFF01_0000])]);
    transport.respond(
        vendor_defined,
        &[ack(DISPLAYPORT_SID, VdmCommand::DiscoverModes, 0, &[capabilities.0])],
    );
    transport.respond(vendor_defined, &[ack(DISPLAYPORT_SID, VdmCommand::EnterMode, 1, &[])]);
    transport.respond(
        vendor_defined,
        &[ack(DISPLAYPORT_SID, VdmCommand::DisplayPortStatus, 1, &[partner_status.0])],
    );
    transport.respond(vendor_defined, &[ack(DISPLAYPORT_SID, VdmCommand::DisplayPortConfig, 1, &[])]);

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcReady);

    let commands: std::vec::Vec<_> = policy_engine
        .transport()
        .sent_vdms()
        .iter()
        .map(|header| header.command())
        .collect();
    assert_eq!(
        commands,
        [
            VdmCommand::DiscoverIdentity,
            VdmCommand::DiscoverSVIDS,
            VdmCommand::DiscoverModes,
            VdmCommand::EnterMode,
            VdmCommand::DisplayPortStatus,
            VdmCommand::DisplayPortConfig,
        ]
    );

    let session = policy_engine.session();
    assert!(session.modal_operation);

    let discovery = &session.discovery;
    assert_eq!(discovery.identity, Some(identity()));
    assert_eq!(discovery.mode_position, 1);
    assert_eq!(discovery.partner_status, Some(partner_status));
    assert!(discovery.configuration.is_some());

    let notifications = &policy_engine.device_policy_manager().notifications;
    assert_eq!(notifications.len(), 6);
    assert_eq!(notifications[0], Notification::IdentityAcked(identity().header));
    assert_eq!(notifications[1], Notification::SvidsAcked(1));
    assert_eq!(notifications[2], Notification::ModesAcked(1));
    assert_eq!(
        notifications[3],
        Notification::ModeEntryAcked {
            svid: DISPLAYPORT_SID,
            position: 1
        }
    );
    assert_eq!(notifications[4], Notification::StatusUpdateAcked(partner_status));
    assert!(matches!(notifications[5], Notification::ConfigureAcked(_)));

    // Discovery is complete.
    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert_eq!(policy_engine.transport().sent_vdms().len(), 6);
}

#[tokio::test]
async fn test_dfp_discovery_stops_without_displayport() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, Config::default());
    let partner = sink_partner();

    let request = dummy_request(1, 100, 150);
    let transport = policy_engine.transport_mut();
    transport.respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(partner, DataMessageType::Request, &[request.0])],
    );

    let vendor_defined = data_type(DataMessageType::VendorDefined);
    transport.respond(
        vendor_defined,
        &[vdm(
            partner,
            PD_SID,
            VdmCommand::DiscoverIdentity,
            VdmCommandType::ResponderACK,
            0,
            identity().to_vdos().as_slice(),
        )],
    );
    transport.respond(
        vendor_defined,
        &[vdm(
            partner,
            PD_SID,
            VdmCommand::DiscoverSVIDS,
            VdmCommandType::ResponderACK,
            0,
            &[0x1234_0000],
        )],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcReady);
    assert_eq!(policy_engine.transport().sent_vdms().len(), 2);
    assert!(!policy_engine.session().modal_operation);
}

#[tokio::test]
async fn test_dfp_identity_retries_are_bounded() {
    let mut policy_engine = get_policy_engine(PowerRole::Source, Config::default());

    let request = dummy_request(1, 100, 150);
    policy_engine.transport_mut().respond(
        data_type(DataMessageType::SourceCapabilities),
        &[data(sink_partner(), DataMessageType::Request, &[request.0])],
    );

    assert_eq!(policy_engine.dispatch(ATTACH, None).await, State::SrcReady);

    let requests = policy_engine.transport().sent_vdms();
    assert_eq!(requests.len(), 21);
    assert!(requests.iter().all(|header| header.command() == VdmCommand::DiscoverIdentity));
    assert!(policy_engine.session().discover_identity.exceeded());
    assert!(
        policy_engine
            .device_policy_manager()
            .notifications
            .iter()
            .all(|notification| *notification == Notification::VdmNaked(VdmCommand::DiscoverIdentity))
    );
}

#[tokio::test]
async fn test_dfp_attention() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    let status = DisplayPortStatus::default().with_connected(0b10).with_irq_hpd(true);

    policy_engine.transport_mut().inject(vdm(
        sink_partner(),
        DISPLAYPORT_SID,
        VdmCommand::Attention,
        VdmCommandType::InitiatorREQ,
        1,
        &[status.0],
    ));

    assert_eq!(policy_engine.dispatch(PendingEvents::NONE, None).await, State::SrcReady);
    assert_eq!(policy_engine.session().discovery.partner_status, Some(status));
    assert_eq!(
        policy_engine.device_policy_manager().notifications,
        [Notification::Attention(status)]
    );
    assert!(policy_engine.transport().sent.is_empty());
}

#[tokio::test]
async fn test_dfp_mode_exit_command() {
    let mut policy_engine = source_with_contract(no_discovery()).await;
    let partner = sink_partner();

    let transport = policy_engine.transport_mut();
    let vendor_defined = data_type(DataMessageType::VendorDefined);
    transport.respond(
        vendor_defined,
        &[vdm(
            partner,
            DISPLAYPORT_SID,
            VdmCommand::EnterMode,
            VdmCommandType::ResponderACK,
            1,
            &[],
        )],
    );
    transport.respond(
        vendor_defined,
        &[vdm(
            partner,
            DISPLAYPORT_SID,
            VdmCommand::ExitMode,
            VdmCommandType::ResponderNAK,
            1,
            &[],
        )],
    );

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::EnterMode))
            .await,
        State::SrcReady
    );
    assert!(policy_engine.session().modal_operation);

    // A NAK keeps the mode.
    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::ExitMode))
            .await,
        State::SrcReady
    );
    assert!(policy_engine.session().modal_operation);
    assert_eq!(
        policy_engine.device_policy_manager().notifications.last(),
        Some(&Notification::VdmNaked(VdmCommand::ExitMode))
    );
}

#[tokio::test]
async fn test_dfp_commands_as_ufp_are_ignored() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;

    assert_eq!(
        policy_engine
            .dispatch(PendingEvents::NONE, Some(Command::DiscoverIdentity))
            .await,
        State::SnkReady
    );
    assert!(policy_engine.transport().sent.is_empty());
}

#[tokio::test]
async fn test_re_attach() {
    let mut policy_engine = sink_with_contract(no_discovery()).await;
    assert!(policy_engine.session().explicit_contract);

    policy_engine.re_attach(DummyTransport::new(PowerRole::Sink));
    assert_eq!(policy_engine.state(), State::Unset);
    assert!(!policy_engine.session().explicit_contract);
    assert!(policy_engine.transport().sent.is_empty());
}
