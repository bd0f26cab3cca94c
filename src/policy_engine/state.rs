//! Protocol states of the policy engine.

/// A policy engine state.
///
/// States carry no data. All variable data lives in the [`super::Session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum State {
    /// Not yet resolved, the state after initialization.
    #[default]
    Unset,

    // Source
    SrcStartup,
    SrcDiscovery,
    SrcSendCapabilities,
    SrcNegotiateCapability,
    SrcTransitionSupply,
    SrcReady,
    SrcDisabled,
    SrcCapabilityResponse,
    SrcHardReset,
    SrcHardResetReceived,
    SrcTransitionToDefault,
    SrcGiveSourceCap,
    SrcGiveSinkCap,
    SrcGetSinkCap,
    SrcWaitNewCapabilities,
    SrcSendSoftReset,
    SrcSoftReset,
    SrcSendNotSupported,
    SrcNotSupportedReceived,

    // Sink
    SnkStartup,
    SnkDiscovery,
    SnkWaitForCapabilities,
    SnkEvaluateCapability,
    SnkSelectCapability,
    SnkTransitionSink,
    SnkReady,
    SnkHardReset,
    SnkTransitionToDefault,
    SnkGiveSinkCap,
    SnkGiveSourceCap,
    SnkGetSourceCap,
    SnkSendSoftReset,
    SnkSoftReset,
    SnkSendNotSupported,
    SnkNotSupportedReceived,

    // Data role swap, as DFP
    DrsDfpUfpEvaluateSwap,
    DrsDfpUfpAcceptSwap,
    DrsDfpUfpChangeToUfp,
    DrsDfpUfpSendSwap,
    DrsDfpUfpRejectSwap,

    // Data role swap, as UFP
    DrsUfpDfpEvaluateSwap,
    DrsUfpDfpAcceptSwap,
    DrsUfpDfpChangeToDfp,
    DrsUfpDfpSendSwap,
    DrsUfpDfpRejectSwap,

    // Power role swap, from source to sink
    PrsSrcSnkEvaluateSwap,
    PrsSrcSnkAcceptSwap,
    PrsSrcSnkTransitionToOff,
    PrsSrcSnkAssertRd,
    PrsSrcSnkWaitSourceOn,
    PrsSrcSnkSendSwap,
    PrsSrcSnkRejectSwap,

    // Power role swap, from sink to source
    PrsSnkSrcEvaluateSwap,
    PrsSnkSrcAcceptSwap,
    PrsSnkSrcTransitionToOff,
    PrsSnkSrcAssertRp,
    PrsSnkSrcSourceOn,
    PrsSnkSrcSendSwap,
    PrsSnkSrcRejectSwap,

    // VCONN swap
    VcsEvaluateSwap,
    VcsAcceptSwap,
    VcsWaitForVconn,
    VcsTurnOffVconn,
    VcsTurnOnVconn,
    VcsSendPsRdy,
    VcsSendSwap,
    VcsRejectSwap,

    // Structured VDM, as responder
    UfpVdmGetIdentity,
    UfpVdmSendIdentity,
    UfpVdmGetIdentityNak,
    UfpVdmGetSvids,
    UfpVdmSendSvids,
    UfpVdmGetSvidsNak,
    UfpVdmGetModes,
    UfpVdmSendModes,
    UfpVdmGetModesNak,
    UfpVdmEvaluateModeEntry,
    UfpVdmModeEntryAck,
    UfpVdmModeEntryNak,
    UfpVdmModeExit,
    UfpVdmModeExitAck,
    UfpVdmModeExitNak,
    UfpVdmAttentionRequest,
    UfpVdmEvaluateStatus,
    UfpVdmStatusAck,
    UfpVdmStatusNak,
    UfpVdmEvaluateConfigure,
    UfpVdmConfigureAck,
    UfpVdmConfigureNak,

    // Structured VDM, as initiator
    DfpVdmIdentityRequest,
    DfpVdmIdentityAcked,
    DfpVdmIdentityNaked,
    DfpVdmSvidsRequest,
    DfpVdmSvidsAcked,
    DfpVdmSvidsNaked,
    DfpVdmModesRequest,
    DfpVdmModesAcked,
    DfpVdmModesNaked,
    DfpVdmModeEntryRequest,
    DfpVdmModeEntryAcked,
    DfpVdmModeEntryNaked,
    DfpVdmModeExitRequest,
    DfpVdmModeExitAcked,
    DfpVdmModeExitNaked,
    DfpVdmAttentionRequest,
    DfpVdmStatusUpdate,
    DfpVdmStatusUpdateAcked,
    DfpVdmStatusUpdateNaked,
    DfpVdmConfigure,
    DfpVdmConfigureAcked,
    DfpVdmConfigureNaked,

    /// A retry ceiling was exceeded. Left only through a plug attach.
    ErrorRecovery,
}

impl State {
    /// Whether this state belongs to the source's own state set.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            State::SrcStartup
                | State::SrcDiscovery
                | State::SrcSendCapabilities
                | State::SrcNegotiateCapability
                | State::SrcTransitionSupply
                | State::SrcReady
                | State::SrcDisabled
                | State::SrcCapabilityResponse
                | State::SrcHardReset
                | State::SrcHardResetReceived
                | State::SrcTransitionToDefault
                | State::SrcGiveSourceCap
                | State::SrcGiveSinkCap
                | State::SrcGetSinkCap
                | State::SrcWaitNewCapabilities
                | State::SrcSendSoftReset
                | State::SrcSoftReset
                | State::SrcSendNotSupported
                | State::SrcNotSupportedReceived
        )
    }

    /// Whether this state belongs to the sink's own state set.
    pub fn is_sink(&self) -> bool {
        matches!(
            self,
            State::SnkStartup
                | State::SnkDiscovery
                | State::SnkWaitForCapabilities
                | State::SnkEvaluateCapability
                | State::SnkSelectCapability
                | State::SnkTransitionSink
                | State::SnkReady
                | State::SnkHardReset
                | State::SnkTransitionToDefault
                | State::SnkGiveSinkCap
                | State::SnkGiveSourceCap
                | State::SnkGetSourceCap
                | State::SnkSendSoftReset
                | State::SnkSoftReset
                | State::SnkSendNotSupported
                | State::SnkNotSupportedReceived
        )
    }

    /// Whether this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        *self == State::ErrorRecovery
    }

    /// Whether this is one of the ready states.
    pub fn is_ready(&self) -> bool {
        matches!(self, State::SrcReady | State::SnkReady)
    }
}
