//! Timers that are used by the policy engine for bounded waits.
use core::future::Future;

/// The timer trait to implement by the user application.
pub trait Timer {
    /// Expire after the specified number of milliseconds.
    fn after_millis(milliseconds: u64) -> impl Future<Output = ()>;
}

/// Types of timers that are used for timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerType {
    /// Time to wait for the hard reset signalling to settle.
    PSHardReset,
    /// Maximum time for the (new) source to turn off VBUS during a power role swap.
    PSSourceOff,
    /// Maximum time for the (new) source to turn on VBUS during a power role swap.
    PSSourceOn,
    /// Maximum time for the source to transition to a new power level.
    PSTransition,
    /// Maximum time for a response to a message.
    SenderResponse,
    /// Maximum time for the sink to wait for source capabilities.
    SinkWaitCap,
    /// Delay between sending source capabilities during discovery.
    SourceCapability,
    /// Time from the Accept message until the source transitions its supply.
    SrcTransition,
    /// Time for the new source to start after a power role swap.
    SwapSourceStart,
    /// Time for VCONN to become valid.
    VCONNOn,
    /// Maximum time for a response to a mode entry request.
    VDMModeEntry,
    /// Maximum time for a response to a mode exit request.
    VDMModeExit,
    /// Maximum time for a response to a structured VDM request.
    VDMResponse,
}

impl TimerType {
    /// The timeout in milliseconds, as given by USB PD.
    pub const fn duration_millis(self) -> u64 {
        // See USB PD R3.2, [Table 6.68]
        match self {
            TimerType::PSHardReset => 30,
            TimerType::PSSourceOff => 835,
            TimerType::PSSourceOn => 435,
            TimerType::PSTransition => 500,
            TimerType::SenderResponse => 30,
            TimerType::SinkWaitCap => 465,
            TimerType::SourceCapability => 150,
            TimerType::SrcTransition => 30,
            TimerType::SwapSourceStart => 20,
            TimerType::VCONNOn => 50,
            TimerType::VDMModeEntry => 45,
            TimerType::VDMModeExit => 45,
            TimerType::VDMResponse => 27,
        }
    }

    /// Create a new timer for a given type.
    ///
    /// Times out after a duration that is given by USB PD.
    pub fn new<TIMER: Timer>(timer_type: TimerType) -> impl Future<Output = ()> {
        TIMER::after_millis(timer_type.duration_millis())
    }
}
