//! Decisions that follow sending source capabilities.
//!
//! The outcome of a capabilities round trip and the counters map to the next state, and to the
//! operations on the counters, without any side effects.
use super::State;
use crate::counters::Counter;

/// The outcome of sending source capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CapsOutcome {
    /// A valid request was received.
    Accepted,
    /// A request without a valid object position was received.
    Rejected,
    /// The capabilities were acknowledged, but no request followed.
    NoResponse,
    /// The capabilities were not acknowledged.
    TransportFailure,
    /// A recoverable transport condition occurred.
    Abnormal,
}

/// An operation on a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterOp {
    /// Leave the counter untouched.
    Keep,
    /// Increment the counter.
    Increment,
    /// Reset the counter to zero.
    Reset,
}

impl CounterOp {
    /// Apply the operation to a counter.
    pub fn apply(self, counter: &mut Counter) {
        match self {
            CounterOp::Keep => (),
            CounterOp::Increment => {
                // Exceeding is evaluated by the decision itself.
                let _ = counter.increment();
            }
            CounterOp::Reset => counter.reset(),
        }
    }
}

/// The next state, and the operations on the caps and hard reset counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    /// The next state.
    pub next: State,
    /// The operation on the caps counter.
    pub caps: CounterOp,
    /// The operation on the hard reset counter.
    pub hard_reset: CounterOp,
}

/// Decide on the next state after sending source capabilities.
pub fn after_send_capabilities(outcome: CapsOutcome, caps: &Counter, hard_reset: &Counter) -> Decision {
    let decision = |next, caps, hard_reset| Decision { next, caps, hard_reset };

    match outcome {
        CapsOutcome::Accepted => decision(State::SrcNegotiateCapability, CounterOp::Reset, CounterOp::Reset),
        CapsOutcome::Rejected => decision(State::SrcHardReset, CounterOp::Keep, CounterOp::Keep),
        CapsOutcome::NoResponse => {
            let mut caps = *caps;

            // Below the ceiling, the next attempt follows the discovery delay.
            let next = if caps.increment().is_ok() {
                State::SrcDiscovery
            } else if hard_reset.exceeded() {
                State::ErrorRecovery
            } else {
                State::SrcHardReset
            };

            decision(next, CounterOp::Increment, CounterOp::Keep)
        }
        CapsOutcome::TransportFailure => decision(State::SrcDiscovery, CounterOp::Increment, CounterOp::Keep),
        CapsOutcome::Abnormal => decision(State::SrcSendCapabilities, CounterOp::Keep, CounterOp::Keep),
    }
}
