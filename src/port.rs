//! External events that reach the policy engine of a port.
//!
//! Events are latched as flags, and examined at the start of the next dispatch run. Each flag,
//! and the pending command, has a depth of one, where the last write wins.
use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

use crate::device_policy_manager::Command;

/// Event flags, consulted at the start of a dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingEvents {
    /// A plug was attached.
    pub plug_attach: bool,
    /// Hard reset signalling was received.
    pub hard_reset_received: bool,
    /// A soft reset message was received.
    pub soft_reset_received: bool,
}

impl PendingEvents {
    /// No pending events.
    pub const NONE: Self = Self {
        plug_attach: false,
        hard_reset_received: false,
        soft_reset_received: false,
    };

    /// Whether any event is pending.
    pub fn any(&self) -> bool {
        self.plug_attach || self.hard_reset_received || self.soft_reset_received
    }
}

/// The event inbox of a port.
///
/// Shared between the port's worker, which runs the policy engine, and interrupt handlers or
/// other tasks, which report events.
pub struct PortEvents<M: RawMutex> {
    pending: Mutex<M, Cell<(PendingEvents, Option<Command>)>>,
    kick: Signal<M, ()>,
}

impl<M: RawMutex> Default for PortEvents<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> PortEvents<M> {
    /// Create a new, empty inbox.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new((PendingEvents::NONE, None))),
            kick: Signal::new(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut PendingEvents, &mut Option<Command>)) {
        self.pending.lock(|cell| {
            let (mut events, mut command) = cell.get();
            f(&mut events, &mut command);
            cell.set((events, command));
        });
        self.kick();
    }

    /// Report a plug attach, and schedule a run.
    pub fn attach(&self) {
        self.update(|events, _| events.plug_attach = true);
    }

    /// Report received hard reset signalling, and schedule a run.
    pub fn hard_reset_received(&self) {
        self.update(|events, _| events.hard_reset_received = true);
    }

    /// Report a received soft reset message, and schedule a run.
    pub fn soft_reset_received(&self) {
        self.update(|events, _| events.soft_reset_received = true);
    }

    /// Deliver a command from the device policy manager, and schedule a run.
    ///
    /// Replaces a command that was not yet taken.
    pub fn command(&self, command: Command) {
        self.update(|_, pending| *pending = Some(command));
    }

    /// Schedule a dispatch run.
    ///
    /// Idempotent, while a run is already scheduled.
    pub fn kick(&self) {
        self.kick.signal(());
    }

    /// Take all pending events and the pending command.
    pub fn take(&self) -> (PendingEvents, Option<Command>) {
        self.pending.lock(|cell| cell.replace((PendingEvents::NONE, None)))
    }

    /// Wait for a scheduled run.
    pub async fn wait(&self) {
        self.kick.wait().await
    }

    /// Whether a run is scheduled.
    pub fn is_kicked(&self) -> bool {
        self.kick.signaled()
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::{PendingEvents, PortEvents};
    use crate::device_policy_manager::Command;

    #[test]
    fn test_last_command_wins() {
        let events: PortEvents<NoopRawMutex> = PortEvents::new();

        events.command(Command::DataRoleSwap);
        events.command(Command::VconnSwap);
        events.hard_reset_received();

        let (pending, command) = events.take();
        assert_eq!(command, Some(Command::VconnSwap));
        assert!(pending.hard_reset_received);
        assert!(!pending.plug_attach);

        // Taking clears the inbox.
        assert_eq!(events.take(), (PendingEvents::NONE, None));
    }

    #[tokio::test]
    async fn test_kick_is_idempotent() {
        let events: PortEvents<NoopRawMutex> = PortEvents::new();
        assert!(!events.is_kicked());

        events.kick();
        events.attach();
        assert!(events.is_kicked());

        events.wait().await;
        assert!(!events.is_kicked());
        assert!(events.take().0.plug_attach);
    }
}
