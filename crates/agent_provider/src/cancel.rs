use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const LIVE: u8 = 0;

/// Why a streamed request stopped being consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CancelReason {
    /// Explicit user action: stop toggle, instance stop, navigation away.
    UserAbort = 1,
    /// The remote instance stopped running or its status query failed.
    InstanceTerminated = 2,
    /// The transport reported end of stream.
    Completed = 3,
}

impl CancelReason {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::UserAbort),
            2 => Some(Self::InstanceTerminated),
            3 => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserAbort => "user_abort",
            Self::InstanceTerminated => "instance_terminated",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared one-way `live -> cancelled` flag for a single streamed request.
///
/// Clones observe the same state. The first [`CancelSignal::cancel`] call wins
/// and fixes the reason; every later call is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    state: Arc<AtomicU8>,
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the signal to cancelled. Returns `true` only for the call that
    /// performed the transition.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.state
            .compare_exchange(LIVE, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) != LIVE
    }

    pub fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_raw(self.state.load(Ordering::Acquire))
    }

    /// True when both handles share the same underlying state.
    pub fn same_as(&self, other: &CancelSignal) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{CancelReason, CancelSignal};

    #[test]
    fn first_trigger_wins_and_later_triggers_are_ignored() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
        assert_eq!(signal.reason(), None);

        assert!(signal.cancel(CancelReason::InstanceTerminated));
        assert!(!signal.cancel(CancelReason::UserAbort));
        assert!(!signal.cancel(CancelReason::Completed));

        assert!(signal.is_cancelled());
        assert_eq!(signal.reason(), Some(CancelReason::InstanceTerminated));
    }

    #[test]
    fn clones_share_state() {
        let signal = CancelSignal::new();
        let clone = signal.clone();

        clone.cancel(CancelReason::UserAbort);

        assert!(signal.same_as(&clone));
        assert_eq!(signal.reason(), Some(CancelReason::UserAbort));
        assert!(!signal.same_as(&CancelSignal::new()));
    }

    #[test]
    fn concurrent_triggers_transition_exactly_once() {
        let signal = CancelSignal::new();
        let handles: Vec<_> = [
            CancelReason::UserAbort,
            CancelReason::InstanceTerminated,
            CancelReason::Completed,
        ]
        .into_iter()
        .cycle()
        .take(24)
        .map(|reason| {
            let signal = signal.clone();
            thread::spawn(move || signal.cancel(reason))
        })
        .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().expect("trigger thread should not panic"))
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(signal.reason().is_some());
    }
}
