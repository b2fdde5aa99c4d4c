//! Single-slot, self-clearing operation status.
//!
//! `Idle -> Pending -> {Success, Error} -> Idle`. Terminal statuses clear
//! themselves after a display timeout when a tokio runtime is present, or on
//! an explicit `reset`. A second `begin` replaces whatever is displayed.
//!
//! `begin` hands out an `OperationTicket` and settling consumes it, so every
//! operation resolves exactly once. A settle always shows its terminal status,
//! even when a newer operation took over the slot in the meantime.

use chrono::Utc;
use log::{debug, warn};
use parking_lot::Mutex;
use scribe_rs_config::OperationsConfig;
use scribe_rs_protocol::{
    Operation, OperationEvent, OperationKind, OperationSink, OperationState, OperationStatus,
};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;

/// How long terminal statuses stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTimeouts {
    pub success: Duration,
    pub error: Duration,
}

impl Default for DisplayTimeouts {
    fn default() -> Self {
        Self::from(&OperationsConfig::default())
    }
}

impl From<&OperationsConfig> for DisplayTimeouts {
    fn from(config: &OperationsConfig) -> Self {
        Self {
            success: Duration::from_millis(config.success_display_ms),
            error: Duration::from_millis(config.error_display_ms),
        }
    }
}

/// Handle for one begun operation.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an operation must be settled with `succeed` or `fail`"]
pub struct OperationTicket {
    seq: u64,
    kind: OperationKind,
}

impl OperationTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

#[derive(Default)]
struct Slot {
    current: OperationState,
    last_seq: u64,
}

struct TrackerInner {
    slot: Mutex<Slot>,
    timeouts: DisplayTimeouts,
    sink: Option<Arc<dyn OperationSink>>,
}

impl TrackerInner {
    fn emit(&self, state: OperationState) {
        if let Some(sink) = &self.sink {
            sink.emit(OperationEvent::now(state));
        }
    }

    /// Clear the slot if it still shows the terminal operation `seq`.
    fn expire(&self, seq: u64) {
        let cleared = {
            let mut slot = self.slot.lock();
            match slot.current.operation() {
                Some(op) if op.seq == seq && op.status.is_terminal() => {
                    slot.current = OperationState::Idle;
                    true
                }
                _ => false,
            }
        };
        if cleared {
            debug!("operation display expired (seq={})", seq);
            self.emit(OperationState::Idle);
        }
    }
}

/// Tracks the operation shown to the user.
#[derive(Clone)]
pub struct OperationTracker {
    inner: Arc<TrackerInner>,
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self::new(DisplayTimeouts::default())
    }
}

impl OperationTracker {
    pub fn new(timeouts: DisplayTimeouts) -> Self {
        Self::build(timeouts, None)
    }

    /// Tracker that reports every state change to `sink`.
    pub fn with_sink(timeouts: DisplayTimeouts, sink: Arc<dyn OperationSink>) -> Self {
        Self::build(timeouts, Some(sink))
    }

    fn build(timeouts: DisplayTimeouts, sink: Option<Arc<dyn OperationSink>>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                slot: Mutex::new(Slot::default()),
                timeouts,
                sink,
            }),
        }
    }

    pub fn timeouts(&self) -> DisplayTimeouts {
        self.inner.timeouts
    }

    /// Current displayed state.
    pub fn state(&self) -> OperationState {
        self.inner.slot.lock().current.clone()
    }

    /// Show a new pending operation, replacing the current one.
    pub fn begin(&self, kind: OperationKind, message: impl Into<String>) -> OperationTicket {
        let (seq, state) = {
            let mut slot = self.inner.slot.lock();
            slot.last_seq += 1;
            slot.current = OperationState::Active(Operation {
                seq: slot.last_seq,
                kind,
                status: OperationStatus::Pending,
                message: message.into(),
                updated_at: Utc::now(),
            });
            (slot.last_seq, slot.current.clone())
        };
        debug!("operation begun (seq={}, kind={})", seq, kind);
        self.inner.emit(state);
        OperationTicket { seq, kind }
    }

    /// Resolve the ticket's operation as a success.
    pub fn succeed(&self, ticket: OperationTicket, message: impl Into<String>) {
        self.settle(ticket, OperationStatus::Success, message.into());
    }

    /// Resolve the ticket's operation as an error.
    pub fn fail(&self, ticket: OperationTicket, message: impl Into<String>) {
        self.settle(ticket, OperationStatus::Error, message.into());
    }

    /// Clear the slot immediately (dismissal).
    pub fn reset(&self) {
        let changed = {
            let mut slot = self.inner.slot.lock();
            !std::mem::take(&mut slot.current).is_idle()
        };
        if changed {
            self.inner.emit(OperationState::Idle);
        }
    }

    fn settle(&self, ticket: OperationTicket, status: OperationStatus, message: String) {
        let OperationTicket { seq, kind } = ticket;
        let (displaced, state) = {
            let mut slot = self.inner.slot.lock();
            let displaced = slot
                .current
                .operation()
                .map(|op| op.seq)
                .filter(|shown| *shown != seq);
            slot.current = OperationState::Active(Operation {
                seq,
                kind,
                status,
                message,
                updated_at: Utc::now(),
            });
            (displaced, slot.current.clone())
        };
        match displaced {
            Some(shown) => warn!(
                "operation settled over another one (seq={}, displaced={}, status={:?})",
                seq, shown, status
            ),
            None => debug!("operation settled (seq={}, status={:?})", seq, status),
        }
        self.inner.emit(state);
        let delay = match status {
            OperationStatus::Error => self.inner.timeouts.error,
            _ => self.inner.timeouts.success,
        };
        self.schedule_expiry(seq, delay);
    }

    fn schedule_expiry(&self, seq: u64, delay: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime; operation stays until reset (seq={})", seq);
            return;
        };
        let inner: Weak<TrackerInner> = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(seq);
            }
        });
    }
}

/// Broadcasts operation events to any number of subscribers.
#[derive(Clone)]
pub struct OperationBus {
    sender: broadcast::Sender<OperationEvent>,
}

impl OperationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.sender.subscribe()
    }
}

impl OperationSink for OperationBus {
    fn emit(&self, event: OperationEvent) {
        if self.sender.send(event).is_err() {
            debug!("operation event dropped; no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn timeouts() -> DisplayTimeouts {
        DisplayTimeouts {
            success: Duration::from_millis(2000),
            error: Duration::from_millis(3000),
        }
    }

    #[test]
    fn settle_without_runtime_stays_until_reset() {
        let tracker = OperationTracker::new(timeouts());
        assert!(tracker.state().is_idle());
        let ticket = tracker.begin(OperationKind::Create, "working");
        assert_eq!(tracker.state().status(), Some(OperationStatus::Pending));
        tracker.succeed(ticket, "done");
        assert_eq!(tracker.state().message(), Some("done"));
        tracker.reset();
        assert!(tracker.state().is_idle());
    }

    #[test]
    fn late_settle_shows_over_a_newer_operation() {
        let tracker = OperationTracker::new(timeouts());
        let first = tracker.begin(OperationKind::Analyze, "first");
        let second = tracker.begin(OperationKind::Create, "second");
        let second_seq = second.seq();
        tracker.succeed(second, "second done");
        tracker.fail(first, "first failed");

        let state = tracker.state();
        let op = state.operation().expect("active");
        assert_eq!(op.kind, OperationKind::Analyze);
        assert_eq!(op.status, OperationStatus::Error);
        assert_eq!(op.message, "first failed");
        assert!(op.seq < second_seq);
    }

    #[test]
    fn settle_after_dismissal_is_still_shown() {
        let tracker = OperationTracker::new(timeouts());
        let ticket = tracker.begin(OperationKind::Create, "working");
        tracker.reset();
        tracker.fail(ticket, "boom");
        assert_eq!(tracker.state().status(), Some(OperationStatus::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn success_clears_after_its_timeout() {
        let tracker = OperationTracker::new(timeouts());
        let ticket = tracker.begin(OperationKind::Analyze, "working");
        tracker.succeed(ticket, "done");
        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(tracker.state().status(), Some(OperationStatus::Success));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(tracker.state().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn error_lingers_longer_than_success() {
        let tracker = OperationTracker::new(timeouts());
        let ticket = tracker.begin(OperationKind::Create, "working");
        tracker.fail(ticket, "boom");
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(tracker.state().status(), Some(OperationStatus::Error));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(tracker.state().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_expiry_does_not_clear_newer_operation() {
        let tracker = OperationTracker::new(timeouts());
        let first = tracker.begin(OperationKind::Create, "first");
        tracker.succeed(first, "first done");
        let seq = tracker.begin(OperationKind::Analyze, "second").seq();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let state = tracker.state();
        let op = state.operation().expect("still active");
        assert_eq!(op.seq, seq);
        assert_eq!(op.status, OperationStatus::Pending);
    }

    #[tokio::test]
    async fn bus_delivers_every_transition() {
        let bus = OperationBus::new(8);
        let mut rx = bus.subscribe();
        let tracker = OperationTracker::with_sink(timeouts(), Arc::new(bus));
        let ticket = tracker.begin(OperationKind::Create, "working");
        tracker.fail(ticket, "boom");
        tracker.reset();

        let statuses: Vec<Option<OperationStatus>> = (0..3)
            .map(|_| rx.try_recv().expect("event").state.status())
            .collect();
        assert_eq!(
            statuses,
            vec![
                Some(OperationStatus::Pending),
                Some(OperationStatus::Error),
                None
            ]
        );
    }
}
