//! Stale response guard
//!
//! A logical query (e.g. "ECUs of the selected car type") may be issued
//! again before the previous response arrives. Each issue takes a
//! [`Ticket`]; only the response holding the newest ticket is kept.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Position of a request in its query's issue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Monotonic ticket source for one logical query
#[derive(Debug, Clone, Default)]
pub struct RequestSequencer {
    issued: Arc<AtomicU64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket for a request about to be sent
    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no request was issued after the one holding `ticket`
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}

/// Slot holding the response of the most recently issued request
#[derive(Debug)]
pub struct Latest<T> {
    sequencer: RequestSequencer,
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            sequencer: self.sequencer.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self {
            sequencer: RequestSequencer::new(),
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T: Clone> Latest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request; earlier tickets become stale
    pub fn begin(&self) -> Ticket {
        self.sequencer.issue()
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.sequencer.is_current(ticket)
    }

    /// Store `value` if `ticket` is still the newest; returns whether it was kept
    pub fn accept(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.slot.lock();
        // Compared under the lock
        if !self.sequencer.is_current(ticket) {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// Current accepted value
    pub fn get(&self) -> Option<T> {
        self.slot.lock().clone()
    }

    /// Drop the value and invalidate requests in flight
    pub fn reset(&self) {
        self.sequencer.issue();
        *self.slot.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_increase() {
        let seq = RequestSequencer::new();
        let a = seq.issue();
        let b = seq.issue();
        assert!(b > a);
        assert!(!seq.is_current(a));
        assert!(seq.is_current(b));
    }

    #[test]
    fn test_late_response_is_discarded() {
        let latest = Latest::new();
        let first = latest.begin();
        let second = latest.begin();

        assert!(latest.accept(second, "coupe ecus"));
        assert!(!latest.accept(first, "sedan ecus"));
        assert_eq!(latest.get(), Some("coupe ecus"));
    }

    #[test]
    fn test_out_of_order_before_newest_arrives() {
        let latest = Latest::new();
        let first = latest.begin();
        let _second = latest.begin();

        assert!(!latest.accept(first, 1));
        assert_eq!(latest.get(), None);
    }

    #[test]
    fn test_reset_invalidates_in_flight() {
        let latest = Latest::new();
        let ticket = latest.begin();
        latest.reset();
        assert!(!latest.accept(ticket, 1));

        let ticket = latest.begin();
        assert!(latest.accept(ticket, 2));
        assert_eq!(latest.get(), Some(2));
    }

    #[test]
    fn test_clones_share_state() {
        let latest = Latest::new();
        let other = latest.clone();
        let ticket = other.begin();
        assert!(latest.is_current(ticket));
        assert!(other.accept(ticket, "x"));
        assert_eq!(latest.get(), Some("x"));
    }
}
