//! Dropping results from superseded requests.
//!
//! In-flight I/O cannot be cancelled, so a newer list or repair request wins
//! by making the older request's ticket stale. Late results carrying a stale
//! ticket are ignored.

use std::cell::Cell;

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// Hands out tickets and remembers which one is current.
#[derive(Debug, Default)]
pub struct LatestRequest {
    latest: Cell<u64>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket that supersedes every earlier one.
    pub fn begin(&self) -> RequestTicket {
        let next = self.latest.get() + 1;
        self.latest.set(next);
        RequestTicket(next)
    }

    /// Check whether `ticket` is still the newest.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.get() == ticket.0
    }

    /// Pass `result` through only if its ticket is still current.
    pub fn accept<T>(&self, ticket: RequestTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            log::debug!("Ignoring result of superseded request #{}", ticket.0);
            None
        }
    }
}
