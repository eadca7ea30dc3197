use crate::fetch::FetchTicket;

/// Single-slot marker of the fetch the grid is waiting for.
///
/// Pushing while a ticket is held replaces it: the last writer wins. The
/// tracker only does bookkeeping and never cancels a call in flight.
#[derive(Debug, Default)]
pub struct PendingFetchTracker {
    slot: Option<FetchTicket>,
}

impl PendingFetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `ticket`, returning the ticket it superseded.
    pub fn push(&mut self, ticket: FetchTicket) -> Option<FetchTicket> {
        let superseded = self.slot.replace(ticket);
        if let Some(old) = &superseded {
            tracing::debug!(sequence = old.sequence, "pending fetch superseded");
        }
        superseded
    }

    pub fn try_peek(&self) -> Option<&FetchTicket> {
        self.slot.as_ref()
    }

    pub fn try_peek_mut(&mut self) -> Option<&mut FetchTicket> {
        self.slot.as_mut()
    }

    pub fn pop(&mut self) -> Option<FetchTicket> {
        self.slot.take()
    }

    pub fn has_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Whether `sequence` is the ticket currently tracked.
    pub fn is_current(&self, sequence: u64) -> bool {
        self.slot.as_ref().is_some_and(|t| t.sequence == sequence)
    }
}
