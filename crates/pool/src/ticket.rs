//! Acquisition tickets and the priority wait queue

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::time::Instant;

use tokio::sync::oneshot;

/// Queue position of a ticket. Orders by priority descending, then by
/// arrival ascending, so the smallest key is the next ticket to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TicketKey {
    rank: Reverse<u32>,
    seq: u64,
}

impl TicketKey {
    pub fn priority(&self) -> u32 {
        self.rank.0
    }
}

/// A caller waiting for a worker. Resolving or rejecting a ticket means
/// removing it from the queue and sending once on `tx`.
pub(crate) struct Ticket<T> {
    pub enqueued_at: Instant,
    tx: oneshot::Sender<T>,
}

impl<T> Ticket<T> {
    /// Deliver the outcome. Returns the value back if the waiter is gone.
    pub fn resolve(self, outcome: T) -> Result<(), T> {
        self.tx.send(outcome)
    }
}

pub(crate) struct TicketQueue<T> {
    tickets: BTreeMap<TicketKey, Ticket<T>>,
    next_seq: u64,
}

impl<T> Default for TicketQueue<T> {
    fn default() -> Self {
        Self {
            tickets: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> TicketQueue<T> {
    pub fn push(&mut self, priority: u32, tx: oneshot::Sender<T>) -> TicketKey {
        let key = TicketKey {
            rank: Reverse(priority),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.tickets.insert(
            key,
            Ticket {
                enqueued_at: Instant::now(),
                tx,
            },
        );
        key
    }

    /// Remove the highest-priority, earliest-arrived ticket
    pub fn pop(&mut self) -> Option<(TicketKey, Ticket<T>)> {
        self.tickets.pop_first()
    }

    pub fn remove(&mut self, key: &TicketKey) -> Option<Ticket<T>> {
        self.tickets.remove(key)
    }

    #[cfg(test)]
    pub fn contains(&self, key: &TicketKey) -> bool {
        self.tickets.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn take_all(&mut self) -> Vec<Ticket<T>> {
        std::mem::take(&mut self.tickets).into_values().collect()
    }
}
