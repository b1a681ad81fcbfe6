//! Idempotency ledger
//!
//! Guarantees at-most-one effective application per request id.
//!
//! ## Slot Lifecycle
//!
//! ```text
//! (absent) --reserve--> Pending --commit--> Committed --expire--> (absent)
//!                          |
//!                          +--abort (reservation dropped)--> (absent)
//! ```
//!
//! Every transition is a single step on the id's DashMap entry, so two callers
//! racing on the same id cannot both observe `(absent)`. A caller that finds
//! the id `Pending` waits for the owner to commit or abort, bounded by
//! `pending_wait`, and never applies the request itself while it is pending.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use eventsync_core::{RequestId, Timestamp};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::fingerprint::Fingerprint;

/// Default retention of committed records
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default time a duplicate waits for an in-flight original
pub const DEFAULT_PENDING_WAIT: Duration = Duration::from_secs(2);

/// Ledger tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How long a committed record answers replays
    pub retention: Duration,
    /// How long a duplicate waits for a pending original before giving up
    pub pending_wait: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            pending_wait: DEFAULT_PENDING_WAIT,
        }
    }
}

/// Outcome a request id previously produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord<T> {
    /// The request id
    pub request_id: RequestId,
    /// Digest of the request that produced `result`
    pub fingerprint: Fingerprint,
    /// Snapshot of the original success
    pub result: T,
    /// After this instant the id is treated as never seen
    pub expires_at: Timestamp,
}

#[derive(Debug)]
enum Slot<T> {
    Pending {
        fingerprint: Fingerprint,
        notify: Arc<Notify>,
    },
    Committed(IdempotencyRecord<T>),
}

enum Attempt<T> {
    Fresh,
    Replay(T),
    Wait(Arc<Notify>),
}

/// Result of `check_or_reserve`
pub enum Reserve<'a, T: Clone> {
    /// First caller: perform the mutation, then `commit`
    Fresh(Reservation<'a, T>),
    /// Already applied: return this cached result without side effects
    Replay(T),
}

/// Exclusive right to apply a request id
///
/// Dropping it without calling [`Reservation::commit`] aborts the reservation:
/// the id becomes free again and waiting duplicates retry from scratch.
pub struct Reservation<'a, T: Clone> {
    ledger: &'a IdempotencyLedger<T>,
    request_id: RequestId,
    fingerprint: Fingerprint,
    finished: bool,
}

impl<'a, T: Clone> Reservation<'a, T> {
    /// The reserved request id
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Record `result` as the outcome of this request id (Pending → Committed)
    pub fn commit(mut self, result: T) {
        self.finished = true;
        self.ledger
            .finish_commit(self.request_id, self.fingerprint, result);
    }
}

impl<'a, T: Clone> Drop for Reservation<'a, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.ledger.finish_abort(self.request_id);
        }
    }
}

/// Deduplicates mutating requests by request id
///
/// Keyed independently from the version store; the two are only used together
/// inside a single create.
pub struct IdempotencyLedger<T> {
    entries: DashMap<RequestId, Slot<T>>,
    config: LedgerConfig,
}

impl<T: Clone> IdempotencyLedger<T> {
    /// Create an empty ledger
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Ledger configuration
    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    /// Number of tracked ids, pending and committed
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger tracks no ids
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Committed record for `request_id`, if one is retained
    pub fn record(&self, request_id: RequestId) -> Option<IdempotencyRecord<T>> {
        self.entries
            .get(&request_id)
            .and_then(|slot| match slot.value() {
                Slot::Committed(record) => Some(record.clone()),
                Slot::Pending { .. } => None,
            })
    }

    /// Reserve `request_id`, or obtain the result it already produced
    ///
    /// If another caller holds the reservation, waits up to `pending_wait` for
    /// it to finish. Fails with `RequestInFlight` if it does not, and with
    /// `ReuseMismatch` if the id belongs to a request with another fingerprint.
    pub async fn check_or_reserve(
        &self,
        request_id: RequestId,
        fingerprint: Fingerprint,
    ) -> Result<Reserve<'_, T>, LedgerError> {
        let deadline = Instant::now() + self.config.pending_wait;
        loop {
            let notify = match self.try_reserve(request_id, fingerprint, Timestamp::now())? {
                Attempt::Fresh => {
                    debug!(target: "eventsync::ledger", request_id = %request_id, "Reserved");
                    return Ok(Reserve::Fresh(Reservation {
                        ledger: self,
                        request_id,
                        fingerprint,
                        finished: false,
                    }));
                }
                Attempt::Replay(result) => {
                    debug!(target: "eventsync::ledger", request_id = %request_id, "Replaying committed result");
                    return Ok(Reserve::Replay(result));
                }
                Attempt::Wait(notify) => notify,
            };

            // Enable the waiter before re-checking so a commit landing in
            // between is not missed.
            let mut notified = pin!(notify.notified());
            notified.as_mut().enable();
            if !self.is_pending_on(request_id, &notify) {
                continue;
            }

            debug!(target: "eventsync::ledger", request_id = %request_id, "Waiting for in-flight request");
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(LedgerError::RequestInFlight { request_id });
            }
        }
    }

    /// Drop committed records whose retention ended at or before `now`
    ///
    /// Pending reservations are never purged. Returns the number removed.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, slot| match slot {
            Slot::Committed(record) if !record.expires_at.is_after(now) => {
                removed += 1;
                false
            }
            _ => true,
        });
        removed
    }

    fn try_reserve(
        &self,
        request_id: RequestId,
        fingerprint: Fingerprint,
        now: Timestamp,
    ) -> Result<Attempt<T>, LedgerError> {
        match self.entries.entry(request_id) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Pending {
                    fingerprint,
                    notify: Arc::new(Notify::new()),
                });
                Ok(Attempt::Fresh)
            }
            Entry::Occupied(mut occupied) => {
                let expired = matches!(
                    occupied.get(),
                    Slot::Committed(record) if !record.expires_at.is_after(now)
                );
                if expired {
                    occupied.insert(Slot::Pending {
                        fingerprint,
                        notify: Arc::new(Notify::new()),
                    });
                    return Ok(Attempt::Fresh);
                }

                match occupied.get() {
                    Slot::Committed(record) if record.fingerprint != fingerprint => {
                        Err(LedgerError::ReuseMismatch { request_id })
                    }
                    Slot::Committed(record) => Ok(Attempt::Replay(record.result.clone())),
                    Slot::Pending {
                        fingerprint: pending,
                        ..
                    } if *pending != fingerprint => Err(LedgerError::ReuseMismatch { request_id }),
                    Slot::Pending { notify, .. } => Ok(Attempt::Wait(Arc::clone(notify))),
                }
            }
        }
    }

    fn is_pending_on(&self, request_id: RequestId, notify: &Arc<Notify>) -> bool {
        self.entries
            .get(&request_id)
            .map(|slot| match slot.value() {
                Slot::Pending { notify: current, .. } => Arc::ptr_eq(current, notify),
                Slot::Committed(_) => false,
            })
            .unwrap_or(false)
    }

    fn finish_commit(&self, request_id: RequestId, fingerprint: Fingerprint, result: T) {
        let expires_at = Timestamp::now().saturating_add(self.config.retention);
        let Some(mut slot) = self.entries.get_mut(&request_id) else {
            warn!(target: "eventsync::ledger", request_id = %request_id, "Commit without a reservation");
            return;
        };
        let notify = match slot.value() {
            Slot::Pending { notify, .. } => Arc::clone(notify),
            Slot::Committed(_) => {
                warn!(target: "eventsync::ledger", request_id = %request_id, "Commit on an already committed request id");
                return;
            }
        };
        *slot.value_mut() = Slot::Committed(IdempotencyRecord {
            request_id,
            fingerprint,
            result,
            expires_at,
        });
        drop(slot);

        notify.notify_waiters();
        debug!(target: "eventsync::ledger", request_id = %request_id, expires_at = %expires_at, "Committed");
    }

    fn finish_abort(&self, request_id: RequestId) {
        let removed = self
            .entries
            .remove_if(&request_id, |_, slot| matches!(slot, Slot::Pending { .. }));
        if let Some((_, Slot::Pending { notify, .. })) = removed {
            notify.notify_waiters();
            debug!(target: "eventsync::ledger", request_id = %request_id, "Reservation aborted");
        }
    }
}
