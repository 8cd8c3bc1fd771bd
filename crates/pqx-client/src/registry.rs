//! Single-slot registry of the transaction that owns a connection.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque identity of a transaction, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(NonZeroU64);

impl TransactionId {
    /// Allocate a fresh identity.
    pub(crate) fn next() -> Self {
        Self(NonZeroU64::MIN.saturating_add(NEXT_ID.fetch_add(1, Ordering::Relaxed)))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The registered transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Registration {
    pub(crate) id: TransactionId,
    pub(crate) description: String,
}

/// Holds at most one registration.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    slot: Option<Registration>,
}

impl Registry {
    /// Claim the slot for `id`.
    ///
    /// Fails when any transaction, including `id` itself, is registered.
    pub(crate) fn register(&mut self, id: TransactionId, description: String) -> Result<()> {
        if let Some(active) = &self.slot {
            let mut attempted = String::from("started ");
            attempted.push_str(&description);
            return Err(Error::TransactionActive {
                active: active.description.clone(),
                attempted,
            });
        }

        self.slot = Some(Registration { id, description });
        Ok(())
    }

    /// Release the slot held by `id`.
    ///
    /// Never fails. An empty slot is left alone; a slot held by a different
    /// transaction is left alone and the inconsistency is reported.
    pub(crate) fn unregister(&mut self, id: TransactionId) {
        match &self.slot {
            Some(active) if active.id == id => {
                self.slot = None;
            }
            Some(active) => {
                tracing::error!(
                    active = %active.description,
                    active_id = %active.id,
                    unregistering = %id,
                    "unregistering a transaction that is not the registered one"
                );
                debug_assert!(
                    std::thread::panicking(),
                    "unregistering {id} while {} is registered",
                    active.id
                );
            }
            None => {
                tracing::debug!(id = %id, "unregister on empty transaction slot");
            }
        }
    }

    pub(crate) fn active(&self) -> Option<&Registration> {
        self.slot.as_ref()
    }

    /// Empty the slot, returning what was in it.
    pub(crate) fn take(&mut self) -> Option<Registration> {
        self.slot.take()
    }
}
