//! In-memory token store with generation-tagged writes
//!
//! Holds the credential for a single account session. A tokio Mutex
//! serializes access from the two writers: the authorization flow (full
//! exchange) and the upload client's refresh path.
//!
//! Writes are linearized by a monotonically increasing generation counter.
//! A writer calls [`TokenStore::begin_write`] when its operation *starts*
//! and [`TokenStore::set`] when it completes; a write whose generation is
//! lower than the one already stored is discarded. This is what prevents a
//! refresh from being clobbered by an authorization exchange that started
//! earlier but resolved later — last-writer-by-completion-time is exactly
//! the ordering we must not have.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::debug;

use crate::credential::Credential;

/// Write ticket handed out by [`TokenStore::begin_write`]. Ordered by issue
/// time, unique per ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// Single-session credential holder. No persistence beyond process lifetime.
#[derive(Debug, Default)]
pub struct TokenStore {
    state: Mutex<Option<(Generation, Credential)>>,
    next_generation: AtomicU64,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a generation for a write that is about to start (token
    /// exchange or refresh). Call this before the network round-trip, not
    /// after, so overlapping writers resolve in start order.
    pub fn begin_write(&self) -> Generation {
        Generation(self.next_generation.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Current credential, if any.
    pub async fn get(&self) -> Option<Credential> {
        let state = self.state.lock().await;
        state.as_ref().map(|(_, credential)| credential.clone())
    }

    /// Store a credential under the given generation.
    ///
    /// Returns `false` (and leaves the store untouched) when a newer
    /// generation has already been stored.
    pub async fn set(&self, generation: Generation, credential: Credential) -> bool {
        let mut state = self.state.lock().await;
        if let Some((stored, _)) = *state
            && stored > generation
        {
            debug!(
                stale = generation.0,
                stored = stored.0,
                "discarding stale credential write"
            );
            return false;
        }
        *state = Some((generation, credential));
        debug!(generation = generation.0, "stored credential");
        true
    }

    /// Drop the stored credential. The next upload will trigger a full
    /// reauthorization.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = None;
        debug!("cleared credential store");
    }
}
