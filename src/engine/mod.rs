//! The auction engine facade.
//!
//! [`AuctionEngine`] wires the lifecycle manager, bid ledger, negotiation
//! manager, settlement resolver and notification fan-out over a pluggable
//! [`EngineStore`]. It is cheap to clone and safe to share across tasks.
//!
//! # Serialization contract
//!
//! The auction row (`current_highest_bid` and `status`) is the only
//! contended resource. Every mutating operation on one auction runs under
//! that auction's entry in an in-process lock registry — the in-memory
//! analog of `SELECT ... FOR UPDATE` on the auction row. The guard is held
//! across the whole read-validate-write sequence, so two concurrent bids are
//! linearized: the loser re-validates against the winner's already-committed
//! highest bid. Locks are per auction; no cross-auction locking exists, and
//! no in-process lock is ever held by *callers* across engine calls.
//!
//! # Example
//!
//! ```no_run
//! # use nilami_engine::{AuctionEngine, EngineConfig};
//! # use nilami_engine::types::{Principal, FarmerId};
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = AuctionEngine::with_memory_store(EngineConfig::default());
//! let mut events = engine.subscribe();
//!
//! let farmer = Principal::Farmer(FarmerId::new());
//! // ... create an auction, place bids, settle.
//! # Ok(()) }
//! ```

mod ledger;
mod lifecycle;
mod negotiation;
mod notifications;
mod queries;
mod settlement;

pub use lifecycle::{CreateAuction, EditAuction};
pub use queries::FarmerStats;

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use tokio::{
    sync::{broadcast, Mutex as AsyncMutex, OwnedMutexGuard},
    time::timeout,
};
use tracing::warn;

use crate::{
    config::EngineConfig,
    error::{EngineError, Result},
    events::EngineEvent,
    model::{Auction, Bid, CounterOffer},
    store::{EngineStore, MemoryStore},
    types::{AuctionId, BidId, CounterOfferId, FarmerId, Principal},
};

type LockRegistry = Arc<StdMutex<HashMap<AuctionId, Arc<AsyncMutex<()>>>>>;

/// Facade over every engine component. See the module docs for the
/// serialization contract.
pub struct AuctionEngine<S: EngineStore> {
    store: Arc<S>,
    config: Arc<EngineConfig>,
    events: broadcast::Sender<EngineEvent>,
    auction_locks: LockRegistry,
}

impl<S: EngineStore> Clone for AuctionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            events: self.events.clone(),
            auction_locks: Arc::clone(&self.auction_locks),
        }
    }
}

impl AuctionEngine<MemoryStore> {
    /// Convenience constructor for tests and local development.
    pub fn with_memory_store(config: EngineConfig) -> Self {
        Self::new(MemoryStore::new(), config)
    }
}

impl<S: EngineStore> AuctionEngine<S> {
    /// Create an engine over the provided store.
    pub fn new(store: S, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            events,
            auction_locks: Arc::default(),
        }
    }

    /// Subscribe to the engine event bus (fire-and-forget).
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// The effective configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /* ------------------------------ internals ----------------------------- */

    /// Acquire this auction's serialization lock.
    ///
    /// The registry mutex is only held to hand out the per-auction lock; the
    /// async guard itself is held across the caller's store round-trips.
    pub(crate) async fn auction_guard(&self, id: AuctionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .auction_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    /// Bound a single storage round-trip by the configured timeout.
    pub(crate) async fn store_op<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(self.config.store_op_timeout, op)
            .await
            .map_err(|_| EngineError::Store("storage operation timed out".into()))?
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Publish onto the event bus. A send failure just means nobody is
    /// listening right now; the persisted notification trail already holds
    /// the record.
    pub(crate) fn publish(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            warn!("engine event dropped: no active subscribers");
        }
    }

    pub(crate) async fn load_auction(&self, id: AuctionId) -> Result<Auction> {
        self.store_op(self.store.auction(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("auction {id}")))
    }

    pub(crate) async fn load_bid(&self, id: BidId) -> Result<Bid> {
        self.store_op(self.store.bid(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("bid {id}")))
    }

    pub(crate) async fn load_counter_offer(&self, id: CounterOfferId) -> Result<CounterOffer> {
        self.store_op(self.store.counter_offer(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("counter offer {id}")))
    }
}

/// Ownership check shared by every farmer-side operation.
pub(crate) fn ensure_owner(auction: &Auction, principal: &Principal) -> Result<FarmerId> {
    match principal.as_farmer() {
        Some(farmer_id) if farmer_id == auction.farmer_id => Ok(farmer_id),
        _ => Err(EngineError::Unauthorized(
            "caller does not own this auction".into(),
        )),
    }
}
