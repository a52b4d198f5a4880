//! Storage abstraction over the four logical collections.
//!
//! The engine is designed for dependency injection: any transactional store
//! that implements [`EngineStore`] can be plugged in (Postgres, SQLite, …).
//! Out of the box we ship [`MemoryStore`], a thread-safe in-memory
//! implementation meant for unit tests and local development, *not*
//! production.
//!
//! Per-auction write serialization is the engine's job (see
//! [`crate::engine`]); the store only has to make each individual call
//! atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::{EngineError, Result},
    model::{Auction, AuctionStatus, Bid, BidStatus, CounterOffer, Notification},
    types::{AuctionId, BidId, BuyerId, CounterOfferId, FarmerId, NotificationId, Principal},
};

/// Durable records for Auction, Bid, CounterOffer and Notification.
#[async_trait]
pub trait EngineStore: Send + Sync + 'static {
    async fn insert_auction(&self, auction: Auction) -> Result<()>;
    async fn auction(&self, id: AuctionId) -> Result<Option<Auction>>;
    async fn update_auction(&self, auction: &Auction) -> Result<()>;
    async fn auctions_by_farmer(&self, farmer_id: FarmerId) -> Result<Vec<Auction>>;
    /// Auctions whose stored status is `Active` (callers still apply
    /// `effective_status` for lazy closing).
    async fn active_auctions(&self) -> Result<Vec<Auction>>;

    async fn insert_bid(&self, bid: Bid) -> Result<()>;
    async fn bid(&self, id: BidId) -> Result<Option<Bid>>;
    async fn update_bid(&self, bid: &Bid) -> Result<()>;
    async fn bids_for_auction(&self, auction_id: AuctionId) -> Result<Vec<Bid>>;
    async fn bids_by_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Bid>>;
    /// The at-most-one Active bid for (auction, buyer).
    async fn active_bid(&self, auction_id: AuctionId, buyer_id: BuyerId) -> Result<Option<Bid>>;

    async fn insert_counter_offer(&self, offer: CounterOffer) -> Result<()>;
    async fn counter_offer(&self, id: CounterOfferId) -> Result<Option<CounterOffer>>;
    async fn update_counter_offer(&self, offer: &CounterOffer) -> Result<()>;
    async fn counter_offers_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<CounterOffer>>;

    async fn insert_notification(&self, notification: Notification) -> Result<()>;
    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>>;
    async fn update_notification(&self, notification: &Notification) -> Result<()>;
    async fn notifications_for(&self, recipient: &Principal) -> Result<Vec<Notification>>;
}

/// In-memory store backed by `RwLock`'d hash maps.
#[derive(Default)]
pub struct MemoryStore {
    auctions: RwLock<HashMap<AuctionId, Auction>>,
    bids: RwLock<HashMap<BidId, Bid>>,
    counter_offers: RwLock<HashMap<CounterOfferId, CounterOffer>>,
    notifications: RwLock<HashMap<NotificationId, Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn insert_auction(&self, auction: Auction) -> Result<()> {
        let mut map = self.auctions.write().await;
        map.insert(auction.id, auction);
        Ok(())
    }

    async fn auction(&self, id: AuctionId) -> Result<Option<Auction>> {
        let map = self.auctions.read().await;
        Ok(map.get(&id).cloned())
    }

    async fn update_auction(&self, auction: &Auction) -> Result<()> {
        let mut map = self.auctions.write().await;
        match map.get_mut(&auction.id) {
            Some(existing) => {
                *existing = auction.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound(format!("auction {}", auction.id))),
        }
    }

    async fn auctions_by_farmer(&self, farmer_id: FarmerId) -> Result<Vec<Auction>> {
        let map = self.auctions.read().await;
        Ok(map
            .values()
            .filter(|a| a.farmer_id == farmer_id)
            .cloned()
            .collect())
    }

    async fn active_auctions(&self) -> Result<Vec<Auction>> {
        let map = self.auctions.read().await;
        Ok(map
            .values()
            .filter(|a| a.status == AuctionStatus::Active)
            .cloned()
            .collect())
    }

    async fn insert_bid(&self, bid: Bid) -> Result<()> {
        let mut map = self.bids.write().await;
        map.insert(bid.id, bid);
        Ok(())
    }

    async fn bid(&self, id: BidId) -> Result<Option<Bid>> {
        let map = self.bids.read().await;
        Ok(map.get(&id).cloned())
    }

    async fn update_bid(&self, bid: &Bid) -> Result<()> {
        let mut map = self.bids.write().await;
        match map.get_mut(&bid.id) {
            Some(existing) => {
                *existing = bid.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound(format!("bid {}", bid.id))),
        }
    }

    async fn bids_for_auction(&self, auction_id: AuctionId) -> Result<Vec<Bid>> {
        let map = self.bids.read().await;
        Ok(map
            .values()
            .filter(|b| b.auction_id == auction_id)
            .cloned()
            .collect())
    }

    async fn bids_by_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Bid>> {
        let map = self.bids.read().await;
        Ok(map
            .values()
            .filter(|b| b.buyer_id == buyer_id)
            .cloned()
            .collect())
    }

    async fn active_bid(&self, auction_id: AuctionId, buyer_id: BuyerId) -> Result<Option<Bid>> {
        let map = self.bids.read().await;
        Ok(map
            .values()
            .find(|b| {
                b.auction_id == auction_id
                    && b.buyer_id == buyer_id
                    && b.status == BidStatus::Active
            })
            .cloned())
    }

    async fn insert_counter_offer(&self, offer: CounterOffer) -> Result<()> {
        let mut map = self.counter_offers.write().await;
        map.insert(offer.id, offer);
        Ok(())
    }

    async fn counter_offer(&self, id: CounterOfferId) -> Result<Option<CounterOffer>> {
        let map = self.counter_offers.read().await;
        Ok(map.get(&id).cloned())
    }

    async fn update_counter_offer(&self, offer: &CounterOffer) -> Result<()> {
        let mut map = self.counter_offers.write().await;
        match map.get_mut(&offer.id) {
            Some(existing) => {
                *existing = offer.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound(format!("counter offer {}", offer.id))),
        }
    }

    async fn counter_offers_for_buyer(&self, buyer_id: BuyerId) -> Result<Vec<CounterOffer>> {
        let map = self.counter_offers.read().await;
        Ok(map
            .values()
            .filter(|c| c.buyer_id == buyer_id)
            .cloned()
            .collect())
    }

    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        let mut map = self.notifications.write().await;
        map.insert(notification.id, notification);
        Ok(())
    }

    async fn notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        let map = self.notifications.read().await;
        Ok(map.get(&id).cloned())
    }

    async fn update_notification(&self, notification: &Notification) -> Result<()> {
        let mut map = self.notifications.write().await;
        match map.get_mut(&notification.id) {
            Some(existing) => {
                *existing = notification.clone();
                Ok(())
            }
            None => Err(EngineError::NotFound(format!(
                "notification {}",
                notification.id
            ))),
        }
    }

    async fn notifications_for(&self, recipient: &Principal) -> Result<Vec<Notification>> {
        let map = self.notifications.read().await;
        Ok(map
            .values()
            .filter(|n| n.recipient == *recipient)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let bid = Bid::new(AuctionId::new(), BuyerId::new(), dec!(100), dec!(1), Utc::now());
        assert!(matches!(
            store.update_bid(&bid).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn active_bid_ignores_settled_rows() {
        let store = MemoryStore::new();
        let auction_id = AuctionId::new();
        let buyer_id = BuyerId::new();

        let mut bid = Bid::new(auction_id, buyer_id, dec!(100), dec!(1), Utc::now());
        bid.status = BidStatus::Rejected;
        store.insert_bid(bid).await.unwrap();

        assert!(store.active_bid(auction_id, buyer_id).await.unwrap().is_none());
    }
}
