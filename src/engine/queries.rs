//! Read side: entity fetches, browse lists, and the farmer dashboard stats.
//!
//! Queries never write; lazy closing stays a pure read here
//! (`effective_status`) so browsing cannot perturb the ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    engine::{ensure_owner, AuctionEngine},
    error::Result,
    model::{Auction, AuctionStatus, Bid, CounterOffer},
    store::EngineStore,
    types::{AuctionId, BidId, BuyerId, FarmerId, Principal},
};

/// Aggregated dashboard numbers for one farmer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FarmerStats {
    pub total_auctions: usize,
    pub active_auctions: usize,
    pub completed_auctions: usize,
    pub cancelled_auctions: usize,
    /// Best `current_highest_bid` across all of the farmer's auctions.
    pub best_price: Decimal,
    pub total_bids: usize,
}

impl<S: EngineStore> AuctionEngine<S> {
    /// Fetch one auction.
    pub async fn auction(&self, auction_id: AuctionId) -> Result<Auction> {
        self.load_auction(auction_id).await
    }

    /// Fetch one bid.
    pub async fn bid_by_id(&self, bid_id: BidId) -> Result<Bid> {
        self.load_bid(bid_id).await
    }

    /// All of a farmer's auctions, newest first.
    pub async fn auctions_by_farmer(&self, farmer_id: FarmerId) -> Result<Vec<Auction>> {
        let mut auctions = self
            .store_op(self.store().auctions_by_farmer(farmer_id))
            .await?;
        auctions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(auctions)
    }

    /// Auctions a buyer can bid on right now: stored-Active rows whose
    /// effective status at `now` is still Active.
    pub async fn open_auctions(&self, now: DateTime<Utc>) -> Result<Vec<Auction>> {
        let mut auctions = self.store_op(self.store().active_auctions()).await?;
        auctions.retain(|a| a.effective_status(now) == AuctionStatus::Active);
        auctions.sort_by(|a, b| a.end_time.cmp(&b.end_time));
        Ok(auctions)
    }

    /// The bid board for an auction, highest price first. Owner-only.
    pub async fn bids_for_auction(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
    ) -> Result<Vec<Bid>> {
        let auction = self.load_auction(auction_id).await?;
        ensure_owner(&auction, principal)?;

        let mut bids = self
            .store_op(self.store().bids_for_auction(auction_id))
            .await?;
        bids.sort_by(|a, b| b.price_per_quintal.cmp(&a.price_per_quintal));
        Ok(bids)
    }

    /// A buyer's own bids, newest first.
    pub async fn bids_by_buyer(&self, buyer_id: BuyerId) -> Result<Vec<Bid>> {
        let mut bids = self.store_op(self.store().bids_by_buyer(buyer_id)).await?;
        bids.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bids)
    }

    /// Counters awaiting this buyer's decision, newest first.
    pub async fn pending_counter_offers_for_buyer(
        &self,
        buyer_id: BuyerId,
    ) -> Result<Vec<CounterOffer>> {
        let mut offers = self
            .store_op(self.store().counter_offers_for_buyer(buyer_id))
            .await?;
        offers.retain(CounterOffer::is_pending);
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(offers)
    }

    /// Dashboard aggregates for a farmer.
    pub async fn farmer_stats(&self, farmer_id: FarmerId) -> Result<FarmerStats> {
        let auctions = self
            .store_op(self.store().auctions_by_farmer(farmer_id))
            .await?;

        let mut stats = FarmerStats {
            total_auctions: auctions.len(),
            ..Default::default()
        };
        for auction in &auctions {
            match auction.status {
                AuctionStatus::Active => stats.active_auctions += 1,
                AuctionStatus::Completed => stats.completed_auctions += 1,
                AuctionStatus::Cancelled => stats.cancelled_auctions += 1,
                AuctionStatus::Closed => {}
            }
            if auction.current_highest_bid > stats.best_price {
                stats.best_price = auction.current_highest_bid;
            }
            stats.total_bids += self
                .store_op(self.store().bids_for_auction(auction.id))
                .await?
                .len();
        }
        Ok(stats)
    }
}
