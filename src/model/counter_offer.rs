//! A farmer's price counter against a specific bid, resolved by that bid's
//! buyer. Pending → Accepted | Rejected, terminal either way.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AuctionId, BidId, BuyerId, CounterOfferId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterOfferStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterOffer {
    pub id: CounterOfferId,
    pub auction_id: AuctionId,
    pub bid_id: BidId,
    /// The buyer who placed the referenced bid; the only principal allowed
    /// to resolve this counter.
    pub buyer_id: BuyerId,

    pub counter_price_per_quintal: Decimal,
    pub status: CounterOfferStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CounterOffer {
    pub fn new(
        auction_id: AuctionId,
        bid_id: BidId,
        buyer_id: BuyerId,
        counter_price_per_quintal: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CounterOfferId::new(),
            auction_id,
            bid_id,
            buyer_id,
            counter_price_per_quintal,
            status: CounterOfferStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == CounterOfferStatus::Pending
    }
}
