//! A buyer's standing offer on an auction.
//!
//! Per (auction, buyer) the ledger keeps at most one *Active* bid; a buyer
//! who bids again updates that row in place instead of stacking new ones.
//! `Accepted` and `Rejected` are terminal — a settled bid is immutable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AuctionId, BidId, BuyerId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Active,
    Accepted,
    Rejected,
}

impl BidStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BidStatus::Accepted | BidStatus::Rejected)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub auction_id: AuctionId,
    pub buyer_id: BuyerId,

    pub price_per_quintal: Decimal,
    /// `price_per_quintal * auction.quantity_quintals`; recomputed whenever
    /// either factor changes.
    pub total_amount: Decimal,

    pub status: BidStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// A fresh Active bid.
    pub fn new(
        auction_id: AuctionId,
        buyer_id: BuyerId,
        price_per_quintal: Decimal,
        quantity_quintals: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BidId::new(),
            auction_id,
            buyer_id,
            price_per_quintal,
            total_amount: price_per_quintal * quantity_quintals,
            status: BidStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// In-place price update, keeping the total consistent.
    pub fn reprice(&mut self, price_per_quintal: Decimal, quantity_quintals: Decimal, now: DateTime<Utc>) {
        self.price_per_quintal = price_per_quintal;
        self.total_amount = price_per_quintal * quantity_quintals;
        self.updated_at = now;
    }
}
