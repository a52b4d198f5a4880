//! Engine event bus.
//!
//! Every committed mutation is mirrored as an [`EngineEvent`] on a Tokio
//! broadcast channel so collaborator services (delivery transports, market
//! dashboards) can react without polling. Publication is fire-and-forget:
//! the persisted [`crate::model::Notification`] trail, not the bus, is the
//! source of truth.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AuctionId, BidId, BuyerId, CounterOfferId, FarmerId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EngineEvent {
    AuctionCreated {
        auction_id: AuctionId,
        farmer_id: FarmerId,
    },
    AuctionEdited {
        auction_id: AuctionId,
    },
    AuctionExtended {
        auction_id: AuctionId,
        new_end_time: chrono::DateTime<chrono::Utc>,
    },
    AuctionCancelled {
        auction_id: AuctionId,
    },
    /// Lazy write-back of an expired auction's status.
    AuctionClosed {
        auction_id: AuctionId,
    },
    BidPlaced {
        auction_id: AuctionId,
        bid_id: BidId,
        buyer_id: BuyerId,
        price: Decimal,
    },
    BidAccepted {
        auction_id: AuctionId,
        bid_id: BidId,
    },
    BidRejected {
        auction_id: AuctionId,
        bid_id: BidId,
    },
    CounterOfferSent {
        auction_id: AuctionId,
        counter_offer_id: CounterOfferId,
        buyer_id: BuyerId,
        counter_price: Decimal,
    },
    CounterOfferAccepted {
        auction_id: AuctionId,
        counter_offer_id: CounterOfferId,
    },
    CounterOfferRejected {
        auction_id: AuctionId,
        counter_offer_id: CounterOfferId,
    },
}
