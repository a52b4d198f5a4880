//! Inbox notifications — the audit trail of every state transition relevant
//! to a farmer or buyer.
//!
//! Records are append-only: the engine guarantees a notification exists in
//! the store before the triggering call returns, and only the read flag ever
//! mutates afterwards. Delivery (push/SMS/UI polling) is a collaborator
//! concern; the engine guarantees existence, not delivery.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AuctionId, NotificationId, Principal};

/// Event tag carried by a notification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewBid,
    BidAccepted,
    BidRejected,
    CounterOffer,
    CounterOfferAccepted,
    CounterOfferRejected,
    AuctionExtended,
    AuctionCancelled,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            NotificationKind::NewBid => "new_bid",
            NotificationKind::BidAccepted => "bid_accepted",
            NotificationKind::BidRejected => "bid_rejected",
            NotificationKind::CounterOffer => "counter_offer",
            NotificationKind::CounterOfferAccepted => "counter_offer_accepted",
            NotificationKind::CounterOfferRejected => "counter_offer_rejected",
            NotificationKind::AuctionExtended => "auction_extended",
            NotificationKind::AuctionCancelled => "auction_cancelled",
        };
        f.write_str(tag)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: Principal,
    pub auction_id: AuctionId,
    pub kind: NotificationKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient: Principal,
        auction_id: AuctionId,
        kind: NotificationKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient,
            auction_id,
            kind,
            message: message.into(),
            read: false,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(NotificationKind::NewBid.to_string(), "new_bid");
        assert_eq!(
            NotificationKind::CounterOfferAccepted.to_string(),
            "counter_offer_accepted"
        );
    }
}
