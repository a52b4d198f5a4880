//! The auction aggregate.
//!
//! An auction is a farmer-owned, time-boxed sale listing for a quantity of a
//! commodity at or above a base price. Its lifecycle is one-directional:
//!
//! ```text
//!            ┌────────────┐  end_time reached (lazy)   ┌──────────┐
//!            │   Active   │ ─────────────────────────► │  Closed  │
//!            └────────────┘                            └──────────┘
//!               │      │
//!   cancel()    │      │  accept_bid()
//!               ▼      ▼
//!      ┌───────────┐ ┌─────────────┐
//!      │ Cancelled │ │  Completed  │        (both terminal)
//!      └───────────┘ └─────────────┘
//! ```
//!
//! The Active → Closed edge is evaluated *lazily*: [`Auction::effective_status`]
//! reports `Closed` for an expired auction without writing anything, and the
//! status row is only persisted as `Closed` on the next bid attempt. Until
//! that write lands the stored status is stale; readers must go through
//! `effective_status` rather than the raw field.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AuctionId, FarmerId};

/// Discrete auction lifecycle states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    /// Open for bids until `end_time`.
    Active,
    /// Past `end_time` without settlement; no further bids.
    Closed,
    /// Withdrawn by the farmer. Terminal.
    Cancelled,
    /// A winning bid was accepted. Terminal.
    Completed,
}

impl AuctionStatus {
    /// Terminal states can never be left.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionStatus::Cancelled | AuctionStatus::Completed)
    }
}

/// A farmer's commodity auction.
///
/// Invariants maintained by the engine:
/// - `current_highest_bid >= base_price` at all times,
/// - `end_time > start_time`,
/// - `photos.len() <= EngineConfig::max_photos`,
/// - status transitions follow the diagram above.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub farmer_id: FarmerId,

    // Commodity descriptor
    pub crop_name: String,
    pub quantity_quintals: Decimal,
    pub quality_grade: String,

    // Pricing
    pub base_price: Decimal,
    pub minimum_bid_increment: Decimal,
    /// Authoritative "best offer so far". Written only by the bid ledger,
    /// counter-offer acceptance and settlement.
    pub current_highest_bid: Decimal,

    // Timeline
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    pub status: AuctionStatus,

    // Location & logistics
    pub location: String,
    pub district: String,
    pub state: String,

    pub description: String,
    pub harvest_date: Option<NaiveDate>,
    pub storage_location: Option<String>,
    /// Opaque photo references owned by the upload collaborator.
    pub photos: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auction {
    /// Status as observed at `now`, without any write.
    ///
    /// An `Active` auction past its end time is *reported* as `Closed`; the
    /// persisted row is updated opportunistically by the next bid attempt.
    pub fn effective_status(&self, now: DateTime<Utc>) -> AuctionStatus {
        if self.status == AuctionStatus::Active && now >= self.end_time {
            AuctionStatus::Closed
        } else {
            self.status
        }
    }

    /// Whether a bid submitted at `now` can be admitted.
    pub fn is_open_for_bids(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == AuctionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn sample(now: DateTime<Utc>) -> Auction {
        Auction {
            id: AuctionId::new(),
            farmer_id: FarmerId::new(),
            crop_name: "Mustard".into(),
            quantity_quintals: dec!(10),
            quality_grade: "Standard".into(),
            base_price: dec!(5000),
            minimum_bid_increment: dec!(50),
            current_highest_bid: dec!(5000),
            start_time: now,
            end_time: now + Duration::hours(24),
            status: AuctionStatus::Active,
            location: "Latur".into(),
            district: "Latur".into(),
            state: "Maharashtra".into(),
            description: String::new(),
            harvest_date: None,
            storage_location: None,
            photos: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn effective_status_reports_closed_without_write() {
        let now = Utc::now();
        let auction = sample(now);

        assert_eq!(auction.effective_status(now), AuctionStatus::Active);
        let past_end = now + Duration::hours(25);
        assert_eq!(auction.effective_status(past_end), AuctionStatus::Closed);
        // The stored status is untouched.
        assert_eq!(auction.status, AuctionStatus::Active);
    }

    #[test]
    fn terminal_states_do_not_expire() {
        let now = Utc::now();
        let mut auction = sample(now);
        auction.status = AuctionStatus::Completed;

        let past_end = now + Duration::hours(25);
        assert_eq!(auction.effective_status(past_end), AuctionStatus::Completed);
        assert!(!auction.is_open_for_bids(past_end));
    }
}
