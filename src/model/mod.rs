//! Domain entities persisted by the engine: [`Auction`], [`Bid`],
//! [`CounterOffer`] and [`Notification`].
//!
//! Entities are plain data plus *pure* helpers; every mutation with domain
//! meaning goes through the engine so the serialization contract in
//! [`crate::engine`] holds.

mod auction;
mod bid;
mod counter_offer;
mod notification;

pub use auction::{Auction, AuctionStatus};
pub use bid::{Bid, BidStatus};
pub use counter_offer::{CounterOffer, CounterOfferStatus};
pub use notification::{Notification, NotificationKind};
