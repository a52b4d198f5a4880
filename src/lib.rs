//! # nilami-engine
//!
//! Auction & negotiation engine for time-boxed commodity sales between
//! farmers and buyers.
//!
//! Responsibilities
//! ----------------
//! 1. Run farmer-owned, time-boxed auctions with base-price and
//!    minimum-increment rules.
//! 2. Admit competing bids from many concurrent buyers, linearized per
//!    auction so no legitimately higher bid is ever silently lost.
//! 3. Support farmer counter-offers resolved by the countered buyer.
//! 4. Settle exactly one winning bid per auction.
//! 5. Keep an append-only notification trail for every state transition.
//!
//! Identity/session handling, rendering, payments, logistics and file
//! storage are collaborator concerns: callers pass an authenticated
//! [`types::Principal`] into every operation and the engine only authorizes
//! ownership. Storage is behind the [`store::EngineStore`] trait; an
//! in-memory implementation ships for tests and local development.
//!
//! Auction closing is evaluated *lazily* on access rather than by a
//! background scheduler — see [`model::Auction::effective_status`].

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod store;
pub mod types;

pub use crate::{
    config::EngineConfig,
    engine::{AuctionEngine, CreateAuction, EditAuction, FarmerStats},
    error::{EngineError, Result},
    events::EngineEvent,
    model::{
        Auction, AuctionStatus, Bid, BidStatus, CounterOffer, CounterOfferStatus, Notification,
        NotificationKind,
    },
    store::{EngineStore, MemoryStore},
};
