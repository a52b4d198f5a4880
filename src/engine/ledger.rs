//! The bid ledger — the engine's core state machine.
//!
//! Per (auction, buyer) a bid walks {no-bid} → Active → {Accepted |
//! Rejected}; terminal states never revert. The ledger is the *sole* writer
//! of `auction.current_highest_bid` on the bidding path, and every admission
//! runs under the auction's serialization lock so concurrent bids are
//! linearized rather than lost: the second bid's validation always observes
//! the first bid's committed highest value.
//!
//! Validation order (each failure leaves state untouched):
//! 1. auction open — with lazy close write-back when the end time passed,
//! 2. price positive,
//! 3. price ≥ base price,
//! 4. price ≥ current highest,
//! 5. price ≥ current highest + increment, except an exact resubmission of
//!    the caller's own standing bid, which is a silent no-op.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::{
    engine::AuctionEngine,
    error::{EngineError, Result},
    events::EngineEvent,
    model::{AuctionStatus, Bid, NotificationKind},
    store::EngineStore,
    types::{AuctionId, Principal},
};

impl<S: EngineStore> AuctionEngine<S> {
    /// Admit a buyer's bid, updating their standing bid in place when one
    /// exists.
    ///
    /// On success `auction.current_highest_bid` equals the admitted price
    /// and the owner has a `new_bid` notification. An exact resubmission of
    /// the caller's own active bid returns that bid unchanged with no side
    /// effects.
    #[instrument(skip(self), fields(%auction_id, price = %price))]
    pub async fn place_bid(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
        price: Decimal,
    ) -> Result<Bid> {
        let buyer_id = principal
            .as_buyer()
            .ok_or_else(|| EngineError::Unauthorized("only buyers may place bids".into()))?;

        let _serial = self.auction_guard(auction_id).await;
        let now = Utc::now();
        let mut auction = self.load_auction(auction_id).await?;

        match auction.status {
            AuctionStatus::Active if now >= auction.end_time => {
                // Lazy close: this is the write that makes the expiry
                // durable for every later reader.
                auction.status = AuctionStatus::Closed;
                auction.updated_at = now;
                self.store_op(self.store().update_auction(&auction)).await?;
                info!(%auction_id, "auction lazily closed on bid attempt");
                self.publish(EngineEvent::AuctionClosed { auction_id });
                return Err(EngineError::AuctionClosed);
            }
            AuctionStatus::Active => {}
            _ => return Err(EngineError::AuctionClosed),
        }

        if price <= Decimal::ZERO {
            return Err(EngineError::Validation("bid price must be positive".into()));
        }
        if price < auction.base_price {
            return Err(EngineError::PriceTooLow {
                offered: price,
                minimum: auction.base_price,
            });
        }
        if price < auction.current_highest_bid {
            return Err(EngineError::PriceTooLow {
                offered: price,
                minimum: auction.current_highest_bid,
            });
        }

        let existing = self
            .store_op(self.store().active_bid(auction_id, buyer_id))
            .await?;

        let floor = auction.current_highest_bid + auction.minimum_bid_increment;
        if price < floor {
            if let Some(prior) = &existing {
                if prior.price_per_quintal == price {
                    debug!(%auction_id, %buyer_id, "idempotent bid resubmission");
                    return Ok(prior.clone());
                }
            }
            return Err(EngineError::IncrementTooLow {
                offered: price,
                minimum: floor,
            });
        }

        let bid = match existing {
            Some(mut bid) => {
                bid.reprice(price, auction.quantity_quintals, now);
                self.store_op(self.store().update_bid(&bid)).await?;
                bid
            }
            None => {
                let bid = Bid::new(auction_id, buyer_id, price, auction.quantity_quintals, now);
                self.store_op(self.store().insert_bid(bid.clone())).await?;
                bid
            }
        };

        auction.current_highest_bid = price;
        auction.updated_at = now;
        self.store_op(self.store().update_auction(&auction)).await?;

        self.notify(
            Principal::Farmer(auction.farmer_id),
            auction_id,
            NotificationKind::NewBid,
            format!(
                "New bid of \u{20b9}{price}/quintal on your {} auction",
                auction.crop_name
            ),
        )
        .await?;

        info!(%auction_id, %buyer_id, %price, "bid admitted");
        self.publish(EngineEvent::BidPlaced {
            auction_id,
            bid_id: bid.id,
            buyer_id,
            price,
        });
        Ok(bid)
    }
}
