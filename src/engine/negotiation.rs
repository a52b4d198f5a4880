//! Counter-offer negotiation between the auction owner and a bidder.
//!
//! A counter is the farmer's trusted price against one specific bid:
//! acceptance rewrites that bid and the auction's highest bid *without* any
//! increment check, because the price originates from the auction owner.
//! Several counters may be pending at once against different bids; the
//! engine neither de-duplicates nor expires them.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::{
    engine::{ensure_owner, AuctionEngine},
    error::{EngineError, Result},
    events::EngineEvent,
    model::{BidStatus, CounterOffer, CounterOfferStatus, NotificationKind},
    store::EngineStore,
    types::{AuctionId, BidId, CounterOfferId, Principal},
};

impl<S: EngineStore> AuctionEngine<S> {
    /// Propose a counter price against an existing bid.
    #[instrument(skip(self), fields(%auction_id, %bid_id, price = %counter_price))]
    pub async fn send_counter_offer(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
        bid_id: BidId,
        counter_price: Decimal,
    ) -> Result<CounterOffer> {
        let _serial = self.auction_guard(auction_id).await;

        let auction = self.load_auction(auction_id).await?;
        ensure_owner(&auction, principal)?;

        if auction.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "auction is already completed or cancelled".into(),
            ));
        }
        if counter_price <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "counter price must be positive".into(),
            ));
        }

        let bid = self.load_bid(bid_id).await?;
        if bid.auction_id != auction_id {
            return Err(EngineError::Validation(
                "bid does not belong to this auction".into(),
            ));
        }

        let now = Utc::now();
        let offer = CounterOffer::new(auction_id, bid_id, bid.buyer_id, counter_price, now);
        self.store_op(self.store().insert_counter_offer(offer.clone()))
            .await?;

        self.notify(
            Principal::Buyer(bid.buyer_id),
            auction_id,
            NotificationKind::CounterOffer,
            format!("Farmer sent a counter offer: \u{20b9}{counter_price}/quintal"),
        )
        .await?;

        info!(counter_offer_id = %offer.id, "counter offer sent");
        self.publish(EngineEvent::CounterOfferSent {
            auction_id,
            counter_offer_id: offer.id,
            buyer_id: bid.buyer_id,
            counter_price,
        });
        Ok(offer)
    }

    /// Buyer accepts the farmer's counter: the referenced bid and the
    /// auction's highest bid are rewritten to the counter price.
    #[instrument(skip(self), fields(%counter_offer_id))]
    pub async fn accept_counter_offer(
        &self,
        counter_offer_id: CounterOfferId,
        principal: &Principal,
    ) -> Result<CounterOffer> {
        // Resolve the auction first so the state checks below run under its
        // serialization lock.
        let auction_id = self.load_counter_offer(counter_offer_id).await?.auction_id;
        let _serial = self.auction_guard(auction_id).await;

        let mut offer = self.load_counter_offer(counter_offer_id).await?;
        self.ensure_counter_recipient(&offer, principal)?;
        if !offer.is_pending() {
            return Err(EngineError::InvalidState(
                "counter offer has already been resolved".into(),
            ));
        }

        let mut auction = self.load_auction(offer.auction_id).await?;
        if auction.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "auction is already completed or cancelled".into(),
            ));
        }
        let mut bid = self.load_bid(offer.bid_id).await?;
        if bid.status != BidStatus::Active {
            return Err(EngineError::InvalidState(
                "referenced bid has already been settled".into(),
            ));
        }

        let now = Utc::now();
        offer.status = CounterOfferStatus::Accepted;
        offer.updated_at = now;
        self.store_op(self.store().update_counter_offer(&offer))
            .await?;

        bid.reprice(offer.counter_price_per_quintal, auction.quantity_quintals, now);
        self.store_op(self.store().update_bid(&bid)).await?;

        // Farmer-originated price: trusted, no increment check.
        auction.current_highest_bid = offer.counter_price_per_quintal;
        auction.updated_at = now;
        self.store_op(self.store().update_auction(&auction)).await?;

        self.notify(
            Principal::Farmer(auction.farmer_id),
            auction.id,
            NotificationKind::CounterOfferAccepted,
            format!(
                "Buyer accepted your counter offer of \u{20b9}{}/quintal",
                offer.counter_price_per_quintal
            ),
        )
        .await?;

        info!(counter_offer_id = %offer.id, "counter offer accepted");
        self.publish(EngineEvent::CounterOfferAccepted {
            auction_id: auction.id,
            counter_offer_id: offer.id,
        });
        Ok(offer)
    }

    /// Buyer declines the counter; no ledger mutation.
    #[instrument(skip(self), fields(%counter_offer_id))]
    pub async fn reject_counter_offer(
        &self,
        counter_offer_id: CounterOfferId,
        principal: &Principal,
    ) -> Result<CounterOffer> {
        let auction_id = self.load_counter_offer(counter_offer_id).await?.auction_id;
        let _serial = self.auction_guard(auction_id).await;

        let mut offer = self.load_counter_offer(counter_offer_id).await?;
        self.ensure_counter_recipient(&offer, principal)?;
        if !offer.is_pending() {
            return Err(EngineError::InvalidState(
                "counter offer has already been resolved".into(),
            ));
        }

        let auction = self.load_auction(offer.auction_id).await?;

        offer.status = CounterOfferStatus::Rejected;
        offer.updated_at = Utc::now();
        self.store_op(self.store().update_counter_offer(&offer))
            .await?;

        self.notify(
            Principal::Farmer(auction.farmer_id),
            auction.id,
            NotificationKind::CounterOfferRejected,
            format!(
                "Buyer declined your counter offer of \u{20b9}{}/quintal",
                offer.counter_price_per_quintal
            ),
        )
        .await?;

        info!(counter_offer_id = %offer.id, "counter offer rejected");
        self.publish(EngineEvent::CounterOfferRejected {
            auction_id: auction.id,
            counter_offer_id: offer.id,
        });
        Ok(offer)
    }

    fn ensure_counter_recipient(
        &self,
        offer: &CounterOffer,
        principal: &Principal,
    ) -> Result<()> {
        match principal.as_buyer() {
            Some(buyer_id) if buyer_id == offer.buyer_id => Ok(()),
            _ => Err(EngineError::Unauthorized(
                "only the countered buyer may resolve this offer".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testkit::{active_auction, buyer, engine};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn counter_requires_ownership_and_containment() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;
        let (other_auction, _) = active_auction(&engine).await;

        let bidder = buyer();
        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();

        // Not the owner.
        let err = engine
            .send_counter_offer(auction.id, &bidder, bid.id, dec!(120))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));

        // Bid from a different auction.
        let other_farmer = engine.auction(other_auction.id).await.unwrap().farmer_id;
        let err = engine
            .send_counter_offer(
                other_auction.id,
                &Principal::Farmer(other_farmer),
                bid.id,
                dec!(120),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // Non-positive price.
        let err = engine
            .send_counter_offer(auction.id, &farmer, bid.id, dec!(0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn acceptance_rewrites_bid_and_highest() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;
        let bidder = buyer();

        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();
        let offer = engine
            .send_counter_offer(auction.id, &farmer, bid.id, dec!(113))
            .await
            .unwrap();

        let resolved = engine.accept_counter_offer(offer.id, &bidder).await.unwrap();
        assert_eq!(resolved.status, CounterOfferStatus::Accepted);

        // The counter bypasses the increment rule (113 < 110 + 10).
        let stored_auction = engine.auction(auction.id).await.unwrap();
        assert_eq!(stored_auction.current_highest_bid, dec!(113));

        let stored_bid = engine.bid_by_id(bid.id).await.unwrap();
        assert_eq!(stored_bid.price_per_quintal, dec!(113));
        assert_eq!(stored_bid.total_amount, dec!(113));

        let inbox = engine.notifications_for(&farmer).await.unwrap();
        assert!(inbox
            .iter()
            .any(|n| n.kind == NotificationKind::CounterOfferAccepted));
    }

    #[tokio::test]
    async fn rejection_leaves_the_ledger_alone() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;
        let bidder = buyer();

        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();
        let offer = engine
            .send_counter_offer(auction.id, &farmer, bid.id, dec!(130))
            .await
            .unwrap();

        let resolved = engine.reject_counter_offer(offer.id, &bidder).await.unwrap();
        assert_eq!(resolved.status, CounterOfferStatus::Rejected);

        let stored_auction = engine.auction(auction.id).await.unwrap();
        assert_eq!(stored_auction.current_highest_bid, dec!(110));
        let stored_bid = engine.bid_by_id(bid.id).await.unwrap();
        assert_eq!(stored_bid.price_per_quintal, dec!(110));
    }

    #[tokio::test]
    async fn resolved_counters_are_immutable() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;
        let bidder = buyer();

        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();
        let offer = engine
            .send_counter_offer(auction.id, &farmer, bid.id, dec!(130))
            .await
            .unwrap();
        engine.reject_counter_offer(offer.id, &bidder).await.unwrap();

        let err = engine.accept_counter_offer(offer.id, &bidder).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn only_the_countered_buyer_may_resolve() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;
        let bidder = buyer();

        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();
        let offer = engine
            .send_counter_offer(auction.id, &farmer, bid.id, dec!(130))
            .await
            .unwrap();

        let err = engine.accept_counter_offer(offer.id, &buyer()).await.unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
        let err = engine.accept_counter_offer(offer.id, &farmer).await.unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn multiple_pending_counters_may_coexist() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;

        let bidder_a = buyer();
        let bidder_b = buyer();
        let bid_a = engine.place_bid(auction.id, &bidder_a, dec!(110)).await.unwrap();
        let bid_b = engine.place_bid(auction.id, &bidder_b, dec!(125)).await.unwrap();

        let offer_a = engine
            .send_counter_offer(auction.id, &farmer, bid_a.id, dec!(140))
            .await
            .unwrap();
        let offer_b = engine
            .send_counter_offer(auction.id, &farmer, bid_b.id, dec!(145))
            .await
            .unwrap();

        assert!(offer_a.is_pending());
        assert!(offer_b.is_pending());
        assert_ne!(offer_a.id, offer_b.id);
    }
}
