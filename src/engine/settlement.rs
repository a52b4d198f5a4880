//! Settlement resolver: the terminal transition of an auction.
//!
//! Accepting one bid completes the auction and rejects every other bid in
//! the same serialized unit. Rejecting a single bid leaves the auction open.
//! `accept_bid`/`reject_bid` are the only paths that move a bid into a
//! terminal state from the farmer's side.

use chrono::Utc;
use tracing::{info, instrument};

use crate::{
    engine::{ensure_owner, AuctionEngine},
    error::{EngineError, Result},
    events::EngineEvent,
    model::{AuctionStatus, Bid, BidStatus, NotificationKind},
    store::EngineStore,
    types::{AuctionId, BidId, Principal},
};

impl<S: EngineStore> AuctionEngine<S> {
    /// Accept `bid_id` as the winning bid: that bid becomes `Accepted`,
    /// every other bid on the auction becomes `Rejected`, and the auction is
    /// `Completed` with its highest bid pinned to the winning price.
    ///
    /// Only the winner is notified; losing buyers observe rejection through
    /// their own bid list.
    #[instrument(skip(self), fields(%auction_id, %bid_id))]
    pub async fn accept_bid(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
        bid_id: BidId,
    ) -> Result<Bid> {
        let _serial = self.auction_guard(auction_id).await;

        let mut auction = self.load_auction(auction_id).await?;
        ensure_owner(&auction, principal)?;

        if auction.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "auction is already completed or cancelled".into(),
            ));
        }

        let mut bid = self.load_bid(bid_id).await?;
        if bid.auction_id != auction_id {
            return Err(EngineError::InvalidState(
                "bid does not belong to this auction".into(),
            ));
        }
        if bid.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "bid has already been settled".into(),
            ));
        }

        let now = Utc::now();
        bid.status = BidStatus::Accepted;
        bid.updated_at = now;
        self.store_op(self.store().update_bid(&bid)).await?;

        let others = self.store_op(self.store().bids_for_auction(auction_id)).await?;
        for mut other in others {
            if other.id != bid.id && other.status == BidStatus::Active {
                other.status = BidStatus::Rejected;
                other.updated_at = now;
                self.store_op(self.store().update_bid(&other)).await?;
            }
        }

        auction.status = AuctionStatus::Completed;
        auction.current_highest_bid = bid.price_per_quintal;
        auction.updated_at = now;
        self.store_op(self.store().update_auction(&auction)).await?;

        self.notify(
            Principal::Buyer(bid.buyer_id),
            auction_id,
            NotificationKind::BidAccepted,
            format!(
                "Your bid of \u{20b9}{}/quintal has been accepted!",
                bid.price_per_quintal
            ),
        )
        .await?;

        info!(%auction_id, winner = %bid.buyer_id, "auction settled");
        self.publish(EngineEvent::BidAccepted {
            auction_id,
            bid_id: bid.id,
        });
        Ok(bid)
    }

    /// Reject a single bid without closing the auction.
    #[instrument(skip(self), fields(%auction_id, %bid_id))]
    pub async fn reject_bid(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
        bid_id: BidId,
    ) -> Result<Bid> {
        let _serial = self.auction_guard(auction_id).await;

        let auction = self.load_auction(auction_id).await?;
        ensure_owner(&auction, principal)?;

        if auction.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "auction is already completed or cancelled".into(),
            ));
        }

        let mut bid = self.load_bid(bid_id).await?;
        if bid.auction_id != auction_id {
            return Err(EngineError::InvalidState(
                "bid does not belong to this auction".into(),
            ));
        }
        if bid.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "bid has already been settled".into(),
            ));
        }

        bid.status = BidStatus::Rejected;
        bid.updated_at = Utc::now();
        self.store_op(self.store().update_bid(&bid)).await?;

        self.notify(
            Principal::Buyer(bid.buyer_id),
            auction_id,
            NotificationKind::BidRejected,
            format!(
                "Your bid of \u{20b9}{}/quintal has been rejected.",
                bid.price_per_quintal
            ),
        )
        .await?;

        info!(%auction_id, %bid_id, "bid rejected");
        self.publish(EngineEvent::BidRejected {
            auction_id,
            bid_id: bid.id,
        });
        Ok(bid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testkit::{active_auction, buyer, engine};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn accept_is_exclusive_and_completes_the_auction() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;

        let winner = buyer();
        let loser = buyer();
        let losing_bid = engine.place_bid(auction.id, &loser, dec!(110)).await.unwrap();
        let winning_bid = engine.place_bid(auction.id, &winner, dec!(125)).await.unwrap();

        let accepted = engine.accept_bid(auction.id, &farmer, winning_bid.id).await.unwrap();
        assert_eq!(accepted.status, BidStatus::Accepted);

        let stored = engine.auction(auction.id).await.unwrap();
        assert_eq!(stored.status, AuctionStatus::Completed);
        assert_eq!(stored.current_highest_bid, dec!(125));

        let stored_loser = engine.bid_by_id(losing_bid.id).await.unwrap();
        assert_eq!(stored_loser.status, BidStatus::Rejected);

        // Winner is notified; the implicit loser is not.
        let winner_inbox = engine.notifications_for(&winner).await.unwrap();
        assert!(winner_inbox.iter().any(|n| n.kind == NotificationKind::BidAccepted));
        let loser_inbox = engine.notifications_for(&loser).await.unwrap();
        assert!(!loser_inbox.iter().any(|n| n.kind == NotificationKind::BidRejected));
    }

    #[tokio::test]
    async fn completed_auction_refuses_everything() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;

        let bidder = buyer();
        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();
        engine.accept_bid(auction.id, &farmer, bid.id).await.unwrap();

        let err = engine.place_bid(auction.id, &buyer(), dec!(300)).await.unwrap_err();
        assert_eq!(err, EngineError::AuctionClosed);

        let err = engine
            .edit_auction(auction.id, &farmer, Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        let err = engine
            .extend_auction(auction.id, &farmer, chrono::Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        let err = engine
            .send_counter_offer(auction.id, &farmer, bid.id, dec!(200))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));

        let err = engine.cancel_auction(auction.id, &farmer).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn reject_leaves_the_auction_open() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;

        let bidder = buyer();
        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();

        let rejected = engine.reject_bid(auction.id, &farmer, bid.id).await.unwrap();
        assert_eq!(rejected.status, BidStatus::Rejected);

        let stored = engine.auction(auction.id).await.unwrap();
        assert_eq!(stored.status, AuctionStatus::Active);

        let inbox = engine.notifications_for(&bidder).await.unwrap();
        assert!(inbox.iter().any(|n| n.kind == NotificationKind::BidRejected));

        // The buyer may bid again with a fresh row.
        let again = engine.place_bid(auction.id, &bidder, dec!(130)).await.unwrap();
        assert_ne!(again.id, bid.id);
        assert_eq!(again.status, BidStatus::Active);
    }

    #[tokio::test]
    async fn settled_bids_are_immutable() {
        let engine = engine();
        let (auction, farmer) = active_auction(&engine).await;

        let bidder = buyer();
        let bid = engine.place_bid(auction.id, &bidder, dec!(110)).await.unwrap();
        engine.reject_bid(auction.id, &farmer, bid.id).await.unwrap();

        let err = engine.reject_bid(auction.id, &farmer, bid.id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn accept_requires_containment() {
        let engine = engine();
        let (auction_a, farmer_a) = active_auction(&engine).await;
        let (auction_b, _) = active_auction(&engine).await;

        let bid_on_b = engine.place_bid(auction_b.id, &buyer(), dec!(110)).await.unwrap();
        let err = engine
            .accept_bid(auction_a.id, &farmer_a, bid_on_b.id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }
}
