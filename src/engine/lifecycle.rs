//! Auction lifecycle manager: create, edit (pre-bid only), extend, cancel.
//!
//! Status is never advanced by a background sweeper; an expired auction is
//! reported closed by [`crate::model::Auction::effective_status`] and
//! persisted as closed lazily by the bid ledger.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::{
    engine::{ensure_owner, AuctionEngine},
    error::{EngineError, Result},
    events::EngineEvent,
    model::{Auction, AuctionStatus, BidStatus, NotificationKind},
    store::EngineStore,
    types::{AuctionId, Principal},
};

/// Parameters for a new auction.
#[derive(Clone, Debug)]
pub struct CreateAuction {
    pub crop_name: String,
    pub quantity_quintals: Decimal,
    /// Defaults to the configured quality grade (normally `"Standard"`).
    pub quality_grade: Option<String>,
    pub base_price: Decimal,
    /// Defaults to the configured increment (normally 50).
    pub minimum_bid_increment: Option<Decimal>,
    pub duration: Duration,
    pub location: String,
    pub district: String,
    /// Defaults to the configured state.
    pub state: Option<String>,
    pub description: String,
    pub harvest_date: Option<NaiveDate>,
    pub storage_location: Option<String>,
    pub photos: Vec<String>,
}

/// Partial update applied by [`AuctionEngine::edit_auction`]. `None` leaves
/// the field untouched.
#[derive(Clone, Debug, Default)]
pub struct EditAuction {
    pub base_price: Option<Decimal>,
    pub minimum_bid_increment: Option<Decimal>,
    pub quality_grade: Option<String>,
    pub description: Option<String>,
    pub storage_location: Option<String>,
    pub harvest_date: Option<NaiveDate>,
    pub photos: Option<Vec<String>>,
}

impl<S: EngineStore> AuctionEngine<S> {
    /// Open a new auction owned by the calling farmer.
    ///
    /// `status` starts as `Active` and `current_highest_bid` at the base
    /// price, so the ≥-base invariant holds from the first instant.
    #[instrument(skip(self, params), fields(crop = %params.crop_name))]
    pub async fn create_auction(
        &self,
        principal: &Principal,
        params: CreateAuction,
    ) -> Result<Auction> {
        let farmer_id = principal
            .as_farmer()
            .ok_or_else(|| EngineError::Unauthorized("only farmers may create auctions".into()))?;

        if params.crop_name.trim().is_empty() {
            return Err(EngineError::Validation("crop name is required".into()));
        }
        if params.quantity_quintals <= Decimal::ZERO {
            return Err(EngineError::Validation("quantity must be positive".into()));
        }
        if params.base_price <= Decimal::ZERO {
            return Err(EngineError::Validation("base price must be positive".into()));
        }
        if params.duration <= Duration::zero() {
            return Err(EngineError::Validation("duration must be positive".into()));
        }
        if params.location.trim().is_empty() || params.district.trim().is_empty() {
            return Err(EngineError::Validation(
                "location and district are required".into(),
            ));
        }
        let increment = params
            .minimum_bid_increment
            .unwrap_or(self.config().default_minimum_increment);
        if increment <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "minimum bid increment must be positive".into(),
            ));
        }
        if params.photos.len() > self.config().max_photos {
            return Err(EngineError::Validation(format!(
                "at most {} photos are allowed",
                self.config().max_photos
            )));
        }

        let now = Utc::now();
        let auction = Auction {
            id: AuctionId::new(),
            farmer_id,
            crop_name: params.crop_name,
            quantity_quintals: params.quantity_quintals,
            quality_grade: params
                .quality_grade
                .unwrap_or_else(|| self.config().default_quality_grade.clone()),
            base_price: params.base_price,
            minimum_bid_increment: increment,
            current_highest_bid: params.base_price,
            start_time: now,
            end_time: now + params.duration,
            status: AuctionStatus::Active,
            location: params.location,
            district: params.district,
            state: params
                .state
                .unwrap_or_else(|| self.config().default_state.clone()),
            description: params.description,
            harvest_date: params.harvest_date,
            storage_location: params.storage_location,
            photos: params.photos,
            created_at: now,
            updated_at: now,
        };

        self.store_op(self.store().insert_auction(auction.clone()))
            .await?;
        info!(auction_id = %auction.id, "auction created");
        self.publish(EngineEvent::AuctionCreated {
            auction_id: auction.id,
            farmer_id,
        });
        Ok(auction)
    }

    /// Edit price and terms before any bid has been recorded.
    ///
    /// Raising the base price above the stored highest bid raises the
    /// highest bid to match — safe because there are no bids to protect.
    #[instrument(skip(self, changes))]
    pub async fn edit_auction(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
        changes: EditAuction,
    ) -> Result<Auction> {
        let _serial = self.auction_guard(auction_id).await;

        let mut auction = self.load_auction(auction_id).await?;
        ensure_owner(&auction, principal)?;

        if auction.status != AuctionStatus::Active {
            return Err(EngineError::InvalidState(
                "only active auctions can be edited".into(),
            ));
        }
        let bids = self.store_op(self.store().bids_for_auction(auction_id)).await?;
        if !bids.is_empty() {
            return Err(EngineError::InvalidState(
                "auction terms are frozen once bids exist".into(),
            ));
        }

        if let Some(base_price) = changes.base_price {
            if base_price <= Decimal::ZERO {
                return Err(EngineError::Validation("base price must be positive".into()));
            }
        }
        if let Some(increment) = changes.minimum_bid_increment {
            if increment <= Decimal::ZERO {
                return Err(EngineError::Validation(
                    "minimum bid increment must be positive".into(),
                ));
            }
        }
        if let Some(photos) = &changes.photos {
            if photos.len() > self.config().max_photos {
                return Err(EngineError::Validation(format!(
                    "at most {} photos are allowed",
                    self.config().max_photos
                )));
            }
        }

        if let Some(base_price) = changes.base_price {
            auction.base_price = base_price;
            if base_price > auction.current_highest_bid {
                auction.current_highest_bid = base_price;
            }
        }
        if let Some(increment) = changes.minimum_bid_increment {
            auction.minimum_bid_increment = increment;
        }
        if let Some(grade) = changes.quality_grade {
            auction.quality_grade = grade;
        }
        if let Some(description) = changes.description {
            auction.description = description;
        }
        if let Some(storage_location) = changes.storage_location {
            auction.storage_location = Some(storage_location);
        }
        if let Some(harvest_date) = changes.harvest_date {
            auction.harvest_date = Some(harvest_date);
        }
        if let Some(photos) = changes.photos {
            auction.photos = photos;
        }
        auction.updated_at = Utc::now();

        self.store_op(self.store().update_auction(&auction)).await?;
        self.publish(EngineEvent::AuctionEdited { auction_id });
        Ok(auction)
    }

    /// Push the end time out by `additional`, notifying every buyer holding
    /// an active bid.
    ///
    /// Extending a lazily-closed auction whose new end time lies in the
    /// future re-opens it; cancelled and completed auctions stay terminal.
    #[instrument(skip(self))]
    pub async fn extend_auction(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
        additional: Duration,
    ) -> Result<Auction> {
        if additional <= Duration::zero() {
            return Err(EngineError::Validation("extension must be positive".into()));
        }

        let _serial = self.auction_guard(auction_id).await;

        let mut auction = self.load_auction(auction_id).await?;
        ensure_owner(&auction, principal)?;

        if auction.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "cannot extend a {} auction",
                match auction.status {
                    AuctionStatus::Cancelled => "cancelled",
                    _ => "completed",
                }
            )));
        }

        let now = Utc::now();
        auction.end_time += additional;
        if auction.status == AuctionStatus::Closed && auction.end_time > now {
            auction.status = AuctionStatus::Active;
        }
        auction.updated_at = now;
        self.store_op(self.store().update_auction(&auction)).await?;

        let hours = additional.num_hours();
        let message = if hours > 0 {
            format!("Auction extended by {hours} hour(s)")
        } else {
            format!("Auction extended by {} minute(s)", additional.num_minutes())
        };
        for buyer_id in self.active_bidders(auction_id).await? {
            self.notify(
                Principal::Buyer(buyer_id),
                auction_id,
                NotificationKind::AuctionExtended,
                message.clone(),
            )
            .await?;
        }

        info!(auction_id = %auction.id, new_end = %auction.end_time, "auction extended");
        self.publish(EngineEvent::AuctionExtended {
            auction_id,
            new_end_time: auction.end_time,
        });
        Ok(auction)
    }

    /// Withdraw an auction. Bids keep whatever status they had; only the
    /// auction's own status flips to `Cancelled`.
    #[instrument(skip(self))]
    pub async fn cancel_auction(
        &self,
        auction_id: AuctionId,
        principal: &Principal,
    ) -> Result<Auction> {
        let _serial = self.auction_guard(auction_id).await;

        let mut auction = self.load_auction(auction_id).await?;
        ensure_owner(&auction, principal)?;

        if auction.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "auction is already completed or cancelled".into(),
            ));
        }

        auction.status = AuctionStatus::Cancelled;
        auction.updated_at = Utc::now();
        self.store_op(self.store().update_auction(&auction)).await?;

        for buyer_id in self.all_bidders(auction_id).await? {
            self.notify(
                Principal::Buyer(buyer_id),
                auction_id,
                NotificationKind::AuctionCancelled,
                "The auction has been cancelled by the farmer".to_string(),
            )
            .await?;
        }

        info!(auction_id = %auction.id, "auction cancelled");
        self.publish(EngineEvent::AuctionCancelled { auction_id });
        Ok(auction)
    }

    /// Distinct buyers currently holding an Active bid on the auction.
    async fn active_bidders(&self, auction_id: AuctionId) -> Result<Vec<crate::types::BuyerId>> {
        let bids = self.store_op(self.store().bids_for_auction(auction_id)).await?;
        let mut buyers: Vec<_> = bids
            .iter()
            .filter(|b| b.status == BidStatus::Active)
            .map(|b| b.buyer_id)
            .collect();
        buyers.sort();
        buyers.dedup();
        Ok(buyers)
    }

    /// Distinct buyers who ever bid on the auction, whatever the bid status.
    async fn all_bidders(&self, auction_id: AuctionId) -> Result<Vec<crate::types::BuyerId>> {
        let bids = self.store_op(self.store().bids_for_auction(auction_id)).await?;
        let mut buyers: Vec<_> = bids.iter().map(|b| b.buyer_id).collect();
        buyers.sort();
        buyers.dedup();
        Ok(buyers)
    }
}
