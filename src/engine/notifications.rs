//! Notification fan-out and inbox reads.
//!
//! The append happens inside the same serialized unit as the triggering
//! mutation, so the record exists in the store before the call returns.
//! There are no retries and no delivery guarantee beyond existence.

use chrono::Utc;
use tracing::instrument;

use crate::{
    engine::AuctionEngine,
    error::{EngineError, Result},
    model::{Notification, NotificationKind},
    store::EngineStore,
    types::{AuctionId, NotificationId, Principal},
};

impl<S: EngineStore> AuctionEngine<S> {
    /// Append one inbox entry for `recipient`.
    pub(crate) async fn notify(
        &self,
        recipient: Principal,
        auction_id: AuctionId,
        kind: NotificationKind,
        message: String,
    ) -> Result<Notification> {
        let notification = Notification::new(recipient, auction_id, kind, message, Utc::now());
        self.store_op(self.store().insert_notification(notification.clone()))
            .await?;
        Ok(notification)
    }

    /// The principal's inbox, newest first.
    #[instrument(skip(self))]
    pub async fn notifications_for(&self, principal: &Principal) -> Result<Vec<Notification>> {
        let mut inbox = self
            .store_op(self.store().notifications_for(principal))
            .await?;
        inbox.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(inbox)
    }

    /// Number of unread entries in the principal's inbox.
    pub async fn unread_count(&self, principal: &Principal) -> Result<usize> {
        let inbox = self
            .store_op(self.store().notifications_for(principal))
            .await?;
        Ok(inbox.iter().filter(|n| !n.read).count())
    }

    /// Flip the read flag. Idempotent; only the recipient may call it.
    #[instrument(skip(self))]
    pub async fn mark_notification_read(
        &self,
        notification_id: NotificationId,
        principal: &Principal,
    ) -> Result<Notification> {
        let mut notification = self
            .store_op(self.store().notification(notification_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("notification {notification_id}")))?;

        if notification.recipient != *principal {
            return Err(EngineError::Unauthorized(
                "notification belongs to another principal".into(),
            ));
        }

        if !notification.read {
            notification.read = true;
            self.store_op(self.store().update_notification(&notification))
                .await?;
        }
        Ok(notification)
    }
}
