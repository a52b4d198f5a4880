//! Canonical identifier and principal types shared across the engine.
//!
//! Every entity id is a newtype over a v4 [`Uuid`] so ids of different
//! entities cannot be confused at compile time. The [`Principal`] type is
//! the *explicit* caller identity passed into every engine call — the engine
//! never consults ambient session state; authentication happens upstream and
//! the engine only authorizes ownership.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Borrow the underlying [`Uuid`].
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(raw: Uuid) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_newtype!(
    /// Identifies one auction listing.
    AuctionId
);
uuid_newtype!(
    /// Identifies one bid row.
    BidId
);
uuid_newtype!(
    /// Identifies one counter-offer.
    CounterOfferId
);
uuid_newtype!(
    /// Identifies one inbox notification.
    NotificationId
);
uuid_newtype!(
    /// Identifies a farmer (auction owner) principal.
    FarmerId
);
uuid_newtype!(
    /// Identifies a buyer (bidder) principal.
    BuyerId
);

/// The kind of actor behind a [`Principal`].
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Farmer,
    Buyer,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::Farmer => f.write_str("farmer"),
            PrincipalKind::Buyer => f.write_str("buyer"),
        }
    }
}

/// Authenticated caller identity, supplied by the upstream auth collaborator.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Principal {
    Farmer(FarmerId),
    Buyer(BuyerId),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::Farmer(_) => PrincipalKind::Farmer,
            Principal::Buyer(_) => PrincipalKind::Buyer,
        }
    }

    /// Returns the farmer id when the caller is a farmer.
    pub fn as_farmer(&self) -> Option<FarmerId> {
        match self {
            Principal::Farmer(id) => Some(*id),
            Principal::Buyer(_) => None,
        }
    }

    /// Returns the buyer id when the caller is a buyer.
    pub fn as_buyer(&self) -> Option<BuyerId> {
        match self {
            Principal::Buyer(id) => Some(*id),
            Principal::Farmer(_) => None,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Farmer(id) => write!(f, "farmer:{id}"),
            Principal::Buyer(id) => write!(f, "buyer:{id}"),
        }
    }
}
