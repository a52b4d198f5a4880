//! Error taxonomy for the auction engine.
//!
//! Every engine operation returns a typed failure synchronously; nothing is
//! swallowed and nothing is retried internally. A failed call leaves all
//! prior state untouched, so callers may safely resubmit. Storage failures
//! are wrapped as [`EngineError::Store`] so raw backend errors never cross
//! the engine boundary.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result shorthand used throughout the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Domain errors emitted by the auction engine.
///
/// Each variant carries the violated invariant so the calling layer can
/// render an actionable message.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Malformed or out-of-range input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Caller is not the entity's permitted actor.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Operation is illegal for the entity's current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Bid is below the base price or the current highest bid.
    #[error("bid of \u{20b9}{offered}/quintal is below the required \u{20b9}{minimum}/quintal")]
    PriceTooLow { offered: Decimal, minimum: Decimal },

    /// Bid does not clear the minimum increment over the current highest bid.
    #[error("minimum increment not met: next valid bid is \u{20b9}{minimum}/quintal, got \u{20b9}{offered}")]
    IncrementTooLow { offered: Decimal, minimum: Decimal },

    /// Auction is not open for bidding (closed, cancelled, completed, or
    /// past its end time).
    #[error("auction is closed to new bids")]
    AuctionClosed,

    /// Referenced entity id does not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage-layer failure, wrapped so backend errors never leak.
    #[error("storage error: {0}")]
    Store(String),
}
