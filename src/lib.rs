pub mod answer;
pub mod bury;
pub mod clock;
pub mod config;
pub mod conversion;
pub mod filtered;
pub mod interval;
pub mod leech;
pub mod limits;
pub mod model;
pub mod queues;
pub mod revlog;
pub mod reset;
pub mod scheduler;
pub mod selection;
pub mod siblings;
pub mod store;

use miette::Diagnostic;
use thiserror::Error;

use model::{CardId, CardQueue};

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Sqlx Error: {source}")]
    Sqlx {
        #[from]
        source: sqlx::Error,
    },
    #[error("Io Error: {description}, {source}")]
    Io {
        description: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Library(#[from] LibraryError),
}

/// Note that `LibraryError` is `Clone` while `Error` is not.
#[derive(Clone, Debug, Diagnostic, Error)]
pub enum LibraryError {
    #[error("Card {card_id} cannot be answered from queue {queue:?}.")]
    InvalidTransition { card_id: CardId, queue: CardQueue },
    #[error("Card {0} is not a preview card in a filtered deck.")]
    InvalidPreviewState(CardId),
    #[error("Early review is not valid for card {0}: {reason}")]
    InvalidEarlyReview { card_id: CardId, reason: String },
    #[error("Revlog key clash at {time_ms}; this should be retried internally.")]
    RevlogKeyClash { time_ms: i64 },
    #[error("Operation cancelled before counts could be finalized.")]
    Cancelled,
    #[error("Store error: {0}")]
    StoreError(String),
}
