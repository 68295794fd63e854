pub mod booking;
pub mod hold;
pub mod menu;
pub mod repository;
pub mod resource;
pub mod slot;
pub mod tenant;

pub use repository::StoreError;

/// Error taxonomy of the reservation core.
///
/// Business conflicts (`HoldConflict`, `HoldNotFound`, `HoldExpired`,
/// `Unauthorized`) surface to the caller verbatim and are never retried;
/// only `Store(Unavailable)` is eligible for bounded internal retry.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("slot is already held or booked")]
    HoldConflict,

    #[error("hold token is unknown or expired")]
    HoldNotFound,

    #[error("hold expired before the booking was committed")]
    HoldExpired,

    #[error("hold belongs to a different tenant")]
    Unauthorized,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
