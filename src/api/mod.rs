pub mod auth;
pub mod payments;
pub mod profile;
pub mod tournaments;
pub mod wallet;
pub mod withdrawals;

pub use auth::{router as auth_router, AppState};
pub use payments::router as payments_router;
pub use profile::router as profile_router;
pub use tournaments::router as tournaments_router;
pub use wallet::router as wallet_router;
pub use withdrawals::router as withdrawals_router;
