pub mod manager;
pub(crate) mod registration;
pub mod store;

pub use manager::{TournamentConfig, TournamentManager, TournamentUpdate};
pub use store::TournamentStore;
