pub mod hub;
pub mod messages;

mod handler;

pub use handler::ws_handler;
pub use hub::EventHub;
