//! WebSocket infrastructure: the upgrade handler and the event relay.

mod handler;
pub mod relay;

pub use handler::ws_handler;
