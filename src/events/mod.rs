//! Diagram events and the bus that delivers them

pub mod bus;
pub mod diagram_events;

pub use bus::{EventBus, Subscription};
pub use diagram_events::*;
