//! Session event logging and feedback
//!
//! Provides the event bus that decouples the timeline interpreter and the
//! session state machine from rendering, audio, and HUD collaborators:
//! systems emit events, collaborators consume them each frame.

mod bus;
mod types;

pub use bus::{BusEvent, EventBus, update_event_bus_time};
pub use types::GameEvent;
