//! `blockbill-events`: event trait, envelope, and bus abstractions.
//!
//! Domain crates describe what happened through typed events; this crate holds
//! the mechanics shared by all of them (the `Event` contract, the envelope that
//! carries stream metadata, and the pub/sub bus used after commit).

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
