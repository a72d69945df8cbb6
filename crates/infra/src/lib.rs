//! Infrastructure layer: event store, dispatch pipeline, charge gateway,
//! configuration, and the billing engine that composes the domain crates.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod event_store;
pub mod gateway;


pub use config::BillingConfig;
pub use dispatcher::EngineError;
pub use engine::{BillingEngine, PaymentRequest};
pub use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, StreamAppend, UncommittedEvent,
};
pub use gateway::{ChargeGateway, ChargeReceipt, ChargeRequest, ScriptedGateway};
