use chrono::{DateTime, Utc};

/// Contract every billing domain event satisfies.
///
/// Events are immutable facts about the ledger (an order approved, a payment
/// applied, blocks redeemed). They carry their own schema version so stored
/// history survives payload evolution, and their business timestamp so
/// consumers never need the wall clock to order what happened.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted event name (e.g. "orders.order.approved").
    ///
    /// This is what the store persists and what bus consumers match on; it
    /// must never change for an already-shipped event type.
    fn event_type(&self) -> &'static str;

    /// Schema version of this event type's payload.
    fn version(&self) -> u32;

    /// Business time at which the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
