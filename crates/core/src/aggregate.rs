//! Event-sourced aggregate contracts.
//!
//! Orders, invoices, accounts and credit pools all follow the same shape:
//! commands are decided against current state without side effects, and state
//! only ever changes by applying the events those decisions produced.

/// Identity and revision of an event-sourced entity.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far (the stream revision).
    ///
    /// The store compares this against [`ExpectedVersion`] on append, which is
    /// what stops two concurrent writers from both approving the same order or
    /// double-spending the same blocks.
    fn version(&self) -> u64;
}

/// What a writer believes the stream revision to be.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append unconditionally (migrations, append-only logs without
    /// contention).
    Any,
    /// Append only if the stream is exactly at this revision.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// Pure decide/apply split for billing aggregates.
///
/// `handle` looks at current state and either refuses the command with a
/// domain error or returns the events that should be recorded; it must not
/// mutate anything or perform IO. `apply` folds one event into state and is
/// total: historical events always replay cleanly.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold one event into state, bumping `version()` by one.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events a command produces, given current state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
