//! Orders domain module (event-sourced).
//!
//! The order state machine: draft orders accumulate line items, move through
//! approval, and are finally invoiced. Draft orders have no externally visible
//! accounting.

pub mod order;

pub use order::{
    AddLineItem, ApproveOrder, CreateOrder, DeleteOrder, MarkInvoiced, Order, OrderApproved,
    OrderCommand, OrderCreated, OrderDeleted, OrderEvent, OrderId, OrderInvoiced, OrderLineAdded,
    OrderRejected, OrderState, OrderSubmitted, RejectOrder, SubmitOrder,
};
