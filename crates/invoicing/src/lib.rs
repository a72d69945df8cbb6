//! Invoicing domain module (event-sourced).
//!
//! The invoice is a per-currency ledger over immutable line items and recorded
//! payments. Totals and the amount due are computed on read; nothing monetary
//! is stored denormalized.

pub mod invoice;
pub mod payment;

pub use invoice::{
    ApplyPayment, CreateInvoice, DeleteInvoice, Invoice, InvoiceCommand, InvoiceCreated,
    InvoiceDeleted, InvoiceEvent, InvoiceId, PaymentApplied,
};
pub use payment::{Payment, PaymentId, PaymentMethod};
