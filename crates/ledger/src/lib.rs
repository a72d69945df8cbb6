//! `blockbill-ledger`: the line item ledger leaf.
//!
//! Append-only monetary rows attached to exactly one typed owner (an order or
//! an invoice), plus the per-currency aggregation the invoice ledger is
//! computed from. No cross-currency combination ever happens here: each
//! currency is tracked and settled independently.

pub mod currency;
pub mod line_item;
pub mod totals;

pub use currency::Currency;
pub use line_item::{LineItem, LineOwner, LineOwnerKind, SkuId, SkuKind, SkuRef};
pub use totals::CurrencyTotals;
