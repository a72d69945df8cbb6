//! Accounts domain module (event-sourced).
//!
//! The account is the billing party: it owns orders, invoices, and
//! store-credit blocks. Only the pieces the billing engine reads live here:
//! the external gateway customer reference and the billing address that
//! invoices snapshot at creation time.

pub mod account;

pub use account::{
    Account, AccountCommand, AccountCreated, AccountDeleted, AccountEvent, AccountId, Address,
    AddressAssigned, AssignAddress, CreateAccount, DeleteAccount,
};
