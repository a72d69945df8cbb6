use serde::{Deserialize, Serialize};

use blockbill_core::AggregateId;
use blockbill_ledger::Currency;

use crate::invoice::InvoiceId;

/// Payment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub AggregateId);

impl PaymentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// How a payment settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Redemption of store-credit blocks (`blk` currency).
    Block,
    /// Card charge through the external gateway.
    Charge,
    Check,
    Ach,
    Bank,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Block => "block",
            PaymentMethod::Charge => "charge",
            PaymentMethod::Check => "check",
            PaymentMethod::Ach => "ach",
            PaymentMethod::Bank => "bank",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One successful settlement attempt against an invoice.
///
/// Created once, immutable afterwards. Failed or declined attempts never
/// produce a `Payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub method: PaymentMethod,
    /// Amount in minor units of `currency`; for block payments, the number of
    /// blocks redeemed (currency `blk`).
    pub amount: i64,
    pub currency: Currency,
    /// External charge reference, present only for gateway charges.
    pub charge_id: Option<String>,
    pub charge_gateway: Option<String>,
    pub note: Option<String>,
}

impl Payment {
    pub fn new(
        id: PaymentId,
        invoice_id: InvoiceId,
        method: PaymentMethod,
        amount: i64,
        currency: Currency,
    ) -> Self {
        Self {
            id,
            invoice_id,
            method,
            amount,
            currency,
            charge_id: None,
            charge_gateway: None,
            note: None,
        }
    }

    pub fn with_charge(mut self, charge_id: String, gateway: String) -> Self {
        self.charge_id = Some(charge_id);
        self.charge_gateway = Some(gateway);
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}
