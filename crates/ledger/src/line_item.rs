use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use blockbill_core::{AggregateId, BillingError, BillingResult};

use crate::currency::Currency;

/// SKU identifier (catalog reference).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkuId(pub AggregateId);

impl SkuId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SkuId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Catalog classification of a SKU.
///
/// `StoreCredit` marks a credit-purchase product: fully settling an invoice
/// line with this kind triggers block generation. The catalog stamps the kind
/// when the line is created; the ledger only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkuKind {
    Standard,
    StoreCredit,
}

/// SKU reference carried by a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuRef {
    pub id: SkuId,
    pub kind: SkuKind,
}

impl SkuRef {
    pub fn standard(id: SkuId) -> Self {
        Self {
            id,
            kind: SkuKind::Standard,
        }
    }

    pub fn store_credit(id: SkuId) -> Self {
        Self {
            id,
            kind: SkuKind::StoreCredit,
        }
    }
}

/// Which kind of aggregate a line item is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineOwnerKind {
    Order,
    Invoice,
}

/// Typed polymorphic owner: one row references exactly one typed owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineOwner {
    pub kind: LineOwnerKind,
    pub id: AggregateId,
}

impl LineOwner {
    pub fn order(id: AggregateId) -> Self {
        Self {
            kind: LineOwnerKind::Order,
            id,
        }
    }

    pub fn invoice(id: AggregateId) -> Self {
        Self {
            kind: LineOwnerKind::Invoice,
            id,
        }
    }
}

/// Append-only monetary ledger row.
///
/// Immutable once created; never updated or deleted in place. `amount` is in
/// minor currency units (e.g. cents); `quantity` is a non-negative rational
/// (fractional allowed). The row's contribution to its currency bucket is
/// `amount × quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub owner: LineOwner,
    pub amount: i64,
    pub currency: Currency,
    pub quantity: Decimal,
    pub sku: Option<SkuRef>,
    pub description: Option<String>,
}

impl LineItem {
    pub fn new(
        owner: LineOwner,
        amount: i64,
        currency: Currency,
        quantity: Decimal,
        sku: Option<SkuRef>,
        description: Option<String>,
    ) -> BillingResult<Self> {
        if quantity.is_sign_negative() {
            return Err(BillingError::validation("quantity must be non-negative"));
        }
        Ok(Self {
            owner,
            amount,
            currency,
            quantity,
            sku,
            description,
        })
    }

    /// Contribution of this row to its currency bucket: `amount × quantity`.
    pub fn contribution(&self) -> Decimal {
        Decimal::from(self.amount) * self.quantity
    }

    /// Whether this row purchases store credit (triggers block generation on
    /// full settlement of the owning invoice).
    pub fn is_store_credit(&self) -> bool {
        matches!(
            self.sku,
            Some(SkuRef {
                kind: SkuKind::StoreCredit,
                ..
            })
        )
    }

    /// Copy this row onto a new owner (order line → invoice line at invoicing
    /// time). Everything but the owner is preserved verbatim.
    pub fn reowned(&self, owner: LineOwner) -> Self {
        Self {
            owner,
            ..self.clone()
        }
    }
}
