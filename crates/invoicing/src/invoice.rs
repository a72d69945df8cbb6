use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use blockbill_accounts::{AccountId, Address};
use blockbill_core::{Aggregate, AggregateId, AggregateRoot, BillingError};
use blockbill_events::Event;
use blockbill_ledger::{CurrencyTotals, LineItem, LineOwnerKind};
use blockbill_orders::OrderId;

use crate::payment::Payment;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Invoice.
///
/// Line items are copied from the source order at creation and never change
/// afterwards; the billing address is snapshotted at the same moment and never
/// re-resolved. `subtotal`, `total` and `amount_due` are computed on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    account_id: Option<AccountId>,
    order_id: Option<OrderId>,
    address: Option<Address>,
    note: Option<String>,
    line_items: Vec<LineItem>,
    payments: Vec<Payment>,
    paid: bool,
    closed: bool,
    attempted: bool,
    attempt_count: u32,
    deleted_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            account_id: None,
            order_id: None,
            address: None,
            note: None,
            line_items: Vec::new(),
            payments: Vec::new(),
            paid: false,
            closed: false,
            attempted: false,
            attempt_count: 0,
            deleted_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn exists(&self) -> bool {
        self.created && !self.is_deleted()
    }

    /// Per-currency sum of `amount × quantity` over the line items.
    pub fn subtotal(&self) -> CurrencyTotals {
        CurrencyTotals::from_line_items(&self.line_items)
    }

    /// No tax or discount layers in this core, so the total is the subtotal.
    pub fn total(&self) -> CurrencyTotals {
        self.subtotal()
    }

    /// Per-currency remainder after recorded payments.
    ///
    /// Payments only reduce currencies the line items actually carry; a key
    /// exists iff at least one line item references the currency.
    pub fn amount_due(&self) -> CurrencyTotals {
        let mut due = self.total();
        for payment in &self.payments {
            due.subtract_existing(&payment.currency, Decimal::from(payment.amount));
        }
        due
    }

    /// Whether the given payment would settle every currency bucket.
    fn settles(&self, payment: &Payment) -> bool {
        let mut due = self.amount_due();
        due.subtract_existing(&payment.currency, Decimal::from(payment.amount));
        !due.is_empty() && due.all_zero()
    }

    /// Line items that purchase store credit.
    pub fn store_credit_lines(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|l| l.is_store_credit())
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub invoice_id: InvoiceId,
    pub account_id: AccountId,
    pub order_id: OrderId,
    /// Billing address snapshot, resolved by the caller at creation time.
    pub address: Address,
    /// Line items already re-owned to this invoice.
    pub line_items: Vec<LineItem>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApplyPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyPayment {
    pub invoice_id: InvoiceId,
    pub payment: Payment,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteInvoice (soft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInvoice {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    ApplyPayment(ApplyPayment),
    DeleteInvoice(DeleteInvoice),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub invoice_id: InvoiceId,
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub address: Address,
    pub line_items: Vec<LineItem>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentApplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentApplied {
    pub invoice_id: InvoiceId,
    pub payment: Payment,
    /// Whether this payment brought every currency bucket to zero.
    pub settled: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDeleted {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    PaymentApplied(PaymentApplied),
    InvoiceDeleted(InvoiceDeleted),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::PaymentApplied(_) => "invoicing.invoice.payment_applied",
            InvoiceEvent::InvoiceDeleted(_) => "invoicing.invoice.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::PaymentApplied(e) => e.occurred_at,
            InvoiceEvent::InvoiceDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = BillingError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.account_id = Some(e.account_id);
                self.order_id = Some(e.order_id);
                self.address = Some(e.address.clone());
                self.note = e.note.clone();
                self.line_items = e.line_items.clone();
                self.created = true;
            }
            InvoiceEvent::PaymentApplied(e) => {
                self.payments.push(e.payment.clone());
                self.attempted = true;
                self.attempt_count += 1;
                if e.settled {
                    self.paid = true;
                    self.closed = true;
                }
            }
            InvoiceEvent::InvoiceDeleted(e) => {
                self.deleted_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::ApplyPayment(cmd) => self.handle_apply_payment(cmd),
            InvoiceCommand::DeleteInvoice(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Invoice {
    fn ensure_live(&self) -> Result<(), BillingError> {
        if !self.created || self.is_deleted() {
            return Err(BillingError::not_found());
        }
        Ok(())
    }

    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), BillingError> {
        if self.id != invoice_id {
            return Err(BillingError::relationship("invoice_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, BillingError> {
        if self.created {
            return Err(BillingError::conflict("invoice already exists"));
        }
        if cmd.line_items.is_empty() {
            return Err(BillingError::state(
                "cannot create an invoice without line items",
            ));
        }
        for line in &cmd.line_items {
            if line.owner.kind != LineOwnerKind::Invoice || line.owner.id != cmd.invoice_id.0 {
                return Err(BillingError::relationship(
                    "line item is not owned by this invoice",
                ));
            }
        }

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            invoice_id: cmd.invoice_id,
            account_id: cmd.account_id,
            order_id: cmd.order_id,
            address: cmd.address.clone(),
            line_items: cmd.line_items.clone(),
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_apply_payment(&self, cmd: &ApplyPayment) -> Result<Vec<InvoiceEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_invoice_id(cmd.invoice_id)?;

        if cmd.payment.invoice_id != self.id {
            return Err(BillingError::relationship(
                "payment references a different invoice",
            ));
        }
        if self.line_items.is_empty() {
            return Err(BillingError::relationship("invoice has no line items"));
        }
        if !self.total().contains(&cmd.payment.currency) {
            return Err(BillingError::currency_mismatch(format!(
                "invoice carries no {} line items",
                cmd.payment.currency
            )));
        }

        Ok(vec![InvoiceEvent::PaymentApplied(PaymentApplied {
            invoice_id: cmd.invoice_id,
            settled: self.settles(&cmd.payment),
            payment: cmd.payment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteInvoice) -> Result<Vec<InvoiceEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_invoice_id(cmd.invoice_id)?;

        Ok(vec![InvoiceEvent::InvoiceDeleted(InvoiceDeleted {
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
