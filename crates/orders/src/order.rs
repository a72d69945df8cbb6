use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use blockbill_accounts::AccountId;
use blockbill_core::{Aggregate, AggregateId, AggregateRoot, BillingError, RequestId};
use blockbill_events::Event;
use blockbill_ledger::{Currency, LineItem, LineOwner, SkuRef};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order lifecycle.
///
/// `Draft(0) → Pending(1) → {Rejected(2), Approved(3)} → Partial(4) →
/// Invoiced(5)`. The soft-delete marker is orthogonal to state. `Partial`
/// (partially invoiced) is carried as a data shape; no transition in this core
/// produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Draft,
    Pending,
    Rejected,
    Approved,
    Partial,
    Invoiced,
}

impl OrderState {
    /// Stable numeric code (wire/storage compatibility).
    pub fn code(self) -> u8 {
        match self {
            OrderState::Draft => 0,
            OrderState::Pending => 1,
            OrderState::Rejected => 2,
            OrderState::Approved => 3,
            OrderState::Partial => 4,
            OrderState::Invoiced => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::Draft => "draft",
            OrderState::Pending => "pending",
            OrderState::Rejected => "rejected",
            OrderState::Approved => "approved",
            OrderState::Partial => "partial",
            OrderState::Invoiced => "invoiced",
        }
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    account_id: Option<AccountId>,
    request_id: Option<RequestId>,
    state: OrderState,
    note: Option<String>,
    line_items: Vec<LineItem>,
    invoice_id: Option<AggregateId>,
    deleted_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            account_id: None,
            request_id: None,
            state: OrderState::Draft,
            note: None,
            line_items: Vec::new(),
            invoice_id: None,
            deleted_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn invoice_id(&self) -> Option<AggregateId> {
        self.invoice_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn exists(&self) -> bool {
        self.created && !self.is_deleted()
    }

    /// Externally visible line items.
    ///
    /// Draft orders have no externally visible accounting; reading their line
    /// items is a `State` error.
    pub fn line_items(&self) -> Result<&[LineItem], BillingError> {
        if self.state == OrderState::Draft {
            return Err(BillingError::state(
                "draft orders have no externally visible line items",
            ));
        }
        Ok(&self.line_items)
    }

    pub fn has_line_items(&self) -> bool {
        !self.line_items.is_empty()
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.state, OrderState::Draft | OrderState::Pending)
    }

    pub fn is_invoice_allowed(&self) -> bool {
        matches!(self.state, OrderState::Approved)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub request_id: Option<RequestId>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItem {
    pub order_id: OrderId,
    /// Unit amount in minor currency units (e.g. cents).
    pub amount: i64,
    pub currency: Currency,
    pub quantity: Decimal,
    pub sku: Option<SkuRef>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitOrder (Draft → Pending).
///
/// The driving workflow lives outside this core; the transition is exposed
/// publicly regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkInvoiced {
    pub order_id: OrderId,
    pub invoice_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteOrder (soft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOrder {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    CreateOrder(CreateOrder),
    AddLineItem(AddLineItem),
    SubmitOrder(SubmitOrder),
    ApproveOrder(ApproveOrder),
    RejectOrder(RejectOrder),
    MarkInvoiced(MarkInvoiced),
    DeleteOrder(DeleteOrder),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub request_id: Option<RequestId>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineAdded {
    pub order_id: OrderId,
    pub line: LineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderApproved {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInvoiced {
    pub order_id: OrderId,
    pub invoice_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeleted {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    OrderLineAdded(OrderLineAdded),
    OrderSubmitted(OrderSubmitted),
    OrderApproved(OrderApproved),
    OrderRejected(OrderRejected),
    OrderInvoiced(OrderInvoiced),
    OrderDeleted(OrderDeleted),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "orders.order.created",
            OrderEvent::OrderLineAdded(_) => "orders.order.line_added",
            OrderEvent::OrderSubmitted(_) => "orders.order.submitted",
            OrderEvent::OrderApproved(_) => "orders.order.approved",
            OrderEvent::OrderRejected(_) => "orders.order.rejected",
            OrderEvent::OrderInvoiced(_) => "orders.order.invoiced",
            OrderEvent::OrderDeleted(_) => "orders.order.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderCreated(e) => e.occurred_at,
            OrderEvent::OrderLineAdded(e) => e.occurred_at,
            OrderEvent::OrderSubmitted(e) => e.occurred_at,
            OrderEvent::OrderApproved(e) => e.occurred_at,
            OrderEvent::OrderRejected(e) => e.occurred_at,
            OrderEvent::OrderInvoiced(e) => e.occurred_at,
            OrderEvent::OrderDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = BillingError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.account_id = Some(e.account_id);
                self.request_id = e.request_id;
                self.note = e.note.clone();
                self.state = OrderState::Draft;
                self.line_items.clear();
                self.created = true;
            }
            OrderEvent::OrderLineAdded(e) => {
                self.line_items.push(e.line.clone());
            }
            OrderEvent::OrderSubmitted(_) => {
                self.state = OrderState::Pending;
            }
            OrderEvent::OrderApproved(_) => {
                self.state = OrderState::Approved;
            }
            OrderEvent::OrderRejected(_) => {
                self.state = OrderState::Rejected;
            }
            OrderEvent::OrderInvoiced(e) => {
                self.state = OrderState::Invoiced;
                self.invoice_id = Some(e.invoice_id);
            }
            OrderEvent::OrderDeleted(e) => {
                self.deleted_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CreateOrder(cmd) => self.handle_create(cmd),
            OrderCommand::AddLineItem(cmd) => self.handle_add_line(cmd),
            OrderCommand::SubmitOrder(cmd) => self.handle_submit(cmd),
            OrderCommand::ApproveOrder(cmd) => self.handle_approve(cmd),
            OrderCommand::RejectOrder(cmd) => self.handle_reject(cmd),
            OrderCommand::MarkInvoiced(cmd) => self.handle_mark_invoiced(cmd),
            OrderCommand::DeleteOrder(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Order {
    fn ensure_live(&self) -> Result<(), BillingError> {
        // Soft-deleted orders are indistinguishable from absent ones.
        if !self.created || self.is_deleted() {
            return Err(BillingError::not_found());
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), BillingError> {
        if self.id != order_id {
            return Err(BillingError::relationship("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateOrder) -> Result<Vec<OrderEvent>, BillingError> {
        if self.created {
            return Err(BillingError::conflict("order already exists"));
        }

        Ok(vec![OrderEvent::OrderCreated(OrderCreated {
            order_id: cmd.order_id,
            account_id: cmd.account_id,
            request_id: cmd.request_id,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLineItem) -> Result<Vec<OrderEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_order_id(cmd.order_id)?;

        if !self.is_modifiable() {
            return Err(BillingError::state(format!(
                "cannot add line items to a {} order",
                self.state.as_str()
            )));
        }

        let line = LineItem::new(
            LineOwner::order(cmd.order_id.0),
            cmd.amount,
            cmd.currency.clone(),
            cmd.quantity,
            cmd.sku,
            cmd.description.clone(),
        )?;

        Ok(vec![OrderEvent::OrderLineAdded(OrderLineAdded {
            order_id: cmd.order_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitOrder) -> Result<Vec<OrderEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.state != OrderState::Draft {
            return Err(BillingError::state(format!(
                "only draft orders can be submitted (order is {})",
                self.state.as_str()
            )));
        }

        Ok(vec![OrderEvent::OrderSubmitted(OrderSubmitted {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveOrder) -> Result<Vec<OrderEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_order_id(cmd.order_id)?;

        // Allowed from Pending or Rejected. Approval is not idempotent:
        // re-approving an approved or invoiced order is a state error.
        if !matches!(self.state, OrderState::Pending | OrderState::Rejected) {
            return Err(BillingError::state(format!(
                "cannot approve a {} order",
                self.state.as_str()
            )));
        }

        Ok(vec![OrderEvent::OrderApproved(OrderApproved {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectOrder) -> Result<Vec<OrderEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_order_id(cmd.order_id)?;

        if self.state != OrderState::Pending {
            return Err(BillingError::state(format!(
                "only pending orders can be rejected (order is {})",
                self.state.as_str()
            )));
        }

        Ok(vec![OrderEvent::OrderRejected(OrderRejected {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_invoiced(&self, cmd: &MarkInvoiced) -> Result<Vec<OrderEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_order_id(cmd.order_id)?;

        if !self.is_invoice_allowed() {
            return Err(BillingError::state(format!(
                "cannot invoice a {} order",
                self.state.as_str()
            )));
        }

        if self.line_items.is_empty() {
            return Err(BillingError::state(
                "cannot invoice an order without line items",
            ));
        }

        Ok(vec![OrderEvent::OrderInvoiced(OrderInvoiced {
            order_id: cmd.order_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteOrder) -> Result<Vec<OrderEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_order_id(cmd.order_id)?;

        Ok(vec![OrderEvent::OrderDeleted(OrderDeleted {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_account_id() -> AccountId {
        AccountId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn usd() -> Currency {
        Currency::new("usd").unwrap()
    }

    fn drive(order: &mut Order, cmd: OrderCommand) {
        let events = order.handle(&cmd).unwrap();
        for e in &events {
            order.apply(e);
        }
    }

    fn draft_order(order_id: OrderId) -> Order {
        let mut order = Order::empty(order_id);
        drive(
            &mut order,
            OrderCommand::CreateOrder(CreateOrder {
                order_id,
                account_id: test_account_id(),
                request_id: None,
                note: None,
                occurred_at: test_time(),
            }),
        );
        order
    }

    fn add_line(order: &mut Order) {
        let cmd = AddLineItem {
            order_id: order.id_typed(),
            amount: 3000,
            currency: usd(),
            quantity: dec!(3),
            sku: None,
            description: None,
            occurred_at: test_time(),
        };
        drive(order, OrderCommand::AddLineItem(cmd));
    }

    fn pending_order(order_id: OrderId) -> Order {
        let mut order = draft_order(order_id);
        add_line(&mut order);
        drive(
            &mut order,
            OrderCommand::SubmitOrder(SubmitOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        order
    }

    fn approved_order(order_id: OrderId) -> Order {
        let mut order = pending_order(order_id);
        drive(
            &mut order,
            OrderCommand::ApproveOrder(ApproveOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        order
    }

    #[test]
    fn create_order_starts_in_draft() {
        let order_id = test_order_id();
        let order = draft_order(order_id);
        assert_eq!(order.state(), OrderState::Draft);
        assert_eq!(order.state().code(), 0);
        assert!(order.exists());
    }

    #[test]
    fn draft_line_items_are_not_externally_visible() {
        let order_id = test_order_id();
        let mut order = draft_order(order_id);
        add_line(&mut order);

        let err = order.line_items().unwrap_err();
        assert!(matches!(err, BillingError::State(_)));

        // Visible once submitted.
        drive(
            &mut order,
            OrderCommand::SubmitOrder(SubmitOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(order.line_items().unwrap().len(), 1);
    }

    #[test]
    fn approve_from_pending_and_from_rejected() {
        let order_id = test_order_id();
        let order = pending_order(order_id);
        let events = order
            .handle(&OrderCommand::ApproveOrder(ApproveOrder {
                order_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(matches!(events[0], OrderEvent::OrderApproved(_)));

        // Rejected orders may be re-approved.
        let mut order = pending_order(order_id);
        drive(
            &mut order,
            OrderCommand::RejectOrder(RejectOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(order.state(), OrderState::Rejected);
        drive(
            &mut order,
            OrderCommand::ApproveOrder(ApproveOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert_eq!(order.state(), OrderState::Approved);
    }

    #[test]
    fn approve_fails_from_draft_approved_and_invoiced() {
        let order_id = test_order_id();
        let approve = OrderCommand::ApproveOrder(ApproveOrder {
            order_id,
            occurred_at: test_time(),
        });

        let order = draft_order(order_id);
        assert!(matches!(
            order.handle(&approve).unwrap_err(),
            BillingError::State(_)
        ));

        let order = approved_order(order_id);
        assert!(matches!(
            order.handle(&approve).unwrap_err(),
            BillingError::State(_)
        ));

        let mut order = approved_order(order_id);
        drive(
            &mut order,
            OrderCommand::MarkInvoiced(MarkInvoiced {
                order_id,
                invoice_id: AggregateId::new(),
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(
            order.handle(&approve).unwrap_err(),
            BillingError::State(_)
        ));
    }

    #[test]
    fn reject_is_only_allowed_from_pending() {
        let order_id = test_order_id();
        let reject = OrderCommand::RejectOrder(RejectOrder {
            order_id,
            occurred_at: test_time(),
        });

        let order = draft_order(order_id);
        assert!(matches!(
            order.handle(&reject).unwrap_err(),
            BillingError::State(_)
        ));

        let order = approved_order(order_id);
        assert!(matches!(
            order.handle(&reject).unwrap_err(),
            BillingError::State(_)
        ));

        let order = pending_order(order_id);
        assert!(order.handle(&reject).is_ok());
    }

    #[test]
    fn mark_invoiced_requires_approved_state_and_lines() {
        let order_id = test_order_id();
        let invoice = OrderCommand::MarkInvoiced(MarkInvoiced {
            order_id,
            invoice_id: AggregateId::new(),
            occurred_at: test_time(),
        });

        // Not approved yet.
        let order = pending_order(order_id);
        assert!(matches!(
            order.handle(&invoice).unwrap_err(),
            BillingError::State(_)
        ));

        // Approved without lines.
        let mut order = draft_order(order_id);
        drive(
            &mut order,
            OrderCommand::SubmitOrder(SubmitOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        drive(
            &mut order,
            OrderCommand::ApproveOrder(ApproveOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert!(matches!(
            order.handle(&invoice).unwrap_err(),
            BillingError::State(_)
        ));

        // Approved with lines.
        let mut order = approved_order(order_id);
        drive(&mut order, invoice.clone());
        assert_eq!(order.state(), OrderState::Invoiced);
        assert!(order.invoice_id().is_some());

        // Re-invoicing an invoiced order fails.
        assert!(matches!(
            order.handle(&invoice).unwrap_err(),
            BillingError::State(_)
        ));
    }

    #[test]
    fn line_items_are_frozen_after_approval() {
        let order_id = test_order_id();
        let order = approved_order(order_id);
        let err = order
            .handle(&OrderCommand::AddLineItem(AddLineItem {
                order_id,
                amount: 100,
                currency: usd(),
                quantity: dec!(1),
                sku: None,
                description: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, BillingError::State(_)));
    }

    #[test]
    fn deleted_order_reads_as_not_found() {
        let order_id = test_order_id();
        let mut order = pending_order(order_id);
        drive(
            &mut order,
            OrderCommand::DeleteOrder(DeleteOrder {
                order_id,
                occurred_at: test_time(),
            }),
        );
        assert!(order.is_deleted());

        let err = order
            .handle(&OrderCommand::ApproveOrder(ApproveOrder {
                order_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, BillingError::NotFound);
    }

    #[test]
    fn state_codes_follow_the_lifecycle_numbering() {
        assert_eq!(OrderState::Draft.code(), 0);
        assert_eq!(OrderState::Pending.code(), 1);
        assert_eq!(OrderState::Rejected.code(), 2);
        assert_eq!(OrderState::Approved.code(), 3);
        assert_eq!(OrderState::Partial.code(), 4);
        assert_eq!(OrderState::Invoiced.code(), 5);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order_id = test_order_id();
        let order = pending_order(order_id);
        let version_before = order.version();
        let state_before = order.state();

        let approve = OrderCommand::ApproveOrder(ApproveOrder {
            order_id,
            occurred_at: test_time(),
        });
        let events1 = order.handle(&approve).unwrap();
        let events2 = order.handle(&approve).unwrap();

        assert_eq!(order.version(), version_before);
        assert_eq!(order.state(), state_before);
        assert_eq!(events1, events2);
    }
}
