//! The billing engine: the application surface over the domain aggregates.
//!
//! Every operation runs the dispatch pipeline (rehydrate, decide, persist,
//! publish). Single-aggregate operations append to one stream; invoicing an
//! order and paying an invoice commit to two streams through one atomic
//! multi-stream append.

use rust_decimal::prelude::ToPrimitive;
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};

use blockbill_accounts::{
    Account, AccountCommand, AccountId, Address, AssignAddress, CreateAccount, DeleteAccount,
};
use blockbill_core::{Aggregate, AggregateId, BillingError, Clock, ExpectedVersion, RequestId};
use blockbill_credits::{
    BlockId, CreditPool, CreditPoolCommand, CreditPoolId, CreditSource, GenerateBlocks,
    RedeemBlocks,
};
use blockbill_events::{EventBus, EventEnvelope};
use blockbill_invoicing::{
    ApplyPayment, CreateInvoice, Invoice, InvoiceCommand, InvoiceEvent, InvoiceId, Payment,
    PaymentId, PaymentMethod,
};
use blockbill_ledger::{Currency, LineOwner, SkuRef};
use blockbill_orders::{
    AddLineItem, ApproveOrder, CreateOrder, DeleteOrder, MarkInvoiced, Order, OrderCommand,
    OrderId, RejectOrder, SubmitOrder,
};
use rust_decimal::Decimal;

use crate::config::BillingConfig;
use crate::dispatcher::{EngineError, publish_all, rehydrate, stage};
use crate::event_store::{EventStore, StreamAppend};
use crate::gateway::{ChargeGateway, ChargeRequest};

const ACCOUNT_TYPE: &str = "accounts.account";
const ORDER_TYPE: &str = "orders.order";
const INVOICE_TYPE: &str = "invoicing.invoice";
const CREDIT_POOL_TYPE: &str = "credits.pool";

/// How a caller asks an invoice to be settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequest {
    /// Redeem store-credit blocks; amount is the batch size, currency `blk`.
    Block { block_ids: Vec<BlockId> },
    /// Charge the external gateway before touching any local state.
    Charge {
        amount: i64,
        currency: Currency,
        token: String,
    },
    Check {
        amount: i64,
        currency: Currency,
        note: Option<String>,
    },
    Ach {
        amount: i64,
        currency: Currency,
        note: Option<String>,
    },
    Bank {
        amount: i64,
        currency: Currency,
        note: Option<String>,
    },
}

/// Event-sourced billing engine.
///
/// Composes the event store, the event bus, the charge gateway, an injectable
/// clock and the engine configuration. All operations are synchronous and
/// never retry; a failed operation leaves no partial state behind.
#[derive(Debug)]
pub struct BillingEngine<S, B, G, C> {
    store: S,
    bus: B,
    gateway: G,
    clock: C,
    config: BillingConfig,
}

impl<S, B, G, C> BillingEngine<S, B, G, C> {
    pub fn new(store: S, bus: B, gateway: G, clock: C, config: BillingConfig) -> Self {
        Self {
            store,
            bus,
            gateway,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B, G, C> BillingEngine<S, B, G, C>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    G: ChargeGateway,
    C: Clock,
{
    // ---- accounts ----

    #[instrument(skip(self))]
    pub fn create_account(
        &self,
        external_customer_id: Option<String>,
    ) -> Result<Account, EngineError> {
        let account_id = AccountId::new(AggregateId::new());
        self.execute_account(
            account_id,
            AccountCommand::CreateAccount(CreateAccount {
                account_id,
                external_customer_id,
                occurred_at: self.clock.now(),
            }),
        )
    }

    #[instrument(skip(self, address))]
    pub fn assign_address(
        &self,
        account_id: AccountId,
        address: Address,
    ) -> Result<Account, EngineError> {
        self.execute_account(
            account_id,
            AccountCommand::AssignAddress(AssignAddress {
                account_id,
                address,
                occurred_at: self.clock.now(),
            }),
        )
    }

    #[instrument(skip(self))]
    pub fn delete_account(&self, account_id: AccountId) -> Result<Account, EngineError> {
        self.execute_account(
            account_id,
            AccountCommand::DeleteAccount(DeleteAccount {
                account_id,
                occurred_at: self.clock.now(),
            }),
        )
    }

    pub fn load_account(&self, account_id: AccountId) -> Result<Account, EngineError> {
        let (account, _) = self.account_state(account_id)?;
        if !account.exists() {
            return Err(BillingError::not_found().into());
        }
        Ok(account)
    }

    // ---- orders ----

    #[instrument(skip(self, note))]
    pub fn create_order(
        &self,
        account_id: AccountId,
        request_id: Option<RequestId>,
        note: Option<String>,
    ) -> Result<Order, EngineError> {
        // Orders must belong to a live account.
        self.load_account(account_id)?;

        let order_id = OrderId::new(AggregateId::new());
        self.execute_order(
            order_id,
            OrderCommand::CreateOrder(CreateOrder {
                order_id,
                account_id,
                request_id,
                note,
                occurred_at: self.clock.now(),
            }),
        )
    }

    #[instrument(skip(self, sku, description))]
    pub fn add_order_line(
        &self,
        order_id: OrderId,
        amount: i64,
        currency: Currency,
        quantity: Decimal,
        sku: Option<SkuRef>,
        description: Option<String>,
    ) -> Result<Order, EngineError> {
        self.execute_order(
            order_id,
            OrderCommand::AddLineItem(AddLineItem {
                order_id,
                amount,
                currency,
                quantity,
                sku,
                description,
                occurred_at: self.clock.now(),
            }),
        )
    }

    #[instrument(skip(self))]
    pub fn submit_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.execute_order(
            order_id,
            OrderCommand::SubmitOrder(SubmitOrder {
                order_id,
                occurred_at: self.clock.now(),
            }),
        )
    }

    #[instrument(skip(self))]
    pub fn approve_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.execute_order(
            order_id,
            OrderCommand::ApproveOrder(ApproveOrder {
                order_id,
                occurred_at: self.clock.now(),
            }),
        )
    }

    #[instrument(skip(self))]
    pub fn reject_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.execute_order(
            order_id,
            OrderCommand::RejectOrder(RejectOrder {
                order_id,
                occurred_at: self.clock.now(),
            }),
        )
    }

    #[instrument(skip(self))]
    pub fn delete_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.execute_order(
            order_id,
            OrderCommand::DeleteOrder(DeleteOrder {
                order_id,
                occurred_at: self.clock.now(),
            }),
        )
    }

    pub fn load_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let (order, _) = self.order_state(order_id)?;
        if !order.exists() {
            return Err(BillingError::not_found().into());
        }
        Ok(order)
    }

    // ---- invoicing ----

    /// Turn an approved order into an invoice.
    ///
    /// Copies the order's line items onto the invoice, snapshots the account's
    /// billing address, links both aggregates and commits their streams in one
    /// atomic append.
    #[instrument(skip(self))]
    pub fn generate_invoice(&self, order_id: OrderId) -> Result<(Order, Invoice), EngineError> {
        let now = self.clock.now();

        let (mut order, order_expected) = self.order_state(order_id)?;
        if !order.exists() {
            return Err(BillingError::not_found().into());
        }
        let account_id = order
            .account_id()
            .ok_or_else(|| BillingError::relationship("order has no account"))?;
        let account = self.load_account(account_id)?;
        let address = account
            .address()
            .cloned()
            .ok_or_else(|| BillingError::state("account has no billing address"))?;

        let invoice_id = InvoiceId::new(AggregateId::new());

        // Decide the order transition first; it enforces the Approved state
        // and the non-empty line item requirement.
        let order_events = order
            .handle(&OrderCommand::MarkInvoiced(MarkInvoiced {
                order_id,
                invoice_id: invoice_id.0,
                occurred_at: now,
            }))
            .map_err(EngineError::from)?;

        let lines = order
            .line_items()
            .map_err(EngineError::from)?
            .iter()
            .map(|l| l.reowned(LineOwner::invoice(invoice_id.0)))
            .collect::<Vec<_>>();

        let mut invoice = Invoice::empty(invoice_id);
        let invoice_events = invoice
            .handle(&InvoiceCommand::CreateInvoice(CreateInvoice {
                invoice_id,
                account_id,
                order_id,
                address,
                line_items: lines,
                note: order.note().map(str::to_string),
                occurred_at: now,
            }))
            .map_err(EngineError::from)?;

        let committed = self.store.append_multi(vec![
            StreamAppend::new(stage(order_id.0, ORDER_TYPE, &order_events)?, order_expected),
            StreamAppend::new(
                stage(invoice_id.0, INVOICE_TYPE, &invoice_events)?,
                ExpectedVersion::Exact(0),
            ),
        ])?;
        publish_all(&self.bus, &committed)?;

        for e in &order_events {
            order.apply(e);
        }
        for e in &invoice_events {
            invoice.apply(e);
        }

        info!(%order_id, %invoice_id, "invoice generated");
        Ok((order, invoice))
    }

    pub fn load_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, EngineError> {
        let (invoice, _) = self.invoice_state(invoice_id)?;
        if !invoice.exists() {
            return Err(BillingError::not_found().into());
        }
        Ok(invoice)
    }

    // ---- payments ----

    /// Settle (part of) an invoice.
    ///
    /// The gateway is consulted before any local mutation, so a decline leaves
    /// no payment row and no block changes. Invoice and credit-pool streams
    /// commit through one atomic append; on full settlement, credit-purchase
    /// line items mint fresh blocks in the same commit.
    #[instrument(skip(self, request), fields(method = request_method(&request)))]
    pub fn pay_invoice(
        &self,
        invoice_id: InvoiceId,
        request: PaymentRequest,
    ) -> Result<(Invoice, Payment), EngineError> {
        let now = self.clock.now();

        let (mut invoice, invoice_expected) = self.invoice_state(invoice_id)?;
        if !invoice.exists() {
            return Err(BillingError::not_found().into());
        }
        if invoice.is_paid() {
            return Err(BillingError::state("invoice is already paid").into());
        }
        let account_id = invoice
            .account_id()
            .ok_or_else(|| BillingError::relationship("invoice has no account"))?;

        let pool_id = CreditPoolId::for_account(account_id);
        let (pool, pool_expected) = self.pool_state(pool_id)?;

        let payment_id = PaymentId::new(AggregateId::new());
        let mut pool_events = Vec::new();

        let payment = match request {
            PaymentRequest::Block { block_ids } => {
                let payment = Payment::new(
                    payment_id,
                    invoice_id,
                    PaymentMethod::Block,
                    block_ids.len() as i64,
                    Currency::blocks(),
                );
                let events = pool
                    .handle(&CreditPoolCommand::RedeemBlocks(RedeemBlocks {
                        pool_id,
                        block_ids,
                        payment_id,
                        payment_amount: payment.amount,
                        now,
                        ttl_days: self.config.blocks_days_alive,
                    }))
                    .map_err(EngineError::from)?;
                pool_events.extend(events);
                payment
            }
            PaymentRequest::Charge {
                amount,
                currency,
                token,
            } => {
                let receipt = self
                    .gateway
                    .charge(&ChargeRequest {
                        amount,
                        currency: currency.clone(),
                        token,
                    })
                    .map_err(|reason| {
                        warn!(%invoice_id, %reason, "gateway declined charge");
                        BillingError::declined(reason)
                    })?;
                Payment::new(payment_id, invoice_id, PaymentMethod::Charge, amount, currency)
                    .with_charge(receipt.charge_id, receipt.gateway)
            }
            PaymentRequest::Check {
                amount,
                currency,
                note,
            } => Payment::new(payment_id, invoice_id, PaymentMethod::Check, amount, currency)
                .with_note(note),
            PaymentRequest::Ach {
                amount,
                currency,
                note,
            } => Payment::new(payment_id, invoice_id, PaymentMethod::Ach, amount, currency)
                .with_note(note),
            PaymentRequest::Bank {
                amount,
                currency,
                note,
            } => Payment::new(payment_id, invoice_id, PaymentMethod::Bank, amount, currency)
                .with_note(note),
        };

        let invoice_events = invoice
            .handle(&InvoiceCommand::ApplyPayment(ApplyPayment {
                invoice_id,
                payment: payment.clone(),
                occurred_at: now,
            }))
            .map_err(EngineError::from)?;

        let settled = invoice_events
            .iter()
            .any(|e| matches!(e, InvoiceEvent::PaymentApplied(p) if p.settled));

        // Full settlement of credit-purchase line items mints blocks in the
        // same commit as the payment.
        if settled {
            let block_ids = credit_purchase_block_ids(&invoice)?;
            if !block_ids.is_empty() {
                let mut pool_after = pool.clone();
                for e in &pool_events {
                    pool_after.apply(e);
                }
                let events = pool_after
                    .handle(&CreditPoolCommand::GenerateBlocks(GenerateBlocks {
                        pool_id,
                        block_ids,
                        source: CreditSource::invoice(invoice_id),
                        occurred_at: now,
                    }))
                    .map_err(EngineError::from)?;
                pool_events.extend(events);
            }
        }

        let mut appends = vec![StreamAppend::new(
            stage(invoice_id.0, INVOICE_TYPE, &invoice_events)?,
            invoice_expected,
        )];
        if !pool_events.is_empty() {
            appends.push(StreamAppend::new(
                stage(account_id.0, CREDIT_POOL_TYPE, &pool_events)?,
                pool_expected,
            ));
        }

        let committed = self.store.append_multi(appends)?;
        publish_all(&self.bus, &committed)?;

        for e in &invoice_events {
            invoice.apply(e);
        }

        info!(
            %invoice_id,
            payment_id = %payment.id,
            method = payment.method.as_str(),
            amount = payment.amount,
            currency = %payment.currency,
            settled,
            "payment applied"
        );
        Ok((invoice, payment))
    }

    // ---- credits ----

    /// Administrative block issuance.
    #[instrument(skip(self, source))]
    pub fn grant_blocks(
        &self,
        account_id: AccountId,
        count: u64,
        source: CreditSource,
    ) -> Result<CreditPool, EngineError> {
        self.load_account(account_id)?;
        if count == 0 {
            return Err(BillingError::validation("cannot grant zero blocks").into());
        }

        let pool_id = CreditPoolId::for_account(account_id);
        let (mut pool, expected) = self.pool_state(pool_id)?;
        let block_ids = (0..count)
            .map(|_| BlockId::new(AggregateId::new()))
            .collect();

        let events = pool
            .handle(&CreditPoolCommand::GenerateBlocks(GenerateBlocks {
                pool_id,
                block_ids,
                source,
                occurred_at: self.clock.now(),
            }))
            .map_err(EngineError::from)?;

        let staged = stage(account_id.0, CREDIT_POOL_TYPE, &events)?;
        let committed = self.store.append(staged, expected)?;
        publish_all(&self.bus, &committed)?;

        for e in &events {
            pool.apply(e);
        }
        info!(%account_id, count, "blocks granted");
        Ok(pool)
    }

    pub fn load_credit_pool(&self, account_id: AccountId) -> Result<CreditPool, EngineError> {
        self.load_account(account_id)?;
        let (pool, _) = self.pool_state(CreditPoolId::for_account(account_id))?;
        Ok(pool)
    }

    // ---- pipeline plumbing ----

    fn execute_account(
        &self,
        account_id: AccountId,
        command: AccountCommand,
    ) -> Result<Account, EngineError> {
        let (account, expected) = self.account_state(account_id)?;
        self.commit_one(account, expected, ACCOUNT_TYPE, account_id.0, command)
    }

    fn execute_order(&self, order_id: OrderId, command: OrderCommand) -> Result<Order, EngineError> {
        let (order, expected) = self.order_state(order_id)?;
        self.commit_one(order, expected, ORDER_TYPE, order_id.0, command)
    }

    /// Decide, persist and publish for a single aggregate stream.
    fn commit_one<A>(
        &self,
        mut aggregate: A,
        expected: ExpectedVersion,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        command: A::Command,
    ) -> Result<A, EngineError>
    where
        A: Aggregate<Error = BillingError>,
        A::Event: blockbill_events::Event + serde::Serialize,
    {
        let events = aggregate.handle(&command).map_err(EngineError::from)?;
        if events.is_empty() {
            return Ok(aggregate);
        }

        let staged = stage(aggregate_id, aggregate_type, &events)?;
        let committed = self.store.append(staged, expected)?;
        publish_all(&self.bus, &committed)?;

        for e in &events {
            aggregate.apply(e);
        }
        Ok(aggregate)
    }

    fn account_state(
        &self,
        account_id: AccountId,
    ) -> Result<(Account, ExpectedVersion), EngineError> {
        rehydrate(&self.store, ACCOUNT_TYPE, account_id.0, |id| {
            Account::empty(AccountId::new(id))
        })
    }

    fn order_state(&self, order_id: OrderId) -> Result<(Order, ExpectedVersion), EngineError> {
        rehydrate(&self.store, ORDER_TYPE, order_id.0, |id| {
            Order::empty(OrderId::new(id))
        })
    }

    fn invoice_state(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<(Invoice, ExpectedVersion), EngineError> {
        rehydrate(&self.store, INVOICE_TYPE, invoice_id.0, |id| {
            Invoice::empty(InvoiceId::new(id))
        })
    }

    fn pool_state(
        &self,
        pool_id: CreditPoolId,
    ) -> Result<(CreditPool, ExpectedVersion), EngineError> {
        rehydrate(&self.store, CREDIT_POOL_TYPE, pool_id.account_id().0, |id| {
            CreditPool::empty(CreditPoolId::for_account(AccountId::new(id)))
        })
    }
}

/// Fresh block ids for every credit-purchase line item of a settled invoice.
///
/// Each store-credit line mints `quantity` blocks; quantities must be whole
/// numbers since blocks are indivisible.
fn credit_purchase_block_ids(invoice: &Invoice) -> Result<Vec<BlockId>, EngineError> {
    let mut ids = Vec::new();
    for line in invoice.store_credit_lines() {
        if !line.quantity.fract().is_zero() {
            return Err(BillingError::validation(
                "credit purchase quantity must be a whole number",
            )
            .into());
        }
        let count = line
            .quantity
            .to_u64()
            .ok_or_else(|| BillingError::validation("credit purchase quantity out of range"))?;
        ids.extend((0..count).map(|_| BlockId::new(AggregateId::new())));
    }
    Ok(ids)
}

fn request_method(request: &PaymentRequest) -> &'static str {
    match request {
        PaymentRequest::Block { .. } => "block",
        PaymentRequest::Charge { .. } => "charge",
        PaymentRequest::Check { .. } => "check",
        PaymentRequest::Ach { .. } => "ach",
        PaymentRequest::Bank { .. } => "bank",
    }
}
