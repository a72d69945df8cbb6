use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use blockbill_accounts::AccountId;
use blockbill_core::{Aggregate, AggregateId, AggregateRoot, BillingError};
use blockbill_events::Event;
use blockbill_invoicing::{InvoiceId, PaymentId};

/// Block identifier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(pub AggregateId);

impl BlockId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BlockId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Credit pool identifier.
///
/// Exactly one pool per account; the pool stream reuses the account's id and
/// is distinguished from the account stream by aggregate type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditPoolId(pub AccountId);

impl CreditPoolId {
    pub fn for_account(account_id: AccountId) -> Self {
        Self(account_id)
    }

    pub fn account_id(&self) -> AccountId {
        self.0
    }
}

impl core::fmt::Display for CreditPoolId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0.0, f)
    }
}

/// What minted a batch of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditSourceKind {
    /// Settled credit-purchase invoice.
    Invoice,
    /// Administrative issuance.
    Admin,
}

/// Provenance reference stamped onto every block at mint time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSource {
    pub kind: CreditSourceKind,
    pub id: AggregateId,
}

impl CreditSource {
    pub fn invoice(invoice_id: InvoiceId) -> Self {
        Self {
            kind: CreditSourceKind::Invoice,
            id: invoice_id.0,
        }
    }

    pub fn admin(reference: AggregateId) -> Self {
        Self {
            kind: CreditSourceKind::Admin,
            id: reference,
        }
    }
}

/// One indivisible unit of `blk` store credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub generated_by: CreditSource,
    pub created_at: DateTime<Utc>,
    /// Set when an operator voids the block outside of payment.
    pub exhausted_at: Option<DateTime<Utc>>,
    /// Set once, by redemption. A spent block never becomes spendable again.
    pub payment_id: Option<PaymentId>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Block {
    pub fn minted(id: BlockId, generated_by: CreditSource, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            generated_by,
            created_at,
            exhausted_at: None,
            payment_id: None,
            deleted_at: None,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.payment_id.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted_at.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_days: i64) -> bool {
        now - self.created_at > Duration::days(ttl_days)
    }

    /// Spendable: not deleted, not exhausted, not spent, within TTL.
    pub fn is_available(&self, now: DateTime<Utc>, ttl_days: i64) -> bool {
        !self.is_deleted()
            && !self.is_exhausted()
            && !self.is_spent()
            && !self.is_expired(now, ttl_days)
    }
}

/// Aggregate root: per-account credit pool.
///
/// The pool needs no creation command; an account's pool is the (possibly
/// empty) set of blocks minted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditPool {
    id: CreditPoolId,
    blocks: BTreeMap<BlockId, Block>,
    version: u64,
}

impl CreditPool {
    /// Create an empty pool instance for rehydration.
    pub fn empty(id: CreditPoolId) -> Self {
        Self {
            id,
            blocks: BTreeMap::new(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> CreditPoolId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.id.0
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of spendable blocks at `now`.
    pub fn available_count(&self, now: DateTime<Utc>, ttl_days: i64) -> usize {
        self.blocks
            .values()
            .filter(|b| b.is_available(now, ttl_days))
            .count()
    }
}

impl AggregateRoot for CreditPool {
    type Id = CreditPoolId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: GenerateBlocks (batch mint with caller-supplied ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateBlocks {
    pub pool_id: CreditPoolId,
    pub block_ids: Vec<BlockId>,
    pub source: CreditSource,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RedeemBlocks (all-or-nothing batch spend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemBlocks {
    pub pool_id: CreditPoolId,
    pub block_ids: Vec<BlockId>,
    pub payment_id: PaymentId,
    /// Payment amount in blocks; must equal `block_ids.len()`.
    pub payment_amount: i64,
    pub now: DateTime<Utc>,
    pub ttl_days: i64,
}

/// Command: ExhaustBlock (operator void outside of payment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhaustBlock {
    pub pool_id: CreditPoolId,
    pub block_id: BlockId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteBlock (soft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBlock {
    pub pool_id: CreditPoolId,
    pub block_id: BlockId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditPoolCommand {
    GenerateBlocks(GenerateBlocks),
    RedeemBlocks(RedeemBlocks),
    ExhaustBlock(ExhaustBlock),
    DeleteBlock(DeleteBlock),
}

/// Event: BlocksGenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksGenerated {
    pub pool_id: CreditPoolId,
    pub block_ids: Vec<BlockId>,
    pub source: CreditSource,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BlocksRedeemed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksRedeemed {
    pub pool_id: CreditPoolId,
    pub block_ids: Vec<BlockId>,
    pub payment_id: PaymentId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BlockExhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockExhausted {
    pub pool_id: CreditPoolId,
    pub block_id: BlockId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BlockDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDeleted {
    pub pool_id: CreditPoolId,
    pub block_id: BlockId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditPoolEvent {
    BlocksGenerated(BlocksGenerated),
    BlocksRedeemed(BlocksRedeemed),
    BlockExhausted(BlockExhausted),
    BlockDeleted(BlockDeleted),
}

impl Event for CreditPoolEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CreditPoolEvent::BlocksGenerated(_) => "credits.pool.blocks_generated",
            CreditPoolEvent::BlocksRedeemed(_) => "credits.pool.blocks_redeemed",
            CreditPoolEvent::BlockExhausted(_) => "credits.pool.block_exhausted",
            CreditPoolEvent::BlockDeleted(_) => "credits.pool.block_deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CreditPoolEvent::BlocksGenerated(e) => e.occurred_at,
            CreditPoolEvent::BlocksRedeemed(e) => e.occurred_at,
            CreditPoolEvent::BlockExhausted(e) => e.occurred_at,
            CreditPoolEvent::BlockDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for CreditPool {
    type Command = CreditPoolCommand;
    type Event = CreditPoolEvent;
    type Error = BillingError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CreditPoolEvent::BlocksGenerated(e) => {
                for id in &e.block_ids {
                    self.blocks
                        .insert(*id, Block::minted(*id, e.source, e.occurred_at));
                }
            }
            CreditPoolEvent::BlocksRedeemed(e) => {
                for id in &e.block_ids {
                    if let Some(block) = self.blocks.get_mut(id) {
                        block.payment_id = Some(e.payment_id);
                    }
                }
            }
            CreditPoolEvent::BlockExhausted(e) => {
                if let Some(block) = self.blocks.get_mut(&e.block_id) {
                    block.exhausted_at = Some(e.occurred_at);
                }
            }
            CreditPoolEvent::BlockDeleted(e) => {
                if let Some(block) = self.blocks.get_mut(&e.block_id) {
                    block.deleted_at = Some(e.occurred_at);
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CreditPoolCommand::GenerateBlocks(cmd) => self.handle_generate(cmd),
            CreditPoolCommand::RedeemBlocks(cmd) => self.handle_redeem(cmd),
            CreditPoolCommand::ExhaustBlock(cmd) => self.handle_exhaust(cmd),
            CreditPoolCommand::DeleteBlock(cmd) => self.handle_delete(cmd),
        }
    }
}

impl CreditPool {
    fn ensure_pool_id(&self, pool_id: CreditPoolId) -> Result<(), BillingError> {
        if self.id != pool_id {
            return Err(BillingError::relationship("pool_id mismatch"));
        }
        Ok(())
    }

    fn ensure_no_duplicates(block_ids: &[BlockId]) -> Result<(), BillingError> {
        let mut seen = std::collections::BTreeSet::new();
        for id in block_ids {
            if !seen.insert(*id) {
                return Err(BillingError::validation(format!(
                    "duplicate block id {id} in batch"
                )));
            }
        }
        Ok(())
    }

    fn handle_generate(&self, cmd: &GenerateBlocks) -> Result<Vec<CreditPoolEvent>, BillingError> {
        self.ensure_pool_id(cmd.pool_id)?;

        if cmd.block_ids.is_empty() {
            return Err(BillingError::validation("cannot mint an empty batch"));
        }
        Self::ensure_no_duplicates(&cmd.block_ids)?;
        for id in &cmd.block_ids {
            if self.blocks.contains_key(id) {
                return Err(BillingError::validation(format!(
                    "block {id} already exists in pool"
                )));
            }
        }

        Ok(vec![CreditPoolEvent::BlocksGenerated(BlocksGenerated {
            pool_id: cmd.pool_id,
            block_ids: cmd.block_ids.clone(),
            source: cmd.source,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_redeem(&self, cmd: &RedeemBlocks) -> Result<Vec<CreditPoolEvent>, BillingError> {
        self.ensure_pool_id(cmd.pool_id)?;

        // One block settles exactly one unit of blk.
        let actual = cmd.block_ids.len() as u64;
        if cmd.payment_amount < 0 || actual != cmd.payment_amount as u64 {
            return Err(BillingError::BlockCountMismatch {
                expected: cmd.payment_amount.max(0) as u64,
                actual,
            });
        }
        if cmd.block_ids.is_empty() {
            return Err(BillingError::validation("cannot redeem an empty batch"));
        }
        Self::ensure_no_duplicates(&cmd.block_ids)?;

        // Validate the whole batch before emitting anything; any failure
        // leaves every block untouched.
        for id in &cmd.block_ids {
            let block = match self.blocks.get(id) {
                Some(b) if !b.is_deleted() => b,
                _ => {
                    return Err(BillingError::block_ownership(format!(
                        "block {id} is not in this account's pool"
                    )));
                }
            };
            if block.is_spent() {
                return Err(BillingError::block_already_spent(format!(
                    "block {id} is tied to a payment"
                )));
            }
            if block.is_exhausted() {
                return Err(BillingError::block_exhausted(format!(
                    "block {id} was voided"
                )));
            }
            if block.is_expired(cmd.now, cmd.ttl_days) {
                return Err(BillingError::block_expired(format!(
                    "block {id} is past its {}-day lifetime",
                    cmd.ttl_days
                )));
            }
        }

        Ok(vec![CreditPoolEvent::BlocksRedeemed(BlocksRedeemed {
            pool_id: cmd.pool_id,
            block_ids: cmd.block_ids.clone(),
            payment_id: cmd.payment_id,
            occurred_at: cmd.now,
        })])
    }

    fn handle_exhaust(&self, cmd: &ExhaustBlock) -> Result<Vec<CreditPoolEvent>, BillingError> {
        self.ensure_pool_id(cmd.pool_id)?;

        let block = match self.blocks.get(&cmd.block_id) {
            Some(b) if !b.is_deleted() => b,
            _ => {
                return Err(BillingError::block_ownership(format!(
                    "block {} is not in this account's pool",
                    cmd.block_id
                )));
            }
        };
        if block.is_spent() {
            return Err(BillingError::block_already_spent(format!(
                "block {} is tied to a payment",
                cmd.block_id
            )));
        }
        if block.is_exhausted() {
            return Err(BillingError::block_exhausted(format!(
                "block {} was already voided",
                cmd.block_id
            )));
        }

        Ok(vec![CreditPoolEvent::BlockExhausted(BlockExhausted {
            pool_id: cmd.pool_id,
            block_id: cmd.block_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteBlock) -> Result<Vec<CreditPoolEvent>, BillingError> {
        self.ensure_pool_id(cmd.pool_id)?;

        match self.blocks.get(&cmd.block_id) {
            Some(b) if !b.is_deleted() => {}
            _ => {
                return Err(BillingError::block_ownership(format!(
                    "block {} is not in this account's pool",
                    cmd.block_id
                )));
            }
        }

        Ok(vec![CreditPoolEvent::BlockDeleted(BlockDeleted {
            pool_id: cmd.pool_id,
            block_id: cmd.block_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL_DAYS: i64 = 365;

    fn pool_id() -> CreditPoolId {
        CreditPoolId::for_account(AccountId::new(AggregateId::new()))
    }

    fn admin_source() -> CreditSource {
        CreditSource::admin(AggregateId::new())
    }

    fn drive(pool: &mut CreditPool, cmd: CreditPoolCommand) {
        let events = pool.handle(&cmd).unwrap();
        for e in &events {
            pool.apply(e);
        }
    }

    fn pool_with_blocks(id: CreditPoolId, count: usize, at: DateTime<Utc>) -> (CreditPool, Vec<BlockId>) {
        let mut pool = CreditPool::empty(id);
        let ids: Vec<BlockId> = (0..count).map(|_| BlockId::new(AggregateId::new())).collect();
        drive(
            &mut pool,
            CreditPoolCommand::GenerateBlocks(GenerateBlocks {
                pool_id: id,
                block_ids: ids.clone(),
                source: admin_source(),
                occurred_at: at,
            }),
        );
        (pool, ids)
    }

    fn redeem(ids: Vec<BlockId>, pool: CreditPoolId, now: DateTime<Utc>) -> CreditPoolCommand {
        CreditPoolCommand::RedeemBlocks(RedeemBlocks {
            pool_id: pool,
            payment_amount: ids.len() as i64,
            block_ids: ids,
            payment_id: PaymentId::new(AggregateId::new()),
            now,
            ttl_days: TTL_DAYS,
        })
    }

    #[test]
    fn generated_blocks_are_available() {
        let id = pool_id();
        let now = Utc::now();
        let (pool, ids) = pool_with_blocks(id, 3, now);

        assert_eq!(pool.len(), 3);
        assert_eq!(pool.available_count(now, TTL_DAYS), 3);
        for block_id in ids {
            assert!(pool.block(block_id).unwrap().is_available(now, TTL_DAYS));
        }
    }

    #[test]
    fn empty_or_duplicate_mint_batches_are_rejected() {
        let id = pool_id();
        let pool = CreditPool::empty(id);
        let now = Utc::now();

        let err = pool
            .handle(&CreditPoolCommand::GenerateBlocks(GenerateBlocks {
                pool_id: id,
                block_ids: vec![],
                source: admin_source(),
                occurred_at: now,
            }))
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));

        let dup = BlockId::new(AggregateId::new());
        let err = pool
            .handle(&CreditPoolCommand::GenerateBlocks(GenerateBlocks {
                pool_id: id,
                block_ids: vec![dup, dup],
                source: admin_source(),
                occurred_at: now,
            }))
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[test]
    fn redemption_ties_payment_onto_every_block() {
        let id = pool_id();
        let now = Utc::now();
        let (mut pool, ids) = pool_with_blocks(id, 2, now);
        let payment_id = PaymentId::new(AggregateId::new());

        drive(
            &mut pool,
            CreditPoolCommand::RedeemBlocks(RedeemBlocks {
                pool_id: id,
                block_ids: ids.clone(),
                payment_id,
                payment_amount: 2,
                now,
                ttl_days: TTL_DAYS,
            }),
        );

        for block_id in &ids {
            let block = pool.block(*block_id).unwrap();
            assert_eq!(block.payment_id, Some(payment_id));
            assert!(!block.is_available(now, TTL_DAYS));
        }
        assert_eq!(pool.available_count(now, TTL_DAYS), 0);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let id = pool_id();
        let now = Utc::now();
        let (pool, ids) = pool_with_blocks(id, 2, now);

        let err = pool
            .handle(&CreditPoolCommand::RedeemBlocks(RedeemBlocks {
                pool_id: id,
                block_ids: ids,
                payment_id: PaymentId::new(AggregateId::new()),
                payment_amount: 3,
                now,
                ttl_days: TTL_DAYS,
            }))
            .unwrap_err();
        assert_eq!(
            err,
            BillingError::BlockCountMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn foreign_block_fails_ownership_and_spares_the_batch() {
        let id = pool_id();
        let now = Utc::now();
        let (mut pool, mut ids) = pool_with_blocks(id, 2, now);
        ids.push(BlockId::new(AggregateId::new()));

        let err = pool.handle(&redeem(ids.clone(), id, now)).unwrap_err();
        assert!(matches!(err, BillingError::BlockOwnership(_)));

        // Nothing was emitted, so the owned blocks stay spendable.
        assert_eq!(pool.available_count(now, TTL_DAYS), 2);
        drive(&mut pool, redeem(ids[..2].to_vec(), id, now));
        assert_eq!(pool.available_count(now, TTL_DAYS), 0);
    }

    #[test]
    fn expired_block_fails_redemption() {
        let id = pool_id();
        let minted_at = Utc::now() - Duration::days(TTL_DAYS + 1);
        let (pool, ids) = pool_with_blocks(id, 1, minted_at);

        let err = pool.handle(&redeem(ids, id, Utc::now())).unwrap_err();
        assert!(matches!(err, BillingError::BlockExpired(_)));
    }

    #[test]
    fn block_on_the_ttl_boundary_is_still_spendable() {
        let id = pool_id();
        let now = Utc::now();
        let minted_at = now - Duration::days(TTL_DAYS);
        let (pool, ids) = pool_with_blocks(id, 1, minted_at);

        assert!(pool.handle(&redeem(ids, id, now)).is_ok());
    }

    #[test]
    fn spent_block_never_redeems_again() {
        let id = pool_id();
        let now = Utc::now();
        let (mut pool, ids) = pool_with_blocks(id, 1, now);

        drive(&mut pool, redeem(ids.clone(), id, now));

        let err = pool.handle(&redeem(ids, id, now)).unwrap_err();
        assert!(matches!(err, BillingError::BlockAlreadySpent(_)));
    }

    #[test]
    fn exhausted_block_fails_redemption() {
        let id = pool_id();
        let now = Utc::now();
        let (mut pool, ids) = pool_with_blocks(id, 1, now);

        drive(
            &mut pool,
            CreditPoolCommand::ExhaustBlock(ExhaustBlock {
                pool_id: id,
                block_id: ids[0],
                occurred_at: now,
            }),
        );

        let err = pool.handle(&redeem(ids, id, now)).unwrap_err();
        assert!(matches!(err, BillingError::BlockExhausted(_)));
    }

    #[test]
    fn deleted_block_reads_as_foreign() {
        let id = pool_id();
        let now = Utc::now();
        let (mut pool, ids) = pool_with_blocks(id, 1, now);

        drive(
            &mut pool,
            CreditPoolCommand::DeleteBlock(DeleteBlock {
                pool_id: id,
                block_id: ids[0],
                occurred_at: now,
            }),
        );

        let err = pool.handle(&redeem(ids, id, now)).unwrap_err();
        assert!(matches!(err, BillingError::BlockOwnership(_)));
    }

    #[test]
    fn duplicate_ids_in_a_redemption_batch_are_rejected() {
        let id = pool_id();
        let now = Utc::now();
        let (pool, ids) = pool_with_blocks(id, 1, now);

        let err = pool
            .handle(&redeem(vec![ids[0], ids[0]], id, now))
            .unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let id = pool_id();
        let now = Utc::now();
        let (pool, ids) = pool_with_blocks(id, 1, now);
        let version_before = pool.version();

        let cmd = redeem(ids, id, now);
        let events1 = pool.handle(&cmd).unwrap();
        let events2 = pool.handle(&cmd).unwrap();

        assert_eq!(pool.version(), version_before);
        assert_eq!(pool.available_count(now, TTL_DAYS), 1);
        assert_eq!(events1, events2);
    }

    proptest::proptest! {
        /// Property: a redeemed block is permanently excluded; re-redeeming
        /// any subset containing it fails and leaves the pool unchanged.
        #[test]
        fn redeemed_blocks_never_redeem_again(spend in 1usize..5, total in 5usize..9) {
            let id = pool_id();
            let now = Utc::now();
            let (mut pool, ids) = pool_with_blocks(id, total, now);

            drive(&mut pool, redeem(ids[..spend].to_vec(), id, now));
            proptest::prop_assert_eq!(pool.available_count(now, TTL_DAYS), total - spend);

            let err = pool.handle(&redeem(ids[..1].to_vec(), id, now)).unwrap_err();
            proptest::prop_assert!(matches!(err, BillingError::BlockAlreadySpent(_)));
            proptest::prop_assert_eq!(pool.available_count(now, TTL_DAYS), total - spend);
        }
    }
}
