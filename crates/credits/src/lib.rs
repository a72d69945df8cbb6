//! Store-credit domain module (event-sourced).
//!
//! Blocks are indivisible one-unit credits in the `blk` currency, held in a
//! per-account pool. A block is minted once, optionally voided or soft-deleted
//! by an operator, and spent at most once; redemption ties it permanently to a
//! payment.

pub mod pool;

pub use pool::{
    Block, BlockDeleted, BlockExhausted, BlockId, BlocksGenerated, BlocksRedeemed, CreditPool,
    CreditPoolCommand, CreditPoolEvent, CreditPoolId, CreditSource, CreditSourceKind, DeleteBlock,
    ExhaustBlock, GenerateBlocks, RedeemBlocks,
};
