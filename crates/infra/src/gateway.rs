//! External card gateway contract.
//!
//! The gateway is opaque: the engine sends an amount, a currency and a tokened
//! instrument, and gets back either a charge reference or a decline reason.
//! There is no idempotency key; the engine calls the gateway before any local
//! mutation so a decline leaves no trace.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use blockbill_core::DeclineReason;
use blockbill_ledger::Currency;

/// A charge to be attempted against the external gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Amount in minor units of `currency`.
    pub amount: i64,
    pub currency: Currency,
    /// Tokenized instrument reference; raw card data never reaches this core.
    pub token: String,
}

/// A successful gateway charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    pub charge_id: String,
    pub gateway: String,
}

pub trait ChargeGateway: Send + Sync {
    fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, DeclineReason>;
}

impl<G> ChargeGateway for Arc<G>
where
    G: ChargeGateway + ?Sized,
{
    fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, DeclineReason> {
        (**self).charge(request)
    }
}

/// Scripted gateway for tests/dev.
///
/// Replies with pre-loaded outcomes in order and records every request it
/// receives. An exhausted script reports a processing error.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Result<ChargeReceipt, DeclineReason>>>,
    requests: Mutex<Vec<ChargeRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that approves every charge with generated charge ids.
    pub fn approving() -> Self {
        Self::default()
    }

    pub fn push_approval(&self, charge_id: impl Into<String>) {
        self.outcomes.lock().unwrap().push_back(Ok(ChargeReceipt {
            charge_id: charge_id.into(),
            gateway: "scripted".to_string(),
        }));
    }

    pub fn push_decline(&self, reason: DeclineReason) {
        self.outcomes.lock().unwrap().push_back(Err(reason));
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<ChargeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ChargeGateway for ScriptedGateway {
    fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, DeclineReason> {
        self.requests.lock().unwrap().push(request.clone());
        match self.outcomes.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            // No script loaded: approve with a generated reference.
            None => Ok(ChargeReceipt {
                charge_id: format!("ch_{}", uuid::Uuid::now_v7().simple()),
                gateway: "scripted".to_string(),
            }),
        }
    }
}
