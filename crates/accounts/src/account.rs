use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blockbill_core::{Aggregate, AggregateId, AggregateRoot, BillingError};
use blockbill_events::Event;

/// Account identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub AggregateId);

impl AccountId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Billing address.
///
/// Stored as opaque text: normalization and country validation happen in an
/// upstream service before the address reaches this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

/// Aggregate root: Account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    external_customer_id: Option<String>,
    address: Option<Address>,
    deleted_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Account {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: AccountId) -> Self {
        Self {
            id,
            external_customer_id: None,
            address: None,
            deleted_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn external_customer_id(&self) -> Option<&str> {
        self.external_customer_id.as_deref()
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn exists(&self) -> bool {
        self.created && !self.is_deleted()
    }
}

impl AggregateRoot for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateAccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccount {
    pub account_id: AccountId,
    pub external_customer_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignAddress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignAddress {
    pub account_id: AccountId,
    pub address: Address,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteAccount (soft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAccount {
    pub account_id: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCommand {
    CreateAccount(CreateAccount),
    AssignAddress(AssignAddress),
    DeleteAccount(DeleteAccount),
}

/// Event: AccountCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub account_id: AccountId,
    pub external_customer_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AddressAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAssigned {
    pub account_id: AccountId,
    pub address: Address,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AccountDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDeleted {
    pub account_id: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    AccountCreated(AccountCreated),
    AddressAssigned(AddressAssigned),
    AccountDeleted(AccountDeleted),
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountCreated(_) => "accounts.account.created",
            AccountEvent::AddressAssigned(_) => "accounts.account.address_assigned",
            AccountEvent::AccountDeleted(_) => "accounts.account.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::AccountCreated(e) => e.occurred_at,
            AccountEvent::AddressAssigned(e) => e.occurred_at,
            AccountEvent::AccountDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = BillingError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::AccountCreated(e) => {
                self.id = e.account_id;
                self.external_customer_id = e.external_customer_id.clone();
                self.created = true;
            }
            AccountEvent::AddressAssigned(e) => {
                self.address = Some(e.address.clone());
            }
            AccountEvent::AccountDeleted(e) => {
                self.deleted_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::CreateAccount(cmd) => self.handle_create(cmd),
            AccountCommand::AssignAddress(cmd) => self.handle_assign_address(cmd),
            AccountCommand::DeleteAccount(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Account {
    fn ensure_live(&self) -> Result<(), BillingError> {
        // Soft-deleted accounts are indistinguishable from absent ones.
        if !self.created || self.is_deleted() {
            return Err(BillingError::not_found());
        }
        Ok(())
    }

    fn ensure_account_id(&self, account_id: AccountId) -> Result<(), BillingError> {
        if self.id != account_id {
            return Err(BillingError::relationship("account_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateAccount) -> Result<Vec<AccountEvent>, BillingError> {
        if self.created {
            return Err(BillingError::conflict("account already exists"));
        }

        Ok(vec![AccountEvent::AccountCreated(AccountCreated {
            account_id: cmd.account_id,
            external_customer_id: cmd.external_customer_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_address(
        &self,
        cmd: &AssignAddress,
    ) -> Result<Vec<AccountEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_account_id(cmd.account_id)?;

        if cmd.address.line1.trim().is_empty() || cmd.address.country.trim().is_empty() {
            return Err(BillingError::validation(
                "address requires line1 and country",
            ));
        }

        Ok(vec![AccountEvent::AddressAssigned(AddressAssigned {
            account_id: cmd.account_id,
            address: cmd.address.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteAccount) -> Result<Vec<AccountEvent>, BillingError> {
        self.ensure_live()?;
        self.ensure_account_id(cmd.account_id)?;

        Ok(vec![AccountEvent::AccountDeleted(AccountDeleted {
            account_id: cmd.account_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
