use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use peerfund_core::{Aggregate, AggregateRoot, DomainError, UserId};
use peerfund_events::Event;

use crate::balance;

// ─────────────────────────────────────────────────────────────────────────────
// Value types
// ─────────────────────────────────────────────────────────────────────────────

/// Processing state of a withdrawal, both for the pending request record and
/// for entries in the transaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Request raised, not yet settled by an administrator.
    Processing,
    /// Settled: the amount has been disbursed.
    Processed,
}

impl core::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransactionStatus::Processing => write!(f, "Processing"),
            TransactionStatus::Processed => write!(f, "Processed"),
        }
    }
}

/// One entry in the append-only transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub created_at: DateTime<Utc>,
    /// Amount in minor units (paise).
    pub amount: i64,
    pub status: TransactionStatus,
}

/// The outstanding withdrawal request, at most one per user.
///
/// Lives inside the aggregate rather than in its own collection, so the
/// "one pending request per user" rule holds transactionally and settlement
/// consumes it in the same append that updates the balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    pub amount: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate root: per-user balance ledger.
///
/// # Invariants
/// - `avail_to_withdraw == max(0, alloted_amt - locked_amt - disbursed_amt)`
///   after every applied event (the appliers are the only writer).
/// - `disbursed_amt` is monotonically non-decreasing.
/// - `transactions` is append-only.
/// - At most one pending withdrawal request exists at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    user_id: UserId,
    alloted_amt: i64,
    locked_amt: i64,
    disbursed_amt: i64,
    avail_to_withdraw: i64,
    is_blocked: bool,
    bank_details_added: bool,
    transactions: Vec<TransactionEntry>,
    pending_request: Option<PendingWithdrawal>,
    version: u64,
    opened: bool,
}

impl LedgerAccount {
    /// Empty aggregate for rehydration.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            alloted_amt: 0,
            locked_amt: 0,
            disbursed_amt: 0,
            avail_to_withdraw: 0,
            is_blocked: false,
            bank_details_added: false,
            transactions: Vec::new(),
            pending_request: None,
            version: 0,
            opened: false,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn alloted_amt(&self) -> i64 {
        self.alloted_amt
    }

    pub fn locked_amt(&self) -> i64 {
        self.locked_amt
    }

    pub fn disbursed_amt(&self) -> i64 {
        self.disbursed_amt
    }

    pub fn avail_to_withdraw(&self) -> i64 {
        self.avail_to_withdraw
    }

    /// Unclamped balance; negative when locked+disbursed exceed alloted.
    pub fn net_balance(&self) -> i64 {
        balance::net_balance(self.alloted_amt, self.locked_amt, self.disbursed_amt)
    }

    pub fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    pub fn bank_details_added(&self) -> bool {
        self.bank_details_added
    }

    pub fn transactions(&self) -> &[TransactionEntry] {
        &self.transactions
    }

    pub fn pending_request(&self) -> Option<&PendingWithdrawal> {
        self.pending_request.as_ref()
    }

    /// Whether the ledger stream has been opened (registration happened).
    pub fn is_opened(&self) -> bool {
        self.opened
    }

    fn ensure_opened(&self) -> Result<(), DomainError> {
        if !self.opened {
            return Err(DomainError::not_found("no ledger record for the user"));
        }
        Ok(())
    }

    fn ensure_user(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.user_id != user_id {
            return Err(DomainError::rule("user id mismatch for ledger stream"));
        }
        Ok(())
    }
}

impl AggregateRoot for LedgerAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.user_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command to open the ledger stream at registration (all amounts zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAccount {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command to overwrite the alloted amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAllotedAmt {
    pub user_id: UserId,
    pub value: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command to add a delta to the alloted amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementAllotedAmt {
    pub user_id: UserId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command to overwrite the locked amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLockedAmt {
    pub user_id: UserId,
    pub value: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command to add a delta to the locked amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementLockedAmt {
    pub user_id: UserId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command to bar the user from initiating withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAccount {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command to lift a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnblockAccount {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command recording that bank details are on file for the user.
///
/// The directory owns the details themselves; the ledger only needs the flag
/// as a withdrawal precondition. Idempotent: a repeat upsert emits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkBankDetailsAdded {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command to raise a withdrawal request.
///
/// `amount: None` requests the full available balance (the reference policy);
/// an explicit amount must satisfy `0 < amount <= avail_to_withdraw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWithdrawal {
    pub user_id: UserId,
    pub amount: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command to settle the pending withdrawal request into a disbursement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleWithdrawal {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// All ledger commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    Open(OpenAccount),
    SetAlloted(SetAllotedAmt),
    IncrementAlloted(IncrementAllotedAmt),
    SetLocked(SetLockedAmt),
    IncrementLocked(IncrementLockedAmt),
    Block(BlockAccount),
    Unblock(UnblockAccount),
    MarkBankDetailsAdded(MarkBankDetailsAdded),
    RequestWithdrawal(RequestWithdrawal),
    SettleWithdrawal(SettleWithdrawal),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// All ledger events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    AccountOpened {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    AllotedAmtSet {
        user_id: UserId,
        value: i64,
        occurred_at: DateTime<Utc>,
    },
    AllotedAmtIncremented {
        user_id: UserId,
        delta: i64,
        occurred_at: DateTime<Utc>,
    },
    LockedAmtSet {
        user_id: UserId,
        value: i64,
        occurred_at: DateTime<Utc>,
    },
    LockedAmtIncremented {
        user_id: UserId,
        delta: i64,
        occurred_at: DateTime<Utc>,
    },
    AccountBlocked {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    AccountUnblocked {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    BankDetailsMarked {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalRequested {
        user_id: UserId,
        amount: i64,
        occurred_at: DateTime<Utc>,
    },
    WithdrawalSettled {
        user_id: UserId,
        amount: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::AccountOpened { .. } => "ledger.account_opened",
            LedgerEvent::AllotedAmtSet { .. } => "ledger.alloted_amt_set",
            LedgerEvent::AllotedAmtIncremented { .. } => "ledger.alloted_amt_incremented",
            LedgerEvent::LockedAmtSet { .. } => "ledger.locked_amt_set",
            LedgerEvent::LockedAmtIncremented { .. } => "ledger.locked_amt_incremented",
            LedgerEvent::AccountBlocked { .. } => "ledger.account_blocked",
            LedgerEvent::AccountUnblocked { .. } => "ledger.account_unblocked",
            LedgerEvent::BankDetailsMarked { .. } => "ledger.bank_details_marked",
            LedgerEvent::WithdrawalRequested { .. } => "ledger.withdrawal_requested",
            LedgerEvent::WithdrawalSettled { .. } => "ledger.withdrawal_settled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::AccountOpened { occurred_at, .. }
            | LedgerEvent::AllotedAmtSet { occurred_at, .. }
            | LedgerEvent::AllotedAmtIncremented { occurred_at, .. }
            | LedgerEvent::LockedAmtSet { occurred_at, .. }
            | LedgerEvent::LockedAmtIncremented { occurred_at, .. }
            | LedgerEvent::AccountBlocked { occurred_at, .. }
            | LedgerEvent::AccountUnblocked { occurred_at, .. }
            | LedgerEvent::BankDetailsMarked { occurred_at, .. }
            | LedgerEvent::WithdrawalRequested { occurred_at, .. }
            | LedgerEvent::WithdrawalSettled { occurred_at, .. } => *occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for LedgerAccount {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::AccountOpened { user_id, .. } => {
                self.user_id = *user_id;
                self.opened = true;
            }
            LedgerEvent::AllotedAmtSet { value, .. } => {
                self.alloted_amt = *value;
                self.recompute_available();
            }
            LedgerEvent::AllotedAmtIncremented { delta, .. } => {
                self.alloted_amt += *delta;
                self.recompute_available();
            }
            LedgerEvent::LockedAmtSet { value, .. } => {
                self.locked_amt = *value;
                self.recompute_available();
            }
            LedgerEvent::LockedAmtIncremented { delta, .. } => {
                self.locked_amt += *delta;
                self.recompute_available();
            }
            LedgerEvent::AccountBlocked { .. } => {
                self.is_blocked = true;
            }
            LedgerEvent::AccountUnblocked { .. } => {
                self.is_blocked = false;
            }
            LedgerEvent::BankDetailsMarked { .. } => {
                self.bank_details_added = true;
            }
            LedgerEvent::WithdrawalRequested { amount, occurred_at, .. } => {
                self.pending_request = Some(PendingWithdrawal {
                    amount: *amount,
                    status: TransactionStatus::Processing,
                    created_at: *occurred_at,
                });
            }
            LedgerEvent::WithdrawalSettled { amount, occurred_at, .. } => {
                self.disbursed_amt += *amount;
                self.recompute_available();
                self.transactions.push(TransactionEntry {
                    created_at: *occurred_at,
                    amount: *amount,
                    status: TransactionStatus::Processed,
                });
                self.pending_request = None;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::Open(cmd) => self.handle_open(cmd),
            LedgerCommand::SetAlloted(cmd) => self.handle_set_alloted(cmd),
            LedgerCommand::IncrementAlloted(cmd) => self.handle_increment_alloted(cmd),
            LedgerCommand::SetLocked(cmd) => self.handle_set_locked(cmd),
            LedgerCommand::IncrementLocked(cmd) => self.handle_increment_locked(cmd),
            LedgerCommand::Block(cmd) => self.handle_block(cmd),
            LedgerCommand::Unblock(cmd) => self.handle_unblock(cmd),
            LedgerCommand::MarkBankDetailsAdded(cmd) => self.handle_mark_bank_details(cmd),
            LedgerCommand::RequestWithdrawal(cmd) => self.handle_request_withdrawal(cmd),
            LedgerCommand::SettleWithdrawal(cmd) => self.handle_settle_withdrawal(cmd),
        }
    }
}

impl LedgerAccount {
    /// The derived balance is written here and nowhere else.
    fn recompute_available(&mut self) {
        self.avail_to_withdraw =
            balance::available_to_withdraw(self.alloted_amt, self.locked_amt, self.disbursed_amt);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Command handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_open(&self, cmd: &OpenAccount) -> Result<Vec<LedgerEvent>, DomainError> {
        if self.opened {
            return Err(DomainError::rule("ledger record already exists"));
        }

        Ok(vec![LedgerEvent::AccountOpened {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_set_alloted(&self, cmd: &SetAllotedAmt) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        if cmd.value < 0 {
            return Err(DomainError::validation("amount must not be negative"));
        }

        Ok(vec![LedgerEvent::AllotedAmtSet {
            user_id: cmd.user_id,
            value: cmd.value,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_increment_alloted(
        &self,
        cmd: &IncrementAllotedAmt,
    ) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        if self.alloted_amt + cmd.delta < 0 {
            return Err(DomainError::validation(
                "resulting alloted amount would be negative",
            ));
        }

        Ok(vec![LedgerEvent::AllotedAmtIncremented {
            user_id: cmd.user_id,
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_set_locked(&self, cmd: &SetLockedAmt) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        // Lock edits require a strictly positive amount.
        if cmd.value <= 0 {
            return Err(DomainError::validation("amount must be positive"));
        }

        Ok(vec![LedgerEvent::LockedAmtSet {
            user_id: cmd.user_id,
            value: cmd.value,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_increment_locked(
        &self,
        cmd: &IncrementLockedAmt,
    ) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        if self.locked_amt + cmd.delta < 0 {
            return Err(DomainError::validation(
                "resulting locked amount would be negative",
            ));
        }

        Ok(vec![LedgerEvent::LockedAmtIncremented {
            user_id: cmd.user_id,
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_block(&self, cmd: &BlockAccount) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        if self.is_blocked {
            return Err(DomainError::rule("user already blocked"));
        }

        Ok(vec![LedgerEvent::AccountBlocked {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_unblock(&self, cmd: &UnblockAccount) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        if !self.is_blocked {
            return Err(DomainError::rule("user is not blocked"));
        }

        Ok(vec![LedgerEvent::AccountUnblocked {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_mark_bank_details(
        &self,
        cmd: &MarkBankDetailsAdded,
    ) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        // Repeat upserts of bank details are a no-op here.
        if self.bank_details_added {
            return Ok(vec![]);
        }

        Ok(vec![LedgerEvent::BankDetailsMarked {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_request_withdrawal(
        &self,
        cmd: &RequestWithdrawal,
    ) -> Result<Vec<LedgerEvent>, DomainError> {
        // Precondition order is part of the contract: existence, block flag,
        // balance, pending request, bank details.
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        if self.is_blocked {
            return Err(DomainError::rule("User is blocked"));
        }
        if self.avail_to_withdraw <= 0 {
            return Err(DomainError::rule("no available balance"));
        }
        if self.pending_request.is_some() {
            return Err(DomainError::rule("withdraw request already pending"));
        }
        if !self.bank_details_added {
            return Err(DomainError::rule("bank details not added for the user"));
        }

        let amount = match cmd.amount {
            // Reference policy: an unspecified amount requests the full
            // available balance.
            None => self.avail_to_withdraw,
            Some(a) if a <= 0 => {
                return Err(DomainError::validation("amount must be positive"));
            }
            Some(a) if a > self.avail_to_withdraw => {
                return Err(DomainError::rule("insufficient available balance"));
            }
            Some(a) => a,
        };

        Ok(vec![LedgerEvent::WithdrawalRequested {
            user_id: cmd.user_id,
            amount,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_settle_withdrawal(
        &self,
        cmd: &SettleWithdrawal,
    ) -> Result<Vec<LedgerEvent>, DomainError> {
        self.ensure_opened()?;
        self.ensure_user(cmd.user_id)?;

        let Some(pending) = &self.pending_request else {
            return Err(DomainError::not_found(
                "No withdraw request for the user at this moment",
            ));
        };

        Ok(vec![LedgerEvent::WithdrawalSettled {
            user_id: cmd.user_id,
            amount: pending.amount,
            occurred_at: cmd.occurred_at,
        }])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
