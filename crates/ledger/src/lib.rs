//! `peerfund-ledger` — the balance ledger domain.
//!
//! One [`LedgerAccount`] per user tracks the alloted/locked/disbursed amounts,
//! the derived available-to-withdraw balance, the append-only transaction
//! history, and the (at most one) pending withdrawal request. The withdrawal
//! workflow (request, then settlement into a disbursement) is expressed as
//! commands and events on this single aggregate, so a settlement updates the
//! balances, appends the transaction entry, and clears the request in one
//! atomic append.

pub mod account;
pub mod balance;

pub use account::{
    BlockAccount, IncrementAllotedAmt, IncrementLockedAmt, LedgerAccount, LedgerCommand,
    LedgerEvent, MarkBankDetailsAdded, OpenAccount, PendingWithdrawal, RequestWithdrawal,
    SetAllotedAmt, SetLockedAmt, SettleWithdrawal, TransactionEntry, TransactionStatus,
    UnblockAccount,
};
pub use balance::{available_to_withdraw, net_balance};
