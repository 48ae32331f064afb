//! # Balance Ledger
//!
//! Fungible balance accounting, one ledger per currency type. The sale core
//! is written against the [`BalanceLedger`] trait so it stays
//! currency-agnostic; currencies themselves are zero-sized marker types
//! implementing [`Currency`], which keeps "paid in NOVA" and "paid in USD"
//! apart at compile time instead of at runtime.
//!
//! ## Payments Are Linear
//!
//! Withdrawn value travels as an owned [`Payment`] token. A payment can
//! only be created by [`BalanceLedger::withdraw`] and destroyed by
//! [`BalanceLedger::deposit`] — it is not `Clone` and not `Copy`, so value
//! in transit can be neither duplicated nor silently dropped into two
//! places. Fee deduction happens through [`Payment::split`], which carves
//! an amount off in place and hands it back as a second payment.
//!
//! All arithmetic is checked. Amounts are `u64` in the smallest unit of
//! the currency; the protocol never divides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use thiserror::Error;

use crate::registry::Address;

// ---------------------------------------------------------------------------
// Currency markers
// ---------------------------------------------------------------------------

/// Compile-time tag for a fungible currency.
///
/// `CODE` is the currency's canonical ticker, used as the persistence key
/// wherever per-currency state is stored in a map.
pub trait Currency: 'static {
    /// Canonical ticker for this currency (e.g., `"NOVA"`).
    const CODE: &'static str;
}

/// VELA native token (smallest unit: photon, 10^-8).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Nova;

impl Currency for Nova {
    const CODE: &'static str = "NOVA";
}

/// United States Dollar stable value (smallest unit: 10^-6).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usd;

impl Currency for Usd {
    const CODE: &'static str = "USD";
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Attempted to withdraw more than the available balance.
    #[error("insufficient balance: {account} has {available} {currency}, requested {requested}")]
    InsufficientBalance {
        /// The account that was being debited.
        account: Address,
        /// Ticker of the currency involved.
        currency: &'static str,
        /// The current balance.
        available: u64,
        /// The amount that was requested.
        requested: u64,
    },

    /// Arithmetic overflow during a deposit.
    #[error("balance overflow: {account} holds {current} {currency}, deposit of {credit} rejected")]
    Overflow {
        /// The account that was being credited.
        account: Address,
        /// Ticker of the currency involved.
        currency: &'static str,
        /// The balance before the failed deposit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },

    /// Tried to split more off a payment than it carries.
    #[error("split exceeds payment: {available} available, {requested} requested")]
    SplitExceedsPayment {
        /// Amount the payment currently carries.
        available: u64,
        /// Amount the caller tried to split off.
        requested: u64,
    },
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// An owned amount of currency in flight between two accounts.
///
/// Deliberately not `Clone`, not `Copy`, and not serializable: a payment
/// exists only inside a single operation, between a `withdraw` and the
/// `deposit` that retires it.
#[derive(Debug)]
pub struct Payment<C: Currency> {
    amount: u64,
    _currency: PhantomData<C>,
}

impl<C: Currency> Payment<C> {
    pub(crate) fn new(amount: u64) -> Self {
        Self {
            amount,
            _currency: PhantomData,
        }
    }

    /// The amount this payment currently carries.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Ticker of the payment's currency.
    pub fn currency_code(&self) -> &'static str {
        C::CODE
    }

    /// Returns `true` if nothing is left to deposit.
    pub fn is_exhausted(&self) -> bool {
        self.amount == 0
    }

    /// Carves `amount` off this payment in place, returning it as a
    /// separate payment. Used for fee routing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SplitExceedsPayment`] if `amount` exceeds
    /// what the payment carries; the payment is left unchanged.
    pub fn split(&mut self, amount: u64) -> Result<Payment<C>, LedgerError> {
        let remaining =
            self.amount
                .checked_sub(amount)
                .ok_or(LedgerError::SplitExceedsPayment {
                    available: self.amount,
                    requested: amount,
                })?;
        self.amount = remaining;
        Ok(Payment::new(amount))
    }
}

// ---------------------------------------------------------------------------
// Ledger trait
// ---------------------------------------------------------------------------

/// Narrow interface over a fungible balance ledger for one currency.
///
/// Object-safe on purpose — royalty engines receive the ledger as
/// `&mut dyn BalanceLedger<C>` so they can route fees without knowing the
/// concrete ledger behind it.
pub trait BalanceLedger<C: Currency> {
    /// Debits `amount` from `account` and returns it as an owned payment.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] on shortfall. The
    /// ledger is unchanged on failure.
    fn withdraw(&mut self, account: &str, amount: u64) -> Result<Payment<C>, LedgerError>;

    /// Credits `payment` to `account`, retiring it. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the credit would exceed
    /// `u64::MAX`.
    fn deposit(&mut self, account: &str, payment: Payment<C>) -> Result<u64, LedgerError>;

    /// Current balance of `account`. Unknown accounts hold zero.
    fn balance(&self, account: &str) -> u64;
}

// ---------------------------------------------------------------------------
// In-memory reference ledger
// ---------------------------------------------------------------------------

/// In-memory balance ledger for a single currency.
///
/// Carries the same semantics the production state trie would: per-account
/// `u64` balances, checked arithmetic, no negative balances.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct InMemoryLedger<C: Currency> {
    /// Account balances in the smallest unit of `C`.
    balances: HashMap<Address, u64>,
    #[serde(skip)]
    _currency: PhantomData<C>,
}

impl<C: Currency> Default for InMemoryLedger<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Currency> InMemoryLedger<C> {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            _currency: PhantomData,
        }
    }

    /// Seeds `account` with an opening balance, replacing any previous one.
    pub fn open_account(&mut self, account: &str, balance: u64) {
        self.balances.insert(account.to_string(), balance);
    }

    /// Returns the number of accounts with a balance entry.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }
}

impl<C: Currency> BalanceLedger<C> for InMemoryLedger<C> {
    fn withdraw(&mut self, account: &str, amount: u64) -> Result<Payment<C>, LedgerError> {
        let available = self.balances.get(account).copied().unwrap_or(0);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: account.to_string(),
                currency: C::CODE,
                available,
                requested: amount,
            })?;

        self.balances.insert(account.to_string(), remaining);
        Ok(Payment::new(amount))
    }

    fn deposit(&mut self, account: &str, payment: Payment<C>) -> Result<u64, LedgerError> {
        let current = self.balances.entry(account.to_string()).or_insert(0);
        let updated = current
            .checked_add(payment.amount())
            .ok_or(LedgerError::Overflow {
                account: account.to_string(),
                currency: C::CODE,
                current: *current,
                credit: payment.amount(),
            })?;

        *current = updated;
        Ok(updated)
    }

    fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}
