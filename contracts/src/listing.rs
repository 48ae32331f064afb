//! # Sale Records
//!
//! The per-(asset, currency) listing state: who gets paid, and how much.
//! One record exists per supported currency of an asset, but all of them
//! gate on the asset's single [custody slot](crate::custody) — which is
//! why at most one currency can have an active listing at a time.
//!
//! A record is never destroyed once configured. Cancelling a listing, or
//! completing a sale, resets it to the inactive zero state; the invariant
//! `lister present ⇔ price > 0` holds in every publicly observable state.
//! Fields are private and transitions go through methods precisely so that
//! the invariant cannot be broken from outside this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use vela_protocol::registry::Address;

/// Exclusive upper bound for listing prices.
///
/// `u64::MAX` is rejected as a price: it is reserved as a sentinel, and no
/// real sale is priced there anyway.
pub const PRICE_CAP: u64 = u64::MAX;

/// Returns `true` if `price` is a valid listing price (`0 < price < PRICE_CAP`).
pub fn price_in_bounds(price: u64) -> bool {
    price > 0 && price < PRICE_CAP
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Whether a sale record currently has an active listing.
///
/// Derived from the record's fields rather than stored, so it can never
/// fall out of sync with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    /// No active listing; `price` is zero.
    Inactive,
    /// Listed for sale at a fixed price.
    Active,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingStatus::Inactive => write!(f, "Inactive"),
            ListingStatus::Active => write!(f, "Active"),
        }
    }
}

// ---------------------------------------------------------------------------
// SaleRecord
// ---------------------------------------------------------------------------

/// Listing state for one (asset, currency) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Ticker of the currency this record sells in.
    currency: String,
    /// The address entitled to receive payment; present iff listed.
    lister: Option<Address>,
    /// Asking price in the smallest unit of `currency`; zero iff inactive.
    price: u64,
    /// When the record was configured.
    created_at: DateTime<Utc>,
    /// Timestamp of the most recent state change.
    updated_at: DateTime<Utc>,
}

impl SaleRecord {
    /// Creates a fresh, inactive record for `currency`.
    pub fn new(currency: &str) -> Self {
        let now = Utc::now();
        Self {
            currency: currency.to_string(),
            lister: None,
            price: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ticker of the currency this record sells in.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// The active lister, if any.
    pub fn lister(&self) -> Option<&str> {
        self.lister.as_deref()
    }

    /// Current asking price; zero when inactive.
    pub fn price(&self) -> u64 {
        self.price
    }

    /// Derived listing status.
    pub fn status(&self) -> ListingStatus {
        if self.lister.is_some() {
            ListingStatus::Active
        } else {
            ListingStatus::Inactive
        }
    }

    /// Returns `true` if a listing is currently active.
    pub fn is_active(&self) -> bool {
        self.lister.is_some()
    }

    /// When the record was configured.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the most recent state change.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Activates the listing. Callers validate ownership and price bounds
    /// first; the debug assertion backstops the price invariant.
    pub(crate) fn activate(&mut self, lister: &str, price: u64) {
        debug_assert!(price_in_bounds(price));
        self.lister = Some(lister.to_string());
        self.price = price;
        self.updated_at = Utc::now();
    }

    /// Changes the asking price of an active listing.
    pub(crate) fn set_price(&mut self, price: u64) {
        debug_assert!(self.is_active());
        debug_assert!(price_in_bounds(price));
        self.price = price;
        self.updated_at = Utc::now();
    }

    /// Resets the record to the inactive zero state. Safe to call on an
    /// already-inactive record.
    pub(crate) fn clear(&mut self) {
        self.lister = None;
        self.price = 0;
        self.updated_at = Utc::now();
    }
}
