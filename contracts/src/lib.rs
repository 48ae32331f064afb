//! # VELA Marketplace Contracts
//!
//! The sale core of the VELA instant-sale protocol. An owner lists a
//! uniquely identified asset at a fixed price in a chosen currency; any
//! other party can then execute one atomic `flash_buy` that pays the price
//! and takes ownership in a single indivisible step. No escrow, no bidding,
//! no partial completion.
//!
//! - **custody** — Per-asset protective custody of a durable transfer
//!   authorization. The single shared slot is what makes any currency's
//!   listing effective, and its single-occupancy invariant is the sole
//!   cross-currency coordination mechanism.
//! - **listing** — The per-(asset, currency) sale record: active lister
//!   and price, maintained under the invariant `lister present ⇔ price > 0`.
//! - **marketplace** — The public operation surface: setup, open, reprice,
//!   cancel, permanent disable, and the atomic buy.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow — wrapping arithmetic and
//!    money do not mix.
//! 2. Every operation is all-or-nothing: every fallible check runs before
//!    the marketplace mutates its own state, so an `Err` return means
//!    nothing here changed.
//! 3. Ownership never moves without consuming a single-use transfer
//!    ticket. The durable authorization in custody is a factory for
//!    tickets, never itself spent by a sale.
//! 4. Every persistent type is serializable (serde) for wire transport and
//!    key-value storage.

pub mod custody;
pub mod listing;
pub mod marketplace;

pub use custody::{CustodyError, CustodySlot, CustodyVault};
pub use listing::{price_in_bounds, ListingStatus, SaleRecord, PRICE_CAP};
pub use marketplace::{MarketError, Marketplace, SaleReceipt};
