// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VELA Protocol — Collaborator Layer
//!
//! VELA is an instant-sale protocol for uniquely identified digital assets:
//! an owner lists an asset at a fixed price, and any other party can execute
//! a single atomic operation that pays the price and takes ownership. No
//! escrow, no bidding, no intermediate custody of funds.
//!
//! This crate is *not* the sale logic. It is the set of collaborators the
//! sale core (see `vela-contracts`) consumes through narrow interfaces:
//!
//! - **registry** — Who owns what, and the capability types that authorize
//!   ownership transfers. The registry is the only mint for
//!   [`TransferAuthorization`](registry::TransferAuthorization)s.
//! - **ledger** — Fungible balances, one ledger per currency type. Value
//!   moves as owned [`Payment`](ledger::Payment) tokens so it can neither
//!   be duplicated nor silently dropped in transit.
//! - **royalty** — Optional in-flight fee deduction, applied to a payment
//!   before the seller is paid.
//!
//! ## Design Philosophy
//!
//! 1. All amounts are `u64` in smallest-unit denomination. No floats,
//!    no decimals in arithmetic, `checked_*` everywhere money moves.
//! 2. Capabilities are linear. A single-use transfer ticket is consumed by
//!    move — the type system makes reuse a compile error, not a runtime one.
//! 3. Every persistent state type derives `Serialize`/`Deserialize` so it
//!    can be stored as a key-value blob or snapshotted for recovery.

pub mod ledger;
pub mod registry;
pub mod royalty;

pub use ledger::{BalanceLedger, Currency, InMemoryLedger, LedgerError, Nova, Payment, Usd};
pub use registry::{
    Address, AssetCatalog, AssetId, AssetRecord, InMemoryRegistry, OwnershipRegistry,
    RegistryError, TransferAuthorization, TransferTicket,
};
pub use royalty::{BasisPointRoyalty, RoyaltyEngine};
