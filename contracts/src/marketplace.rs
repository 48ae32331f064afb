//! # Marketplace Operations
//!
//! The public operation surface of the instant-sale protocol: setup, open,
//! reprice, cancel, permanent disable, and the atomic `flash_buy`. The
//! [`Marketplace`] owns the custody vault and the sale records; the
//! ownership registry, balance ledger, and royalty engine are collaborators
//! passed in per call.
//!
//! ## Atomicity
//!
//! Each operation commits in full or not at all. The embedding environment
//! serializes operations touching the same asset, so there is no locking
//! here; within an operation, every fallible check runs before the
//! marketplace mutates its own state, so an `Err` return means the
//! marketplace is exactly as it was. External collaborator effects that
//! precede a late abort (a buyer debit before a royalty misconfiguration
//! surfaces) are the transactional host's to discard.
//!
//! ## Listing Exclusivity
//!
//! Opening a listing deposits the owner's transfer authorization into the
//! asset's single custody slot. Because `open_listing` requires that slot
//! to be vacant, at most one currency's listing can be live per asset;
//! reclaiming the slot (and the authorization) goes through
//! [`Marketplace::disable_permanently`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use vela_protocol::ledger::{BalanceLedger, Currency, LedgerError};
use vela_protocol::registry::{
    Address, AssetCatalog, AssetId, OwnershipRegistry, RegistryError, TransferAuthorization,
};
use vela_protocol::royalty::RoyaltyEngine;

use crate::custody::{CustodyError, CustodyVault};
use crate::listing::{price_in_bounds, SaleRecord};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during marketplace operations.
#[derive(Debug, Error)]
pub enum MarketError {
    /// The caller is not the asset's current owner.
    #[error("not the owner: {caller} does not own asset {asset}")]
    NotOwner {
        /// The asset in question.
        asset: AssetId,
        /// The address that made the request.
        caller: Address,
    },

    /// The buyer already owns the asset; buying from yourself is a no-op
    /// dressed up as a trade.
    #[error("buyer {buyer} already owns asset {asset}")]
    AlreadyOwner {
        /// The asset in question.
        asset: AssetId,
        /// The would-be buyer.
        buyer: Address,
    },

    /// Listing price outside the open interval `(0, u64::MAX)`.
    #[error("invalid price {price}: must be positive and below u64::MAX")]
    InvalidPrice {
        /// The rejected price.
        price: u64,
    },

    /// A listing is already live for this asset — in this currency or any
    /// other. The custody slot is single-occupancy.
    #[error("asset {asset} is already listed for sale")]
    AlreadyListed {
        /// The asset in question.
        asset: AssetId,
    },

    /// The operation needs an active listing and there is none.
    #[error("no active {currency} listing for asset {asset}")]
    NotListed {
        /// The asset in question.
        asset: AssetId,
        /// Ticker of the currency that was queried.
        currency: &'static str,
    },

    /// `setup` was never run for this (asset, currency) pair.
    #[error("no {currency} sale record configured for asset {asset}")]
    NotConfigured {
        /// The asset in question.
        asset: AssetId,
        /// Ticker of the currency that was queried.
        currency: &'static str,
    },

    /// A declared identity did not match the expected one at setup time.
    #[error("identity mismatch: expected {expected:?}, found {actual:?}")]
    IdentityMismatch {
        /// What the caller expected.
        expected: String,
        /// What was actually declared.
        actual: String,
    },

    /// The asset changed hands outside the protocol since the listing was
    /// opened; paying the recorded seller would pay the wrong party.
    #[error("owner changed since listing: recorded seller {recorded}, current owner {actual}")]
    OwnerChanged {
        /// The seller the listing recorded.
        recorded: Address,
        /// The asset's actual current owner.
        actual: Address,
    },

    /// Fee deduction consumed the entire payment, leaving nothing for the
    /// seller. A royalty engine that does this is misconfigured.
    #[error("payment exhausted: fees consumed the entire {price} unit payment")]
    PaymentExhausted {
        /// The gross price that was withdrawn.
        price: u64,
    },

    /// A custody operation failed.
    #[error(transparent)]
    Custody(#[from] CustodyError),

    /// A ledger operation failed (insufficient balance, overflow).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Settlement summary for one completed flash buy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReceipt {
    /// Unique identifier for this settlement.
    pub receipt_id: String,
    /// The asset that changed hands.
    pub asset: AssetId,
    /// Ticker of the sale currency.
    pub currency: String,
    /// The seller who was paid.
    pub seller: Address,
    /// The new owner.
    pub buyer: Address,
    /// Gross price withdrawn from the buyer.
    pub price: u64,
    /// Share routed to royalties before payout.
    pub royalty_paid: u64,
    /// Net amount deposited to the seller.
    pub net_proceeds: u64,
    /// When the sale settled.
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Marketplace
// ---------------------------------------------------------------------------

/// The instant-sale marketplace: custody vault plus sale records.
///
/// Records are keyed by asset, then by currency ticker — the key-value
/// rendition of state attached to the asset's own storage identity. In
/// production this struct is persisted as a single serialized blob in the
/// protocol's state store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Marketplace {
    /// Per-asset capability custody.
    custody: CustodyVault,
    /// Sale records: asset ID → currency ticker → record.
    records: HashMap<AssetId, HashMap<String, SaleRecord>>,
}

impl Marketplace {
    /// Creates an empty marketplace.
    pub fn new() -> Self {
        Self::default()
    }

    // -- queries ------------------------------------------------------------

    /// The sale record for (asset, `C`), if configured.
    pub fn record_of<C: Currency>(&self, asset: &str) -> Option<&SaleRecord> {
        self.record_at(asset, C::CODE)
    }

    /// The active listing for (asset, `C`): lister and price.
    pub fn listing<C: Currency>(&self, asset: &str) -> Option<(&str, u64)> {
        self.record_of::<C>(asset)
            .and_then(|record| record.lister().map(|lister| (lister, record.price())))
    }

    /// Returns `true` if (asset, `C`) has an active listing.
    pub fn is_listed<C: Currency>(&self, asset: &str) -> bool {
        self.record_of::<C>(asset)
            .map(SaleRecord::is_active)
            .unwrap_or(false)
    }

    /// Returns `true` if a transfer authorization is held for `asset`.
    pub fn is_custodied(&self, asset: &str) -> bool {
        self.custody.is_held(asset)
    }

    // -- lifecycle ----------------------------------------------------------

    /// Configures the (asset, `C`) sale record and ensures the asset's
    /// custody slot exists.
    ///
    /// Verifies the asset's declared collection and name against the
    /// expected values first — wiring up the wrong asset for sale is the
    /// kind of mistake that should fail loudly at setup, not at buy time.
    ///
    /// Calling setup again for a pair that is already configured
    /// **overwrites** the record (it is not idempotent); don't re-setup a
    /// live pair.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::IdentityMismatch`] if the declared identity
    /// differs from the expected one, and propagates catalog failures for
    /// unknown assets.
    pub fn setup<C: Currency>(
        &mut self,
        catalog: &dyn AssetCatalog,
        asset: &str,
        expected_collection: &str,
        expected_name: &str,
    ) -> Result<(), MarketError> {
        let collection = catalog.collection_of(asset)?;
        if collection != expected_collection {
            return Err(MarketError::IdentityMismatch {
                expected: expected_collection.to_string(),
                actual: collection,
            });
        }

        let name = catalog.name_of(asset)?;
        if name != expected_name {
            return Err(MarketError::IdentityMismatch {
                expected: expected_name.to_string(),
                actual: name,
            });
        }

        self.records
            .entry(asset.to_string())
            .or_default()
            .insert(C::CODE.to_string(), SaleRecord::new(C::CODE));
        self.custody.initialize(asset);

        debug!(asset, currency = C::CODE, "sale record configured");
        Ok(())
    }

    /// Opens a fixed-price listing for (asset, `C`) and takes the owner's
    /// transfer authorization into custody.
    ///
    /// The custody slot must be vacant: a live listing in *any* currency
    /// occupies it, and two listings for one asset cannot both be backed
    /// by the single transfer power.
    ///
    /// # Errors
    ///
    /// In check order: [`MarketError::NotOwner`],
    /// [`MarketError::IdentityMismatch`] (authorization bound to a
    /// different asset), [`MarketError::InvalidPrice`],
    /// [`MarketError::NotConfigured`], [`MarketError::AlreadyListed`].
    pub fn open_listing<C: Currency>(
        &mut self,
        registry: &dyn OwnershipRegistry,
        caller: &str,
        asset: &str,
        authorization: TransferAuthorization,
        price: u64,
    ) -> Result<(), MarketError> {
        require_owner(registry, caller, asset)?;

        if authorization.asset() != asset {
            return Err(MarketError::IdentityMismatch {
                expected: asset.to_string(),
                actual: authorization.asset().to_string(),
            });
        }

        if !price_in_bounds(price) {
            return Err(MarketError::InvalidPrice { price });
        }

        let record = self
            .record_at(asset, C::CODE)
            .ok_or_else(|| not_configured::<C>(asset))?;

        if record.is_active() || self.custody.is_held(asset) {
            return Err(MarketError::AlreadyListed {
                asset: asset.to_string(),
            });
        }

        self.custody.deposit(asset, authorization)?;
        // Infallible from here: the record was checked present above.
        if let Some(record) = self.record_at_mut(asset, C::CODE) {
            record.activate(caller, price);
        }

        info!(asset, currency = C::CODE, lister = caller, price, "listing opened");
        Ok(())
    }

    /// Changes the asking price of an active listing. Nothing else moves —
    /// the custody slot and lister are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotOwner`], [`MarketError::InvalidPrice`],
    /// [`MarketError::NotConfigured`], or [`MarketError::NotListed`].
    pub fn reprice<C: Currency>(
        &mut self,
        registry: &dyn OwnershipRegistry,
        caller: &str,
        asset: &str,
        new_price: u64,
    ) -> Result<(), MarketError> {
        require_owner(registry, caller, asset)?;

        if !price_in_bounds(new_price) {
            return Err(MarketError::InvalidPrice { price: new_price });
        }

        let record = self
            .record_at_mut(asset, C::CODE)
            .ok_or_else(|| not_configured::<C>(asset))?;

        if !record.is_active() {
            return Err(MarketError::NotListed {
                asset: asset.to_string(),
                currency: C::CODE,
            });
        }

        record.set_price(new_price);
        info!(asset, currency = C::CODE, price = new_price, "listing repriced");
        Ok(())
    }

    /// Closes the (asset, `C`) listing, resetting the record to its
    /// inactive zero state. Idempotent — cancelling an already-inactive
    /// listing succeeds.
    ///
    /// The custody slot is **not** released; the held authorization stays
    /// available for a future relisting. Use
    /// [`disable_permanently`](Self::disable_permanently) to reclaim it.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotOwner`] or [`MarketError::NotConfigured`].
    pub fn cancel_listing<C: Currency>(
        &mut self,
        registry: &dyn OwnershipRegistry,
        caller: &str,
        asset: &str,
    ) -> Result<(), MarketError> {
        require_owner(registry, caller, asset)?;

        let record = self
            .record_at_mut(asset, C::CODE)
            .ok_or_else(|| not_configured::<C>(asset))?;

        record.clear();
        info!(asset, currency = C::CODE, "listing cancelled");
        Ok(())
    }

    /// Withdraws the asset from sale entirely: closes the asset's listings
    /// in *every* configured currency and returns the custodied transfer
    /// authorization to the caller. The single slot backs all currencies,
    /// so vacating it cannot leave any record active. Until a fresh
    /// authorization is deposited by a later `open_listing`, no listing
    /// can be opened for this asset.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotOwner`], [`MarketError::NotConfigured`],
    /// or a custody [`Empty`](CustodyError::Empty) error if no
    /// authorization is held.
    pub fn disable_permanently<C: Currency>(
        &mut self,
        registry: &dyn OwnershipRegistry,
        caller: &str,
        asset: &str,
    ) -> Result<TransferAuthorization, MarketError> {
        require_owner(registry, caller, asset)?;

        // Check custody before touching the record so that a vacant slot
        // aborts the operation without clearing the listing state.
        if !self.custody.is_held(asset) {
            return Err(CustodyError::Empty {
                asset: asset.to_string(),
            }
            .into());
        }

        self.record_at(asset, C::CODE)
            .ok_or_else(|| not_configured::<C>(asset))?;

        // Every currency's listing rides on the one authorization being
        // withdrawn, so all of them close with it.
        if let Some(by_currency) = self.records.get_mut(asset) {
            for record in by_currency.values_mut() {
                record.clear();
            }
        }

        let authorization = self.custody.withdraw(asset)?;
        info!(asset, currency = C::CODE, "sales permanently disabled");
        Ok(authorization)
    }

    /// The atomic buy: pays the listed price and takes ownership in one
    /// indivisible step.
    ///
    /// The seller paid is the owner captured *before* any mutation — if
    /// the asset changed hands outside the protocol after listing, the
    /// staleness check aborts rather than paying a no-longer-authorized
    /// seller. The custody slot keeps its durable authorization; only the
    /// derived single-use ticket is consumed.
    ///
    /// # Errors
    ///
    /// In check order: [`MarketError::AlreadyOwner`],
    /// [`MarketError::NotConfigured`], [`MarketError::NotListed`],
    /// [`MarketError::OwnerChanged`], custody
    /// [`Empty`](CustodyError::Empty), the ledger's
    /// [`InsufficientBalance`](LedgerError::InsufficientBalance),
    /// [`MarketError::PaymentExhausted`] if fees consume the whole price,
    /// and the ledger's [`Overflow`](LedgerError::Overflow) if the seller
    /// cannot absorb the proceeds. Every failure, the overflow included,
    /// leaves the listing active and ownership unmoved.
    pub fn flash_buy<C: Currency>(
        &mut self,
        registry: &mut dyn OwnershipRegistry,
        ledger: &mut dyn BalanceLedger<C>,
        royalty: Option<&dyn RoyaltyEngine<C>>,
        buyer: &str,
        asset: &str,
    ) -> Result<SaleReceipt, MarketError> {
        if registry.is_owner(asset, buyer) {
            return Err(MarketError::AlreadyOwner {
                asset: asset.to_string(),
                buyer: buyer.to_string(),
            });
        }

        let record = self
            .record_at(asset, C::CODE)
            .ok_or_else(|| not_configured::<C>(asset))?;
        let price = record.price();
        let recorded_seller = record
            .lister()
            .ok_or_else(|| MarketError::NotListed {
                asset: asset.to_string(),
                currency: C::CODE,
            })?
            .to_string();

        // Captured before any mutation; this is who gets paid, even though
        // ownership moves before the deposit below.
        let current_owner = registry.owner(asset)?;
        if recorded_seller != current_owner {
            return Err(MarketError::OwnerChanged {
                recorded: recorded_seller,
                actual: current_owner,
            });
        }

        let ticket = self.custody.mint_ticket(asset)?;

        let mut payment = ledger.withdraw(buyer, price)?;
        if let Some(engine) = royalty {
            engine.apply(ledger, &mut payment, asset)?;
        }

        let net_proceeds = payment.amount();
        if net_proceeds == 0 {
            return Err(MarketError::PaymentExhausted { price });
        }

        // The seller is paid before ownership moves and before the record
        // is cleared: a failed deposit (fee-account or seller overflow)
        // aborts with the listing intact and the asset still the seller's,
        // rather than destroying the payment mid-settlement.
        ledger.deposit(&current_owner, payment)?;
        registry.transfer(ticket, buyer)?;

        if let Some(record) = self.record_at_mut(asset, C::CODE) {
            record.clear();
        }

        info!(
            asset,
            currency = C::CODE,
            buyer,
            seller = %current_owner,
            price,
            net_proceeds,
            "flash buy settled"
        );

        Ok(SaleReceipt {
            receipt_id: Uuid::new_v4().to_string(),
            asset: asset.to_string(),
            currency: C::CODE.to_string(),
            seller: current_owner,
            buyer: buyer.to_string(),
            price,
            royalty_paid: price - net_proceeds,
            net_proceeds,
            completed_at: Utc::now(),
        })
    }

    // -- internals ----------------------------------------------------------

    fn record_at(&self, asset: &str, currency: &str) -> Option<&SaleRecord> {
        self.records
            .get(asset)
            .and_then(|by_currency| by_currency.get(currency))
    }

    fn record_at_mut(&mut self, asset: &str, currency: &str) -> Option<&mut SaleRecord> {
        self.records
            .get_mut(asset)
            .and_then(|by_currency| by_currency.get_mut(currency))
    }
}

fn require_owner(
    registry: &dyn OwnershipRegistry,
    caller: &str,
    asset: &str,
) -> Result<(), MarketError> {
    if registry.is_owner(asset, caller) {
        Ok(())
    } else {
        Err(MarketError::NotOwner {
            asset: asset.to_string(),
            caller: caller.to_string(),
        })
    }
}

fn not_configured<C: Currency>(asset: &str) -> MarketError {
    MarketError::NotConfigured {
        asset: asset.to_string(),
        currency: C::CODE,
    }
}
