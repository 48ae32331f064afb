//! # Capability Custody
//!
//! Protective custody for transfer authorizations. Each asset has at most
//! one custody slot, and each slot holds at most one durable
//! [`TransferAuthorization`] at a time. While an authorization sits in
//! custody, the marketplace — and only the marketplace — has standing
//! power to transfer the asset, which is what makes a listing in *any*
//! currency effective.
//!
//! The slot is deliberately strict:
//!
//! - Depositing into an occupied slot is a protocol error. Authorizations
//!   are never silently replaced or merged.
//! - A successful sale does **not** empty the slot. Sales consume
//!   single-use tickets derived from the held authorization via
//!   [`CustodyVault::mint_ticket`]; the durable grant stays put until the
//!   asset is permanently withdrawn from sale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use vela_protocol::registry::{AssetId, TransferAuthorization, TransferTicket};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during custody operations.
#[derive(Debug, Error)]
pub enum CustodyError {
    /// The slot already holds an authorization. Deposits never replace.
    #[error("custody slot for asset {asset} already holds an authorization")]
    AlreadyHeld {
        /// The asset whose slot was occupied.
        asset: AssetId,
    },

    /// The slot holds nothing, but the operation needs an authorization.
    #[error("custody slot for asset {asset} is empty")]
    Empty {
        /// The asset whose slot was vacant.
        asset: AssetId,
    },

    /// The presented authorization is bound to a different asset.
    #[error("authorization is bound to asset {bound}, not {expected}")]
    AssetMismatch {
        /// The asset the caller named.
        expected: AssetId,
        /// The asset the authorization is actually bound to.
        bound: AssetId,
    },
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Custody slot for a single asset.
#[derive(Debug, Serialize, Deserialize)]
pub struct CustodySlot {
    /// The held authorization, present iff the marketplace currently has
    /// standing power to transfer the asset.
    held: Option<TransferAuthorization>,
    /// When the slot was first created.
    created_at: DateTime<Utc>,
    /// Timestamp of the most recent deposit or withdrawal.
    updated_at: DateTime<Utc>,
}

impl CustodySlot {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            held: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if an authorization is currently held.
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// When the slot was first created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the most recent deposit or withdrawal.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Per-asset custody slots, keyed by asset ID.
///
/// The vault is owned by the [`Marketplace`](crate::marketplace::Marketplace)
/// and persists independent of who currently owns any asset — ownership can
/// change hands while the sale infrastructure stays addressable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CustodyVault {
    /// Custody slots keyed by asset ID.
    slots: HashMap<AssetId, CustodySlot>,
}

impl CustodyVault {
    /// Creates an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a (possibly empty) slot exists for `asset`.
    ///
    /// Idempotent: initializing an existing slot is a no-op, never an
    /// error, and never disturbs a held authorization.
    pub fn initialize(&mut self, asset: &str) {
        self.slots
            .entry(asset.to_string())
            .or_insert_with(CustodySlot::new);
    }

    /// Places a durable authorization into the asset's slot.
    ///
    /// Creates the slot if [`initialize`](Self::initialize) was never
    /// called for this asset.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::AssetMismatch`] if the authorization is
    /// bound to a different asset, and [`CustodyError::AlreadyHeld`] if
    /// the slot is occupied. A rejected authorization is dropped; owners
    /// mint a fresh grant from the registry when they retry.
    pub fn deposit(
        &mut self,
        asset: &str,
        authorization: TransferAuthorization,
    ) -> Result<(), CustodyError> {
        if authorization.asset() != asset {
            return Err(CustodyError::AssetMismatch {
                expected: asset.to_string(),
                bound: authorization.asset().to_string(),
            });
        }

        let slot = self
            .slots
            .entry(asset.to_string())
            .or_insert_with(CustodySlot::new);

        if slot.held.is_some() {
            return Err(CustodyError::AlreadyHeld {
                asset: asset.to_string(),
            });
        }

        slot.held = Some(authorization);
        slot.updated_at = Utc::now();
        Ok(())
    }

    /// Removes and returns the held authorization, vacating the slot.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::Empty`] if no authorization is held.
    pub fn withdraw(&mut self, asset: &str) -> Result<TransferAuthorization, CustodyError> {
        let slot = self.slots.get_mut(asset).ok_or_else(|| CustodyError::Empty {
            asset: asset.to_string(),
        })?;

        let authorization = slot.held.take().ok_or_else(|| CustodyError::Empty {
            asset: asset.to_string(),
        })?;

        slot.updated_at = Utc::now();
        Ok(authorization)
    }

    /// Derives a single-use transfer ticket from the held authorization.
    ///
    /// The durable authorization stays in the slot — only the returned
    /// ticket is consumed by the subsequent transfer.
    ///
    /// # Errors
    ///
    /// Returns [`CustodyError::Empty`] if the slot is vacant or was never
    /// created.
    pub fn mint_ticket(&self, asset: &str) -> Result<TransferTicket, CustodyError> {
        self.slots
            .get(asset)
            .and_then(|slot| slot.held.as_ref())
            .map(TransferAuthorization::ticket)
            .ok_or_else(|| CustodyError::Empty {
                asset: asset.to_string(),
            })
    }

    /// Returns `true` if an authorization is currently held for `asset`.
    pub fn is_held(&self, asset: &str) -> bool {
        self.slots
            .get(asset)
            .map(CustodySlot::is_held)
            .unwrap_or(false)
    }

    /// Returns the slot for `asset`, if one was ever created.
    pub fn slot(&self, asset: &str) -> Option<&CustodySlot> {
        self.slots.get(asset)
    }

    /// Number of slots ever created (occupied or not).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
