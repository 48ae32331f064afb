//! # Asset Ownership Registry
//!
//! The registry is the source of truth for who owns which asset, and the
//! only place transfer capabilities come from. Ownership can change in
//! exactly one way: somebody presents a [`TransferTicket`] to
//! [`OwnershipRegistry::transfer`].
//!
//! ## Capability Model
//!
//! Two credential types, with very different lifetimes:
//!
//! - [`TransferAuthorization`] — a *durable* grant of standing power to
//!   transfer one specific asset. Only the current owner can obtain one
//!   (via [`OwnershipRegistry::authorize_transfer`]). It is never consumed
//!   by a transfer; it acts as a factory for tickets.
//! - [`TransferTicket`] — a *single-use* derivative, valid for exactly one
//!   transfer. The `transfer` call takes it by value, so a ticket that has
//!   been presented once cannot be referenced again. Neither type is
//!   `Clone` — duplication is not an operation that exists.
//!
//! The registry does not know or care about prices, listings, or royalties.
//! Sale orchestration lives in `vela-contracts`; this module only answers
//! ownership questions and honors capabilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Hex-encoded public key identifying an account.
pub type Address = String;

/// Unique identifier for a registered asset, assigned at mint time.
pub type AssetId = String;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced asset has never been registered.
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    /// The caller requested a privilege reserved for the asset's owner.
    #[error("not the owner: {caller} does not own asset {asset}")]
    NotOwner {
        /// The asset in question.
        asset: AssetId,
        /// The address that made the request.
        caller: Address,
    },
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Durable authorization to transfer one specific asset.
///
/// Granted by the registry to the asset's current owner, and deliberately
/// not `Clone`: there is exactly one live grant per call to
/// [`OwnershipRegistry::authorize_transfer`]. The grant is never consumed
/// by a transfer — tickets derived from it are.
///
/// Serializable so a custodian can persist it alongside its other state.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferAuthorization {
    /// The asset this grant is bound to.
    asset: AssetId,
    /// Unique identity of this grant.
    grant_id: Uuid,
    /// When the registry issued the grant.
    granted_at: DateTime<Utc>,
}

impl TransferAuthorization {
    pub(crate) fn new(asset: AssetId) -> Self {
        Self {
            asset,
            grant_id: Uuid::new_v4(),
            granted_at: Utc::now(),
        }
    }

    /// The asset this authorization is bound to.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Unique identity of this grant.
    pub fn grant_id(&self) -> Uuid {
        self.grant_id
    }

    /// When the registry issued this grant.
    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Derives a single-use [`TransferTicket`] for the bound asset.
    ///
    /// Does not consume the authorization — a durable grant can back any
    /// number of tickets over its lifetime, one per transfer.
    pub fn ticket(&self) -> TransferTicket {
        TransferTicket {
            asset: self.asset.clone(),
            grant_id: self.grant_id,
        }
    }
}

/// Single-use authorization for exactly one ownership transfer.
///
/// Obtained from [`TransferAuthorization::ticket`] and consumed by value
/// in [`OwnershipRegistry::transfer`]. Not `Clone`, not `Serialize`:
/// a ticket lives and dies inside one operation.
#[derive(Debug)]
pub struct TransferTicket {
    asset: AssetId,
    grant_id: Uuid,
}

impl TransferTicket {
    /// The asset this ticket can transfer.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Identity of the durable grant this ticket was derived from.
    pub fn grant_id(&self) -> Uuid {
        self.grant_id
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Narrow interface over the ownership source of truth.
///
/// The sale core holds no ownership state of its own — every ownership
/// question and every transfer goes through this trait.
pub trait OwnershipRegistry {
    /// Returns `true` if `address` is the current owner of `asset`.
    ///
    /// Unknown assets are owned by nobody.
    fn is_owner(&self, asset: &str, address: &str) -> bool;

    /// Returns the current owner of `asset`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownAsset`] if the asset does not exist.
    fn owner(&self, asset: &str) -> Result<Address, RegistryError>;

    /// Grants a durable transfer authorization for `asset` to its owner.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotOwner`] unless `caller` currently owns
    /// the asset. Returns [`RegistryError::UnknownAsset`] if the asset
    /// does not exist.
    fn authorize_transfer(
        &self,
        caller: &str,
        asset: &str,
    ) -> Result<TransferAuthorization, RegistryError>;

    /// Consumes a single-use ticket and reassigns ownership to `recipient`.
    ///
    /// Returns the previous owner's address.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownAsset`] if the ticket's asset is no
    /// longer registered.
    fn transfer(
        &mut self,
        ticket: TransferTicket,
        recipient: &str,
    ) -> Result<Address, RegistryError>;
}

/// Setup-time identity source: the declared collection and name of an asset.
///
/// Used once per sale-record setup to verify that the asset being wired up
/// for sale is the asset the operator thinks it is.
pub trait AssetCatalog {
    /// The collection the asset was minted under.
    fn collection_of(&self, asset: &str) -> Result<String, RegistryError>;

    /// The asset's name within its collection.
    fn name_of(&self, asset: &str) -> Result<String, RegistryError>;
}

// ---------------------------------------------------------------------------
// In-memory reference registry
// ---------------------------------------------------------------------------

/// Registration entry for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Collection the asset belongs to (e.g., "vela-genesis").
    pub collection: String,
    /// Asset name within the collection.
    pub name: String,
    /// Current owner.
    pub owner: Address,
    /// When the asset was registered.
    pub minted_at: DateTime<Utc>,
}

/// In-memory ownership registry.
///
/// In production, ownership would live in the protocol's state trie. This
/// representation carries the same semantics for validation logic, local
/// deployments, and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryRegistry {
    /// Registered assets keyed by their unique ID.
    assets: HashMap<AssetId, AssetRecord>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new asset and returns its freshly minted ID.
    pub fn register(&mut self, collection: &str, name: &str, owner: &str) -> AssetId {
        let asset_id = Uuid::new_v4().to_string();
        self.assets.insert(
            asset_id.clone(),
            AssetRecord {
                collection: collection.to_string(),
                name: name.to_string(),
                owner: owner.to_string(),
                minted_at: Utc::now(),
            },
        );
        asset_id
    }

    /// Returns the registration entry for `asset`, if any.
    pub fn record(&self, asset: &str) -> Option<&AssetRecord> {
        self.assets.get(asset)
    }

    /// Returns the number of registered assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }
}

impl OwnershipRegistry for InMemoryRegistry {
    fn is_owner(&self, asset: &str, address: &str) -> bool {
        self.assets
            .get(asset)
            .map(|record| record.owner == address)
            .unwrap_or(false)
    }

    fn owner(&self, asset: &str) -> Result<Address, RegistryError> {
        self.assets
            .get(asset)
            .map(|record| record.owner.clone())
            .ok_or_else(|| RegistryError::UnknownAsset(asset.to_string()))
    }

    fn authorize_transfer(
        &self,
        caller: &str,
        asset: &str,
    ) -> Result<TransferAuthorization, RegistryError> {
        let record = self
            .assets
            .get(asset)
            .ok_or_else(|| RegistryError::UnknownAsset(asset.to_string()))?;

        if record.owner != caller {
            return Err(RegistryError::NotOwner {
                asset: asset.to_string(),
                caller: caller.to_string(),
            });
        }

        Ok(TransferAuthorization::new(asset.to_string()))
    }

    fn transfer(
        &mut self,
        ticket: TransferTicket,
        recipient: &str,
    ) -> Result<Address, RegistryError> {
        let record = self
            .assets
            .get_mut(ticket.asset())
            .ok_or_else(|| RegistryError::UnknownAsset(ticket.asset().to_string()))?;

        let previous = std::mem::replace(&mut record.owner, recipient.to_string());
        Ok(previous)
    }
}

impl AssetCatalog for InMemoryRegistry {
    fn collection_of(&self, asset: &str) -> Result<String, RegistryError> {
        self.assets
            .get(asset)
            .map(|record| record.collection.clone())
            .ok_or_else(|| RegistryError::UnknownAsset(asset.to_string()))
    }

    fn name_of(&self, asset: &str) -> Result<String, RegistryError> {
        self.assets
            .get(asset)
            .map(|record| record.name.clone())
            .ok_or_else(|| RegistryError::UnknownAsset(asset.to_string()))
    }
}
