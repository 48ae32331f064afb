//! # Royalty Routing
//!
//! Optional fee deduction applied to a payment while it is in flight
//! between buyer and seller. The sale core treats the engine as a black
//! box: it hands over the payment and the ledger, and whatever remains in
//! the payment afterwards goes to the seller.
//!
//! An engine must only ever *shrink* the payment — [`Payment::split`] is
//! the intended mechanism, and it cannot create value out of thin air.

use serde::{Deserialize, Serialize};

use crate::ledger::{BalanceLedger, Currency, LedgerError, Payment};
use crate::registry::Address;

// ---------------------------------------------------------------------------
// Engine trait
// ---------------------------------------------------------------------------

/// A fee policy applied to payments in flight.
pub trait RoyaltyEngine<C: Currency> {
    /// Deducts this engine's fee for `asset` from `payment` in place and
    /// routes it through `ledger` to wherever the fee belongs.
    ///
    /// # Errors
    ///
    /// Propagates ledger failures (e.g., a fee-account overflow). Engines
    /// must not fail after partially routing a fee.
    fn apply(
        &self,
        ledger: &mut dyn BalanceLedger<C>,
        payment: &mut Payment<C>,
        asset: &str,
    ) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// Basis-point reference engine
// ---------------------------------------------------------------------------

/// Flat-rate royalty: a fixed share of every sale, in basis points,
/// routed to a single beneficiary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasisPointRoyalty {
    /// Account the fee is routed to.
    pub beneficiary: Address,
    /// Fee rate in basis points (1 bp = 0.01%). Capped at [`Self::MAX_BPS`].
    pub rate_bps: u32,
}

impl BasisPointRoyalty {
    /// 100% — the whole payment. Rates above this are clamped.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a new engine routing `rate_bps` of every sale to
    /// `beneficiary`.
    pub fn new(beneficiary: &str, rate_bps: u32) -> Self {
        Self {
            beneficiary: beneficiary.to_string(),
            rate_bps: rate_bps.min(Self::MAX_BPS),
        }
    }

    /// The fee due on a payment of `amount`, rounded down.
    pub fn fee_for(&self, amount: u64) -> u64 {
        // u128 intermediate: amount * 10_000 bps can exceed u64.
        ((amount as u128 * self.rate_bps as u128) / Self::MAX_BPS as u128) as u64
    }
}

impl<C: Currency> RoyaltyEngine<C> for BasisPointRoyalty {
    fn apply(
        &self,
        ledger: &mut dyn BalanceLedger<C>,
        payment: &mut Payment<C>,
        _asset: &str,
    ) -> Result<(), LedgerError> {
        let fee = self.fee_for(payment.amount());
        if fee == 0 {
            return Ok(());
        }

        let cut = payment.split(fee)?;
        ledger.deposit(&self.beneficiary, cut)?;
        Ok(())
    }
}
