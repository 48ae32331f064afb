//! Integration tests for the instant-sale marketplace.
//!
//! These tests exercise full sale lifecycles across module boundaries,
//! wiring the marketplace to the in-memory registry and ledgers the way a
//! node embedding the contracts would: basic sales, royalty routing,
//! double-buy and stale-listing defenses, and cross-currency exclusivity.

use vela_contracts::custody::CustodyError;
use vela_contracts::marketplace::{MarketError, Marketplace};
use vela_protocol::ledger::{BalanceLedger, InMemoryLedger, LedgerError, Nova, Usd};
use vela_protocol::registry::{AssetId, InMemoryRegistry, OwnershipRegistry};
use vela_protocol::royalty::BasisPointRoyalty;

/// A registry, a NOVA ledger, and a marketplace, pre-wired.
struct World {
    registry: InMemoryRegistry,
    ledger: InMemoryLedger<Nova>,
    market: Marketplace,
}

impl World {
    fn new() -> Self {
        Self {
            registry: InMemoryRegistry::new(),
            ledger: InMemoryLedger::new(),
            market: Marketplace::new(),
        }
    }

    /// Registers an asset for `owner` and configures its NOVA sale record.
    fn mint_configured(&mut self, owner: &str) -> AssetId {
        let asset = self.registry.register("genesis", "Vela #1", owner);
        self.market
            .setup::<Nova>(&self.registry, &asset, "genesis", "Vela #1")
            .unwrap();
        asset
    }

    /// Opens a NOVA listing with a freshly granted authorization.
    fn list(&mut self, owner: &str, asset: &str, price: u64) {
        let grant = self.registry.authorize_transfer(owner, asset).unwrap();
        self.market
            .open_listing::<Nova>(&self.registry, owner, asset, grant, price)
            .unwrap();
    }
}

// ---------------------------------------------------------------------------
// Scenario A — basic sale
// ---------------------------------------------------------------------------

#[test]
fn basic_sale_moves_asset_and_funds() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("seller", 100);
    w.ledger.open_account("buyer", 100);
    w.list("seller", &asset, 10);

    let receipt = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset)
        .unwrap();

    assert_eq!(w.ledger.balance("buyer"), 90);
    assert_eq!(w.ledger.balance("seller"), 110);
    assert!(w.registry.is_owner(&asset, "buyer"));

    // Record reset to inactive, custody slot still occupied.
    let record = w.market.record_of::<Nova>(&asset).unwrap();
    assert!(!record.is_active());
    assert_eq!(record.price(), 0);
    assert!(w.market.is_custodied(&asset));

    assert_eq!(receipt.price, 10);
    assert_eq!(receipt.royalty_paid, 0);
    assert_eq!(receipt.net_proceeds, 10);
    assert_eq!(receipt.seller, "seller");
    assert_eq!(receipt.buyer, "buyer");
}

// ---------------------------------------------------------------------------
// Scenario B — royalty routing
// ---------------------------------------------------------------------------

#[test]
fn sale_with_royalty_routes_fee_before_payout() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("seller", 100);
    w.ledger.open_account("buyer", 100);
    w.list("seller", &asset, 10);

    let royalty = BasisPointRoyalty::new("treasury", 1_000); // 10%
    let receipt = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, Some(&royalty), "buyer", &asset)
        .unwrap();

    // 10 paid, 1 routed to the treasury, 9 net to the seller.
    assert_eq!(w.ledger.balance("buyer"), 90);
    assert_eq!(w.ledger.balance("treasury"), 1);
    assert_eq!(w.ledger.balance("seller"), 109);
    assert_eq!(receipt.royalty_paid, 1);
    assert_eq!(receipt.net_proceeds, 9);
}

#[test]
fn royalty_consuming_whole_payment_aborts_the_sale() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 100);
    w.list("seller", &asset, 10);

    let royalty = BasisPointRoyalty::new("treasury", 10_000); // 100%
    let result =
        w.market
            .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, Some(&royalty), "buyer", &asset);

    assert!(matches!(result, Err(MarketError::PaymentExhausted { .. })));
    // The marketplace rolled nothing forward: still listed, still custodied,
    // asset still the seller's.
    assert_eq!(w.market.listing::<Nova>(&asset), Some(("seller", 10)));
    assert!(w.market.is_custodied(&asset));
    assert!(w.registry.is_owner(&asset, "seller"));
}

// ---------------------------------------------------------------------------
// Scenario C — double buy
// ---------------------------------------------------------------------------

#[test]
fn second_buy_after_a_sale_is_rejected() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 100);
    w.ledger.open_account("late-buyer", 100);
    w.list("seller", &asset, 10);

    w.market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset)
        .unwrap();

    let result =
        w.market
            .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "late-buyer", &asset);
    assert!(matches!(result, Err(MarketError::NotListed { .. })));
    assert_eq!(w.ledger.balance("late-buyer"), 100);
    assert!(w.registry.is_owner(&asset, "buyer"));
}

// ---------------------------------------------------------------------------
// Scenario D — stale listing
// ---------------------------------------------------------------------------

#[test]
fn buy_after_external_ownership_change_is_rejected() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 100);
    w.list("seller", &asset, 10);

    // The asset changes hands outside the protocol: the owner grants a
    // fresh authorization and transfers directly through the registry.
    let side_grant = w.registry.authorize_transfer("seller", &asset).unwrap();
    w.registry.transfer(side_grant.ticket(), "carol").unwrap();

    let result = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset);
    assert!(matches!(result, Err(MarketError::OwnerChanged { .. })));
    // Nobody was paid, nothing moved.
    assert_eq!(w.ledger.balance("buyer"), 100);
    assert!(w.registry.is_owner(&asset, "carol"));
}

// ---------------------------------------------------------------------------
// Scenario E — self buy
// ---------------------------------------------------------------------------

#[test]
fn owner_cannot_buy_their_own_listing() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("seller", 100);
    w.list("seller", &asset, 10);

    let result = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "seller", &asset);
    assert!(matches!(result, Err(MarketError::AlreadyOwner { .. })));
    assert_eq!(w.ledger.balance("seller"), 100);
    assert!(w.market.is_listed::<Nova>(&asset));
}

// ---------------------------------------------------------------------------
// Scenario F — cross-currency exclusivity
// ---------------------------------------------------------------------------

#[test]
fn one_custody_slot_gates_all_currencies() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.market
        .setup::<Usd>(&w.registry, &asset, "genesis", "Vela #1")
        .unwrap();
    w.list("seller", &asset, 10);

    // A USD listing competes for the same custody slot and must lose.
    let grant = w.registry.authorize_transfer("seller", &asset).unwrap();
    let result = w
        .market
        .open_listing::<Usd>(&w.registry, "seller", &asset, grant, 500);
    assert!(matches!(result, Err(MarketError::AlreadyListed { .. })));

    // Permanently disabling the NOVA side releases the slot; USD can then
    // list with a fresh authorization.
    w.market
        .disable_permanently::<Nova>(&w.registry, "seller", &asset)
        .unwrap();
    let grant = w.registry.authorize_transfer("seller", &asset).unwrap();
    w.market
        .open_listing::<Usd>(&w.registry, "seller", &asset, grant, 500)
        .unwrap();
    assert_eq!(w.market.listing::<Usd>(&asset), Some(("seller", 500)));
}

#[test]
fn cancelled_listing_keeps_custody_occupied() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.market
        .setup::<Usd>(&w.registry, &asset, "genesis", "Vela #1")
        .unwrap();
    w.list("seller", &asset, 10);

    w.market
        .cancel_listing::<Nova>(&w.registry, "seller", &asset)
        .unwrap();

    // The authorization is still in protective custody, so the slot still
    // rejects a new deposit — reclaiming it goes through a permanent
    // disable, which is the owner's explicit release.
    let grant = w.registry.authorize_transfer("seller", &asset).unwrap();
    let result = w
        .market
        .open_listing::<Usd>(&w.registry, "seller", &asset, grant, 500);
    assert!(matches!(result, Err(MarketError::AlreadyListed { .. })));
    assert!(w.market.is_custodied(&asset));
}

// ---------------------------------------------------------------------------
// Decommission and relisting
// ---------------------------------------------------------------------------

#[test]
fn disable_then_relist_requires_fresh_authorization() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.list("seller", &asset, 10);

    let returned = w
        .market
        .disable_permanently::<Nova>(&w.registry, "seller", &asset)
        .unwrap();
    assert_eq!(returned.asset(), asset);
    assert!(!w.market.is_custodied(&asset));

    // With custody vacant, a relisting deposits a fresh grant and works.
    w.list("seller", &asset, 20);
    assert_eq!(w.market.listing::<Nova>(&asset), Some(("seller", 20)));
    assert!(w.market.is_custodied(&asset));
}

#[test]
fn new_owner_relists_after_reclaiming_the_slot() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 100);
    w.list("seller", &asset, 10);

    w.market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset)
        .unwrap();

    // The previous owner's grant still sits in custody. The new owner
    // reclaims the slot and lists with their own authorization.
    let stale_grant = w
        .market
        .disable_permanently::<Nova>(&w.registry, "buyer", &asset)
        .unwrap();
    assert_eq!(stale_grant.asset(), asset);

    w.list("buyer", &asset, 30);
    assert_eq!(w.market.listing::<Nova>(&asset), Some(("buyer", 30)));

    // And the next sale settles against the new owner.
    w.ledger.open_account("carol", 50);
    let receipt = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "carol", &asset)
        .unwrap();
    assert_eq!(receipt.seller, "buyer");
    assert_eq!(w.ledger.balance("carol"), 20);
    assert!(w.registry.is_owner(&asset, "carol"));
}

#[test]
fn disable_in_any_currency_closes_every_listing() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.market
        .setup::<Usd>(&w.registry, &asset, "genesis", "Vela #1")
        .unwrap();
    w.list("seller", &asset, 10);

    // Disabling through the USD handle withdraws the one authorization
    // that backed the NOVA listing, so the NOVA record must close with
    // it — an active record over a vacant slot would be unsellable.
    w.market
        .disable_permanently::<Usd>(&w.registry, "seller", &asset)
        .unwrap();
    assert!(!w.market.is_custodied(&asset));
    assert_eq!(w.market.listing::<Nova>(&asset), None);
    assert!(!w.market.record_of::<Nova>(&asset).unwrap().is_active());
}

#[test]
fn previous_owner_cannot_operate_after_a_sale() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 100);
    w.list("seller", &asset, 10);

    w.market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset)
        .unwrap();

    let result = w
        .market
        .disable_permanently::<Nova>(&w.registry, "seller", &asset);
    assert!(matches!(result, Err(MarketError::NotOwner { .. })));

    let result = w.market.cancel_listing::<Nova>(&w.registry, "seller", &asset);
    assert!(matches!(result, Err(MarketError::NotOwner { .. })));
}

// ---------------------------------------------------------------------------
// Custody error surfacing
// ---------------------------------------------------------------------------

#[test]
fn buy_after_disable_is_rejected() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 100);
    w.list("seller", &asset, 10);

    // Disable clears the listing along with custody, so the buy fails at
    // the listing check — custody can never be the first thing to trip.
    w.market
        .disable_permanently::<Nova>(&w.registry, "seller", &asset)
        .unwrap();

    let result = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset);
    assert!(matches!(result, Err(MarketError::NotListed { .. })));
}

#[test]
fn exact_balance_buy_succeeds() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 10);
    w.list("seller", &asset, 10);

    w.market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset)
        .unwrap();
    assert_eq!(w.ledger.balance("buyer"), 0);
    assert_eq!(w.ledger.balance("seller"), 10);
}

#[test]
fn insufficient_balance_error_carries_context() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("buyer", 7);
    w.list("seller", &asset, 10);

    let result = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset);
    match result {
        Err(MarketError::Ledger(LedgerError::InsufficientBalance {
            available,
            requested,
            ..
        })) => {
            assert_eq!(available, 7);
            assert_eq!(requested, 10);
        }
        other => panic!("expected insufficient balance, got {other:?}"),
    }
}

#[test]
fn seller_overflow_aborts_with_the_listing_intact() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");
    w.ledger.open_account("seller", u64::MAX);
    w.ledger.open_account("buyer", 10);
    w.list("seller", &asset, 10);

    let result = w
        .market
        .flash_buy::<Nova>(&mut w.registry, &mut w.ledger, None, "buyer", &asset);
    assert!(matches!(
        result,
        Err(MarketError::Ledger(LedgerError::Overflow { .. }))
    ));

    // The marketplace rolled nothing forward: still listed, still
    // custodied, still the seller's asset, seller balance untouched.
    assert_eq!(w.market.listing::<Nova>(&asset), Some(("seller", 10)));
    assert!(w.market.is_custodied(&asset));
    assert!(w.registry.is_owner(&asset, "seller"));
    assert_eq!(w.ledger.balance("seller"), u64::MAX);
}

#[test]
fn empty_custody_error_names_the_asset() {
    let mut w = World::new();
    let asset = w.mint_configured("seller");

    let result = w
        .market
        .disable_permanently::<Nova>(&w.registry, "seller", &asset);
    match result {
        Err(MarketError::Custody(CustodyError::Empty { asset: reported })) => {
            assert_eq!(reported, asset);
        }
        other => panic!("expected empty custody, got {other:?}"),
    }
}
