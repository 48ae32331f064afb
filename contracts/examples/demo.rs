//! CLI demo of the full instant-sale lifecycle.
//!
//! Walks through asset registration, sale-record setup, listing, a royalty
//! sale, and the relisting dance after ownership changes hands. Set
//! `RUST_LOG=info` to see the marketplace's structured events interleaved
//! with the narration.
//!
//! Run with:
//!   cargo run --example demo -p vela-contracts

use vela_contracts::marketplace::Marketplace;
use vela_protocol::ledger::{BalanceLedger, InMemoryLedger, Nova};
use vela_protocol::registry::{InMemoryRegistry, OwnershipRegistry};
use vela_protocol::royalty::BasisPointRoyalty;

const BOLD: &str = "\x1b[1m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[ Step {num} ]==================================================={RESET}");
    println!("{BOLD}  {title}{RESET}");
}

fn balances(ledger: &InMemoryLedger<Nova>, accounts: &[&str]) {
    for account in accounts {
        println!("    {account:<10} {} NOVA", ledger.balance(account));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut registry = InMemoryRegistry::new();
    let mut ledger = InMemoryLedger::<Nova>::new();
    let mut market = Marketplace::new();

    section(1, "Mint an asset and seed balances");
    let asset = registry.register("vela-genesis", "Vela #001", "alice");
    ledger.open_account("alice", 100);
    ledger.open_account("bob", 100);
    println!("    asset {asset} minted to alice");

    section(2, "Configure the sale record");
    market
        .setup::<Nova>(&registry, &asset, "vela-genesis", "Vela #001")
        .expect("setup");
    println!("    NOVA sale record configured, custody slot created");

    section(3, "Alice lists at 10 NOVA");
    let grant = registry
        .authorize_transfer("alice", &asset)
        .expect("authorize");
    market
        .open_listing::<Nova>(&registry, "alice", &asset, grant, 10)
        .expect("open listing");
    println!("    transfer authorization taken into custody");

    section(4, "Bob flash-buys with a 10% royalty in force");
    let royalty = BasisPointRoyalty::new("treasury", 1_000);
    let receipt = market
        .flash_buy::<Nova>(&mut registry, &mut ledger, Some(&royalty), "bob", &asset)
        .expect("flash buy");
    println!(
        "    settled: {} gross, {} royalty, {} net to {}",
        receipt.price, receipt.royalty_paid, receipt.net_proceeds, receipt.seller
    );
    balances(&ledger, &["alice", "bob", "treasury"]);

    section(5, "Bob reclaims the custody slot and relists at 30");
    let stale = market
        .disable_permanently::<Nova>(&registry, "bob", &asset)
        .expect("disable");
    println!("    alice's old grant ({}) returned and discarded", stale.grant_id());
    let grant = registry.authorize_transfer("bob", &asset).expect("authorize");
    market
        .open_listing::<Nova>(&registry, "bob", &asset, grant, 30)
        .expect("relist");
    println!("    asset live again at 30 NOVA, seller bob");

    println!();
    println!("{BOLD}{GREEN}  Demo complete — one asset, two owners, zero escrow.{RESET}");
    println!();
}
