//! Engine Tests: issuance → payment → sweep against an in-memory chain
//!
//! These tests verify:
//! 1. Issued addresses are the standard BIP44 coin-145 addresses
//! 2. A payment moves the monitor from unpaid to paid with confirmations
//! 3. A three-address sweep produces the pinned raw transaction
//! 4. Sealed seeds configured through the environment open the same wallet

use cashdrop::chain::{AddressSummary, AddressTransaction};
use cashdrop::config::vars;
use cashdrop::{
    AtomicIndexAllocator, CashAddress, EngineConfig, InMemoryChain, Network, PaymentMonitor, PaymentStatus,
    SweepConfig, SweepSource, Sweeper, Wallet, WalletError, WalletSeed,
};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use std::time::Duration;

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner())
}

fn clear_env() {
    for key in [
        vars::NETWORK,
        vars::FEE_SATS,
        vars::API_MAINNET,
        vars::API_TESTNET,
        vars::HTTP_TIMEOUT_SECS,
        vars::SWEEP_CONCURRENCY,
        vars::POLL_SECS,
        vars::SEALED_SEED,
        vars::SEED_SECRET,
    ] {
        std::env::remove_var(key);
    }
}

// Test mnemonic (well-known, never use with real funds)
const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

const DESTINATION: &str = "bitcoincash:qr6m7j9njldwwzlg9v7v53unlr4jkmx6eylep8ekg2";

const GOLDEN_SWEEP_HEX: &str = "0200000003aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa000000006a473044022028a4609dd883bd32d0c356466c28d490d33e3c5c1ce236d9135e20fa88027e6702202c060c50940102f5be4135023b4af2f80e6ebed697d666826915b8739b287ec2412102bbe7dbcdf8b2261530a867df7180b17a90b482f74f2736b8a30d3f756e42e217ffffffffbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb010000006b483045022100e91321f29a79df556da067e89e38fff783d87a67810ec04c1271c318cf445e5f02201e75f27e646a386e5f990838598d5d83b76d35990f1df7a9692bf58f863a48b441210262f8bf1ab1d25111c569da0133c30f8b3fa411e2f8af2565d3f0111cb34ae7f6ffffffffcccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc020000006b4830450221009d23fca1c92724fd7bef94a1b32320768999648ef8f70dbabf98e77326ac408302201a98505d7d5485385af1fc2d60e501234ad80211d611873cc38a94376c6807ec412103e3ec1540bc6f7731d99cbb02448c1fa323c29aaa258b9fde5f4f339f2f975547ffffffff0108460200000000001976a914f5bf48b397dae70be82b3cca4793f8eb2b6cdac988ac00000000";

fn wallet(network: Network) -> Wallet {
    Wallet::new(WalletSeed::parse(TEST_MNEMONIC).expect("mnemonic"), network)
}

/// Test: issuance hands out consecutive indices and their standard addresses
#[test]
fn issuance_follows_allocator() {
    let w = wallet(Network::Mainnet);
    let allocator = AtomicIndexAllocator::default();

    let issued: Vec<_> = (0..3).map(|_| w.issue_address(&allocator).expect("issue")).collect();
    let addresses: Vec<String> = issued.iter().map(|i| i.address.to_string()).collect();
    assert_eq!(
        addresses,
        [
            "bitcoincash:qqyx49mu0kkn9ftfj6hje6g2wfer34yfnq5tahq3q6",
            "bitcoincash:qp8sfdhgjlq68hlzka9lcsxtcnvuvnd0xqxugfzzc5",
            "bitcoincash:qqkuy34ntrye9a2h4xpdstcu4aq5wfrwscjtaphenr",
        ]
    );
    assert_eq!(issued.iter().map(|i| i.index).collect::<Vec<_>>(), vec![0, 1, 2]);

    let testnet = wallet(Network::Testnet);
    assert_eq!(testnet.address_at(1).unwrap().to_string(), "bchtest:qrfuppcw3cf6nmpjpufgpzy3y74ptfxq5yxdy864k4");
    assert_eq!(testnet.address_at(2).unwrap().to_string(), "bchtest:qpxzu2ljsp5sgk5wkcnusw0lyvrtwwa6xq7ysu5t02");
}

/// Test: a payment link goes unpaid → paid (mempool) → confirmed
#[tokio::test]
async fn payment_lifecycle() {
    let w = wallet(Network::Mainnet);
    let address = w.address_at(7).unwrap();
    let chain = Arc::new(InMemoryChain::new());
    let monitor = PaymentMonitor::new(chain.clone());

    let verdict = monitor.poll(&address, Some(150_000)).await;
    assert_eq!(verdict.status(), PaymentStatus::Unpaid);
    assert_eq!((verdict.amount_sats, verdict.confirmations), (0, 0));

    chain.set_summary(&address, AddressSummary { balance_sats: 150_000, received_sats: 150_000, transaction_count: 1 });
    chain.set_transactions(
        &address,
        vec![AddressTransaction { hash: "11".repeat(32), balance_change: 150_000, block_height: None, time: None }],
    );
    let verdict = monitor.poll(&address, Some(150_000)).await;
    assert!(verdict.paid);
    assert_eq!(verdict.confirmations, 0);

    chain.set_transactions(
        &address,
        vec![AddressTransaction { hash: "11".repeat(32), balance_change: 150_000, block_height: Some(100), time: None }],
    );
    chain.set_best_height(Network::Mainnet, Ok(103));
    let verdict = monitor.poll(&address, Some(150_000)).await;
    assert_eq!(verdict.status(), PaymentStatus::Paid);
    assert_eq!(verdict.confirmations, 4);
    assert_eq!(verdict.tx_hash, Some("11".repeat(32)));
}

/// Test: sweeping three funded links yields the pinned transaction
#[tokio::test]
async fn sweep_produces_pinned_transaction() {
    let w = wallet(Network::Mainnet);
    let chain = Arc::new(InMemoryChain::new());
    let funding = [("aa", 0, 50_000), ("bb", 1, 60_000), ("cc", 2, 40_000)];
    let mut sources = Vec::new();
    for (index, (txid, vout, value)) in funding.into_iter().enumerate() {
        let address = w.address_at(index as u32).unwrap();
        chain.add_utxo(&address, txid.repeat(32), vout, value);
        sources.push(SweepSource { index: index as u32, address });
    }

    let destination = CashAddress::parse(DESTINATION).unwrap();
    let sweeper = Sweeper::new(chain.clone(), SweepConfig { fee_sats: 1_000, concurrency: 4 });

    let preview = sweeper.preview(&sources).await.expect("preview");
    assert_eq!((preview.total_sats, preview.amount_sats), (150_000, 149_000));
    assert!(chain.pushed().is_empty());

    let receipt = sweeper.sweep(&w, &sources, &destination).await.expect("sweep");
    assert_eq!(receipt.amount_sats, 149_000);
    assert_eq!(receipt.input_count, 3);
    assert_eq!(receipt.txid, "7c3be2b2c20e4005ad57ad45b86a745a53acc221d8fdb25eff0e334ac16709b8");
    assert_eq!(
        receipt.explorer_url,
        "https://blockchair.com/bitcoin-cash/transaction/7c3be2b2c20e4005ad57ad45b86a745a53acc221d8fdb25eff0e334ac16709b8"
    );

    let pushed = chain.pushed();
    assert_eq!(pushed, vec![(GOLDEN_SWEEP_HEX.to_string(), Network::Mainnet)]);
}

/// Test: a sweep with a seed that did not issue the addresses never reaches broadcast
#[tokio::test]
async fn sweep_with_foreign_seed_is_refused() {
    let issuer = wallet(Network::Mainnet);
    let chain = Arc::new(InMemoryChain::new());
    let address = issuer.address_at(0).unwrap();
    chain.add_utxo(&address, "aa".repeat(32), 0, 50_000);

    let other = Wallet::new(WalletSeed::generate().expect("generate"), Network::Mainnet);
    let sweeper = Sweeper::new(chain.clone(), SweepConfig::default());
    let result = sweeper
        .sweep(&other, &[SweepSource { index: 0, address }], &CashAddress::parse(DESTINATION).unwrap())
        .await;

    assert!(matches!(result, Err(WalletError::AddressMismatch { index: 0, .. })));
    assert!(chain.pushed().is_empty());
}

/// Test: configuration is read from CASHDROP_* variables
#[test]
fn config_from_env() {
    let _guard = lock_env();
    clear_env();

    let sealed = WalletSeed::parse(TEST_MNEMONIC).unwrap().seal("correct horse").unwrap();
    std::env::set_var(vars::NETWORK, "chipnet");
    std::env::set_var(vars::FEE_SATS, "750");
    std::env::set_var(vars::API_TESTNET, "http://127.0.0.1:9999/");
    std::env::set_var(vars::HTTP_TIMEOUT_SECS, "3");
    std::env::set_var(vars::SWEEP_CONCURRENCY, "8");
    std::env::set_var(vars::POLL_SECS, "30");
    std::env::set_var(vars::SEALED_SEED, &sealed);
    std::env::set_var(vars::SEED_SECRET, "correct horse");

    let config = EngineConfig::from_env().expect("config");
    clear_env();

    assert_eq!(config.network, Network::Testnet);
    assert_eq!(config.fee_sats, 750);
    assert_eq!(config.chain.base_url(Network::Testnet), "http://127.0.0.1:9999");
    assert_eq!(config.chain.timeout, Duration::from_secs(3));
    assert_eq!(config.sweep_config(), SweepConfig { fee_sats: 750, concurrency: 8 });
    assert_eq!(config.poll_interval, Duration::from_secs(30));

    let w = config.wallet().expect("wallet");
    assert_eq!(w.address_at(0).unwrap().to_string(), "bchtest:qqaz6s295ncfs53m86qj0uw6sl8u2kuw0ymst35fx4");
}

/// Test: malformed variables are reported, not silently defaulted
#[test]
fn config_rejects_bad_values() {
    let _guard = lock_env();
    clear_env();

    std::env::set_var(vars::FEE_SATS, "lots");
    assert!(matches!(EngineConfig::from_env(), Err(WalletError::Config(_))));
    clear_env();

    std::env::set_var(vars::NETWORK, "regtest");
    assert!(matches!(EngineConfig::from_env(), Err(WalletError::Config(_))));
    clear_env();

    let config = EngineConfig::from_env().expect("defaults");
    assert_eq!(config.network, Network::Mainnet);
    assert_eq!(config.fee_sats, 1_000);
}

/// Test: a wrong seal secret fails loudly instead of yielding another wallet
#[test]
fn wrong_secret_is_detected() {
    let _guard = lock_env();
    clear_env();

    let sealed = WalletSeed::parse(TEST_MNEMONIC).unwrap().seal("right").unwrap();
    let config = EngineConfig::new(Network::Mainnet).with_sealed_seed(sealed, "wrong");
    assert!(matches!(config.wallet(), Err(WalletError::SeedDecryption)));
}
