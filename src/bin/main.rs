//! cashdrop CLI - payment-link wallet operations, JSON out
//!
//!   cashdrop seed new [--secret S] [--show]   → fresh mnemonic, sealed for storage
//!   cashdrop address <index> [--amount BCH]   → receive address + payment URI
//!   cashdrop check <address> [--amount BCH]   → one payment poll
//!   cashdrop watch <address> [--amount BCH]   → poll until paid and confirmed
//!   cashdrop sweep <destination> --indices 0-9 [--dry-run]
//!   cashdrop serve [--port 8080]
//!
//! Configuration comes from `CASHDROP_*` variables (a `.env` file in the
//! working directory is loaded first). Output is pretty JSON on a terminal,
//! compact JSON otherwise.

use anyhow::{anyhow, bail, Context, Result};
use cashdrop::chain::{BlockchairClient, ChainData};
use cashdrop::logging::init_logging;
use cashdrop::seed::migrate_legacy;
use cashdrop::units::{bch_to_sats, format_bch};
use cashdrop::{
    install_signal_handlers, payment_uri, CashAddress, EngineConfig, Network, PaymentMonitor, PaymentVerdict,
    SweepSource, Sweeper, Wallet, WalletSeed,
};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::{debug, info};

fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);
    init_logging();

    if opts.help {
        print_usage();
        return;
    }
    if opts.version {
        println!("cashdrop {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("seed") => cmd_seed(&opts),
        Some("address") | Some("addr") => cmd_address(&opts),
        Some("decode") => cmd_decode(&opts),
        Some("check") => cmd_check(&opts),
        Some("watch") => cmd_watch(&opts),
        Some("sweep") => cmd_sweep(&opts),
        Some("serve") => cmd_serve(&opts),
        Some(cmd) => Err(anyhow!("unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = !opts.json && (opts.pretty || std::io::stdout().is_terminal());
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({ "error": format!("{:#}", e) }), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    if pretty { format!("{:#}", value) } else { value.to_string() }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    args: Vec<String>,
    network: Option<String>,
    amount: Option<String>,
    secret: Option<String>,
    sources: Vec<String>,
    indices: Option<String>,
    confirmations: Option<u64>,
    port: Option<u16>,
    dry_run: bool,
    show: bool,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv(".env");

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--dry-run" => opts.dry_run = true,
                "--show" => opts.show = true,
                "--network" | "-n" => opts.network = iter.next().cloned(),
                "--amount" | "-a" => opts.amount = iter.next().cloned(),
                "--secret" | "-s" => opts.secret = iter.next().cloned(),
                "--source" => opts.sources.extend(iter.next().cloned()),
                "--indices" | "-i" => opts.indices = iter.next().cloned(),
                "--confirmations" | "-c" => opts.confirmations = iter.next().and_then(|v| v.parse().ok()),
                "--port" | "-p" => opts.port = iter.next().and_then(|v| v.parse().ok()),
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => debug!(flag = %arg, "ignoring unknown flag"),
            }
        }

        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }
        opts.args = positional;

        if opts.port.is_none() {
            opts.port = env::var("CASHDROP_PORT").ok().and_then(|s| s.parse().ok());
        }
        opts
    }

    fn arg(&self, position: usize, name: &str) -> Result<&str> {
        self.args.get(position).map(String::as_str).ok_or_else(|| anyhow!("missing <{}>", name))
    }

    fn amount_sats(&self) -> Result<Option<u64>> {
        self.amount
            .as_deref()
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .and_then(bch_to_sats)
                    .ok_or_else(|| anyhow!("invalid BCH amount: {}", raw))
            })
            .transpose()
    }
}

/// `KEY=value` lines; variables already set in the environment win.
fn load_dotenv(path: &str) {
    let Ok(contents) = std::fs::read_to_string(path) else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key).is_err() {
                env::set_var(key, value);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"cashdrop - Bitcoin Cash payment-link wallet

USAGE:
    cashdrop <command> [args] [options]

COMMANDS:
    seed new                      Generate a mnemonic and seal it with the secret
    seed reveal                   Unseal CASHDROP_SEALED_SEED and print the words
    seed migrate <legacy-blob>    Re-seal a seed stored in the old XOR format
    address <index>               Receive address at m/44'/coin'/0'/0/<index>
    decode <address>              CashAddr breakdown (network, hash160)
    check <address>               Poll once for payment
    watch <address>               Poll until paid with enough confirmations
    sweep <destination>           Move every UTXO of the sources to <destination>
    serve                         Start the HTTP read API

OPTIONS:
    --network, -n <net>           mainnet|testnet (env: CASHDROP_NETWORK)
    --amount, -a <bch>            Expected amount in BCH
    --secret, -s <secret>         Seal secret (env: CASHDROP_SEED_SECRET)
    --show                        Include the mnemonic in `seed new` output
    --indices, -i <a-b>           Sweep sources by derivation index range
    --source <index:address>      Sweep source (repeatable)
    --confirmations, -c <n>       Confirmations `watch` waits for (default 1)
    --dry-run                     Preview a sweep without signing
    --port, -p <port>             Server port (default 8080, env: CASHDROP_PORT)
    --json / --pretty             Force compact / pretty output
    --version, -V                 Print version

ENVIRONMENT:
    CASHDROP_SEALED_SEED, CASHDROP_SEED_SECRET, CASHDROP_FEE_SATS,
    CASHDROP_API_MAINNET, CASHDROP_API_TESTNET, CASHDROP_HTTP_TIMEOUT_SECS,
    CASHDROP_SWEEP_CONCURRENCY, CASHDROP_POLL_SECS, CASHDROP_LOG_JSON, RUST_LOG

EXAMPLES:
    cashdrop seed new --secret "$SECRET"
    cashdrop address 42 --amount 0.0015
    cashdrop check bitcoincash:qq... --amount 0.0015 --json | jq .paid
    cashdrop sweep bitcoincash:qr... --indices 0-99 --dry-run
"#
    );
}

fn engine_config(opts: &ParsedArgs) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env()?;
    if let Some(raw) = opts.network.as_deref() {
        config.network = Network::parse_alias(raw).ok_or_else(|| anyhow!("unknown network: {}", raw))?;
    }
    if let Some(secret) = opts.secret.clone() {
        config.seed_secret = Some(secret);
    }
    Ok(config)
}

fn chain(config: &EngineConfig) -> Result<Arc<dyn ChainData>> {
    Ok(Arc::new(BlockchairClient::new(config.chain.clone())?))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start tokio runtime")
}

fn verdict_json(address: &CashAddress, verdict: &PaymentVerdict) -> Value {
    json!({
        "address": address,
        "status": verdict.status(),
        "paid": verdict.paid,
        "amount_sats": verdict.amount_sats,
        "amount_bch": format_bch(verdict.amount_sats),
        "tx_hash": verdict.tx_hash,
        "confirmations": verdict.confirmations,
    })
}

fn cmd_seed(opts: &ParsedArgs) -> Result<Value> {
    let config = engine_config(opts)?;
    match opts.arg(0, "new|reveal|migrate")? {
        "new" => {
            let seed = WalletSeed::generate()?;
            let sealed = config.seed_secret.as_deref().map(|s| seed.seal(s)).transpose()?;
            let wallet = Wallet::new(seed, config.network);
            let mut out = json!({
                "words": wallet.seed().word_count(),
                "sealed": sealed,
                "account_xpub": wallet.account_key()?.xpub.to_string(),
                "first_address": wallet.address_at(0)?,
            });
            // Without a secret there is nothing to store but the words themselves.
            if opts.show || sealed.is_none() {
                out["mnemonic"] = json!(wallet.seed().phrase().as_str());
            }
            Ok(out)
        }
        "reveal" => {
            let wallet = config.wallet()?;
            Ok(json!({
                "mnemonic": wallet.seed().phrase().as_str(),
                "words": wallet.seed().word_count(),
                "first_address": wallet.address_at(0)?,
            }))
        }
        "migrate" => {
            let legacy = opts.arg(1, "legacy-blob")?;
            let secret = config.seed_secret.as_deref().ok_or_else(|| anyhow!("a seal secret is required"))?;
            let sealed = migrate_legacy(legacy, secret)?;
            let wallet = Wallet::from_sealed(&sealed, secret, config.network)?;
            Ok(json!({ "sealed": sealed, "first_address": wallet.address_at(0)? }))
        }
        other => bail!("unknown seed command: {}", other),
    }
}

fn cmd_address(opts: &ParsedArgs) -> Result<Value> {
    let index: u32 = opts.arg(0, "index")?.parse().context("index must be a non-negative integer")?;
    let wallet = engine_config(opts)?.wallet()?;
    let address = wallet.address_at(index)?;
    Ok(json!({
        "index": index,
        "network": wallet.network(),
        "address": address,
        "uri": payment_uri(&address, opts.amount_sats()?),
    }))
}

fn cmd_decode(opts: &ParsedArgs) -> Result<Value> {
    let address = CashAddress::parse(opts.arg(0, "address")?)?;
    Ok(json!({
        "address": address,
        "network": address.network,
        "payload": address.payload(),
        "hash160": address.hash_hex(),
    }))
}

fn cmd_check(opts: &ParsedArgs) -> Result<Value> {
    let config = engine_config(opts)?;
    let address = CashAddress::parse_for(opts.arg(0, "address")?, config.network)?;
    let expected = opts.amount_sats()?;
    let monitor = PaymentMonitor::new(chain(&config)?);

    let verdict = runtime()?.block_on(monitor.poll(&address, expected));
    Ok(verdict_json(&address, &verdict))
}

fn cmd_watch(opts: &ParsedArgs) -> Result<Value> {
    let config = engine_config(opts)?;
    let address = CashAddress::parse_for(opts.arg(0, "address")?, config.network)?;
    let expected = opts.amount_sats()?;
    let wanted = opts.confirmations.unwrap_or(1);
    let monitor = PaymentMonitor::new(chain(&config)?);

    runtime()?.block_on(async {
        let shutdown = install_signal_handlers();
        info!(%address, ?expected, confirmations = wanted, interval = ?config.poll_interval, "watching address");
        loop {
            let verdict = monitor.poll(&address, expected).await;
            info!(paid = verdict.paid, amount = verdict.amount_sats, confirmations = verdict.confirmations, "poll");
            if verdict.paid && verdict.confirmations >= wanted {
                return Ok(verdict_json(&address, &verdict));
            }
            if !shutdown.sleep(config.poll_interval).await {
                let mut out = verdict_json(&address, &verdict);
                out["interrupted"] = json!(true);
                return Ok(out);
            }
        }
    })
}

/// `--source index:address` entries, or every index of `--indices a-b`.
fn sweep_sources(opts: &ParsedArgs, config: &EngineConfig) -> Result<Vec<SweepSource>> {
    let mut sources = Vec::new();
    for raw in &opts.sources {
        let (index, address) = raw.split_once(':').ok_or_else(|| anyhow!("expected index:address, got {}", raw))?;
        sources.push(SweepSource {
            index: index.parse().with_context(|| format!("bad index in {}", raw))?,
            address: CashAddress::parse_for(address, config.network)?,
        });
    }
    if let Some(range) = opts.indices.as_deref() {
        let (start, end) = range.split_once('-').unwrap_or((range, range));
        let start: u32 = start.trim().parse().with_context(|| format!("bad index range {}", range))?;
        let end: u32 = end.trim().parse().with_context(|| format!("bad index range {}", range))?;
        if end < start {
            bail!("empty index range {}", range);
        }
        let wallet = config.wallet()?;
        for index in start..=end {
            sources.push(SweepSource { index, address: wallet.address_at(index)? });
        }
    }
    if sources.is_empty() {
        bail!("no sweep sources; pass --indices or --source");
    }
    Ok(sources)
}

fn cmd_sweep(opts: &ParsedArgs) -> Result<Value> {
    let config = engine_config(opts)?;
    let destination = CashAddress::parse_for(opts.arg(0, "destination")?, config.network)?;
    let sources = sweep_sources(opts, &config)?;
    let sweeper = Sweeper::new(chain(&config)?, config.sweep_config());
    let rt = runtime()?;

    if opts.dry_run {
        let preview = rt.block_on(sweeper.preview(&sources))?;
        let mut out = serde_json::to_value(&preview)?;
        out["destination"] = json!(destination);
        out["amount_bch"] = json!(format_bch(preview.amount_sats));
        return Ok(out);
    }

    let wallet = config.wallet()?;
    let receipt = rt.block_on(sweeper.sweep(&wallet, &sources, &destination))?;
    let mut out = serde_json::to_value(&receipt)?;
    out["amount_bch"] = json!(format_bch(receipt.amount_sats));
    Ok(out)
}

#[cfg(feature = "server")]
fn cmd_serve(opts: &ParsedArgs) -> Result<Value> {
    use cashdrop::{create_router, AppState};

    let config = engine_config(opts)?;
    let port = opts.port.unwrap_or(8080);
    let mut state = AppState::new(config.network, chain(&config)?);
    if config.sealed_seed.is_some() {
        state = state.with_wallet(config.wallet()?);
    }

    runtime()?.block_on(async {
        let shutdown = install_signal_handlers();
        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {}", addr))?;

        info!(%addr, network = %config.network, wallet = state.wallet.is_some(), "cashdrop listening");
        axum::serve(listener, create_router(state))
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await
            .context("server error")?;

        info!("server stopped");
        Ok::<Value, anyhow::Error>(json!({ "status": "stopped" }))
    })
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_opts: &ParsedArgs) -> Result<Value> {
    bail!("built without the `server` feature")
}
