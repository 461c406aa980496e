use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use tradrx_bridge::{BridgeConfig, TradingBridge};
use tradrx_client::{MarketApi, RestMarketApi};
use tradrx_core::{
    BridgeEvent, CredentialField, Exchange, OrderType, ProbeResult, Side, TradeRequest,
    TradeResult,
};
use tradrx_feed::BinanceStreamConnector;
use tradrx_keystore::backend::FileStore;
use tradrx_keystore::KeyStore;

#[derive(Parser)]
#[command(name = "tradrx")]
#[command(about = "TradrX exchange bridge — live prices, credentials, and trade submission")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to a TOML config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Credential storage file
    #[arg(long, env = "TRADRX_KEYS_FILE", default_value = "tradrx-keys.json")]
    keys_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream live prices to the terminal
    Watch {
        /// Stop after this many seconds; runs until Ctrl-C when omitted
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Submit a trade (demo acknowledgment until request signing lands)
    Trade {
        /// Trading pair, e.g. "BTC/USDT"
        #[arg(short, long)]
        pair: String,

        /// buy or sell
        #[arg(short, long)]
        side: String,

        /// Order quantity in base asset units
        #[arg(short, long)]
        quantity: Decimal,

        /// Limit price; omit for a market order
        #[arg(long)]
        price: Option<Decimal>,
    },

    /// Show account balances
    Portfolio,

    /// List coins by market cap
    Markets {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "20")]
        per_page: u32,
    },

    /// Show 24h ticker statistics
    Ticker {
        /// Binance symbol, e.g. "BTCUSDT"; all symbols when omitted
        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// Show an order book snapshot
    Book {
        /// Binance symbol, e.g. "BTCUSDT"
        #[arg(short, long)]
        symbol: String,

        /// Depth levels per side
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Manage stored exchange credentials
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Show data source and credential status
    Status,
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Validate and store credentials for an exchange
    Set {
        /// binance or coinbase
        #[arg(short, long)]
        exchange: Exchange,

        #[arg(long)]
        api_key: String,

        #[arg(long)]
        secret_key: String,

        /// Required by Coinbase only
        #[arg(long)]
        passphrase: Option<String>,
    },

    /// Show which credential fields are configured
    Status,

    /// Erase all stored credentials
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };

    let api = Arc::new(RestMarketApi::new(config.provider_urls())?);
    let connector = Arc::new(BinanceStreamConnector::for_all_pairs(
        &config.binance_stream_url,
    ));
    let keys = KeyStore::new(FileStore::open(&cli.keys_file));
    let bridge = TradingBridge::new(Arc::clone(&api) as Arc<dyn MarketApi>, connector, keys, &config);

    match cli.command {
        Commands::Watch { duration } => watch(&bridge, duration).await?,
        Commands::Trade {
            pair,
            side,
            quantity,
            price,
        } => trade(&bridge, pair, &side, quantity, price).await?,
        Commands::Portfolio => portfolio(&bridge).await?,
        Commands::Markets { page, per_page } => markets(api.as_ref(), page, per_page).await?,
        Commands::Ticker { symbol } => ticker(api.as_ref(), symbol.as_deref()).await?,
        Commands::Book { symbol, limit } => book(api.as_ref(), &symbol, limit).await?,
        Commands::Keys { command } => keys_command(&bridge, command).await?,
        Commands::Status => status(&bridge),
    }

    Ok(())
}

async fn watch<S: tradrx_keystore::backend::KeyValueStore>(
    bridge: &TradingBridge<S>,
    duration: Option<u64>,
) -> Result<()> {
    let mut events = bridge.subscribe();
    bridge.start().await;

    for pair in bridge.current_prices() {
        println!(
            "{:<10} {:>14.2}  {:>+7.2}%",
            pair.symbol, pair.price, pair.change_percent_24h
        );
    }

    let deadline = duration.map(Duration::from_secs);
    let run = async {
        loop {
            match events.recv().await {
                Ok(BridgeEvent::Price(pair)) => {
                    println!(
                        "{:<10} {:>14.2}  {:>+7.2}%",
                        pair.symbol, pair.price, pair.change_percent_24h
                    );
                }
                Ok(BridgeEvent::StreamConnected) => println!("-- stream connected --"),
                Ok(BridgeEvent::StreamDisconnected { reason }) => {
                    println!("-- stream disconnected: {reason} --")
                }
                Ok(BridgeEvent::StreamFailed { attempts }) => {
                    println!("-- stream failed after {attempts} attempts, polling only --")
                }
                // Lagged receivers skip ahead; closed means shutdown.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    match deadline {
        Some(limit) => {
            let _ = tokio::time::timeout(limit, run).await;
        }
        None => {
            tokio::select! {
                _ = run => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
    }

    bridge.stop().await;
    Ok(())
}

async fn trade<S: tradrx_keystore::backend::KeyValueStore>(
    bridge: &TradingBridge<S>,
    pair: String,
    side: &str,
    quantity: Decimal,
    price: Option<Decimal>,
) -> Result<()> {
    let side = match side.to_ascii_lowercase().as_str() {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        other => anyhow::bail!("side must be buy or sell, got: {other}"),
    };
    let order_type = if price.is_some() {
        OrderType::Limit
    } else {
        OrderType::Market
    };

    let request = TradeRequest {
        pair,
        side,
        order_type,
        quantity,
        price,
    };
    match bridge.submit_trade(&request).await {
        TradeResult::Accepted {
            order_id,
            status,
            exchange,
        } => println!("Accepted on {exchange}: order {order_id} ({status})"),
        TradeResult::Rejected { reason } => {
            println!("Rejected: {reason}");
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn portfolio<S: tradrx_keystore::backend::KeyValueStore>(
    bridge: &TradingBridge<S>,
) -> Result<()> {
    let portfolio = bridge.get_portfolio().await?;
    if portfolio.positions.is_empty() {
        println!("No non-zero balances.");
        return Ok(());
    }
    println!(
        "{:<8} {:>16} {:>16} {:>16}",
        "ASSET", "FREE", "LOCKED", "TOTAL"
    );
    for position in &portfolio.positions {
        println!(
            "{:<8} {:>16} {:>16} {:>16}",
            position.asset, position.free, position.locked, position.total
        );
    }
    println!(
        "As of {}",
        portfolio.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

async fn markets(api: &RestMarketApi, page: u32, per_page: u32) -> Result<()> {
    let entries = api.markets(page, per_page).await?;
    println!("{:<16} {:<8} {:>14} {:>9}", "ID", "SYMBOL", "PRICE", "24H %");
    for entry in &entries {
        println!(
            "{:<16} {:<8} {:>14.2} {:>+8.2}%",
            entry.id,
            entry.symbol.to_uppercase(),
            entry.current_price.unwrap_or_default(),
            entry.price_change_percentage_24h.unwrap_or_default()
        );
    }
    Ok(())
}

async fn ticker(api: &RestMarketApi, symbol: Option<&str>) -> Result<()> {
    let tickers = api.ticker_24h(symbol).await?;
    for ticker in &tickers {
        println!(
            "{:<12} {:>14.2}  {:>+7.2}%",
            ticker.symbol, ticker.last_price, ticker.price_change_percent
        );
    }
    Ok(())
}

async fn book(api: &RestMarketApi, symbol: &str, limit: u32) -> Result<()> {
    let book = api.order_book(symbol, limit).await?;
    println!("{symbol} order book (update {})", book.last_update_id);
    println!("{:>14} {:>14}  |  {:>14} {:>14}", "BID", "QTY", "ASK", "QTY");
    for i in 0..book.bids.len().max(book.asks.len()) {
        let bid = book
            .bids
            .get(i)
            .map(|(p, q)| format!("{p:>14.2} {q:>14.4}"))
            .unwrap_or_else(|| format!("{:>14} {:>14}", "", ""));
        let ask = book
            .asks
            .get(i)
            .map(|(p, q)| format!("{p:>14.2} {q:>14.4}"))
            .unwrap_or_else(|| format!("{:>14} {:>14}", "", ""));
        println!("{bid}  |  {ask}");
    }
    Ok(())
}

async fn keys_command<S: tradrx_keystore::backend::KeyValueStore>(
    bridge: &TradingBridge<S>,
    command: KeyCommands,
) -> Result<()> {
    match command {
        KeyCommands::Set {
            exchange,
            api_key,
            secret_key,
            passphrase,
        } => {
            let mut fields = vec![
                (CredentialField::ApiKey, api_key),
                (CredentialField::SecretKey, secret_key),
            ];
            if let Some(passphrase) = passphrase {
                fields.push((CredentialField::Passphrase, passphrase));
            }

            match bridge.configure_credentials(exchange, &fields).await? {
                ProbeResult::Online { latency_ms } => {
                    println!("Credentials stored; {exchange} reachable ({latency_ms} ms)")
                }
                ProbeResult::Offline => {
                    println!("Credentials stored; warning: {exchange} unreachable")
                }
            }
        }
        KeyCommands::Status => {
            for credential in bridge.status().credentials {
                let mark = if credential.configured { "ready" } else { "incomplete" };
                println!("{} [{}]", credential.exchange, mark);
                for field in credential.fields {
                    let state = if field.configured { "set" } else { "missing" };
                    println!("  {:<12} {}", field.field, state);
                }
            }
        }
        KeyCommands::Clear => {
            bridge.clear_credentials();
            println!("All stored credentials cleared.");
        }
    }
    Ok(())
}

fn status<S: tradrx_keystore::backend::KeyValueStore>(bridge: &TradingBridge<S>) {
    let status = bridge.status();
    println!("Polling:    {}", if status.poll_active { "active" } else { "inactive" });
    println!("Stream:     {:?}", status.stream_state);
    for credential in status.credentials {
        println!(
            "Keys {:<9} {}",
            format!("{}:", credential.exchange),
            if credential.configured { "configured" } else { "not configured" }
        );
    }
}
