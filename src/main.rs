use anyhow::{bail, Context};
use xchange_client::config::ClientOptions;
use xchange_client::depth::{DepthCache, Side, ValueMode};
use xchange_client::market::CandleSeries;
use xchange_client::xchange::{XchangeClient, DEFAULT_DEPTH_LIMIT, DEFAULT_KLINE_LIMIT};

/// Parsed command line
#[derive(Debug, Default)]
struct Cli {
    config: Option<String>,
    limit: Option<u32>,
    volume: bool,
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args);

    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let options = match &cli.config {
        Some(path) => ClientOptions::from_json_file(path)
            .with_context(|| format!("Failed to load options from {}", path))?,
        None => ClientOptions::from_env().context("Invalid XCHANGE_* environment")?,
    };

    if !options.credentials.has_key() {
        tracing::warn!("API credentials not found - only public endpoints will work");
    }

    let client = XchangeClient::connect(options).await?;
    tracing::debug!(base_url = client.base_url(), "Client ready");

    let command: Vec<&str> = cli.command.iter().map(String::as_str).collect();
    match command.as_slice() {
        ["time"] => {
            println!("{}", client.time().await?);
        }
        ["prices"] => print_json(&client.prices(None).await?)?,
        ["prices", market] => print_json(&client.prices(Some(*market)).await?)?,
        ["book-tickers"] => print_json(&client.book_tickers().await?)?,
        ["balance"] => print_json(&client.balance().await?)?,
        ["open-orders"] => print_json(&client.open_orders(None).await?)?,
        ["open-orders", market] => print_json(&client.open_orders(Some(*market)).await?)?,
        ["depth", market] => {
            run_depth(&client, market, cli.limit.unwrap_or(DEFAULT_DEPTH_LIMIT)).await?
        }
        ["candles", market, interval] => {
            let klines = client
                .candlesticks(market, interval, cli.limit.unwrap_or(DEFAULT_KLINE_LIMIT))
                .await?;
            let series = CandleSeries::from_klines(&klines);
            if cli.volume {
                print_json(&series.timestamped(true))?;
            } else {
                print_json(&series.ohlcv())?;
            }
        }
        [] => {
            print_usage();
            std::process::exit(1);
        }
        other => bail!("Unknown command: {}", other.join(" ")),
    }

    Ok(())
}

/// Seeds a depth cache from a snapshot and prints both sides and the volume
async fn run_depth(client: &XchangeClient, market: &str, limit: u32) -> anyhow::Result<()> {
    let cache = DepthCache::new();
    cache.apply_snapshot(market, client.depth(market, limit).await?);

    let report = serde_json::json!({
        "market": market,
        "bids": cache.sorted_view(market, Side::Bid, None, ValueMode::Quantity),
        "asks": cache.sorted_view(market, Side::Ask, None, ValueMode::Quantity),
        "volume": cache.volume(market),
    });
    print_json(&report)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse command-line arguments
fn parse_args(args: &[String]) -> Cli {
    let mut cli = Cli::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    cli.config = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--limit" => {
                if i + 1 < args.len() {
                    cli.limit = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--volume" => cli.volume = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => {
                eprintln!("Unknown argument: {}", flag);
                print_usage();
                std::process::exit(1);
            }
            word => cli.command.push(word.to_string()),
        }
        i += 1;
    }

    cli
}

/// Print usage information
fn print_usage() {
    println!("xchange - command line client for the Xchange REST API");
    println!();
    println!("USAGE:");
    println!("    xchange [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    time                          Server time in ms");
    println!("    prices [MARKET]               Latest prices keyed by market");
    println!("    book-tickers                  Best bid/ask of every market");
    println!("    balance                       Balances keyed by asset (signed)");
    println!("    open-orders [MARKET]          Open orders (signed)");
    println!("    depth MARKET                  Order book sides and volume");
    println!("    candles MARKET INTERVAL       OHLCV arrays for charting");
    println!();
    println!("OPTIONS:");
    println!("    --config <FILE>     JSON options file (APIKEY, APISECRET, recvWindow, ...)");
    println!("    --limit <N>         Depth levels or candle count");
    println!("    --volume            candles: timestamped rows with volume");
    println!("    --help, -h          Print this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    XCHANGE_API_KEY          API key (optional)");
    println!("    XCHANGE_API_SECRET       API secret (optional)");
    println!("    XCHANGE_BASE_URL         REST base URL");
    println!("    XCHANGE_RECV_WINDOW      Receive window in ms (default: 5000)");
    println!("    XCHANGE_USE_SERVER_TIME  Sync the signing clock with the server");
    println!("    XCHANGE_PROXY            host:port HTTP proxy");
    println!("    RUST_LOG                 Logging level (default: info)");
}
