//! XVC reward projection CLI
//!
//! Asks the local wallet daemon about a block height and prints the
//! reward breakdown and block time for it.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use xvc_core::config::Config;
use xvc_core::constants::CURRENCY_CODE;
use xvc_core::geoip::{peer_host, GeoIpClient, GeoIpLookup};
use xvc_core::rewards::VcashCurve;
use xvc_core::rpc::HttpRpcClient;
use xvc_core::store::{RewardCalculator, RewardChartPoint, RewardProjection, WalletStatus};

#[derive(Parser)]
#[command(name = "xvc-rewards", version, about = "XVC block reward projections")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Wallet daemon RPC endpoint (overrides the config file)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Project rewards and block time for a height
    Project {
        height: String,
        /// Also print the next 100,000 blocks in 2,500 block steps
        #[arg(long)]
        chart: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Read heights from stdin and print projections as they resolve
    Watch,
    /// Locate a peer address
    Geoip { addr: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(url) = cli.rpc_url {
        config.rpc_url = url;
        config.validate()?;
    }

    match cli.command {
        Command::Project { height, chart, json } => project(&config, &height, chart, json).await,
        Command::Watch => watch(&config).await,
        Command::Geoip { addr } => geoip(&config, &addr).await,
    }
}

async fn project(
    config: &Config,
    height: &str,
    chart: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rpc = HttpRpcClient::new(&config.rpc_url, config.request_timeout())?;
    let wallet = WalletStatus::new();
    if let Err(e) = wallet.refresh(&rpc).await {
        warn!("Chain height unknown, estimates assume height 0: {}", e);
    }

    let store = RewardCalculator::new(VcashCurve);
    if !store.set_height(height) {
        return Err(format!("invalid block height {:?} (expected up to 7 digits)", height).into());
    }
    store.resolve(&rpc).await;

    let projection = store.projection(&wallet);
    let series = if chart { Some(store.chart_series()) } else { None };

    if json {
        let output = serde_json::json!({ "projection": projection, "chart": series });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_projection(&projection);
        if let Some(series) = series {
            print_chart(&series);
        }
    }

    Ok(())
}

async fn watch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let rpc = Arc::new(HttpRpcClient::new(&config.rpc_url, config.request_timeout())?);
    let wallet = WalletStatus::new();
    if let Err(e) = wallet.refresh(rpc.as_ref()).await {
        warn!("Chain height unknown, estimates assume height 0: {}", e);
    }
    if let Some(chain) = wallet.info() {
        info!("Wallet daemon at {}, chain height {}", rpc.url(), chain.blocks);
    }

    let store = Arc::new(RewardCalculator::new(VcashCurve));
    let resolver = store.spawn_resolver(Arc::clone(&rpc));
    let mut timestamps = store.subscribe_resolved_timestamp();
    let mut tips = wallet.subscribe();
    let mut reachability = rpc.subscribe_status();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // First tick one period from now; the tip was just read
    let period = config.status_refresh();
    let mut refresh = tokio::time::interval_at(Instant::now() + period, period);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Enter block heights, one per line. Ctrl+D to stop.");

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if store.set_height(line.trim()) {
                        print_projection(&store.projection(&wallet));
                    } else {
                        warn!("Ignoring {:?}: expected up to 7 digits", line.trim());
                    }
                }
                None => break,
            },
            changed = timestamps.changed() => {
                if changed.is_err() {
                    break;
                }
                print_projection(&store.projection(&wallet));
            }
            _ = refresh.tick() => {
                if let Err(e) = wallet.refresh(rpc.as_ref()).await {
                    warn!("Chain tip refresh failed: {}", e);
                }
            }
            changed = tips.changed() => {
                if changed.is_err() {
                    break;
                }
                // Only estimates depend on the tip
                if store.is_estimated() && !store.height().is_empty() {
                    print_projection(&store.projection(&wallet));
                }
            }
            changed = reachability.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *reachability.borrow_and_update();
                match online {
                    Some(true) => println!("Daemon {} online", rpc.url()),
                    Some(false) => println!("Daemon {} offline", rpc.url()),
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    resolver.abort();
    Ok(())
}

async fn geoip(config: &Config, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = GeoIpClient::new(&config.geoip_url, config.request_timeout())?;
    let host = peer_host(addr);

    match client.lookup(host).await? {
        GeoIpLookup::Found(data) => {
            println!("{}", host);
            println!("  Country: {}", data.country_name().unwrap_or("-"));
            println!("  City:    {}", data.city.as_deref().unwrap_or("-"));
            if let Some(location) = data.location {
                if let (Some(lat), Some(lon)) = (location.latitude, location.longitude) {
                    println!("  Coords:  {:.4}, {:.4}", lat, lon);
                }
            }
        }
        GeoIpLookup::NotFound => println!("{}: location unknown", host),
    }

    Ok(())
}

fn format_time(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{} ms", ms))
}

fn print_projection(projection: &RewardProjection) {
    let kind = if projection.estimated { "estimated" } else { "on chain" };

    println!("Block #{} ({})", projection.height, kind);
    println!("  Time:          {}", format_time(projection.time));
    println!("  PoW reward:    {:.6} {}", projection.pow_reward, CURRENCY_CODE);
    println!(
        "  Incentive:     {:.6} {} ({:.2}%)",
        projection.incentive_reward, CURRENCY_CODE, projection.incentive_percent
    );
    println!("  Mining reward: {:.6} {}", projection.mining_reward, CURRENCY_CODE);
}

fn print_chart(series: &[RewardChartPoint]) {
    println!();
    println!("{:>10}  {:>14}  {:>14}  {:>14}", "Block", "PoW", "Mining", "Incentive");
    for point in series {
        println!(
            "{:>10}  {:>14.6}  {:>14.6}  {:>14.6}",
            point.height, point.pow_reward, point.mining_reward, point.incentive_reward
        );
    }
}
