use std::path::PathBuf;

use allowlist_raffle::client::fetch_summary;
use allowlist_raffle::config::RaffleConfig;
use allowlist_raffle::discovery::DiscoveryEvent;
use allowlist_raffle::evm::types::parse_address;
use allowlist_raffle::logging::init_tracing;
use allowlist_raffle::view::{edit_link, view_link, RaffleTable};
use allowlist_raffle::{Address, RaffleClientBuilder};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(name = "raffle")]
#[command(about = "Browse allowlist raffles registered in a factory contract")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./raffle.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Factory contract address
    #[arg(long, global = true, value_parser = parse_address_arg)]
    factory: Option<Address>,

    /// Maximum number of raffles resolved at once
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every raffle registered in the factory
    List,
    /// Show a single raffle
    Show {
        /// Raffle contract address
        #[arg(value_parser = parse_address_arg)]
        address: Address,
    },
}

fn parse_address_arg(s: &str) -> Result<Address, String> {
    parse_address(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = RaffleConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(rpc_url) = cli.rpc_url {
        config.network.rpc_url = rpc_url;
    }
    if let Some(factory) = cli.factory {
        config.network.factory_address = Some(factory);
    }
    if let Some(concurrency) = cli.concurrency {
        config.discovery.max_concurrent_reads = concurrency;
    }

    config.validate()?;
    init_tracing(&config.logging)?;
    debug!("Using RPC endpoint {}", config.network.rpc_url);

    match cli.command {
        Commands::List => {
            let client = RaffleClientBuilder::new().config(config).connect().await?;
            let mut controller = client.list_controller();
            controller.mount();

            while let Some(event) = controller.next_update().await {
                if cli.json {
                    continue;
                }
                match event {
                    DiscoveryEvent::Counted { count, block, .. } => match block {
                        Some(block) => eprintln!("Found {} raffles at block {}", count, block),
                        None => eprintln!("Found {} raffles", count),
                    },
                    DiscoveryEvent::Resolved { id, .. } => {
                        let remaining = controller.state().pending_count();
                        eprintln!("Resolved raffle {} ({} remaining)", id, remaining);
                    }
                    _ => {}
                }
            }

            let table = RaffleTable::from_state(controller.state());
            if cli.json {
                println!("{}", table.render_json()?);
            } else {
                print!("{}", table.render_text());
            }
            controller.pump().await?;
        }
        Commands::Show { address } => {
            let image_url = config.discovery.image_url.clone();
            let reader = RaffleClientBuilder::new()
                .config(config)
                .connect_reader()
                .await?;
            let summary = fetch_summary(&reader, address, &image_url).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Name:    {}", summary.name);
                println!("Address: {}", summary.contract_address.to_checksum(None));
                println!("Image:   {}", summary.image_url);
                println!("View:    {}", view_link(address));
                println!("Edit:    {}", edit_link(address));
            }
        }
    }

    Ok(())
}
