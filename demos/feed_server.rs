//! Product feed server example
//!
//! Run with: cargo run --example feed_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example feed_server                    # binds to 0.0.0.0:8000
//!   cargo run --example feed_server localhost          # binds to 127.0.0.1:8000
//!   cargo run --example feed_server 127.0.0.1:8001     # binds to 127.0.0.1:8001
//!
//! ## Subscribing
//!
//! With websocat:
//!   websocat ws://localhost:8000/ws/products/
//!
//! Every few seconds the demo adds a tea to the catalog or changes a price;
//! each change arrives as one JSON text frame.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use storefeed::catalog::{CartItemPatch, MemoryCatalog, NewCartItem};
use storefeed::server::config::DEFAULT_PORT;
use storefeed::{FeedServer, ServerConfig};

const TEAS: &[(&str, f64)] = &[
    ("Green Tea", 5.0),
    ("Sencha", 7.5),
    ("Da Hong Pao", 18.0),
    ("Shu Puer", 12.0),
    ("Darjeeling", 9.5),
];

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8000
/// - "127.0.0.1" -> 127.0.0.1:8000
/// - "127.0.0.1:8001" -> 127.0.0.1:8001
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: feed_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:8000)");
}

/// Adds teas, then keeps nudging their prices
async fn simulate_store(catalog: Arc<MemoryCatalog>) {
    let mut tick = tokio::time::interval(Duration::from_secs(3));
    let mut round = 0usize;

    loop {
        tick.tick().await;

        let result = if round < TEAS.len() {
            let (name, price) = TEAS[round];
            catalog.create(NewCartItem::new(name, price), Some(1))
        } else {
            let id = (round % TEAS.len()) as u64 + 1;
            let price = TEAS[id as usize - 1].1 + (round / TEAS.len()) as f64;
            catalog.partial_update(id, CartItemPatch::default().price(price))
        };

        match result {
            Ok(item) => tracing::info!(id = item.id, name = %item.product_name, price = item.product_price, "Catalog changed"),
            Err(e) => tracing::warn!(error = %e, "Catalog write failed"),
        }

        round += 1;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default().bind_addr,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefeed=debug".parse()?)
                .add_directive("feed_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig::with_addr(bind_addr).max_connections(1024);

    println!("Starting product feed on {}", config.bind_addr);
    println!("Subscribe: websocat ws://{}/ws/products/", config.bind_addr);
    println!();

    let server = Arc::new(FeedServer::new(config));
    let catalog = Arc::new(MemoryCatalog::with_hook(server.notifier().clone()));

    let simulator = tokio::spawn(simulate_store(catalog.clone()));

    let result = server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    simulator.abort();

    let stats = server.channel().stats();
    println!(
        "Published {} changes, {} deliveries, {} overflows ({} items in catalog)",
        stats.envelopes_published,
        stats.deliveries,
        stats.overflows,
        catalog.len()
    );

    result?;
    Ok(())
}
