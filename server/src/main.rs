use clap::Parser;
use log::info;
use server::config::Config;
use server::server::Server;
use tokio::net::TcpListener;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// TCP port to listen on
    #[clap(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Number of inventory shards
    #[clap(long, default_value_t = 32)]
    shards: usize,

    /// Cards minted into the inventory at startup
    #[clap(long, default_value_t = 50_000)]
    initial_cards: usize,

    /// Number of pack worker tasks
    #[clap(long, default_value_t = 1_000)]
    pack_workers: usize,

    /// Maximum concurrently accepted connections
    #[clap(long, default_value_t = 30_000)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // Print a message about setting RUST_LOG if not set
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Warning: RUST_LOG environment variable not set. Set it to display logs!");
        eprintln!("Recommended: RUST_LOG=info cargo run");
    }

    let args = Args::parse();
    let config = Config {
        host: args.host,
        port: args.port,
        shard_count: args.shards,
        initial_cards: args.initial_cards,
        pack_workers: args.pack_workers,
        max_connections: args.max_connections,
        ..Config::default()
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Card duel server listening on {}", addr);
    info!(
        "Inventory: {} cards across {} shards; {} pack workers",
        config.initial_cards, config.shard_count, config.pack_workers
    );

    let server = Server::new(config);
    server.run(listener).await?;
    Ok(())
}
