//! routekv CLI
//!
//! Operates directly on a route store directory.

use std::collections::BTreeMap;
use std::time::Duration;

use clap::{Parser, Subcommand};
use routekv::{Config, Context, DurableBackend, Route, RouteStore, WalSyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// routekv CLI
#[derive(Parser, Debug)]
#[command(name = "routekv")]
#[command(about = "Inspect and edit a durable route store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./routekv_data")]
    data_dir: String,

    /// fsync the WAL every N writes instead of on every write
    #[arg(long)]
    sync_every: Option<usize>,

    /// Per-operation timeout in seconds
    #[arg(short, long, default_value = "60")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the route stored under a name
    Get {
        /// Short name
        key: String,
    },

    /// Point a name at a URL
    Set {
        /// Short name
        key: String,

        /// Redirect target
        url: String,
    },

    /// Remove a name
    Del {
        /// Short name
        key: String,
    },

    /// List routes starting at a name
    List {
        /// First name to include (defaults to the beginning)
        #[arg(default_value = "")]
        start: String,
    },

    /// Dump every route
    Dump,

    /// Allocate the next identifier
    NextId,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,routekv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let sync = match args.sync_every {
        Some(count) => WalSyncStrategy::EveryNEntries { count },
        None => WalSyncStrategy::EveryWrite,
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .wal_sync_strategy(sync)
        .build();

    let backend = match DurableBackend::open(config) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };
    let store = RouteStore::from_backend(backend);
    let ctx = Context::with_timeout(Duration::from_secs(args.timeout));

    let outcome = run(&store, &ctx, args.command);

    // Close errors are reported but do not change the exit path
    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
    }

    match outcome {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run(store: &RouteStore, ctx: &Context, command: Commands) -> routekv::Result<()> {
    match command {
        Commands::Get { key } => {
            let route = store.get_link(ctx, &key)?;
            print_route(&key, &route);
        }
        Commands::Set { key, url } => {
            store.update_link(ctx, &key, &Route::new(url))?;
        }
        Commands::Del { key } => {
            store.delete_link(ctx, &key)?;
        }
        Commands::List { start } => {
            print_routes(&store.get_links(ctx, &start)?);
        }
        Commands::Dump => {
            print_routes(&store.get_links(ctx, "")?);
        }
        Commands::NextId => {
            println!("{}", store.next_id(ctx)?);
        }
    }
    Ok(())
}

fn print_routes(routes: &BTreeMap<String, Route>) {
    for (key, route) in routes {
        print_route(key, route);
    }
}

fn print_route(key: &str, route: &Route) {
    println!("{}\t{}\t{}", key, route.url, route.time);
}
