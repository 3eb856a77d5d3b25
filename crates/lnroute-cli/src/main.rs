//! lnroute CLI: operator commands against a running lnroute node.
//!
//! Subcommands: status, edge, channels, route.

mod commands;

use clap::{Parser, Subcommand};

/// lnroute: inspect the channel graph and build routes.
#[derive(Parser, Debug)]
#[command(name = "lnroute", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
    /// Show a cached channel edge.
    Edge(commands::edge::EdgeArgs),
    /// List the backing node's own channels.
    Channels(commands::channels::ChannelsArgs),
    /// Build a route over an explicit list of channels.
    Route(commands::route::RouteArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Status(args) => commands::status::run(args).await,
        Commands::Edge(args) => commands::edge::run(args).await,
        Commands::Channels(args) => commands::channels::run(args).await,
        Commands::Route(args) => commands::route::run(args).await,
    }
}
