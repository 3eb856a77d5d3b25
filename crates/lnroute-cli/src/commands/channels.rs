//! `lnroute channels`: list the backing node's own channels.

use clap::Args;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct ChannelsArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = super::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Print the raw JSON response.
    #[arg(long)]
    pub json: bool,
}

#[derive(Deserialize)]
struct Channel {
    chan_id: u64,
    active: bool,
    remote_pubkey: String,
    capacity: u64,
    local_balance: u64,
    remote_balance: u64,
}

#[derive(Deserialize)]
struct ChannelsResponse {
    channels: Vec<Channel>,
    count: usize,
}

pub async fn run(args: &ChannelsArgs) -> anyhow::Result<()> {
    let raw: serde_json::Value =
        super::get_json(&args.endpoint, "/api/v1/channels", "channel listing").await?;
    if args.json {
        return super::print_json(&raw);
    }
    let resp: ChannelsResponse = serde_json::from_value(raw)?;

    println!("Channels ({}):", resp.count);
    for c in &resp.channels {
        println!(
            "  {:>20}  {}  {:>12} sat  local {:>12}  remote {:>12}  {}",
            c.chan_id,
            if c.active { "active  " } else { "inactive" },
            c.capacity,
            c.local_balance,
            c.remote_balance,
            c.remote_pubkey
        );
    }
    Ok(())
}
