// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Itinerary Planner
//!
//! Plans one loop from the command line without starting the server and
//! prints the Google Maps link on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use chathletique_mcp::{
    config::Config,
    constants::{json_fields, tools},
    logging,
    mcp::{call_tool, ToolContext},
};
use clap::Parser;
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "plan-itinerary")]
#[command(about = "Plan a running loop of a given length and print its Google Maps link")]
struct Args {
    /// Place name or address where the loop starts
    #[arg(long)]
    place: Option<String>,

    /// Target length in kilometers
    #[arg(short, long)]
    distance_km: Option<f64>,

    /// Route the loop through a popular Strava segment
    #[arg(long)]
    segment: bool,

    /// Print the whole tool result as JSON instead of the link
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;
    let args = Args::parse();

    let config = Config::load(args.config)?;
    let ctx = ToolContext::from_config(&config)?;

    let tool = if args.segment {
        tools::CREATE_SEGMENT_ITINERARY
    } else {
        tools::CREATE_ITINERARY
    };
    let mut arguments = json!({});
    arguments[json_fields::STARTING_PLACE] = json!(args.place);
    arguments[json_fields::DISTANCE_KM] = json!(args.distance_km);

    let result = call_tool(&ctx, tool, &arguments)
        .await
        .with_context(|| format!("{} failed", tool))?;
    info!(
        "{} after {} attempts: {} m",
        result["status"], result["attempts"], result["achieved_distance_m"]
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let link = result["link"]
            .as_str()
            .context("Tool result has no link")?;
        println!("{}", link);
    }
    Ok(())
}
