// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Chathletique MCP Server
//!
//! A Model Context Protocol (MCP) server that turns an AI assistant into a
//! running coach. It reads the athlete's Strava history, plans loop
//! itineraries of a requested length and fetches weather forecasts for the
//! athlete's usual running area.
//!
//! ## Features
//!
//! - **Running stats**: totals and the most recent runs from Strava
//! - **Loop itineraries**: round trips refined until their length matches the
//!   request, returned as a Google Maps deep link
//! - **Segment loops**: loops that pass through a popular Strava segment
//! - **Weather**: 5-day / 3-hour forecasts, filtered for running
//! - **Activity series**: cleaned heart-rate and speed streams
//!
//! ## Quick Start
//!
//! 1. Put the provider keys in a `.env` file or a TOML config
//! 2. Start the server with `chathletique-mcp`
//! 3. Connect from Claude or another MCP client over TCP or `POST /mcp`
//!
//! ## Architecture
//!
//! - **Providers**: HTTP clients behind one trait per capability
//! - **Itinerary**: distance refinement and deep-link construction
//! - **Intelligence**: geocoding, forecast filtering and stream cleaning
//! - **MCP**: JSON-RPC handling, tool schemas and the two transports
//! - **Config**: file or environment configuration handed to every tool
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chathletique_mcp::config::Config;
//! use chathletique_mcp::mcp::{call_tool, ToolContext};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let ctx = ToolContext::from_config(&config)?;
//!
//!     let result = call_tool(
//!         &ctx,
//!         "create_itinerary",
//!         &json!({ "starting_place": "Opéra, Paris", "distance_km": 10 }),
//!     )
//!     .await?;
//!     println!("{}", result["link"]);
//!
//!     Ok(())
//! }
//! ```

/// Routing, activity, geocoding and forecast provider clients
pub mod providers;

/// Common data models
pub mod models;

/// Configuration management and persistence
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Distance-targeted loop planning
pub mod itinerary;

/// Model Context Protocol server implementation
pub mod mcp;

/// Geocoding, forecasts and activity stream cleaning
pub mod intelligence;

/// Production logging and structured output
pub mod logging;

/// Health checks and monitoring
pub mod health;
