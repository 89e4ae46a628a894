// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use chathletique_mcp::{
    config::Config, health::HealthChecker, logging, logging::AppLogger, mcp::McpServer,
};
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Line-delimited JSON-RPC over TCP
    Tcp,
    /// `POST /mcp` plus health routes
    Http,
    /// Both transports at once
    Both,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port, overrides the configured one
    #[arg(short, long)]
    port: Option<u16>,

    /// HTTP port, overrides the configured one
    #[arg(long)]
    http_port: Option<u16>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long, value_enum, default_value = "both")]
    transport: Transport,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;

    let args = Args::parse();

    let mut config = Config::load(args.config)?;
    if let Some(port) = args.port {
        config.server.tcp_port = port;
    }
    if let Some(port) = args.http_port {
        config.server.http_port = port;
    }
    config.validate()?;
    AppLogger::log_config_summary(&config.summary());

    let server = McpServer::from_config(&config)?;
    let health_checker = Arc::new(HealthChecker::new(&config));
    let host = config.server.host.clone();

    let result = match args.transport {
        Transport::Tcp => server.run(&host, config.server.tcp_port).await,
        Transport::Http => {
            server
                .run_http(&host, config.server.http_port, health_checker)
                .await
        }
        Transport::Both => {
            info!(
                "Serving TCP on {} and HTTP on {}",
                config.server.tcp_port, config.server.http_port
            );
            tokio::try_join!(
                server.clone().run(&host, config.server.tcp_port),
                server.run_http(&host, config.server.http_port, health_checker),
            )
            .map(|_| ())
        }
    };

    if let Err(e) = &result {
        error!("Server error: {:#}", e);
    }
    result
}
