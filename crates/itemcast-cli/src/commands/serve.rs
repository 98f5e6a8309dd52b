//! Web server command.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use itemcast_core::ItemService;
use itemcast_db::{open_repository, DbConfig, DbType};
use itemcast_hub::{Hub, HubConfig, PumpConfig};
use itemcast_web::AppState;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Storage backend (sqlite or memory)
    #[arg(long, env = "DB_TYPE", default_value = "sqlite")]
    pub db_type: String,

    /// SQLite database file
    #[arg(long, env = "DB_PATH", default_value = "itemcast.db")]
    pub db_path: PathBuf,

    /// Outbound queue capacity per WebSocket client
    #[arg(long, env = "HUB_QUEUE_CAPACITY", default_value_t = itemcast_hub::config::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Seconds between keepalive pings
    #[arg(long, default_value_t = 30)]
    pub ping_interval: u64,

    /// Seconds a single WebSocket write may take
    #[arg(long, default_value_t = 10)]
    pub write_timeout: u64,

    /// Seconds without a pong before a client is dropped
    #[arg(long, default_value_t = 60)]
    pub read_timeout: u64,

    /// Largest inbound WebSocket message, in bytes
    #[arg(long, default_value_t = 512)]
    pub max_message_size: usize,

    /// Also write logs to this file
    #[arg(long)]
    pub log: Option<PathBuf>,
}

impl ServeArgs {
    fn db_config(&self) -> Result<DbConfig> {
        let db_type: DbType = self.db_type.parse()?;
        Ok(DbConfig {
            db_type,
            path: self.db_path.clone(),
        })
    }

    fn pump_config(&self) -> PumpConfig {
        PumpConfig {
            ping_interval_secs: self.ping_interval,
            write_timeout_secs: self.write_timeout,
            read_timeout_secs: self.read_timeout,
            max_message_size: self.max_message_size,
        }
    }

    fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let addr = args.addr()?;
    let db = args.db_config()?;
    let repo = open_repository(&db)
        .with_context(|| format!("Failed to initialize {} repository", db.db_type))?;

    let hub = Hub::spawn(HubConfig {
        queue_capacity: args.queue_capacity,
    });
    let state = AppState::new(ItemService::new(repo, hub), args.pump_config());

    println!();
    println!("  {} {}", "Itemcast".cyan().bold(), "Server".bold());
    println!();
    println!("  {}    {}", "Storage".green(), db.db_type);
    println!("  {}        http://{}/api/v1/items", "API".green(), addr);
    println!("  {}  ws://{}/ws", "WebSocket".green(), addr);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    itemcast_web::run_server(state, addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    })
    .await
}
