mod demo;

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use demo::config::ServerConfig;
use log::{error, info};
use rbac_gate::{config, logs};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct ServerArgs {
    /// Path of the TOML config file. Defaults are used when it does not exist.
    #[arg(long, short, default_value = "~/.config/rbac-gate/server.toml")]
    pub config: String,

    /// Print server configuration data (JSON) and exit.
    #[arg(long)]
    pub print_config: bool,
}

async fn run(args: ServerArgs) -> Result<()> {
    let cfg: ServerConfig = config::load_config(&args.config)?;

    if args.print_config {
        let json = serde_json::to_string_pretty(&cfg).context("encode config json")?;
        println!("{json}");
        return Ok(());
    }

    logs::init(&cfg.log_level)?;

    let srv = cfg.build_server();
    srv.run().await.context("run demo server")?;

    info!("Server exited by user");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    match run(args).await {
        Ok(()) => {}
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
