//! CLI for reportauth: resolve the report server URL, serve the logon endpoint.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reportauth_rs::{Config, Extension, HostLocator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reportauth")]
#[command(about = "Report server discovery and anonymous logon")]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// JSON management inventory snapshot; overrides `inventory` in the config
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and print the report server web service URL.
    Resolve {
        /// Host running the report server (defaults to discovery.machine_name)
        #[arg(long)]
        machine: Option<String>,
        /// Instance name as used in the namespace, e.g. RS_MSSQLSERVER
        #[arg(long)]
        instance: Option<String>,
    },
    /// Serve the logon endpoint until Ctrl-C.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env()?;
    if let Some(path) = &cli.inventory {
        config.inventory = Some(path.clone());
    }
    Ok(config)
}

fn run_resolve(
    config: Config,
    machine: Option<String>,
    instance: Option<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ext = Extension::from_config(config)?;
    let default = ext.locator();
    let locator = HostLocator::new(
        machine.unwrap_or(default.machine_name),
        instance.unwrap_or(default.instance_name),
    );
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let url = rt.block_on(ext.resolve(&locator))?;
    println!("{}", url);
    Ok(())
}

fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    Extension::from_config(config)?.run()
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Resolve { machine, instance } => run_resolve(config, machine, instance),
        Commands::Serve { host, port } => run_serve(config, host, port),
    }
}
