mod cli;

use vidrelay::{
    config,
    retention::{RetentionPolicy, RetentionScheduler},
    server,
};
use vidrelay_store::FileStore;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vidrelay");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        dir = ?config.storage.dir,
        ttl_hours = config.storage.ttl_hours,
        sweep_interval_secs = config.storage.sweep_interval_secs,
        "Retention policy"
    );

    server::start_server(config).await
}

async fn sweep(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let store = FileStore::new(&config.storage.dir);
    let scheduler = RetentionScheduler::new(store, RetentionPolicy::from(&config.storage));

    let report = scheduler.sweep_now().await?;
    println!("Scanned: {}", report.scanned);
    println!("Deleted: {}", report.deleted);
    println!("Already gone: {}", report.already_gone);
    println!("Kept: {}", report.skipped);
    println!("Failed: {}", report.failed);

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidrelay=trace,vidrelay_store=trace,tower_http=debug".to_string()
        } else {
            "vidrelay=debug,vidrelay_store=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Sweep => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(sweep(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidrelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Public URL: {}", config.server.public_url);
    println!("  Storage: {:?}", config.storage.dir);
    println!("  TTL: {} hours", config.storage.ttl_hours);
    println!("  Sweep every: {}s", config.storage.sweep_interval_secs);
    println!(
        "  Resolver: {}",
        if config.resolver.api_url.is_empty() {
            "(not configured)"
        } else {
            config.resolver.api_url.as_str()
        }
    );
    println!("  Channel enabled: {}", config.channel.enabled);

    Ok(())
}
