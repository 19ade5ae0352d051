use std::sync::Arc;

use anyhow::Context;

use connect_server::directory::{ProcessEnvironment, ServerDirectory};
use connect_server::gateway::{GatewayRuntime, start_gateway};
use connect_server::registry::CipherRegistry;
use connect_server::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (for development)
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting Connect Server gateway...");
    log::info!("Protocol version: {}", protocol::protocol_version());

    // Load configuration
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "server/config/connectserver.toml".to_string());

    let settings = match Settings::load_from_file(&config_path) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!(
                "Failed to load settings from '{}': {}. Falling back to default settings.",
                config_path,
                err
            );
            Settings::default()
        }
    };
    let settings = Arc::new(settings);

    // Cipher registrations are startup configuration; a bad table is fatal.
    let registry = CipherRegistry::from_settings(&settings).unwrap_or_else(|err| {
        eprintln!("Invalid cipher registration table: {}", err);
        std::process::exit(1);
    });
    log::info!("Registered {} client generations", registry.len());

    let directory = ServerDirectory::from_settings(&settings, Arc::new(ProcessEnvironment))
        .context("failed to seed the server directory")?;
    log::info!("Seeded {} game servers", directory.server_count());

    let runtime = Arc::new(GatewayRuntime::new(
        Arc::clone(&settings),
        Arc::new(registry),
        Arc::new(directory),
    ));

    let handle = start_gateway(runtime)
        .await
        .context("failed to start the gateway listener")?;
    log::info!(
        "Gateway listening at {} (host={} port={})",
        handle.local_addr(),
        settings.listener.host,
        settings.listener.port
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the shutdown signal")?;
    log::info!("Shutdown signal received");
    handle.close();

    Ok(())
}
