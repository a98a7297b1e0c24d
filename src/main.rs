use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info, warn};

use filestash::{AppState, Config, Database, WebServer};

const CONFIG_FILE: &str = "config.toml";

fn load_config() -> filestash::Result<Config> {
    if Path::new(CONFIG_FILE).exists() {
        Config::load_with_env(CONFIG_FILE)
    } else {
        Config::from_env()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match load_config().and_then(|config| config.validate().map(|()| config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = filestash::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filestash::logging::init_console_only(&config.logging.level);
    }

    info!("filestash starting");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database.path, e);
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::from_config(&config, db) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize services: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Leftovers from uploads interrupted by a crash
    if let Err(e) = state.storage.sweep_partials() {
        warn!("Failed to sweep interrupted uploads: {}", e);
    }
    if let Err(e) = state.storage.cleanup_empty_dirs() {
        warn!("Failed to clean up empty storage directories: {}", e);
    }

    let server = match WebServer::new(&config.server, state) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server configured on {}", server.addr());

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
