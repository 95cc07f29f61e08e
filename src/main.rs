use std::sync::Arc;

use actix_extensible_rate_limit::backend::memory::InMemoryBackend;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::*;

use ubuntu_panel::{
    auth::Authenticator,
    cli::manager::Args,
    files::FileBrowser,
    logger, server,
    settings::{self, manager::Settings},
    storage::Storage,
    system::SysinfoProbe,
};

#[actix_web::main]
async fn main() {
    let args = Args::parse();

    // The logger depends on the settings, so failures before it is up go to stderr
    let settings = match settings::manager::load(&args) {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("Failed to load configuration: {error:#}");
            std::process::exit(1);
        }
    };

    if let Err(error) = logger::manager::init(&settings, args.is_verbose()) {
        eprintln!("Failed to start logger: {error:#}");
        std::process::exit(1);
    }

    if let Err(error) = run(settings).await {
        error!("{error:#}");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<()> {
    debug!(
        "Settings: {}",
        serde_json::to_string(&settings).unwrap_or_default()
    );
    if settings.uses_default_secret() {
        warn!("Using the default token secret, set `jwt_secret` in the configuration file");
    }

    let authenticator = Authenticator::new(
        &settings.jwt_secret,
        settings.session_timeout,
        settings.password_hash_cost,
    );

    // Schema and seed must be in place before accepting traffic
    let storage = Storage::open(&settings.database_path())
        .await
        .context("Failed to open database")?;
    storage
        .migrate()
        .await
        .context("Failed to migrate database")?;
    storage
        .seed_default_admin(&authenticator)
        .await
        .context("Failed to create the default user")?;

    if settings.docker_enabled {
        debug!("Docker endpoints enabled, socket: {:?}", settings.docker_socket);
    }

    let state = server::AppState {
        probe: Arc::new(SysinfoProbe::default()),
        storage,
        authenticator,
        files: FileBrowser::new(&settings.files_root),
        static_dir: settings.static_dir.clone(),
        docker_enabled: settings.docker_enabled,
        login_attempts: InMemoryBackend::builder().build(),
    };

    server::manager::run(&settings.server_address(), state)
        .await
        .context("Failed starting web API")?;

    info!("Server stopped");

    Ok(())
}
