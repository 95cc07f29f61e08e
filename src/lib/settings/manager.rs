use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::cli::manager::Args;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOG_FILE_NAME: &str = "ubuntu-panel.log";
pub const DEFAULT_JWT_SECRET: &str = "ubuntu_panel_secret_key";

/// Values accepted in the configuration file, all optional
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    /// Seconds
    pub session_timeout: Option<u64>,
    pub password_hash_cost: Option<u32>,
    pub docker_enabled: Option<bool>,
    pub docker_socket: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub files_root: Option<PathBuf>,
}

/// Resolved runtime configuration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_file: PathBuf,
    #[serde(skip)]
    pub jwt_secret: String,
    pub session_timeout: Duration,
    pub password_hash_cost: u32,
    pub docker_enabled: bool,
    pub docker_socket: PathBuf,
    pub static_dir: PathBuf,
    pub files_root: PathBuf,
}

impl Settings {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(crate::storage::DATABASE_FILE_NAME)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Merge command line, file and defaults, in this order of priority.
    pub fn resolve(args: &Args, file: SettingsFile) -> Self {
        let data_dir = args
            .data_dir
            .clone()
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from("/opt/ubuntu-panel"));

        let log_file = args
            .log_file
            .clone()
            .or(file.log_file)
            .unwrap_or_else(|| data_dir.join(LOG_FILE_NAME));

        Self {
            host: args
                .host
                .clone()
                .or(file.host)
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.or(file.port).unwrap_or(7800),
            log_level: args
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| "info".into()),
            log_file,
            jwt_secret: args
                .jwt_secret
                .clone()
                .or(file.jwt_secret)
                .unwrap_or_else(|| DEFAULT_JWT_SECRET.into()),
            session_timeout: Duration::from_secs(
                args.session_timeout
                    .or(file.session_timeout)
                    .unwrap_or(24 * 60 * 60),
            ),
            password_hash_cost: args
                .password_hash_cost
                .or(file.password_hash_cost)
                .unwrap_or(bcrypt::DEFAULT_COST),
            docker_enabled: args.docker_enabled.or(file.docker_enabled).unwrap_or(true),
            docker_socket: args
                .docker_socket
                .clone()
                .or(file.docker_socket)
                .unwrap_or_else(|| PathBuf::from("/var/run/docker.sock")),
            static_dir: args
                .static_dir
                .clone()
                .or(file.static_dir)
                .unwrap_or_else(|| Path::new("web").join("dist")),
            files_root: args
                .files_root
                .clone()
                .or(file.files_root)
                .unwrap_or_else(|| PathBuf::from("/")),
            data_dir,
        }
    }
}

/// Load the configuration for this run and make sure the data directory exists.
///
/// An explicit `--config` file must exist, otherwise the first file found in
/// the default locations is used, if any.
pub fn load(args: &Args) -> Result<Settings> {
    let file = match &args.config {
        Some(path) => Some(read_settings_file(path)?),
        None => match default_settings_path() {
            Some(path) => Some(read_settings_file(&path)?),
            None => None,
        },
    };

    let settings = Settings::resolve(args, file.unwrap_or_default());

    std::fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            settings.data_dir.display()
        )
    })?;

    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))
}

fn default_settings_path() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(project) = ProjectDirs::from("com", "Ubuntu Panel", env!("CARGO_PKG_NAME")) {
        candidates.push(project.config_dir().join(CONFIG_FILE_NAME));
    }
    candidates.push(Path::new("/etc/ubuntu-panel").join(CONFIG_FILE_NAME));
    candidates.push(Path::new("/opt/ubuntu-panel").join(CONFIG_FILE_NAME));

    let found = candidates.into_iter().find(|path| path.is_file());
    if let Some(path) = &found {
        debug!("Using configuration file: {}", path.display());
    }

    found
}
