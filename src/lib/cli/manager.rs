use std::path::PathBuf;

use clap::Parser;

/// Command line arguments. Every value can also come from an
/// `UBUNTU_PANEL_*` environment variable, and when neither is given the
/// configuration file decides.
#[derive(Parser, Clone, Debug, Default)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Args {
    /// Path of the TOML configuration file
    #[arg(long, value_name = "FILE", env = "UBUNTU_PANEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Development mode, logs everything down to debug
    #[arg(long, env = "UBUNTU_PANEL_DEV")]
    pub dev: bool,

    /// Turn all log categories up to Debug, for more information check RUST_LOG env variable
    #[arg(short, long)]
    pub verbose: bool,

    /// Address the REST API binds to
    #[arg(long, env = "UBUNTU_PANEL_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "UBUNTU_PANEL_PORT")]
    pub port: Option<u16>,

    /// Where the database and the default log file live
    #[arg(long, value_name = "DIR", env = "UBUNTU_PANEL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", env = "UBUNTU_PANEL_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, value_name = "FILE", env = "UBUNTU_PANEL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Directory with the web front-end
    #[arg(long, value_name = "DIR", env = "UBUNTU_PANEL_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Only this directory and below can be browsed through the files API
    #[arg(long, value_name = "DIR", env = "UBUNTU_PANEL_FILES_ROOT")]
    pub files_root: Option<PathBuf>,

    #[arg(long, value_name = "BOOL", env = "UBUNTU_PANEL_DOCKER_ENABLED")]
    pub docker_enabled: Option<bool>,

    #[arg(long, value_name = "PATH", env = "UBUNTU_PANEL_DOCKER_SOCKET")]
    pub docker_socket: Option<PathBuf>,

    /// Secret used to sign session tokens
    #[arg(
        long,
        value_name = "SECRET",
        env = "UBUNTU_PANEL_JWT_SECRET",
        hide_env_values = true
    )]
    pub jwt_secret: Option<String>,

    /// Session token lifetime, in seconds
    #[arg(long, value_name = "SECONDS", env = "UBUNTU_PANEL_SESSION_TIMEOUT")]
    pub session_timeout: Option<u64>,

    /// bcrypt cost of new password hashes
    #[arg(
        long,
        value_name = "COST",
        env = "UBUNTU_PANEL_PASSWORD_HASH_COST",
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub password_hash_cost: Option<u32>,
}

impl Args {
    pub fn is_verbose(&self) -> bool {
        self.verbose || self.dev
    }
}

// Return the command line used to start this application
pub fn command_line_string() -> String {
    std::env::args().collect::<Vec<String>>().join(" ")
}
