use std::{path::PathBuf, sync::Arc};

use actix_extensible_rate_limit::backend::memory::InMemoryBackend;

use crate::{auth::Authenticator, files::FileBrowser, storage::Storage, system::SystemProbe};

/// Everything the handlers need, built once at startup and shared by all workers.
#[derive(Clone)]
pub struct AppState {
    pub probe: Arc<dyn SystemProbe>,
    pub storage: Storage,
    pub authenticator: Authenticator,
    pub files: FileBrowser,
    pub static_dir: PathBuf,
    pub docker_enabled: bool,
    /// Login attempt counters
    pub login_attempts: InMemoryBackend,
}
