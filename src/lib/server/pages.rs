use std::path::{Component, Path, PathBuf};

use actix_files::NamedFile;
use actix_web::{
    web::{self, Json},
    HttpRequest, HttpResponse,
};
use serde::{Deserialize, Serialize};
use tracing::*;
use validator::Validate;

use super::{
    auth::authorize,
    error::{Error, Result},
    state::AppState,
};
use crate::{
    auth::Claims,
    files::DirectoryEntry,
    system::{
        self,
        types::{HostInfo, ProcessInfo, SystemStatus},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 6, max = 72))]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Info {
    pub name: String,
    pub version: String,
    pub build_date: String,
    #[serde(flatten)]
    pub host: HostInfo,
}

/// Serve the web front-end, falling back to its `index.html` so the client
/// side router can handle the path.
pub async fn root(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    let path = req.path();
    if path == "/api" || path.starts_with("/api/") {
        return Err(Error::NotFound("API not found".to_string()));
    }

    let filename = path.trim_start_matches('/');
    let filename = if filename.is_empty() {
        "index.html"
    } else {
        filename
    };

    if let Some(file) = static_file(&state.static_dir, filename) {
        return Ok(file.into_response(&req));
    }

    // SPA fallback: serve index.html for client-side routing
    if let Some(file) = static_file(&state.static_dir, "index.html") {
        return Ok(file.into_response(&req));
    }

    Err(Error::NotFound("Not found".to_string()))
}

fn static_file(static_dir: &Path, filename: &str) -> Option<NamedFile> {
    let relative = PathBuf::from(filename);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        warn!("Refusing to serve {filename:?}");
        return None;
    }

    let path = static_dir.join(relative);
    if !path.is_file() {
        return None;
    }

    NamedFile::open(&path)
        .map_err(|error| warn!("Failed to open {path:?}: {error}"))
        .ok()
}

pub async fn api_not_found() -> Result<HttpResponse> {
    Err(Error::NotFound("API not found".to_string()))
}

/// Routes that exist but have no behavior yet
pub async fn not_implemented() -> Result<HttpResponse> {
    Err(Error::NotImplemented)
}

/// Exchange valid credentials for a session token
pub async fn login(
    state: web::Data<AppState>,
    json: web::Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let request = json.into_inner();
    request.validate()?;

    let user = state.storage.user_by_username(&request.username).await?;

    let authenticator = state.authenticator.clone();
    let password = request.password;
    let user = web::block(move || {
        authenticator
            .authenticate(user.as_ref(), &password)
            .map(|_| user)
    })
    .await??;

    let Some(user) = user else {
        return Err(Error::Internal("authenticated user vanished".to_string()));
    };

    let token = state.authenticator.issue_token(&user)?;
    info!("User {:?} logged in", user.username);

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        expires_in: state.authenticator.session_timeout().as_secs(),
    }))
}

/// Tokens are stateless, the client drops its own copy
pub async fn logout() -> Result<Json<MessageResponse>> {
    Ok(MessageResponse::new("Logout successful"))
}

/// Change the password of the user owning the session token
pub async fn change_password(
    req: HttpRequest,
    state: web::Data<AppState>,
    json: web::Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let claims = authorize(&req)?;
    let request = json.into_inner();
    request.validate()?;

    let user = state
        .storage
        .user_by_username(&claims.sub)
        .await?
        .filter(|user| user.id == claims.uid)
        .ok_or_else(|| Error::Unauthorized("Invalid or expired token".to_string()))?;

    let authenticator = state.authenticator.clone();
    let password_hash = web::block(move || {
        if !authenticator.verify_password(&request.old_password, &user.password_hash) {
            return Err(Error::BadRequest("Current password is incorrect".to_string()));
        }

        Ok(authenticator.hash_password(&request.new_password)?)
    })
    .await??;

    state.storage.update_password(claims.uid, &password_hash).await?;
    info!("User {:?} changed its password", claims.sub);

    Ok(MessageResponse::new("Password changed successfully"))
}

/// Provide CPU, memory, disk and network usage of the host
pub async fn system_status(state: web::Data<AppState>) -> Result<Json<SystemStatus>> {
    let probe = state.probe.clone();
    let status = web::block(move || system::system_status(probe.as_ref())).await??;

    Ok(Json(status))
}

/// Provide the list of running processes
pub async fn processes(state: web::Data<AppState>) -> Result<Json<Vec<ProcessInfo>>> {
    let probe = state.probe.clone();
    let processes = web::block(move || system::list_processes(probe.as_ref())).await??;

    Ok(Json(processes))
}

/// Provide information about the running service and its host
pub async fn info(state: web::Data<AppState>) -> Result<Json<Info>> {
    let probe = state.probe.clone();
    let host = web::block(move || probe.host_info()).await?;

    Ok(Json(Info {
        name: env!("CARGO_PKG_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        build_date: option_env!("VERGEN_BUILD_DATE").unwrap_or("?").into(),
        host,
    }))
}

/// List the content of a directory, the filesystem root by default
pub async fn list_files(
    state: web::Data<AppState>,
    query: web::Query<ListFilesQuery>,
    claims: web::ReqData<Claims>,
) -> Result<Json<Vec<DirectoryEntry>>> {
    let path = query.into_inner().path;
    debug!("{:?} is listing {path:?}", claims.sub);

    let files = state.files.clone();
    let entries = web::block(move || files.list_directory(&path)).await??;

    Ok(Json(entries))
}
