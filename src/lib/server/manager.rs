use std::time::Duration;

use actix_cors::Cors;
use actix_extensible_rate_limit::{
    backend::{memory::InMemoryBackend, SimpleInputFunctionBuilder},
    RateLimiter,
};
use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    http::header,
    middleware::from_fn,
    web, App, HttpRequest, HttpServer,
};
use tracing::*;
use tracing_actix_web::TracingLogger;

use super::{auth::require_auth, error::Error, pages, state::AppState};

/// How long in-flight requests may take to complete once a shutdown is requested
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Login attempts allowed per client address within [LOGIN_WINDOW]
pub const LOGIN_ATTEMPTS: u64 = 10;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(60);

fn json_error_handler(error: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    warn!("Problem with json: {error}");
    Error::BadRequest(error.to_string()).into()
}

fn query_error_handler(error: QueryPayloadError, _: &HttpRequest) -> actix_web::Error {
    warn!("Problem with query: {error}");
    Error::BadRequest(error.to_string()).into()
}

// Start REST API server with the desired address
pub async fn run(server_address: &str, state: AppState) -> Result<(), std::io::Error> {
    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .wrap(cors())
            .wrap(TracingLogger::default())
            .configure(configure(state.clone()))
    })
    .shutdown_timeout(SHUTDOWN_GRACE_PERIOD.as_secs())
    .bind(server_address)?
    .run()
    .await
}

/// Cross-origin policy for the web front-end
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH])
        .supports_credentials()
        .max_age(12 * 60 * 60)
}

/// Register the application state, the API and the front-end.
pub fn configure(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let docker_enabled = state.docker_enabled;
        let login_attempts = state.login_attempts.clone();

        cfg.app_data(state)
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .service(
                web::scope("/api")
                    .configure(|cfg| configure_auth_routes(cfg, login_attempts))
                    .configure(|cfg| configure_api_routes(cfg, docker_enabled))
                    .default_service(web::to(pages::api_not_found)),
            )
            // Static file serving (catch-all, must be last so API routes match first)
            .default_service(web::to(pages::root));
    }
}

/// Routes reachable without a session token
fn configure_auth_routes(cfg: &mut web::ServiceConfig, login_attempts: InMemoryBackend) {
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    // Add a rate limiter to slow down password guessing, the counters
                    // are shared by all workers and keyed on the connecting address
                    .wrap(
                        RateLimiter::builder(
                            login_attempts,
                            SimpleInputFunctionBuilder::new(LOGIN_WINDOW, LOGIN_ATTEMPTS)
                                .peer_ip_key()
                                .build(),
                        )
                        .add_headers()
                        .build(),
                    )
                    .route(web::post().to(pages::login)),
            )
            .route("/logout", web::post().to(pages::logout))
            .route("/change-password", web::post().to(pages::change_password)),
    );
}

fn configure_api_routes(cfg: &mut web::ServiceConfig, docker_enabled: bool) {
    cfg.service(
        web::scope("/users")
            .wrap(from_fn(require_auth))
            .route("", web::get().to(pages::not_implemented))
            .route("/", web::get().to(pages::not_implemented))
            .route("", web::post().to(pages::not_implemented))
            .route("/", web::post().to(pages::not_implemented))
            .route("/{id}", web::get().to(pages::not_implemented))
            .route("/{id}", web::put().to(pages::not_implemented))
            .route("/{id}", web::delete().to(pages::not_implemented)),
    )
    .service(
        web::scope("/system")
            .wrap(from_fn(require_auth))
            .route("/status", web::get().to(pages::system_status))
            .route("/resources", web::get().to(pages::system_status))
            .route("/processes", web::get().to(pages::processes))
            .route("/info", web::get().to(pages::info)),
    )
    .service(
        web::scope("/services")
            .wrap(from_fn(require_auth))
            .route("", web::get().to(pages::not_implemented))
            .route("/", web::get().to(pages::not_implemented))
            .route("/{name}", web::get().to(pages::not_implemented))
            .route("/{name}/start", web::post().to(pages::not_implemented))
            .route("/{name}/stop", web::post().to(pages::not_implemented))
            .route("/{name}/restart", web::post().to(pages::not_implemented)),
    )
    .service(
        web::scope("/files")
            .wrap(from_fn(require_auth))
            .route("", web::get().to(pages::list_files))
            .route("/", web::get().to(pages::list_files))
            .route("", web::delete().to(pages::not_implemented))
            .route("/", web::delete().to(pages::not_implemented))
            .route("/content", web::get().to(pages::not_implemented))
            .route("/upload", web::post().to(pages::not_implemented))
            .route("/mkdir", web::post().to(pages::not_implemented)),
    )
    .service(
        web::scope("/settings")
            .wrap(from_fn(require_auth))
            .route("", web::get().to(pages::not_implemented))
            .route("/", web::get().to(pages::not_implemented))
            .route("/{key}", web::put().to(pages::not_implemented)),
    );

    if docker_enabled {
        cfg.service(
            web::scope("/docker")
                .wrap(from_fn(require_auth))
                .route("/containers", web::get().to(pages::not_implemented))
                .route("/containers", web::post().to(pages::not_implemented))
                .route("/containers/{id}", web::get().to(pages::not_implemented))
                .route("/containers/{id}", web::delete().to(pages::not_implemented))
                .route(
                    "/containers/{id}/start",
                    web::post().to(pages::not_implemented),
                )
                .route(
                    "/containers/{id}/stop",
                    web::post().to(pages::not_implemented),
                )
                .route("/images", web::get().to(pages::not_implemented)),
        );
    }
}
