use std::{collections::HashSet, path::PathBuf, sync::Arc, time::Duration};

use actix_extensible_rate_limit::backend::memory::InMemoryBackend;
use actix_web::{
    http::{header, Method, StatusCode},
    test, web, App,
};
use serde_json::{json, Value};

use ubuntu_panel::{
    auth::Authenticator,
    files::FileBrowser,
    server::{manager, AppState},
    storage::{Storage, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME},
    system::{
        fake_probe::FakeProbe,
        types::{DiskUsage, MemoryUsage, ProcessSample},
        Metric,
    },
};

const STATUS_JSON: &str = r#"{"cpu":{"usage_percent":12.5,"temperature":0.0},"memory":{"total":1000,"used":400,"free":600,"usage_percent":40.0},"disk":{"total":5000,"used":2500,"free":2500,"usage_percent":50.0},"network":[]}"#;

fn status_probe() -> FakeProbe {
    FakeProbe {
        cpu_usage: 12.5,
        memory: MemoryUsage {
            total: 1000,
            used: 400,
            free: 600,
            usage_percent: 40.0,
        },
        disk: DiskUsage {
            total: 5000,
            used: 2500,
            free: 2500,
            usage_percent: 50.0,
        },
        network: vec![],
        ..Default::default()
    }
}

async fn state_with(probe: FakeProbe) -> AppState {
    let storage = Storage::in_memory().await.unwrap();
    storage.migrate().await.unwrap();

    // Lowest bcrypt cost, keeps the tests fast
    let authenticator = Authenticator::new("integration-secret", Duration::from_secs(600), 4);
    storage.seed_default_admin(&authenticator).await.unwrap();

    AppState {
        probe: Arc::new(probe),
        storage,
        authenticator,
        files: FileBrowser::default(),
        static_dir: PathBuf::from("/nonexistent-ubuntu-panel-static"),
        docker_enabled: true,
        login_attempts: InMemoryBackend::builder().build(),
    }
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(App::new().configure(manager::configure(web::Data::new($state)))).await
    };
}

async fn bearer(state: &AppState) -> String {
    let admin = state
        .storage
        .user_by_username(DEFAULT_ADMIN_USERNAME)
        .await
        .unwrap()
        .unwrap();
    format!("Bearer {}", state.authenticator.issue_token(&admin).unwrap())
}

fn login_request(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr("127.0.0.1:40000".parse().unwrap())
        .set_json(json!({ "username": username, "password": password }))
}

#[actix_web::test]
async fn system_status_is_serialized_as_expected() {
    let state = state_with(status_probe()).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    for uri in ["/api/system/status", "/api/system/resources"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header((header::AUTHORIZATION, token.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");

        let body = test::read_body(resp).await;
        assert_eq!(body, STATUS_JSON, "{uri}");
    }
}

#[actix_web::test]
async fn failing_metric_aborts_system_status() {
    let state = state_with(status_probe().failing(Metric::Network)).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/system/status")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("network"), "{error}");
}

#[actix_web::test]
async fn missing_authorization_is_rejected() {
    let app = init_app!(state_with(status_probe()).await);

    let req = test::TestRequest::get().uri("/api/system/status").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        test::read_body(resp).await,
        r#"{"error":"Authorization header required"}"#
    );

    let req = test::TestRequest::get()
        .uri("/api/system/processes")
        .insert_header((header::AUTHORIZATION, "   "))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn placeholder_token_is_rejected() {
    let app = init_app!(state_with(status_probe()).await);

    let req = test::TestRequest::get()
        .uri("/api/system/status")
        .insert_header((header::AUTHORIZATION, "mock-token-for-testing"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        test::read_body(resp).await,
        r#"{"error":"Invalid or expired token"}"#
    );
}

#[actix_web::test]
async fn processes_with_missing_details_are_listed() {
    let probe = FakeProbe {
        processes: vec![
            ProcessSample {
                pid: 1,
                name: Some("systemd".into()),
                cpu_percent: Some(0.25),
                mem_percent: Some(0.5),
                status: Some("Sleeping".into()),
            },
            ProcessSample {
                pid: 4242,
                ..Default::default()
            },
        ],
        ..status_probe()
    };
    let state = state_with(probe).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/system/processes")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let processes: Vec<Value> = test::call_and_read_body_json(&app, req).await;

    assert_eq!(processes.len(), 2);
    assert!(processes.contains(&json!({
        "pid": 1,
        "name": "systemd",
        "cpu_percent": 0.25,
        "mem_percent": 0.5,
        "status": "Sleeping",
    })));
    assert!(processes.contains(&json!({
        "pid": 4242,
        "name": "",
        "cpu_percent": 0.0,
        "mem_percent": 0.0,
        "status": "",
    })));
}

#[actix_web::test]
async fn directory_listing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"0123456789").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let state = state_with(status_probe()).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri(&format!("/api/files/?path={}", dir.path().display()))
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let entries: Vec<Value> = test::call_and_read_body_json(&app, req).await;

    assert_eq!(entries.len(), 2);
    let found: HashSet<(String, bool)> = entries
        .iter()
        .map(|entry| {
            (
                entry["name"].as_str().unwrap().to_string(),
                entry["is_dir"].as_bool().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        found,
        HashSet::from([("a.txt".to_string(), false), ("sub".to_string(), true)])
    );

    let file = entries.iter().find(|entry| entry["name"] == "a.txt").unwrap();
    assert_eq!(file["size"], 10);
    assert!(file["mod_time"].is_string());
}

#[actix_web::test]
async fn directory_listing_defaults_to_root() {
    let state = state_with(status_probe()).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    let mut listings = Vec::new();
    for uri in ["/api/files", "/api/files/?path=", "/api/files/?path=/"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header((header::AUTHORIZATION, token.clone()))
            .to_request();
        let entries: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        let mut names: Vec<String> = entries
            .iter()
            .map(|entry| entry["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        listings.push(names);
    }

    assert!(!listings[0].is_empty());
    assert_eq!(listings[0], listings[1]);
    assert_eq!(listings[1], listings[2]);
}

#[actix_web::test]
async fn directory_listing_errors() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("inner")).unwrap();

    let state = AppState {
        files: FileBrowser::new(root.path().join("inner")),
        ..state_with(status_probe()).await
    };
    let token = bearer(&state).await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/files/?path=/nonexistent")
        .insert_header((header::AUTHORIZATION, token.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    let req = test::TestRequest::get()
        .uri("/api/files/?path=../")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn login_issues_a_usable_token() {
    let app = init_app!(state_with(status_probe()).await);

    let resp = test::call_service(
        &app,
        login_request(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["expires_in"], 600);
    let token = body["token"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/system/status")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn login_with_bad_credentials_fails() {
    let app = init_app!(state_with(status_probe()).await);

    for (username, password) in [("admin", "wrong"), ("nobody", "admin123")] {
        let resp = test::call_service(&app, login_request(username, password).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            test::read_body(resp).await,
            r#"{"error":"Invalid username or password"}"#
        );
    }

    let resp = test::call_service(&app, login_request("", "").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let app = init_app!(state_with(status_probe()).await);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr("127.0.0.1:40000".parse().unwrap())
        .insert_header(header::ContentType::json())
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Bad Request"));
}

#[actix_web::test]
async fn password_can_be_changed() {
    let state = state_with(status_probe()).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    let change = |old: &str, new: &str, token: Option<&str>| {
        let mut req = test::TestRequest::post()
            .uri("/api/auth/change-password")
            .set_json(json!({ "old_password": old, "new_password": new }));
        if let Some(token) = token {
            req = req.insert_header((header::AUTHORIZATION, token.to_string()));
        }
        req.to_request()
    };

    let resp = test::call_service(&app, change("admin123", "n3w-passw0rd", None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, change("wrong", "n3w-passw0rd", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, change("admin123", "short", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, change("admin123", "n3w-passw0rd", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Password changed successfully");

    let resp = test::call_service(&app, login_request("admin", "admin123").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(&app, login_request("admin", "n3w-passw0rd").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn logout_needs_no_token() {
    let app = init_app!(state_with(status_probe()).await);

    let req = test::TestRequest::post().uri("/api/auth/logout").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({ "message": "Logout successful" }));
}

#[actix_web::test]
async fn management_endpoints_are_not_implemented() {
    let state = state_with(status_probe()).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    let requests = [
        test::TestRequest::get().uri("/api/users"),
        test::TestRequest::get().uri("/api/users/"),
        test::TestRequest::post().uri("/api/users/"),
        test::TestRequest::put().uri("/api/users/3"),
        test::TestRequest::delete().uri("/api/users/3"),
        test::TestRequest::get().uri("/api/services/"),
        test::TestRequest::post().uri("/api/services/nginx/restart"),
        test::TestRequest::get().uri("/api/docker/containers"),
        test::TestRequest::post().uri("/api/docker/containers/abc/stop"),
        test::TestRequest::get().uri("/api/docker/images"),
        test::TestRequest::get().uri("/api/files/content"),
        test::TestRequest::post().uri("/api/files/upload"),
        test::TestRequest::post().uri("/api/files/mkdir"),
        test::TestRequest::delete().uri("/api/files/"),
        test::TestRequest::get().uri("/api/settings/"),
        test::TestRequest::put().uri("/api/settings/theme"),
    ];

    for request in requests {
        let req = request
            .insert_header((header::AUTHORIZATION, token.clone()))
            .to_request();
        let path = req.path().to_string();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED, "{path}");
        assert_eq!(
            test::read_body(resp).await,
            r#"{"error":"Not implemented"}"#,
            "{path}"
        );
    }

    // Stubs are still behind the authorization gate
    let req = test::TestRequest::get().uri("/api/users").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn docker_routes_follow_configuration() {
    let state = AppState {
        docker_enabled: false,
        ..state_with(status_probe()).await
    };
    let token = bearer(&state).await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/docker/containers")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(test::read_body(resp).await, r#"{"error":"API not found"}"#);
}

#[actix_web::test]
async fn unknown_api_path_is_not_found() {
    let app = init_app!(state_with(status_probe()).await);

    for uri in ["/api/unknown", "/api"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(
            test::read_body(resp).await,
            r#"{"error":"API not found"}"#,
            "{uri}"
        );
    }
}

#[actix_web::test]
async fn front_end_is_served_with_index_fallback() {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        static_dir.path().join("index.html"),
        "<html>ubuntu panel</html>",
    )
    .unwrap();
    std::fs::create_dir(static_dir.path().join("assets")).unwrap();
    std::fs::write(
        static_dir.path().join("assets").join("app.js"),
        "console.log('panel')",
    )
    .unwrap();

    let state = AppState {
        static_dir: static_dir.path().to_path_buf(),
        ..state_with(status_probe()).await
    };
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/assets/app.js").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "console.log('panel')");

    for uri in ["/", "/dashboard", "/system/monitor"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        assert_eq!(
            test::read_body(resp).await,
            "<html>ubuntu panel</html>",
            "{uri}"
        );
    }
}

#[actix_web::test]
async fn missing_front_end_is_not_found() {
    let app = init_app!(state_with(status_probe()).await);

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(test::read_body(resp).await, r#"{"error":"Not found"}"#);
}

#[actix_web::test]
async fn info_describes_service_and_host() {
    let probe = FakeProbe {
        host: ubuntu_panel::system::types::HostInfo {
            host_name: Some("panel-host".into()),
            os: Some("Linux 24.04 Ubuntu".into()),
            kernel_version: Some("6.8.0".into()),
            uptime_secs: 3600,
        },
        ..status_probe()
    };
    let state = state_with(probe).await;
    let token = bearer(&state).await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/system/info")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let info: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(info["name"], "ubuntu-panel");
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(info["host_name"], "panel-host");
    assert_eq!(info["uptime_secs"], 3600);
}

#[actix_web::test]
async fn login_attempts_are_limited_across_workers() {
    let state = state_with(status_probe()).await;

    // Every worker builds its own App from the same state
    let first_worker = init_app!(state.clone());
    let second_worker = init_app!(state);

    for attempt in 0..manager::LOGIN_ATTEMPTS {
        let worker = if attempt % 2 == 0 {
            &first_worker
        } else {
            &second_worker
        };
        let req = login_request("admin", "wrong")
            .peer_addr("10.0.0.1:50000".parse().unwrap())
            .to_request();
        let resp = test::call_service(worker, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "attempt {attempt}");
    }

    for worker in [&first_worker, &second_worker] {
        let req = login_request("admin", "admin123")
            .peer_addr("10.0.0.1:50001".parse().unwrap())
            .to_request();
        let resp = test::call_service(worker, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    // Forwarding headers come from the client and do not reset the counter
    let req = login_request("admin", "admin123")
        .peer_addr("10.0.0.1:50002".parse().unwrap())
        .insert_header(("X-Forwarded-For", "203.0.113.9"))
        .insert_header((header::FORWARDED, "for=203.0.113.9"))
        .to_request();
    let resp = test::call_service(&first_worker, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // Other clients are not affected
    let req = login_request("admin", "admin123")
        .peer_addr("10.0.0.2:50000".parse().unwrap())
        .to_request();
    let resp = test::call_service(&second_worker, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn cors_preflight_allows_the_front_end() {
    let state = state_with(status_probe()).await;
    let app = test::init_service(
        App::new()
            .wrap(manager::cors())
            .configure(manager::configure(web::Data::new(state))),
    )
    .await;

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/system/status")
        .insert_header((header::ORIGIN, "http://panel.example.com"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "GET"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "{}", resp.status());

    let headers = resp.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://panel.example.com"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "43200");

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header((header::ORIGIN, "http://panel.example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let exposed = resp
        .headers()
        .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("content-length"), "{exposed}");
}
