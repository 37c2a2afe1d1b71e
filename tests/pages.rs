//! Page requests end to end with fake build and render components.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;

use luna_ssr::build::BuildTarget;
use luna_ssr::http::from_fn;
use luna_ssr::{HttpServer, Route};

use common::{spawn, test_config};

fn users_route() -> Route {
    Route::new("/users/:id").title("User").description("Profile page")
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(users_route())).await;

    let first = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers()["x-cache"], "miss");
    let body = first.text().await.unwrap();
    assert!(body.contains(r#"data-path="/users/7""#));
    assert!(body.contains("<title>User</title>"));
    assert!(body.contains(".server{color:red}"));

    let second = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(second.headers()["x-cache"], "hit");
    assert!(second.text().await.unwrap().contains(r#"data-path="/users/7""#));

    // One client and one server build, one render.
    assert_eq!(server.bundler.calls(), 2);
    assert_eq!(server.engine.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cache_is_keyed_by_path() {
    let dir = tempfile::tempdir().unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(users_route())).await;

    reqwest::get(server.url("/users/1")).await.unwrap();
    let other = reqwest::get(server.url("/users/2")).await.unwrap();
    assert_eq!(other.headers()["x-cache"], "miss");
    assert!(other.text().await.unwrap().contains(r#"data-path="/users/2""#));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(users_route())).await;

    let response = reqwest::get(server.url("/missing")).await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("/missing"));
    assert_eq!(server.bundler.calls(), 0);
}

#[tokio::test]
async fn test_build_failure_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(users_route())).await;

    server.bundler.set_failing(true);
    let failed = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(failed.status(), 500);
    let body: Value = failed.json().await.unwrap();
    assert_eq!(body["error"], "error rendering page");
    assert_eq!(server.engine.runs.load(Ordering::SeqCst), 0);

    server.bundler.set_failing(false);
    let recovered = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(recovered.status(), 200);
    assert_eq!(recovered.headers()["x-cache"], "miss");
}

#[tokio::test]
async fn test_server_build_failure_discards_client_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(users_route())).await;

    server.bundler.fail_target(BuildTarget::Server);
    let failed = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(failed.status(), 500);
    let body = failed.text().await.unwrap();
    assert!(!body.contains("hydrate"));

    // Both branches ran; nothing was rendered or stored.
    assert_eq!(server.bundler.calls(), 2);
    assert_eq!(server.engine.runs.load(Ordering::SeqCst), 0);
    assert!(server.cache.is_empty());
}

#[tokio::test]
async fn test_page_rendered_across_reload_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(users_route())).await;

    server.bundler.clear_during_build(server.cache.clone());
    let first = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers()["x-cache"], "miss");
    assert!(server.cache.is_empty());

    let second = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(second.headers()["x-cache"], "miss");
    assert_eq!(server.engine.runs.load(Ordering::SeqCst), 2);

    let third = reqwest::get(server.url("/users/7")).await.unwrap();
    assert_eq!(third.headers()["x-cache"], "hit");
}

#[tokio::test]
async fn test_zero_ttl_bypasses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let route = Route::new("/live").cache_ttl(Duration::ZERO);
    let server = spawn(HttpServer::new(test_config(&dir)).route(route)).await;

    for _ in 0..2 {
        let response = reqwest::get(server.url("/live")).await.unwrap();
        assert_eq!(response.headers()["x-cache"], "miss");
    }
    assert_eq!(server.engine.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_middleware_short_circuits_render() {
    let dir = tempfile::tempdir().unwrap();
    let route = Route::new("/admin").middleware(from_fn(|ctx, next| async move {
        if ctx.header("authorization").is_none() {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        next(ctx).await
    }));
    let server = spawn(HttpServer::new(test_config(&dir)).route(route)).await;

    let denied = reqwest::get(server.url("/admin")).await.unwrap();
    assert_eq!(denied.status(), 401);
    assert_eq!(server.bundler.calls(), 0);

    let allowed = reqwest::Client::new()
        .get(server.url("/admin"))
        .header("authorization", "Bearer t")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);
}

#[tokio::test]
async fn test_development_pages_carry_reload_script() {
    let dir = tempfile::tempdir().unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(Route::new("/"))).await;

    let body = reqwest::get(server.url("/")).await.unwrap().text().await.unwrap();
    assert!(body.contains("/ws"));
    assert!(body.contains("new WebSocket"));
}

#[tokio::test]
async fn test_files_with_extension_come_from_public_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("public")).unwrap();
    std::fs::write(dir.path().join("public/robots.txt"), "User-agent: *").unwrap();
    let server = spawn(HttpServer::new(test_config(&dir)).route(Route::new("/"))).await;

    let response = reqwest::get(server.url("/robots.txt")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "User-agent: *");
    assert_eq!(server.bundler.calls(), 0);
}
