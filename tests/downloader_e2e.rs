//! End-to-end tests for the image downloader
//!
//! Each test starts an in-process HTTP server on a random loopback port,
//! runs the worker pool against it and checks the files written to a
//! temporary directory.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
};
use bytes::Bytes;
use fetchpool::config::Config;
use fetchpool::images::{HttpConfig, ImageDownloaderFactory};
use fetchpool::pool::{Dispatcher, PoolConfig, PoolError, StopReason, WorkConsumer, WorkFactory};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::time::Duration;

const IMAGE: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg-payload\xFF\xD9";

#[derive(Clone, Default)]
struct ServerState {
    hits: Arc<AtomicUsize>,
}

/// Start embedded mock HTTP server; returns its base URL and hit counter
async fn start_mock_server() -> (String, Arc<AtomicUsize>) {
    let state = ServerState::default();
    let hits = state.hits.clone();

    let app = Router::new()
        .route("/image.jpg", get(serve_image))
        .route("/redirect", get(|| async { Redirect::temporary("/image.jpg") }))
        .route("/missing", get(serve_missing))
        .route("/slow", get(serve_slow))
        .with_state(state);

    // Bind to random available port
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", bound_addr), hits)
}

async fn serve_image(State(state): State<ServerState>) -> Bytes {
    state.hits.fetch_add(1, Ordering::SeqCst);
    Bytes::from_static(IMAGE)
}

async fn serve_missing(State(state): State<ServerState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, "no image here")
}

async fn serve_slow(State(state): State<ServerState>) -> Bytes {
    state.hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(30)).await;
    Bytes::from_static(IMAGE)
}

fn saved_files(dir: &TempDir) -> Vec<PathBuf> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[tokio::test]
async fn test_downloads_every_image() {
    let (base_url, hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        5,
        dir.path(),
        format!("{}/image.jpg", base_url),
        HttpConfig::default(),
    )
    .unwrap();

    let summary = Dispatcher::with_pool_size(2)
        .run_factory(&factory)
        .await
        .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (5, 0));
    assert_eq!(summary.expected, Some(5));
    assert_eq!(summary.stop_reason, Some(StopReason::Exhausted));
    assert_eq!(hits.load(Ordering::SeqCst), 5);

    let files = saved_files(&dir);
    assert_eq!(files.len(), 5);
    for file in &files {
        assert_eq!(file.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(file).unwrap(), IMAGE);
    }
}

#[tokio::test]
async fn test_follows_redirects() {
    let (base_url, _hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        2,
        dir.path(),
        format!("{}/redirect", base_url),
        HttpConfig::default(),
    )
    .unwrap();

    let summary = Dispatcher::with_pool_size(2)
        .run_factory(&factory)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    for file in saved_files(&dir) {
        assert_eq!(std::fs::read(file).unwrap(), IMAGE);
    }
}

#[tokio::test]
async fn test_http_errors_are_counted_not_fatal() {
    let (base_url, hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        3,
        dir.path(),
        format!("{}/missing", base_url),
        HttpConfig::default(),
    )
    .unwrap();

    let summary = Dispatcher::with_pool_size(2)
        .run_factory(&factory)
        .await
        .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (0, 3));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(summary.failures.iter().all(|f| f.reason == "HTTP 404: Not Found"));
    assert!(saved_files(&dir).is_empty());
}

#[tokio::test]
async fn test_zero_images_makes_no_requests() {
    let (base_url, hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        0,
        dir.path(),
        format!("{}/image.jpg", base_url),
        HttpConfig::default(),
    )
    .unwrap();

    let summary = Dispatcher::with_pool_size(4)
        .run_factory(&factory)
        .await
        .unwrap();

    assert_eq!((summary.succeeded, summary.failed), (0, 0));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_save_dir_aborts_run() {
    let (base_url, hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        3,
        dir.path().join("does-not-exist"),
        format!("{}/image.jpg", base_url),
        HttpConfig::default(),
    )
    .unwrap();

    let result = Dispatcher::with_pool_size(2).run_factory(&factory).await;

    assert!(matches!(result, Err(PoolError::Production(_))));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_item_timeout_fails_slow_downloads() {
    let (base_url, _hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        2,
        dir.path(),
        format!("{}/slow", base_url),
        HttpConfig::default(),
    )
    .unwrap();

    let config = PoolConfig::new(2).with_item_timeout(Duration::from_millis(200));
    let summary = Dispatcher::new(config).run_factory(&factory).await.unwrap();

    assert_eq!((summary.succeeded, summary.failed), (0, 2));
    assert!(summary.failures.iter().all(|f| f.reason.starts_with("timed out")));
}

#[tokio::test]
async fn test_hard_stop_leaves_no_saved_file() {
    let (base_url, hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        2,
        dir.path(),
        format!("{}/slow", base_url),
        HttpConfig::default(),
    )
    .unwrap();
    assert_eq!(factory.save_path(), dir.path());

    let handle = Dispatcher::with_pool_size(2).start_factory(&factory).unwrap();
    while hits.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.hard_stop();

    let summary = handle.join().await.unwrap();
    assert_eq!((summary.succeeded, summary.cancelled), (0, 2));
    assert!(saved_files(&dir).is_empty());
}

#[tokio::test]
async fn test_overwrites_existing_file() {
    let (base_url, _hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let factory = ImageDownloaderFactory::new(
        1,
        dir.path(),
        format!("{}/image.jpg", base_url),
        HttpConfig::default(),
    )
    .unwrap();

    let target = dir.path().join("existing.jpg");
    std::fs::write(&target, b"stale contents that are longer than the image").unwrap();

    factory
        .create_consumer()
        .consume(target.clone())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), IMAGE);
}

#[tokio::test]
async fn test_separate_runs_never_collide() {
    let (base_url, _hits) = start_mock_server().await;
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();

    for dir in [&first_dir, &second_dir] {
        let factory = ImageDownloaderFactory::new(
            4,
            dir.path(),
            format!("{}/image.jpg", base_url),
            HttpConfig::default(),
        )
        .unwrap();
        Dispatcher::with_pool_size(2)
            .run_factory(&factory)
            .await
            .unwrap();
    }

    let first: HashSet<_> = saved_files(&first_dir)
        .into_iter()
        .map(|p| p.file_name().unwrap().to_owned())
        .collect();
    let second: HashSet<_> = saved_files(&second_dir)
        .into_iter()
        .map(|p| p.file_name().unwrap().to_owned())
        .collect();

    assert_eq!(first.len(), 4);
    assert_eq!(second.len(), 4);
    assert!(first.is_disjoint(&second));
}

#[tokio::test]
async fn test_factory_from_config() {
    let (base_url, _hits) = start_mock_server().await;
    let dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.images.maximum_images = 3;
    config.images.save_path = dir.path().to_path_buf();
    config.images.source_url = format!("{}/image.jpg", base_url);
    config.images.file_extension = "jpeg".to_string();
    config.pool.pool_size = 3;
    config.validate().unwrap();

    let factory = ImageDownloaderFactory::from_config(&config).unwrap();
    let summary = Dispatcher::new(PoolConfig::from(&config.pool))
        .run_factory(&factory)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 3);
    assert!(
        saved_files(&dir)
            .iter()
            .all(|p| p.extension().unwrap() == "jpeg")
    );
}
