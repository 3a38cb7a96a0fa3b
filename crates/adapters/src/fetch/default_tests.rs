// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// Serve one HTTP response on a local port and return its base URL.
async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let head = format!(
            "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetches_file_url() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src.bin");
    std::fs::write(&src, b"payload").unwrap();
    let dest = dir.path().join("dest.bin");

    let url = Url::from_file_path(&src).unwrap();
    DefaultFetcher::new().fetch(&url, &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
}

#[tokio::test]
async fn missing_file_url_is_io_error() {
    let dir = TempDir::new().unwrap();
    let url = Url::from_file_path(dir.path().join("nope")).unwrap();
    let err = DefaultFetcher::new()
        .fetch(&url, &dir.path().join("dest"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Io { .. }));
}

#[tokio::test]
async fn rejects_unknown_scheme() {
    let dir = TempDir::new().unwrap();
    let url = Url::parse("ftp://example.com/simd").unwrap();
    let err = DefaultFetcher::new()
        .fetch(&url, &dir.path().join("dest"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::UnsupportedScheme { .. }));
}

#[tokio::test]
async fn fetches_http_body() {
    let base = serve_once("HTTP/1.1 200 OK", b"binary-bytes").await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("dest");

    let url = Url::parse(&format!("{base}/simd")).unwrap();
    DefaultFetcher::new().fetch(&url, &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"binary-bytes");
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let base = serve_once("HTTP/1.1 404 Not Found", b"").await;
    let dir = TempDir::new().unwrap();

    let url = Url::parse(&format!("{base}/simd")).unwrap();
    let err = DefaultFetcher::new()
        .fetch(&url, &dir.path().join("dest"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }), "{err}");
}

#[tokio::test]
async fn fake_serves_registered_urls() {
    let dir = TempDir::new().unwrap();
    let fake = super::super::FakeFetcher::new();
    fake.serve("https://example.com/simd", "abc");

    let dest = dir.path().join("dest");
    fake.fetch(&Url::parse("https://example.com/simd").unwrap(), &dest)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"abc");

    let missing = fake
        .fetch(&Url::parse("https://example.com/other").unwrap(), &dest)
        .await;
    assert!(matches!(missing, Err(FetchError::Status { status: 404, .. })));
    assert_eq!(fake.calls().len(), 2);
}
