// Copyright 2026 The FlexSwitch Exporter Authors
// SPDX-License-Identifier: MIT

use crate::collector::{CollectorError, ScrapeParams};

fn transport_error(url: &str, source: reqwest::Error) -> CollectorError {
    CollectorError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Issues one GET against the switch management API and buffers the whole
/// response body.
///
/// FlexSwitch management endpoints commonly serve self-signed certificates, so
/// certificate verification is disabled for `https` targets. That trades
/// transport authenticity for reachability of unmanaged devices; credentials
/// sent with such a request can be intercepted.
pub async fn get(url: &str, params: &ScrapeParams) -> Result<Vec<u8>, CollectorError> {
    let mut builder = reqwest::Client::builder().timeout(params.timeout);
    if params.proto == "https" {
        builder = builder.danger_accept_invalid_certs(true);
    }
    let client = builder.build().map_err(|err| transport_error(url, err))?;

    let mut request = client.get(url);
    if !params.username.is_empty() && !params.password.is_empty() {
        request = request.basic_auth(&params.username, Some(&params.password));
    }

    let response = request
        .send()
        .await
        .map_err(|err| transport_error(url, err))?;
    let body = response
        .bytes()
        .await
        .map_err(|err| transport_error(url, err))?;

    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn params() -> ScrapeParams {
        ScrapeParams {
            target: "127.0.0.1".to_string(),
            proto: "http".to_string(),
            port: 0,
            username: String::new(),
            password: String::new(),
            timeout: time::Duration::from_secs(5),
        }
    }

    async fn serve_once(body: &'static str) -> (std::net::SocketAddr, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut request = vec![0u8; 4096];
            let n = stream.read(&mut request).await.unwrap();
            request.truncate(n);

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();

            request
        });

        (addr, task)
    }

    #[tokio::test]
    async fn get_returns_body() {
        let (addr, task) = serve_once("{\"ObjCount\": 0}").await;

        let body = get(&format!("http://{addr}/public/v1/state/ports"), &params())
            .await
            .unwrap();

        assert_eq!(body, b"{\"ObjCount\": 0}");
        let request = task.await.unwrap();
        assert!(!String::from_utf8(request).unwrap().contains("authorization:"));
    }

    #[tokio::test]
    async fn get_attaches_basic_auth() {
        let (addr, task) = serve_once("{}").await;

        let mut params = params();
        params.username = "admin".to_string();
        params.password = "hunter2".to_string();

        get(&format!("http://{addr}/"), &params).await.unwrap();

        let request = String::from_utf8(task.await.unwrap()).unwrap();
        // base64("admin:hunter2")
        assert!(request.contains("Basic YWRtaW46aHVudGVyMg=="));
    }

    #[tokio::test]
    async fn get_surfaces_connection_failure() {
        // Port from an ephemeral listener that has been dropped.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = get(&format!("http://{addr}/"), &params()).await.unwrap_err();
        assert!(matches!(err, CollectorError::Transport { .. }));
    }
}
