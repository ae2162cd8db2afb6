//! Test utilities.

use hyper::{body::Incoming, header, server::conn::http1, service::service_fn, Request, Response};
use hyper_util::rt::TokioIo;
use reqwest::StatusCode;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

use std::{
    convert::Infallible,
    net::{Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
};

pub(crate) fn health_payload(health: &str) -> String {
    format!(r#"{{"links":{{}},"entry":[{{"name":"splunkd","content":{{"health":"{health}"}}}}]}}"#)
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub path_and_query: String,
    pub authorization: Option<String>,
}

impl RecordedRequest {
    fn new(request: &Request<Incoming>) -> Self {
        Self {
            path_and_query: request
                .uri()
                .path_and_query()
                .map_or_else(String::new, ToString::to_string),
            authorization: request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        }
    }
}

/// Mock Splunk API responding to all requests with the same status and body.
#[derive(Debug)]
pub(crate) struct MockSplunk {
    local_addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: JoinHandle<()>,
}

impl Drop for MockSplunk {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockSplunk {
    pub async fn ok(body: &str) -> Self {
        Self::new(StatusCode::OK, body).await
    }

    pub async fn new(status: StatusCode, body: &str) -> Self {
        // Bind the mock server to a random free port.
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let local_addr = listener.local_addr().unwrap();
        let requests = Arc::<Mutex<Vec<_>>>::default();
        let server_requests = Arc::clone(&requests);
        let body = body.to_owned();

        let server = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let requests = Arc::clone(&server_requests);
                let body = body.clone();
                let service = service_fn(move |request: Request<Incoming>| {
                    requests
                        .lock()
                        .unwrap()
                        .push(RecordedRequest::new(&request));
                    let response = Response::builder()
                        .status(status)
                        .body(body.clone())
                        .unwrap();
                    async move { Ok::<_, Infallible>(response) }
                });
                tokio::spawn(async move {
                    http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                        .ok();
                });
            }
        });

        Self {
            local_addr,
            requests,
            server,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts a server that announces a longer body than it sends, and closes the connection
/// after sending the partial body.
pub(crate) async fn start_truncating_server(partial_body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let local_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let mut request_buffer = [0_u8; 4_096];
            stream.read(&mut request_buffer).await.ok();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{partial_body}",
                partial_body.len() + 100
            );
            stream.write_all(response.as_bytes()).await.ok();
            // Dropping `stream` closes the connection mid-body.
        }
    });
    local_addr
}
