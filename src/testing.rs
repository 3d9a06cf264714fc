//! Loopback HTTP server for tests that exercise real requests.
//!
//! Every connection is answered once and closed. Clients reach arbitrary
//! host names through [`StubServer::client`], which pins those names to the
//! loopback address, so URLs keep their production hosts plus the port.

use crate::utils::BROWSER_USER_AGENT;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// The parts of a request a responder routes on.
pub struct Request<'a> {
    /// Host header without the port.
    pub host: &'a str,
    pub port: u16,
    /// Path plus query string.
    pub target: &'a str,
}

pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Serve `respond(request)` as the raw HTTP response for every request.
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&Request<'_>) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let respond = Arc::new(respond);
        let port = addr.port();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let seen = Arc::clone(&seen);
                let respond = Arc::clone(&respond);
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 4096];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head).into_owned();
                    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let host = head
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("host"))
                        .map(|(_, value)| value.trim().split(':').next().unwrap_or("").to_string())
                        .unwrap_or_default();

                    seen.lock().unwrap().push(format!("{host}{target}"));
                    let response = respond(&Request {
                        host: &host,
                        port,
                        target: &target,
                    });
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self { addr, requests }
    }

    /// `http://{host}:{port}{path}` on this server.
    pub fn url(&self, host: &str, path: &str) -> String {
        format!("http://{host}:{}{path}", self.addr.port())
    }

    /// A redirect-following client that resolves every name in `hosts` to this server.
    pub fn client(&self, hosts: &[&str]) -> Client {
        hosts
            .iter()
            .fold(Client::builder().user_agent(BROWSER_USER_AGENT), |builder, host| {
                builder.resolve(host, self.addr)
            })
            .build()
            .unwrap()
    }

    /// `host` plus request target of every request served so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn html(body: &str) -> String {
    respond_with("200 OK", "text/html; charset=utf-8", body)
}

pub fn json(body: &str) -> String {
    respond_with("200 OK", "application/json", body)
}

pub fn redirect(location: &str) -> String {
    format!(
        "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    )
}

fn respond_with(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
