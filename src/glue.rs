//! Layer 0: the inter-cloud glue. When two layers of the same twin live
//! on different providers, the downstream layer exposes a small HTTP
//! receiver and the upstream layer is handed its URL plus a bearer
//! token; `config_inter_cloud.json` is the source of truth for both.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;

use crate::config::{InterCloudConnection, InterCloudConnections};
use crate::context::DeploymentContext;
use crate::error::{DeployerError, Result};

const TOKEN_LEN: usize = 32;
const HEADER_NAME: &str = "X-Inter-Cloud-Token";

/// Generates a 32-character URL-safe token for a new glue connection.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// One accepted forwarded payload, captured for whatever the caller
/// wants to do with it (persist to hot storage, re-publish, etc).
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub body: Value,
}

/// A bound glue receiver for one `(source_layer, target_layer)` pair.
/// Holds the listener open for the lifetime of the twin; `deploy_l0`
/// creates one per cross-cloud edge the twin's provider assignment
/// requires, `destroy_l0` drops them all.
pub struct GlueReceiver {
    listener: TcpListener,
    bind_addr: SocketAddr,
    token: String,
}

impl GlueReceiver {
    pub fn bind(addr: &str, token: String) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let bind_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            bind_addr,
            token,
        })
    }

    pub fn bound_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn url(&self) -> String {
        format!("http://{}/events", self.bind_addr)
    }

    /// Spawns the accept loop on a background thread, forwarding every
    /// authorized `POST /events` body to `sink`. Requests missing or
    /// mismatching the token header get a `401`; anything else is `404`.
    pub fn serve(&self, sink: Arc<Mutex<Vec<ReceivedEvent>>>) -> Result<()> {
        let listener = self
            .listener
            .try_clone()
            .map_err(|err| DeployerError::Other(err.to_string()))?;
        let token = self.token.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let _ = stream.set_read_timeout(Some(Duration::from_secs(30)));
                if let Some((request_line, headers, body)) = read_http_request(&mut stream) {
                    handle_request(&mut stream, &request_line, &headers, &body, &token, &sink);
                }
            }
        });
        Ok(())
    }
}

fn read_http_request(stream: &mut std::net::TcpStream) -> Option<(String, String, String)> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    let mut content_length = 0usize;
    loop {
        let mut chunk = [0u8; 1024];
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if header_end.is_none() {
                    if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                        header_end = Some(pos + 4);
                        let headers = String::from_utf8_lossy(&buffer[..pos + 4]);
                        for line in headers.lines() {
                            if let Some(value) = line.strip_prefix("Content-Length:") {
                                content_length = value.trim().parse().unwrap_or(0);
                            }
                        }
                    }
                }
                if let Some(h_end) = header_end {
                    if buffer.len() >= h_end + content_length {
                        break;
                    }
                }
                if n < chunk.len() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    let request = String::from_utf8_lossy(&buffer).into_owned();
    let split = request.find("\r\n\r\n")?;
    let (head, rest) = request.split_at(split);
    let body = rest.trim_start_matches("\r\n\r\n").to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers = lines.collect::<Vec<_>>().join("\n");
    Some((request_line, headers, body))
}

fn handle_request(
    stream: &mut std::net::TcpStream,
    request_line: &str,
    headers: &str,
    body: &str,
    expected_token: &str,
    sink: &Arc<Mutex<Vec<ReceivedEvent>>>,
) {
    if !request_line.starts_with("POST /events") {
        write_response(stream, 404, "");
        return;
    }

    let provided_token = headers
        .lines()
        .find_map(|line| line.strip_prefix(&format!("{HEADER_NAME}:")))
        .map(str::trim);

    if provided_token != Some(expected_token) {
        write_response(stream, 401, "");
        return;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            sink.lock().unwrap().push(ReceivedEvent { body: value });
            write_response(stream, 200, "");
        }
        Err(_) => write_response(stream, 400, ""),
    }
}

fn write_response(stream: &mut std::net::TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Registers a new glue connection for `source_layer -> target_layer`,
/// binding a receiver and persisting its URL and token. Idempotent: a
/// connection already on file is returned unchanged, never rebound.
pub fn deploy_l0(
    ctx: &mut DeploymentContext,
    source_layer: &str,
    target_layer: &str,
) -> Result<InterCloudConnection> {
    let conn_id = InterCloudConnections::connection_id(source_layer, target_layer);
    if let Ok(existing) = ctx.get_inter_cloud_connection(source_layer, target_layer) {
        return Ok(existing.clone());
    }

    let token = generate_token();
    let receiver = GlueReceiver::bind("0.0.0.0:0", token.clone())?;
    let url = receiver.url();
    receiver.serve(Arc::new(Mutex::new(Vec::new())))?;

    let connection = InterCloudConnection { url, token };
    ctx.config
        .inter_cloud
        .connections
        .insert(conn_id, connection.clone());
    ctx.save_inter_cloud()?;
    Ok(connection)
}

/// Removes a registered connection from `config_inter_cloud.json`. The
/// receiver thread itself is torn down when its listener is dropped at
/// process exit; there is no live handle to close here once persisted.
pub fn destroy_l0(ctx: &mut DeploymentContext, source_layer: &str, target_layer: &str) -> Result<()> {
    let conn_id = InterCloudConnections::connection_id(source_layer, target_layer);
    ctx.config.inter_cloud.connections.remove(&conn_id);
    ctx.save_inter_cloud()
}

pub fn info_l0(ctx: &DeploymentContext) -> BTreeMap<String, Value> {
    ctx.config
        .inter_cloud
        .connections
        .iter()
        .map(|(id, conn)| (id.clone(), serde_json::json!({"url": conn.url})))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_expected_length_and_alphanumeric() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn mismatched_token_is_rejected_before_parsing_body() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let headers = format!("{HEADER_NAME}: wrong-token");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        let expected = "right-token".to_string();
        let sink_clone = sink.clone();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            handle_request(&mut stream, "POST /events HTTP/1.1", &headers, "{}", &expected, &sink_clone);
            tx.send(()).unwrap();
        });
        let _ = std::net::TcpStream::connect(addr);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(sink.lock().unwrap().is_empty());
    }
}
