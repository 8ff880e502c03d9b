//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed map of path → body for HEAD and GET, answers 404 for
//! anything else, and records every request line it sees.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, HEAD returns 405 (servers that block HEAD).
    pub head_allowed: bool,
    /// When set, GET bodies are sent in 1 KiB chunks with this pause between them.
    pub chunk_delay: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            chunk_delay: None,
        }
    }
}

pub struct StaticServer {
    /// Base URL ending in `/`, e.g. `http://127.0.0.1:12345/`.
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticServer {
    /// Request lines received so far, e.g. `GET /hbs/omnia/medkit/sha256sums`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with("GET "))
            .collect()
    }
}

pub fn start(files: HashMap<String, Vec<u8>>) -> StaticServer {
    start_with_options(files, ServerOptions::default())
}

pub fn start_with_options(files: HashMap<String, Vec<u8>>, opts: ServerOptions) -> StaticServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files = Arc::new(files);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &files, &log, opts));
        }
    });
    StaticServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(
    mut stream: TcpStream,
    files: &HashMap<String, Vec<u8>>,
    log: &Mutex<Vec<String>>,
    opts: ServerOptions,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("/").to_string();
    log.lock().unwrap().push(format!("{} {}", method, path));

    let body = files.get(&path);
    match (method.as_str(), body) {
        ("HEAD", _) if !opts.head_allowed => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        }
        ("HEAD", Some(body)) => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/gzip\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
        ("GET", Some(body)) => {
            let response = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", body.len());
            let _ = stream.write_all(response.as_bytes());
            match opts.chunk_delay {
                None => {
                    let _ = stream.write_all(body);
                }
                Some(delay) => {
                    for chunk in body.chunks(1024) {
                        if stream.write_all(chunk).and_then(|_| stream.flush()).is_err() {
                            return;
                        }
                        thread::sleep(delay);
                    }
                }
            }
        }
        ("HEAD", None) | ("GET", None) => {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        }
        _ => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        }
    }
}
