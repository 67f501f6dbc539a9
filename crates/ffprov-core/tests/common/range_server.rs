//! Minimal HTTP/1.1 server with Range GET support for integration tests.
//!
//! Serves a fixed body per path. Each route can ignore ranges, answer with a
//! fixed status, cut its first responses short, or misreport the range start.
//! Every request is recorded so tests can assert on what was asked for.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Route {
    pub body: Vec<u8>,
    /// Always reply 200 with the full body.
    pub ignore_ranges: bool,
    /// Reply with this status and a short text body instead of serving.
    pub status: Option<u16>,
    /// Announce the full length but close after this many body bytes, for this many requests.
    pub truncate_at: Option<usize>,
    pub truncate_times: usize,
    /// Reply 206 from byte 0 whatever range was asked for.
    pub misreport_range: bool,
    /// Go silent for `stall_for` after this many body bytes, then send the rest.
    pub stall_at: Option<usize>,
    pub stall_for: Duration,
}

impl Route {
    pub fn body(body: impl Into<Vec<u8>>) -> Self {
        Route {
            body: body.into(),
            ..Route::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub range_start: Option<u64>,
}

pub struct RangeServer {
    base: String,
    log: Arc<Mutex<Vec<Request>>>,
}

impl RangeServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }

    pub fn requests_for(&self, path: &str) -> Vec<Request> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: HashMap<String, Route> = routes
        .into_iter()
        .map(|(p, r)| (format!("/{}", p.trim_start_matches('/')), r))
        .collect();
    let routes = Arc::new(Mutex::new(routes));
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_srv = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let log = Arc::clone(&log_srv);
            thread::spawn(move || handle(stream, &routes, &log));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        log,
    }
}

fn handle(mut stream: TcpStream, routes: &Mutex<HashMap<String, Route>>, log: &Mutex<Vec<Request>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range_start) = parse_request(request);
    log.lock().unwrap().push(Request { path: path.to_string(), range_start });

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    // Copy what this request needs and consume one truncation while holding the lock.
    let (route, truncate) = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(route) => {
                let truncate = if route.truncate_times > 0 {
                    route.truncate_times -= 1;
                    route.truncate_at
                } else {
                    None
                };
                (route.clone(), truncate)
            }
            None => {
                respond(&mut stream, "404 Not Found", &[], b"not found", None, None);
                return;
            }
        }
    };

    if let Some(code) = route.status {
        let status = format!("{} Scripted", code);
        respond(&mut stream, &status, &[], b"scripted error body", None, None);
        return;
    }

    let body = route.body.as_slice();
    let stall = route.stall_at.map(|at| (at, route.stall_for));
    let total = body.len() as u64;
    match range_start {
        Some(start) if !route.ignore_ranges => {
            if start >= total {
                let header = format!("Content-Range: bytes */{}", total);
                respond(&mut stream, "416 Range Not Satisfiable", &[header], &[], None, None);
                return;
            }
            let start = if route.misreport_range { 0 } else { start };
            let slice = &body[start as usize..];
            let header = format!("Content-Range: bytes {}-{}/{}", start, total - 1, total);
            respond(&mut stream, "206 Partial Content", &[header], slice, truncate, stall);
        }
        _ => respond(&mut stream, "200 OK", &[], body, truncate, stall),
    }
}

fn respond(
    stream: &mut TcpStream,
    status: &str,
    headers: &[String],
    body: &[u8],
    cut_at: Option<usize>,
    stall: Option<(usize, Duration)>,
) {
    let mut head = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n", status, body.len());
    for h in headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let sent = cut_at.map(|n| n.min(body.len())).unwrap_or(body.len());
    let body = &body[..sent];
    match stall {
        Some((at, pause)) if at < body.len() => {
            let _ = stream.write_all(&body[..at]);
            let _ = stream.flush();
            thread::sleep(pause);
            let _ = stream.write_all(&body[at..]);
        }
        _ => {
            let _ = stream.write_all(body);
        }
    }
    let _ = stream.flush();
    let _ = stream.shutdown(Shutdown::Both);
}

/// Returns (method, path, optional start of `Range: bytes=X-`).
fn parse_request(request: &str) -> (&str, &str, Option<u64>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let target = first.next().unwrap_or("/");
    let path = target.split('?').next().unwrap_or("/");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(part) = value.strip_prefix("bytes=") {
                    if let Some((a, _)) = part.split_once('-') {
                        range = a.trim().parse::<u64>().ok();
                    }
                }
            }
        }
    }
    (method, path, range)
}
