//! Loopback static-file server used while printing the page.
//!
//! The browser has to load the page over HTTP so that stylesheets, fonts and
//! SVG icons referenced with relative URLs resolve. The server:
//! - binds `127.0.0.1` on the first free port of a contiguous range
//! - serves files below one root directory from a background thread
//! - stops and joins that thread when dropped

use crate::SiteError;
use log::{debug, info};
use std::fs::File;
use std::net::TcpListener;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

pub struct StaticServer {
    server: Arc<Server>,
    port: u16,
    handle: Option<JoinHandle<()>>,
}

impl StaticServer {
    /// Serves `root` on the first free port in `first_port..first_port + attempts`.
    pub fn start(
        root: impl Into<PathBuf>,
        first_port: u16,
        attempts: u16,
    ) -> Result<Self, SiteError> {
        let root = root.into();
        let (listener, port) = bind_first_free(first_port, attempts)?;

        let server = Server::from_listener(listener, None).map_err(|e| SiteError::ServerError {
            message: format!("Could not start HTTP server on port {}: {}", port, e),
            suggestion: "Try a different port range in the [pdf] configuration".to_string(),
        })?;
        let server = Arc::new(server);

        let worker = Arc::clone(&server);
        let handle = thread::spawn(move || {
            for request in worker.incoming_requests() {
                handle_request(&root, request);
            }
            debug!("HTTP server thread finished");
        });

        info!("HTTP server started on port {}", port);
        Ok(StaticServer {
            server,
            port,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// URL of `file` (relative to the served root), with an optional `#fragment`.
    pub fn url_for(&self, file: &str, fragment: Option<&str>) -> String {
        page_url(self.port, file, fragment)
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        debug!("HTTP server on port {} stopped", self.port);
    }
}

pub fn page_url(port: u16, file: &str, fragment: Option<&str>) -> String {
    let mut url = format!("http://127.0.0.1:{}/{}", port, file.trim_start_matches('/'));
    if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
        url.push('#');
        url.push_str(fragment.trim_start_matches('#'));
    }
    url
}

fn bind_first_free(first_port: u16, attempts: u16) -> Result<(TcpListener, u16), SiteError> {
    let mut last_error = None;
    for offset in 0..attempts {
        let Some(port) = first_port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                debug!("Port {} unavailable: {}", port, e);
                last_error = Some(e);
            }
        }
    }

    Err(SiteError::ServerError {
        message: format!(
            "Could not find available port after {} attempts starting at {}{}",
            attempts,
            first_port,
            last_error.map(|e| format!(" ({})", e)).unwrap_or_default()
        ),
        suggestion: "Free a port in that range or change pdf.port / pdf.port_attempts"
            .to_string(),
    })
}

/// Maps a request URL onto a file below `root`.
///
/// Returns `None` for paths that try to leave the root.
pub fn resolve_path(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or("");
    let relative = Path::new(path.trim_start_matches('/'));

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let mut resolved = root.join(relative);
    if resolved.is_dir() {
        resolved.push("index.html");
    }
    Some(resolved)
}

pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn handle_request(root: &Path, request: Request) {
    let url = request.url().to_string();

    if !matches!(request.method(), Method::Get | Method::Head) {
        respond_status(request, 405, &url);
        return;
    }

    let Some(path) = resolve_path(root, &url) else {
        respond_status(request, 403, &url);
        return;
    };

    match File::open(&path) {
        Ok(file) => {
            let mut response = Response::from_file(file);
            if let Ok(header) =
                Header::from_bytes(&b"Content-Type"[..], content_type(&path).as_bytes())
            {
                response = response.with_header(header);
            }
            debug!("200 {}", url);
            if let Err(e) = request.respond(response) {
                debug!("Failed to send {}: {}", url, e);
            }
        }
        Err(_) => respond_status(request, 404, &url),
    }
}

fn respond_status(request: Request, code: u16, url: &str) {
    debug!("{} {}", code, url);
    let response = Response::empty(StatusCode(code));
    if let Err(e) = request.respond(response) {
        debug!("Failed to send {} for {}: {}", code, url, e);
    }
}
