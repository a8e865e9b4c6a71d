//! Embedded web dashboard for horizon.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page dashboard: section KPIs, comparison tool, datasets, config
//! - JSON API endpoints for the same data, plus a CSV export of comparisons
//!
//! Launched via `horizon web` (default: `http://127.0.0.1:8501`).

mod api;
mod frontend;

use std::io::Cursor;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::activity::ActivityLog;
use crate::config::{self, HorizonConfig};
use crate::store::TableCache;

pub(crate) type HttpResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Server state
// ---------------------------------------------------------------------------

/// Everything a request handler needs. Tables loaded by one request stay
/// cached for the next.
pub struct ServerState {
    pub config: HorizonConfig,
    pub cache: TableCache,
    pub log: ActivityLog,
}

impl ServerState {
    pub fn new(config: HorizonConfig) -> Self {
        Self {
            cache: TableCache::new(config.data_dir()),
            log: ActivityLog::from_config(&config),
            config,
        }
    }

    /// Pick up a changed config file. The table cache survives unless the
    /// data directory moved.
    fn reload(&mut self) {
        let config = config::load();
        if config.data_dir() != self.config.data_dir() {
            self.cache = TableCache::new(config.data_dir());
        }
        self.log = ActivityLog::from_config(&config);
        self.config = config;
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard server on the given address.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local single-user dashboard). Errors are answered per request without
/// stopping the server.
pub fn serve(config: HorizonConfig, addr: &str, open: bool) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("horizon dashboard running at http://{addr}");
    println!("Data directory: {}", config.data_dir().display());
    println!("Press Ctrl+C to stop.\n");

    if open {
        let _ = open_browser(&format!("http://{addr}"));
    }

    let mut state = ServerState::new(config);

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Read body up-front for methods that carry one
        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let resp = match dispatch(&mut state, &method, &url, body.as_deref()) {
            Ok(resp) => resp,
            Err(e) => api::error_response(&e),
        };
        let status = resp.status_code().0;
        let _ = request.respond(resp);

        // Brief access log
        println!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub(crate) fn dispatch(
    state: &mut ServerState,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<HttpResponse> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API: Dashboard
        (&Method::Get, "/api/sections") => api::get_sections(),
        (&Method::Get, "/api/kpis") => api::get_kpis(state, url),
        (&Method::Get, "/api/options") => api::get_options(state),
        (&Method::Get, "/api/compare") => api::get_compare(state, url),
        (&Method::Get, "/api/concentration") => api::get_concentration(state),
        (&Method::Get, "/api/volatility") => api::get_volatility(state),
        (&Method::Get, "/api/datasets") => api::get_datasets(state),
        (&Method::Get, "/api/activity") => api::get_activity(state, url),

        // API: Configuration
        (&Method::Get, "/api/config") => api::get_config(state),
        (&Method::Put, "/api/config") => {
            let body = body.unwrap_or("{}");
            let resp = api::put_config(body)?;
            state.reload();
            Ok(resp)
        }
        (&Method::Post, "/api/config/reset") => {
            let resp = api::post_config_reset()?;
            state.reload();
            Ok(resp)
        }

        // API: Health
        (&Method::Get, "/api/health") => api::get_health(state),

        // 404
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Serve the embedded single-page frontend.
fn serve_frontend() -> HttpResponse {
    let html = frontend::INDEX_HTML;
    Response::from_data(html.as_bytes().to_vec())
        .with_header(header("Content-Type", "text/html; charset=utf-8"))
        .with_status_code(StatusCode(200))
}

/// 404 response.
fn not_found() -> HttpResponse {
    let body = r#"{"error": "not found", "kind": "not_found", "data_gap": false}"#;
    Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json())
        .with_status_code(StatusCode(404))
}

/// Build a header from static parts.
pub(crate) fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("static header must be valid")
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    header("Content-Type", "application/json; charset=utf-8")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Cell, DatasetId, Table};

    fn state() -> ServerState {
        let mut state = ServerState::new(HorizonConfig::default());
        state.log = ActivityLog::disabled();
        state.cache = TableCache::new("/nonexistent");
        state.cache.insert(
            DatasetId::PatentsByCountry,
            Table::from_records(
                "patents_by_country",
                &["entity", "num_patent_applications"],
                vec![
                    vec![Cell::from("China"), 29853.0.into()],
                    vec![Cell::from("United States"), 16805.0.into()],
                ],
            ),
        );
        state
    }

    fn status(state: &mut ServerState, method: Method, url: &str) -> u16 {
        match dispatch(state, &method, url, None) {
            Ok(resp) => resp.status_code().0,
            Err(e) => api::error_response(&e).status_code().0,
        }
    }

    #[test]
    fn frontend_and_unknown_paths() {
        let mut s = state();
        assert_eq!(status(&mut s, Method::Get, "/"), 200);
        assert_eq!(status(&mut s, Method::Get, "/nope"), 404);
        assert_eq!(status(&mut s, Method::Delete, "/api/config"), 404);
    }

    #[test]
    fn compare_status_codes() {
        let mut s = state();
        assert_eq!(
            status(&mut s, Method::Get, "/api/compare?dimension=country&metric=patents"),
            200
        );
        assert_eq!(
            status(&mut s, Method::Get, "/api/compare?dimension=country&metric=parameters"),
            400
        );
        assert_eq!(status(&mut s, Method::Get, "/api/compare?dimension=country"), 400);
        // Dataset file is absent: an engine error, not a server fault.
        assert_eq!(
            status(&mut s, Method::Get, "/api/compare?dimension=domain&metric=training-cost"),
            422
        );
    }

    #[test]
    fn kpis_need_a_known_section() {
        let mut s = state();
        assert_eq!(status(&mut s, Method::Get, "/api/kpis?section=investment"), 200);
        assert_eq!(status(&mut s, Method::Get, "/api/kpis?section=weather"), 400);
        assert_eq!(status(&mut s, Method::Get, "/api/kpis"), 400);
    }

    #[test]
    fn read_only_endpoints_answer() {
        let mut s = state();
        for url in [
            "/api/sections",
            "/api/options",
            "/api/datasets",
            "/api/health",
            "/api/config",
            "/api/activity",
        ] {
            assert_eq!(status(&mut s, Method::Get, url), 200, "{url}");
        }
        assert_eq!(status(&mut s, Method::Get, "/api/concentration"), 422);
    }
}
