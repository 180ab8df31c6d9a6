//! Prints the generated page to PDF with headless Chrome.
//!
//! The page is loaded through a [`StaticServer`] so relative assets resolve,
//! then printed with the page size, margins and scale from [`PdfConfig`]. The
//! server is stopped on every exit path when it goes out of scope.

use crate::config::PdfConfig;
use crate::server::StaticServer;
use crate::SiteError;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the resource count must hold still before the network counts as idle.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfReport {
    pub url: String,
    pub bytes: usize,
    /// False when the ready selector never became visible
    pub ready: bool,
}

/// Builds the print options for `config`.
pub fn print_options(config: &PdfConfig) -> PrintToPdfOptions {
    let (width, height) = config.page_size.dimensions_inches();
    PrintToPdfOptions {
        print_background: Some(config.print_background),
        scale: Some(config.scale),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(config.margins.top),
        margin_right: Some(config.margins.right),
        margin_bottom: Some(config.margins.bottom),
        margin_left: Some(config.margins.left),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

/// Quotes `value` as a single-quoted JavaScript string literal.
fn js_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn visibility_script(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (!el) {{ return false; }} \
         const style = window.getComputedStyle(el); const rect = el.getBoundingClientRect(); \
         return style.display !== 'none' && style.visibility !== 'hidden' \
         && rect.width > 0 && rect.height > 0; }})()",
        js_string(selector)
    )
}

fn browser_error(action: &str, e: impl std::fmt::Display) -> SiteError {
    SiteError::PdfError {
        message: format!("{}: {}", action, e),
        path: None,
        suggestion: Some(
            "Check that Chrome or Chromium is installed and can be launched headless".to_string(),
        ),
    }
}

fn evaluate_bool(tab: &Tab, script: &str) -> bool {
    tab.evaluate(script, false)
        .ok()
        .and_then(|result| result.value)
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

fn evaluate_count(tab: &Tab, script: &str) -> Option<u64> {
    tab.evaluate(script, false)
        .ok()
        .and_then(|result| result.value)
        .and_then(|value| value.as_f64())
        .map(|count| count as u64)
}

/// Follows the number of loaded resources across polls.
#[derive(Debug)]
struct IdleTracker {
    window: Duration,
    last_count: Option<u64>,
    stable_since: Instant,
}

impl IdleTracker {
    fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            last_count: None,
            stable_since: now,
        }
    }

    /// Records `count` seen at `now`; true once it has not changed for the window.
    fn observe(&mut self, count: u64, now: Instant) -> bool {
        if self.last_count != Some(count) {
            self.last_count = Some(count);
            self.stable_since = now;
        }
        now.saturating_duration_since(self.stable_since) >= self.window
    }
}

fn wait_for_network_idle(tab: &Tab, timeout: Duration) -> bool {
    let started = Instant::now();
    let mut tracker = IdleTracker::new(NETWORK_IDLE_WINDOW, started);
    while started.elapsed() < timeout {
        match evaluate_count(tab, RESOURCE_COUNT_SCRIPT) {
            Some(count) if tracker.observe(count, Instant::now()) => return true,
            Some(count) => debug!("{} resources loaded", count),
            None => debug!("Resource timing unavailable"),
        }
        thread::sleep(READY_POLL_INTERVAL);
    }
    false
}

fn wait_for_document_complete(tab: &Tab, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if evaluate_bool(tab, "document.readyState === 'complete'") {
            return true;
        }
        thread::sleep(READY_POLL_INTERVAL);
    }
    false
}

fn wait_for_visible(tab: &Tab, selector: &str, timeout: Duration) -> bool {
    let started = Instant::now();
    if let Err(e) = tab.wait_for_element_with_custom_timeout(selector, timeout) {
        debug!("Element {} not found: {}", selector, e);
        return false;
    }

    let script = visibility_script(selector);
    while started.elapsed() < timeout {
        if evaluate_bool(tab, &script) {
            return true;
        }
        thread::sleep(READY_POLL_INTERVAL);
    }
    false
}

/// Loads `html_path` through a local server and prints it to `output`.
///
/// The page is given `ready_timeout_ms` for each of network idle, document
/// completion and selector visibility. A wait that times out is logged and the
/// export goes on; everything else (port exhaustion, browser launch, navigation, printing,
/// writing the file) fails.
pub fn generate_pdf(
    config: &PdfConfig,
    html_path: &Path,
    output: &Path,
) -> Result<PdfReport, SiteError> {
    if !html_path.is_file() {
        return Err(SiteError::IoError {
            message: "HTML page not found".to_string(),
            path: html_path.display().to_string(),
            suggestion: "Run the convert command first to generate the page".to_string(),
        });
    }
    crate::ensure_parent_dir(&output.to_string_lossy())?;

    let root = match html_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let file_name = html_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index.html".to_string());

    let server = StaticServer::start(root, config.port, config.port_attempts)?;
    let url = server.url_for(&file_name, Some(&config.url_fragment));

    let browser = Browser::new(LaunchOptions {
        headless: true,
        ..Default::default()
    })
    .map_err(|e| browser_error("Failed to launch browser", e))?;
    let tab = browser
        .new_tab()
        .map_err(|e| browser_error("Failed to open tab", e))?;

    info!("Loading {}", url);
    tab.navigate_to(&url)
        .map_err(|e| browser_error("Navigation failed", e))?;
    tab.wait_until_navigated()
        .map_err(|e| browser_error("Navigation did not finish", e))?;

    let timeout = Duration::from_millis(config.ready_timeout_ms);
    if !wait_for_network_idle(&tab, timeout) {
        warn!(
            "Network not idle after {} ms, continuing anyway",
            config.ready_timeout_ms
        );
    }
    if !wait_for_document_complete(&tab, timeout) {
        warn!("Document did not reach readyState 'complete', continuing anyway");
    }
    let ready = wait_for_visible(&tab, &config.ready_selector, timeout);
    if !ready {
        warn!(
            "{} not visible after {} ms, continuing anyway",
            config.ready_selector, config.ready_timeout_ms
        );
    }

    // Fonts and SVG icons may still be loading.
    thread::sleep(Duration::from_millis(config.settle_delay_ms));

    let pdf = tab
        .print_to_pdf(Some(print_options(config)))
        .map_err(|e| browser_error("Printing to PDF failed", e))?;

    fs::write(output, &pdf).map_err(|e| SiteError::PdfError {
        message: format!("Could not write PDF: {}", e),
        path: Some(output.display().to_string()),
        suggestion: Some("Check that you have write permissions for this location".to_string()),
    })?;
    info!("PDF written to {} ({} bytes)", output.display(), pdf.len());

    drop(server);
    Ok(PdfReport {
        url,
        bytes: pdf.len(),
        ready,
    })
}
