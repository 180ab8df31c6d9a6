//! Configuration for file locations, build stamping and PDF export.
//!
//! Configuration is read from a TOML file. Every key is optional; anything
//! missing, of the wrong type or out of range keeps its built-in default. A
//! discovered file that cannot be read or parsed degrades to the defaults as a
//! whole; a file named explicitly must load ([`read_config_file`]).
//!
//! # Configuration Structure
//!
//! - `[paths]` names the markdown source, the HTML template/output and the PDF output
//! - `[build]` names the environment variable holding the revision id
//! - `[pdf]` controls the headless-browser print: page size, scale, margins (inches),
//!   the local server port range and the readiness wait
//!
//! # Configuration Example
//!
//! ```toml
//! [paths]
//! markdown = "resume.md"
//! html = "index.html"
//! pdf = "resume.pdf"
//!
//! [build]
//! revision_env = "GITHUB_SHA"
//!
//! [pdf]
//! page_size = "letter"
//! scale = 0.98
//! print_background = true
//! margins = { top = 0.2, right = 0.2, bottom = 0.2, left = 0.2 }
//! port = 8000
//! port_attempts = 10
//! ready_selector = "#resume-section"
//! ready_timeout_ms = 10000
//! settle_delay_ms = 2000
//! url_fragment = "resume"
//! ```
//!
//! In the CLI the file is discovered in this order: `--config <file>`,
//! `resumesiterc.toml` in the working directory, `<config dir>/resumesite/config.toml`.

use crate::SiteError;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use toml::Value;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "resumesiterc.toml";

/// Where the TOML configuration should be loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Use built-in defaults
    Default,
    /// Load configuration from a file path
    File(&'a str),
    /// Use a TOML string held in memory
    Embedded(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathsConfig {
    pub markdown: String,
    pub html: String,
    pub pdf: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            markdown: "resume.md".to_string(),
            html: "index.html".to_string(),
            pdf: "resume.pdf".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Environment variable read for the revision id
    pub revision_env: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            revision_env: crate::build_info::DEFAULT_REVISION_ENV.to_string(),
        }
    }
}

/// Paper sizes the exporter knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Letter,
    Legal,
    A4,
}

impl PageSize {
    pub fn from_name(name: &str) -> Option<PageSize> {
        match name.trim().to_ascii_lowercase().as_str() {
            "letter" => Some(PageSize::Letter),
            "legal" => Some(PageSize::Legal),
            "a4" => Some(PageSize::A4),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageSize::Letter => "letter",
            PageSize::Legal => "legal",
            PageSize::A4 => "a4",
        }
    }

    /// `(width, height)` in inches.
    pub fn dimensions_inches(&self) -> (f64, f64) {
        match self {
            PageSize::Letter => (8.5, 11.0),
            PageSize::Legal => (8.5, 14.0),
            PageSize::A4 => (8.27, 11.69),
        }
    }
}

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfMargins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for PdfMargins {
    fn default() -> Self {
        PdfMargins {
            top: 0.2,
            right: 0.2,
            bottom: 0.2,
            left: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfConfig {
    pub page_size: PageSize,
    pub scale: f64,
    pub print_background: bool,
    pub margins: PdfMargins,
    /// First port tried by the local file server
    pub port: u16,
    /// Number of consecutive ports tried before giving up
    pub port_attempts: u16,
    /// Element that must be visible before printing
    pub ready_selector: String,
    pub ready_timeout_ms: u64,
    /// Extra wait for fonts and images after the page is ready
    pub settle_delay_ms: u64,
    pub url_fragment: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        PdfConfig {
            page_size: PageSize::Letter,
            scale: 0.98,
            print_background: true,
            margins: PdfMargins::default(),
            port: 8000,
            port_attempts: 10,
            ready_selector: "#resume-section".to_string(),
            ready_timeout_ms: 10_000,
            settle_delay_ms: 2_000,
            url_fragment: "resume".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteConfig {
    pub paths: PathsConfig,
    pub build: BuildConfig,
    pub pdf: PdfConfig,
}

fn parse_string(value: Option<&Value>, default: String) -> String {
    match value.and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => default,
    }
}

/// Accepts both `1` and `1.0`.
fn parse_number(value: Option<&Value>) -> Option<f64> {
    let v = value?;
    v.as_float().or_else(|| v.as_integer().map(|i| i as f64))
}

fn parse_margins(value: Option<&Value>, default: PdfMargins) -> PdfMargins {
    let Some(margins) = value else {
        return default;
    };
    let side = |name: &str, fallback: f64| {
        parse_number(margins.get(name))
            .filter(|m| *m >= 0.0)
            .unwrap_or(fallback)
    };
    PdfMargins {
        top: side("top", default.top),
        right: side("right", default.right),
        bottom: side("bottom", default.bottom),
        left: side("left", default.left),
    }
}

fn parse_pdf(value: Option<&Value>, default: PdfConfig) -> PdfConfig {
    let mut pdf = default;
    let Some(section) = value else {
        return pdf;
    };

    if let Some(name) = section.get("page_size").and_then(|v| v.as_str()) {
        match PageSize::from_name(name) {
            Some(size) => pdf.page_size = size,
            None => warn!("Unknown page_size '{}', keeping {}", name, pdf.page_size.name()),
        }
    }
    // Chrome accepts print scales between 0.1 and 2.
    if let Some(scale) = parse_number(section.get("scale")).filter(|s| (0.1..=2.0).contains(s)) {
        pdf.scale = scale;
    }
    if let Some(background) = section.get("print_background").and_then(|v| v.as_bool()) {
        pdf.print_background = background;
    }
    pdf.margins = parse_margins(section.get("margins"), pdf.margins);

    if let Some(port) = section
        .get("port")
        .and_then(|v| v.as_integer())
        .and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p > 0)
    {
        pdf.port = port;
    }
    if let Some(attempts) = section
        .get("port_attempts")
        .and_then(|v| v.as_integer())
        .and_then(|a| u16::try_from(a).ok())
        .filter(|a| *a > 0)
    {
        pdf.port_attempts = attempts;
    }

    pdf.ready_selector = parse_string(section.get("ready_selector"), pdf.ready_selector);
    if let Some(ms) = section
        .get("ready_timeout_ms")
        .and_then(|v| v.as_integer())
        .and_then(|ms| u64::try_from(ms).ok())
    {
        pdf.ready_timeout_ms = ms;
    }
    if let Some(ms) = section
        .get("settle_delay_ms")
        .and_then(|v| v.as_integer())
        .and_then(|ms| u64::try_from(ms).ok())
    {
        pdf.settle_delay_ms = ms;
    }
    if let Some(fragment) = section.get("url_fragment").and_then(|v| v.as_str()) {
        pdf.url_fragment = fragment.trim_start_matches('#').to_string();
    }
    pdf
}

/// Parses a TOML configuration string into a complete [`SiteConfig`].
///
/// Returns the defaults if the string is not valid TOML.
///
/// # Example
/// ```rust
/// use resumesite::config::{parse_config_string, PageSize};
///
/// let config = parse_config_string(r#"
/// [paths]
/// markdown = "cv.md"
///
/// [pdf]
/// page_size = "a4"
/// margins = { top = 0.5 }
/// "#);
/// assert_eq!(config.paths.markdown, "cv.md");
/// assert_eq!(config.paths.html, "index.html");
/// assert_eq!(config.pdf.page_size, PageSize::A4);
/// assert_eq!(config.pdf.margins.top, 0.5);
/// assert_eq!(config.pdf.margins.left, 0.2);
/// ```
pub fn parse_config_string(config_str: &str) -> SiteConfig {
    match toml::from_str::<Value>(config_str) {
        Ok(config) => config_from_value(&config),
        Err(e) => {
            warn!("Invalid configuration, using defaults: {}", e);
            SiteConfig::default()
        }
    }
}

fn config_from_value(config: &Value) -> SiteConfig {
    let defaults = SiteConfig::default();
    let paths = config.get("paths");
    let build = config.get("build");

    SiteConfig {
        paths: PathsConfig {
            markdown: parse_string(
                paths.and_then(|p| p.get("markdown")),
                defaults.paths.markdown,
            ),
            html: parse_string(paths.and_then(|p| p.get("html")), defaults.paths.html),
            pdf: parse_string(paths.and_then(|p| p.get("pdf")), defaults.paths.pdf),
        },
        build: BuildConfig {
            revision_env: parse_string(
                build.and_then(|b| b.get("revision_env")),
                defaults.build.revision_env,
            ),
        },
        pdf: parse_pdf(config.get("pdf"), defaults.pdf),
    }
}

/// Loads the configuration from `source`.
///
/// A file that cannot be read falls back to the defaults.
///
/// # Examples
/// ```rust
/// use resumesite::config::{ConfigSource, load_config_from_source};
///
/// let config = load_config_from_source(ConfigSource::Default);
/// assert_eq!(config.pdf.port, 8000);
///
/// let config = load_config_from_source(ConfigSource::File("nonexistent.toml"));
/// assert_eq!(config.pdf.port, 8000);
///
/// let config = load_config_from_source(ConfigSource::Embedded("[pdf]\nport = 9100\n"));
/// assert_eq!(config.pdf.port, 9100);
/// ```
pub fn load_config_from_source(source: ConfigSource) -> SiteConfig {
    match source {
        ConfigSource::Default => SiteConfig::default(),
        ConfigSource::File(path) => match fs::read_to_string(Path::new(path)) {
            Ok(s) => {
                debug!("Loaded configuration from {}", path);
                parse_config_string(&s)
            }
            Err(e) => {
                warn!("Could not read configuration {}: {}; using defaults", path, e);
                SiteConfig::default()
            }
        },
        ConfigSource::Embedded(content) => parse_config_string(content),
    }
}

/// Reads a configuration file the user named explicitly.
///
/// Unlike [`load_config_from_source`], a file that cannot be read or is not
/// valid TOML is an error. Individual bad values still keep their defaults.
pub fn read_config_file(path: &str) -> Result<SiteConfig, SiteError> {
    let content = fs::read_to_string(Path::new(path)).map_err(|e| SiteError::ConfigError {
        message: format!("Could not read configuration {}: {}", path, e),
        suggestion: "Check the path given to --config".to_string(),
    })?;
    let config: Value = toml::from_str(&content).map_err(|e| SiteError::ConfigError {
        message: format!("Invalid configuration {}: {}", path, e),
        suggestion: "Compare with the output of --get-default-configuration".to_string(),
    })?;
    debug!("Loaded configuration from {}", path);
    Ok(config_from_value(&config))
}

/// Per-user configuration file, `<config dir>/resumesite/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("resumesite").join("config.toml"))
}

/// First configuration file that exists, in discovery order.
pub fn discover_config_file(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    let local = Path::new(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local.to_path_buf());
    }
    user_config_path().filter(|p| p.exists())
}

/// A complete configuration file holding every default value.
pub fn default_config_toml() -> String {
    let config = SiteConfig::default();
    let pdf = &config.pdf;
    format!(
        r#"# resumesite configuration
# Place as ./{local} or in your user config directory as resumesite/config.toml

[paths]
markdown = "{markdown}"
html = "{html}"
pdf = "{pdf_path}"

[build]
# Environment variable holding the revision id; "local" is used when unset
revision_env = "{revision_env}"

[pdf]
page_size = "{page_size}"   # letter, legal or a4
scale = {scale:?}
print_background = {background}
# Margins in inches
margins = {{ top = {top:?}, right = {right:?}, bottom = {bottom:?}, left = {left:?} }}
port = {port}
port_attempts = {attempts}
ready_selector = "{selector}"
ready_timeout_ms = {timeout}
settle_delay_ms = {settle}
url_fragment = "{fragment}"
"#,
        local = LOCAL_CONFIG_FILE,
        markdown = config.paths.markdown,
        html = config.paths.html,
        pdf_path = config.paths.pdf,
        revision_env = config.build.revision_env,
        page_size = pdf.page_size.name(),
        scale = pdf.scale,
        background = pdf.print_background,
        top = pdf.margins.top,
        right = pdf.margins.right,
        bottom = pdf.margins.bottom,
        left = pdf.margins.left,
        port = pdf.port,
        attempts = pdf.port_attempts,
        selector = pdf.ready_selector,
        timeout = pdf.ready_timeout_ms,
        settle = pdf.settle_delay_ms,
        fragment = pdf.url_fragment,
    )
}
