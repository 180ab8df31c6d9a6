//! The resumesite library regenerates a styled résumé web page from a single markdown file.
//!
//! The markdown is the source of truth. It is parsed into a [`resume::ResumeDocument`],
//! projected into an existing HTML template by locating known anchor elements, stamped
//! with build metadata and written back. A separate validator checks the markdown before
//! a build, and (with the default `pdf` feature) the generated page is printed to PDF
//! through a headless browser.
//!
//! Basic usage renders in memory:
//! ```rust
//! use resumesite::build_info::BuildStamp;
//! use std::error::Error;
//!
//! fn example(template: &str) -> Result<(), Box<dyn Error>> {
//!     let markdown = "## Skills\n- Rust\n- Leadership\n";
//!     let stamp = BuildStamp::from_env("GITHUB_SHA");
//!     let rendered = resumesite::render_resume(markdown, template, &stamp)?;
//!     println!("{} skills, {} bytes", rendered.resume.skills.len(), rendered.html.len());
//!     Ok(())
//! }
//! ```
//!
//! Or works on files, the way the CLI does:
//! ```rust,no_run
//! use resumesite::config::SiteConfig;
//!
//! let config = SiteConfig::default();
//! let summary = resumesite::convert_files(
//!     &config.paths.markdown,
//!     &config.paths.html,
//!     &config.build.revision_env,
//!     true,
//! )?;
//! println!("{} job(s)", summary.jobs);
//! # Ok::<(), resumesite::SiteError>(())
//! ```
//!
//! ## Pipeline
//! ```text
//! +-------------+     +------------------+     +-------------------+
//! | resume.md   | --> | ResumeParser     | --> | ResumeDocument    |
//! +-------------+     +------------------+     +-------------------+
//!                                                        |
//! +-------------+     +------------------+     +-------------------+
//! | index.html  | --> | RcDom + anchors  | --> | template mutation |
//! +-------------+     +------------------+     +-------------------+
//!                                                        |
//!                     +------------------+     +-------------------+
//!                     | headless browser | <-- | build stamp, save |
//!                     +------------------+     +-------------------+
//! ```

pub mod build_info;
pub mod config;
pub mod dom;
pub mod markdown;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod resume;
#[cfg(feature = "pdf")]
pub mod server;
pub mod template;
pub mod validation;

use build_info::BuildStamp;
use log::{debug, info};
use markdown::{Diagnostic, ResumeParser};
use resume::ResumeDocument;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use validation::{ResumeStats, ValidationReport};

/// Errors raised while building the site or exporting it.
#[derive(Debug)]
pub enum SiteError {
    /// An input could not be read or an output could not be written
    IoError {
        message: String,
        path: String,
        suggestion: String,
    },
    /// The markdown is missing required sections
    ValidationError { errors: Vec<String> },
    /// The HTML template is missing required anchor ids
    TemplateError { missing: Vec<String> },
    /// The HTML tree could not be serialized
    RenderError { message: String },
    ConfigError { message: String, suggestion: String },
    /// The local file server could not start
    ServerError { message: String, suggestion: String },
    /// The browser could not be launched, navigated or printed
    PdfError {
        message: String,
        path: Option<String>,
        suggestion: Option<String>,
    },
}

impl Error for SiteError {}
impl fmt::Display for SiteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SiteError::IoError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "❌ File Error: {}", message)?;
                write!(f, "\n📁 Path: {}", path)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            SiteError::ValidationError { errors } => {
                write!(f, "❌ Validation Error: {} problem(s) found", errors.len())?;
                for error in errors {
                    write!(f, "\n   • {}", error)?;
                }
                write!(
                    f,
                    "\n💡 Suggestion: Add the missing level-2 headings to the markdown"
                )?;
                Ok(())
            }
            SiteError::TemplateError { missing } => {
                write!(
                    f,
                    "❌ Template Error: missing required element id(s): {}",
                    missing.join(", ")
                )?;
                write!(
                    f,
                    "\n💡 Suggestion: Restore the elements with these ids in the HTML template"
                )?;
                Ok(())
            }
            SiteError::RenderError { message } => {
                write!(f, "❌ Render Error: {}", message)
            }
            SiteError::ConfigError {
                message,
                suggestion,
            } => {
                write!(f, "❌ Configuration Error: {}", message)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            SiteError::ServerError {
                message,
                suggestion,
            } => {
                write!(f, "❌ Server Error: {}", message)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            SiteError::PdfError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "❌ PDF Generation Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\n📁 Path: {}", p)?;
                }
                if let Some(hint) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", hint)?;
                }
                Ok(())
            }
        }
    }
}

impl SiteError {
    pub fn render_error(message: impl Into<String>) -> Self {
        SiteError::RenderError {
            message: message.into(),
        }
    }

    /// Creates a simple PDF error with just a message
    pub fn pdf_error(message: impl Into<String>) -> Self {
        SiteError::PdfError {
            message: message.into(),
            path: None,
            suggestion: Some(
                "Check that Chrome or Chromium is installed and can be launched".to_string(),
            ),
        }
    }

    fn read_failed(path: &str, err: &std::io::Error) -> Self {
        SiteError::IoError {
            message: format!("Could not read file: {}", err),
            path: path.to_string(),
            suggestion: if err.kind() == std::io::ErrorKind::NotFound {
                "Check the path, or run the command from the directory holding the file"
                    .to_string()
            } else {
                "Check that you have read permissions for this file".to_string()
            },
        }
    }

    fn write_failed(path: &str, err: &std::io::Error) -> Self {
        SiteError::IoError {
            message: format!("Could not write file: {}", err),
            path: path.to_string(),
            suggestion: "Check that you have write permissions for this location".to_string(),
        }
    }
}

/// Reads a UTF-8 input file, naming the path in the error.
pub fn read_input(path: &str) -> Result<String, SiteError> {
    let content = fs::read_to_string(path).map_err(|e| SiteError::read_failed(path, &e))?;
    debug!("Read {} ({} bytes)", path, content.len());
    Ok(content)
}

/// Output of [`render_resume`].
#[derive(Debug, Clone)]
pub struct RenderedResume {
    pub html: String,
    pub resume: ResumeDocument,
    pub stamp: BuildStamp,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses `markdown`, projects it into `template_html` and stamps the result.
///
/// The template is checked for every required anchor before any edit; a
/// missing anchor fails with [`SiteError::TemplateError`] listing all of them.
pub fn render_resume(
    markdown: &str,
    template_html: &str,
    stamp: &BuildStamp,
) -> Result<RenderedResume, SiteError> {
    let mut parser = ResumeParser::new(markdown);
    let resume = parser.parse();
    let diagnostics = parser.diagnostics().to_vec();

    let dom = dom::parse_html(template_html);
    template::apply_resume(&dom, &resume)?;
    stamp.apply(&dom);
    let html = dom::serialize_document(&dom)?;

    Ok(RenderedResume {
        html,
        resume,
        stamp: stamp.clone(),
        diagnostics,
    })
}

/// Counts reported after a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub location: String,
    pub summary_paragraphs: usize,
    pub jobs: usize,
    pub skills: usize,
    pub schools: usize,
    pub certifications: usize,
    pub bytes: usize,
    pub written: bool,
    pub stamp: BuildStamp,
}

impl ConversionSummary {
    fn new(rendered: &RenderedResume, written: bool) -> Self {
        let resume = &rendered.resume;
        ConversionSummary {
            location: resume.location.clone(),
            summary_paragraphs: resume.summary.len(),
            jobs: resume.work_experience.len(),
            skills: resume.skills.len(),
            schools: resume.education.len(),
            certifications: resume.certifications.len(),
            bytes: rendered.html.len(),
            written,
            stamp: rendered.stamp.clone(),
        }
    }
}

/// Regenerates `html_path` in place from `markdown_path`.
///
/// With `dry_run` everything runs except the final write.
pub fn convert_files(
    markdown_path: &str,
    html_path: &str,
    revision_env: &str,
    dry_run: bool,
) -> Result<ConversionSummary, SiteError> {
    let template_html = read_input(html_path)?;
    let markdown = read_input(markdown_path)?;

    let stamp = BuildStamp::from_env(revision_env);
    let rendered = render_resume(&markdown, &template_html, &stamp)?;

    if dry_run {
        info!(
            "Dry run: would write {} bytes to {}",
            rendered.html.len(),
            html_path
        );
    } else {
        fs::write(html_path, &rendered.html).map_err(|e| SiteError::write_failed(html_path, &e))?;
        info!("Wrote {} ({} bytes)", html_path, rendered.html.len());
    }

    Ok(ConversionSummary::new(&rendered, !dry_run))
}

/// Validates the markdown at `path`, returning the report and size figures.
pub fn validate_file(path: &str) -> Result<(ValidationReport, ResumeStats), SiteError> {
    let content = read_input(path)?;
    Ok((
        validation::validate_resume(&content),
        ResumeStats::from_content(&content),
    ))
}

/// Fails with [`SiteError::ValidationError`] when `report` has errors.
pub fn ensure_valid(report: &ValidationReport) -> Result<(), SiteError> {
    if report.is_valid() {
        Ok(())
    } else {
        Err(SiteError::ValidationError {
            errors: report.errors.clone(),
        })
    }
}

/// Fails early when the directory that should hold `path` is missing.
pub fn ensure_parent_dir(path: &str) -> Result<(), SiteError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(SiteError::IoError {
                message: "Output directory does not exist".to_string(),
                path: parent.display().to_string(),
                suggestion: format!("Create the directory first: mkdir -p {}", parent.display()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    const TEMPLATE: &str = include_str!("../../demos/index.html");
    const RESUME: &str = include_str!("../../demos/resume.md");

    fn stamp() -> BuildStamp {
        BuildStamp::new(
            Some("0123456789abcdef"),
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        )
    }

    #[test]
    fn test_render_demo_resume() {
        let rendered = render_resume(RESUME, TEMPLATE, &stamp()).unwrap();
        assert!(!rendered.resume.location.is_empty());
        assert!(!rendered.resume.work_experience.is_empty());
        assert!(rendered.html.contains("<!-- build: 0123456 2025-01-02T03:04:05Z -->"));
        assert!(rendered.html.contains(&rendered.resume.location));
        for job in &rendered.resume.work_experience {
            assert!(rendered.html.contains(&job.title), "missing {}", job.title);
        }
    }

    #[test]
    fn test_render_reports_missing_anchors() {
        let broken = TEMPLATE.replace("resume-buttons-skills", "renamed-skills");
        match render_resume(RESUME, &broken, &stamp()) {
            Err(SiteError::TemplateError { missing }) => {
                assert_eq!(missing, vec!["resume-buttons-skills".to_string()]);
            }
            other => panic!("expected TemplateError, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_files_writes_output() {
        let dir = tempdir().unwrap();
        let md = dir.path().join("resume.md");
        let html = dir.path().join("index.html");
        fs::write(&md, RESUME).unwrap();
        fs::write(&html, TEMPLATE).unwrap();

        let summary = convert_files(
            md.to_str().unwrap(),
            html.to_str().unwrap(),
            "RESUMESITE_TEST_REVISION_UNSET",
            false,
        )
        .unwrap();

        assert!(summary.written);
        assert_eq!(summary.stamp.revision, build_info::LOCAL_REVISION);
        let written = fs::read_to_string(&html).unwrap();
        assert_eq!(written.len(), summary.bytes);
        assert!(written.contains("name=\"build-sha\""));
    }

    #[test]
    fn test_convert_files_dry_run_leaves_template_alone() {
        let dir = tempdir().unwrap();
        let md = dir.path().join("resume.md");
        let html = dir.path().join("index.html");
        fs::write(&md, RESUME).unwrap();
        fs::write(&html, TEMPLATE).unwrap();

        let summary = convert_files(
            md.to_str().unwrap(),
            html.to_str().unwrap(),
            "RESUMESITE_TEST_REVISION_UNSET",
            true,
        )
        .unwrap();

        assert!(!summary.written);
        assert!(summary.bytes > 0);
        assert_eq!(fs::read_to_string(&html).unwrap(), TEMPLATE);
    }

    #[test]
    fn test_convert_files_missing_input_names_path() {
        let dir = tempdir().unwrap();
        let html = dir.path().join("index.html");
        fs::write(&html, TEMPLATE).unwrap();
        let missing = dir.path().join("nope.md");

        let err = convert_files(
            missing.to_str().unwrap(),
            html.to_str().unwrap(),
            "RESUMESITE_TEST_REVISION_UNSET",
            false,
        )
        .unwrap_err();

        match &err {
            SiteError::IoError { path, .. } => assert!(path.ends_with("nope.md")),
            other => panic!("expected IoError, got {:?}", other),
        }
        assert!(err.to_string().contains("nope.md"));
    }

    #[test]
    fn test_validate_file_and_ensure_valid() {
        let dir = tempdir().unwrap();
        let md = dir.path().join("resume.md");
        fs::write(&md, "## Skills\n- Rust\n").unwrap();

        let (report, stats) = validate_file(md.to_str().unwrap()).unwrap();
        assert_eq!(stats.sections, 1);
        match ensure_valid(&report) {
            Err(SiteError::ValidationError { errors }) => assert_eq!(errors.len(), 3),
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_demo_resume_is_valid() {
        let report = validation::validate_resume(RESUME);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_ensure_parent_dir() {
        assert!(ensure_parent_dir("resume.pdf").is_ok());
        assert!(matches!(
            ensure_parent_dir("/nonexistent/directory/resume.pdf"),
            Err(SiteError::IoError { .. })
        ));
    }

    #[test]
    fn test_site_error_display_variants() {
        let io = SiteError::IoError {
            message: "io fail".to_string(),
            path: "/path/to".to_string(),
            suggestion: "check path".to_string(),
        };
        let s = io.to_string();
        assert!(s.contains("File Error: io fail"));
        assert!(s.contains("📁 Path: /path/to"));
        assert!(s.contains("💡 Suggestion: check path"));

        let template = SiteError::TemplateError {
            missing: vec!["a".to_string(), "b".to_string()],
        };
        assert!(template.to_string().contains("a, b"));

        let validation = SiteError::ValidationError {
            errors: vec!["Missing required section: ## Skills".to_string()],
        };
        let s = validation.to_string();
        assert!(s.contains("1 problem(s)"));
        assert!(s.contains("## Skills"));

        let pdf = SiteError::pdf_error("launch failed");
        let s = pdf.to_string();
        assert!(s.contains("PDF Generation Error: launch failed"));
        assert!(s.contains("Chrome"));

        let render = SiteError::render_error("bad tree");
        assert!(render.to_string().contains("Render Error: bad tree"));
    }
}
