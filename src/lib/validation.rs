//! Pre-build validation of the résumé markdown.
//!
//! Every check is independent. Missing required sections are errors and block
//! the build; everything else is reported as a warning.

use crate::markdown::LOCATION_LABEL;
use once_cell::sync::Lazy;
use regex::Regex;

/// Sections the site cannot be built without.
pub const REQUIRED_SECTIONS: [&str; 4] = [
    "Professional Summary",
    "Work Experience",
    "Skills",
    "Education",
];

static DATE_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").expect("valid date regex"));

/// Outcome of [`validate_resume`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `(is_valid, warnings, errors)`
    pub fn into_parts(self) -> (bool, Vec<String>, Vec<String>) {
        (self.errors.is_empty(), self.warnings, self.errors)
    }
}

/// Size figures printed after a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeStats {
    pub total_lines: usize,
    pub sections: usize,
    pub bytes: usize,
}

impl ResumeStats {
    pub fn from_content(content: &str) -> Self {
        ResumeStats {
            // A trailing newline opens one more, empty, line.
            total_lines: content.split('\n').count(),
            sections: content.lines().filter(|l| l.starts_with("## ")).count(),
            bytes: content.len(),
        }
    }
}

/// Lines between `## <name>` and the next level-2 heading, or `None` when the
/// heading is absent.
fn section_body<'a>(lines: &[&'a str], name: &str) -> Option<Vec<&'a str>> {
    let header = format!("## {}", name);
    let start = lines.iter().position(|l| l.trim() == header)?;
    Some(
        lines[start + 1..]
            .iter()
            .take_while(|l| !l.starts_with("## "))
            .copied()
            .collect(),
    )
}

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("* ")
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Validates résumé markdown.
///
/// # Example
/// ```rust
/// use resumesite::validation::validate_resume;
///
/// let report = validate_resume("## Skills\n- Rust\n");
/// assert!(!report.is_valid());
/// assert_eq!(report.errors.len(), 3);
/// ```
pub fn validate_resume(content: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    let lines: Vec<&str> = content.lines().collect();

    for section in REQUIRED_SECTIONS {
        let header = format!("## {}", section);
        if !lines.iter().any(|l| l.trim() == header) {
            report
                .errors
                .push(format!("Missing required section: {}", header));
        }
    }

    if !content.contains(LOCATION_LABEL) {
        report
            .warnings
            .push("Location not found - resume may not display location properly".to_string());
    }

    if let Some(body) = section_body(&lines, "Work Experience") {
        let jobs: Vec<&str> = body
            .iter()
            .filter_map(|l| l.strip_prefix("### "))
            .collect();
        if jobs.is_empty() {
            report
                .warnings
                .push("No job entries found in Work Experience section".to_string());
        }
        for job in jobs {
            if !DATE_GROUP.is_match(job) {
                report
                    .warnings
                    .push(format!("Job entry missing dates: '{}...'", truncate(job, 50)));
            }
        }
    }

    if let Some(body) = section_body(&lines, "Skills") {
        if !body.iter().any(|l| is_bullet(l)) {
            report
                .warnings
                .push("No skills found in Skills section".to_string());
        }
    }

    if let Some(body) = section_body(&lines, "Education") {
        if !body.iter().any(|l| l.starts_with("### ")) {
            report
                .warnings
                .push("No schools found in Education section".to_string());
        }
    }

    let mut previous_blank = false;
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx + 1;

        if line.contains('\t') {
            report.warnings.push(format!(
                "Line {}: Contains tab character (use spaces instead)",
                line_num
            ));
        }

        let content_end = line.trim_end();
        let blank = content_end.trim_start().is_empty();
        // Exactly two trailing spaces is a markdown hard line break.
        if !blank && content_end.len() != line.len() && &line[content_end.len()..] != "  " {
            report
                .warnings
                .push(format!("Line {}: Has trailing whitespace", line_num));
        }

        if blank && previous_blank {
            report
                .warnings
                .push(format!("Line {}: Multiple consecutive blank lines", line_num));
        }
        previous_blank = blank;
    }

    report
}
