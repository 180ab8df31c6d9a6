//! Markdown section parser.
//!
//! Reads the résumé markdown in a single forward pass and builds a
//! [`ResumeDocument`]. The format is the one the site author writes by hand:
//!
//! ```text
//! # Name
//! **Location:** Seattle, Washington
//!
//! ## Professional Summary
//! Free text, blank lines separate paragraphs.
//!
//! ## Work Experience
//! ### Company - Title (2020 - Present)
//! - bullet
//!
//! ## Skills
//! - skill
//!
//! ## Education
//! ### School
//! - item
//!
//! ## Certifications
//! - certification
//! ```
//!
//! Parsing never fails. Missing or malformed pieces leave the matching
//! collection empty, and anything worth telling the author about is logged and
//! kept as a [`Diagnostic`] on the parser.

use crate::resume::{JobEntry, ResumeDocument, SchoolEntry};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

/// Everything up to the last top-level parenthesized group is the title, the
/// group contents are the dates.
static JOB_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*\S)\s*\(([^)]+)\)\s*$").expect("valid job heading regex"));

static LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Location:\*\*\s*(.+)").expect("valid location regex"));

pub const LOCATION_LABEL: &str = "**Location:**";

/// A level-2 section of the résumé, or the preamble before the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Preamble,
    Summary,
    Work,
    Skills,
    Education,
    Certifications,
}

impl Section {
    /// Maps an exact heading line (already trimmed) to its section.
    pub fn from_heading(line: &str) -> Option<Section> {
        match line {
            "## Professional Summary" => Some(Section::Summary),
            "## Work Experience" => Some(Section::Work),
            "## Skills" => Some(Section::Skills),
            "## Education" => Some(Section::Education),
            "## Certifications" => Some(Section::Certifications),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Section::Preamble => "Preamble",
            Section::Summary => "Professional Summary",
            Section::Work => "Work Experience",
            Section::Skills => "Skills",
            Section::Education => "Education",
            Section::Certifications => "Certifications",
        }
    }
}

/// A non-fatal remark about the parsed markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number in the markdown source
    pub line: usize,
    pub message: String,
}

/// Single-pass résumé parser.
///
/// # Example
/// ```rust
/// use resumesite::markdown::ResumeParser;
///
/// let mut parser = ResumeParser::new("## Work Experience\n### ACME - Engineer\n- Built things\n");
/// let doc = parser.parse();
/// assert_eq!(doc.work_experience[0].title, "ACME - Engineer");
/// assert_eq!(parser.diagnostics().len(), 1);
/// ```
pub struct ResumeParser<'a> {
    source: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ResumeParser<'a> {
    pub fn new(source: &'a str) -> Self {
        ResumeParser {
            source,
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics collected by the last call to [`ResumeParser::parse`].
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn parse(&mut self) -> ResumeDocument {
        self.diagnostics.clear();
        let mut state = ParseState::default();

        for (idx, line) in self.source.lines().enumerate() {
            let line_num = idx + 1;
            let trimmed = line.trim();

            if line.contains(LOCATION_LABEL) {
                if let Some(caps) = LOCATION.captures(line) {
                    state.doc.location = caps[1].trim().to_string();
                    info!("Found location: {}", state.doc.location);
                }
            } else if let Some(section) = Section::from_heading(trimmed) {
                info!("Parsing {} (line {})", section.label(), line_num);
                state.enter(section);
            } else if state.section == Section::Work && line.starts_with("### ") {
                state.flush_job();
                let heading = line["### ".len()..].trim();
                self.open_job(&mut state, heading, line_num);
            } else if state.section == Section::Education && line.starts_with("### ") {
                state.flush_school();
                let name = line["### ".len()..].trim();
                debug!("School: {}", name);
                state.school = Some(SchoolEntry::new(name));
            } else if line.starts_with("- ") || line.starts_with("* ") {
                state.push_bullet(line[2..].trim());
            } else if state.section == Section::Summary {
                if !trimmed.is_empty()
                    && !line.starts_with('#')
                    && !line.starts_with("---")
                    && !line.starts_with("**")
                {
                    state.summary_lines.push(trimmed.to_string());
                } else if trimmed.is_empty()
                    && state.summary_lines.last().is_some_and(|l| !l.is_empty())
                {
                    state.summary_lines.push(String::new());
                }
            }
        }

        let doc = state.finish();
        debug!(
            "Parsed {} job(s), {} skill(s), {} school(s), {} certification(s)",
            doc.work_experience.len(),
            doc.skills.len(),
            doc.education.len(),
            doc.certifications.len()
        );
        doc
    }

    fn open_job(&mut self, state: &mut ParseState, heading: &str, line_num: usize) {
        if heading.is_empty() {
            self.report(line_num, "Job heading has no text; entry skipped".to_string());
            return;
        }

        let job = match parse_job_heading(heading) {
            Some((title, dates)) => JobEntry::new(title, dates),
            None => {
                self.report(line_num, format!("Job entry missing dates: {}", heading));
                JobEntry::new(heading, "")
            }
        };
        debug!("Job: {}", job.title);
        state.job = Some(job);
    }

    fn report(&mut self, line: usize, message: String) {
        warn!("Line {}: {}", line, message);
        self.diagnostics.push(Diagnostic { line, message });
    }
}

/// Mutable state threaded through one parsing pass.
struct ParseState {
    section: Section,
    doc: ResumeDocument,
    job: Option<JobEntry>,
    school: Option<SchoolEntry>,
    summary_lines: Vec<String>,
}

impl Default for ParseState {
    fn default() -> Self {
        ParseState {
            section: Section::Preamble,
            doc: ResumeDocument::default(),
            job: None,
            school: None,
            summary_lines: Vec::new(),
        }
    }
}

impl ParseState {
    fn enter(&mut self, next: Section) {
        match self.section {
            Section::Work => self.flush_job(),
            Section::Education => self.flush_school(),
            Section::Summary => self.finish_summary(),
            _ => {}
        }
        if next == Section::Summary {
            self.summary_lines.clear();
        }
        self.section = next;
    }

    fn flush_job(&mut self) {
        if let Some(job) = self.job.take() {
            self.doc.work_experience.push(job);
        }
    }

    fn flush_school(&mut self) {
        if let Some(school) = self.school.take() {
            self.doc.education.push(school);
        }
    }

    fn finish_summary(&mut self) {
        if !self.summary_lines.is_empty() {
            self.doc.summary = parse_summary_paragraphs(&self.summary_lines);
        }
    }

    fn push_bullet(&mut self, bullet: &str) {
        match self.section {
            Section::Work => {
                if let Some(job) = self.job.as_mut() {
                    job.bullets.push(bullet.to_string());
                }
            }
            Section::Skills => self.doc.skills.push(bullet.to_string()),
            Section::Certifications => self.doc.certifications.push(bullet.to_string()),
            Section::Education => {
                if let Some(school) = self.school.as_mut() {
                    school.items.push(bullet.to_string());
                }
            }
            Section::Preamble | Section::Summary => {}
        }
    }

    fn finish(mut self) -> ResumeDocument {
        self.flush_job();
        self.flush_school();
        if self.section == Section::Summary {
            self.finish_summary();
        }
        self.doc
    }
}

/// Parses markdown into a [`ResumeDocument`], logging any diagnostics.
pub fn parse_markdown_resume(markdown: &str) -> ResumeDocument {
    ResumeParser::new(markdown).parse()
}

/// Splits a job heading into `(title, dates)`.
///
/// Only the last parenthesized group is taken as the date range, earlier groups
/// stay in the title. Returns `None` when the heading does not end in a group.
///
/// ```rust
/// use resumesite::markdown::parse_job_heading;
///
/// let (title, dates) = parse_job_heading("Manager (Operations) - ACME (2020 - 2022)").unwrap();
/// assert_eq!(title, "Manager (Operations) - ACME");
/// assert_eq!(dates, "2020 - 2022");
/// ```
pub fn parse_job_heading(heading: &str) -> Option<(String, String)> {
    JOB_HEADING.captures(heading).map(|caps| {
        (
            caps[1].trim().to_string(),
            caps[2].trim().to_string(),
        )
    })
}

/// Joins buffered summary lines into paragraphs.
///
/// Empty strings mark paragraph breaks; runs of breaks collapse. The result is
/// never empty.
pub fn parse_summary_paragraphs<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines {
        let line = line.as_ref();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    if paragraphs.is_empty() {
        vec![String::new()]
    } else {
        paragraphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_RESUME: &str = "\
# Tom Irish

**Location:** Seattle, Washington

---

## Professional Summary

A summary.

---

## Work Experience

### Expeditors - Senior Manager (2025 - Present)

- Led things
- Built things

### Expeditors - Manager (2016 - 2025)

- Managed things

---

## Skills

- Leadership
- Python

---

## Education

### Washington State University

- Bachelor of Arts in MIS

---

## Certifications

- Some Cert
";

    #[test]
    fn test_location_parsed() {
        let doc = parse_markdown_resume(MINIMAL_RESUME);
        assert_eq!(doc.location, "Seattle, Washington");
    }

    #[test]
    fn test_location_missing() {
        let content = MINIMAL_RESUME.replace("**Location:** Seattle, Washington", "");
        let doc = parse_markdown_resume(&content);
        assert_eq!(doc.location, "");
    }

    #[test]
    fn test_location_anywhere_in_document() {
        let content = MINIMAL_RESUME.replace("- Python", "- Python\n**Location:** Remote");
        let doc = parse_markdown_resume(&content);
        assert_eq!(doc.location, "Remote");
        assert_eq!(doc.skills, vec!["Leadership", "Python"]);
    }

    #[test]
    fn test_summary_single_paragraph() {
        let doc = parse_markdown_resume(MINIMAL_RESUME);
        assert_eq!(doc.summary, vec!["A summary."]);
    }

    #[test]
    fn test_summary_multiple_paragraphs() {
        let content = MINIMAL_RESUME.replace(
            "A summary.",
            "First paragraph\ncontinues here.\n\n\nSecond paragraph.",
        );
        let doc = parse_markdown_resume(&content);
        assert_eq!(
            doc.summary,
            vec!["First paragraph continues here.", "Second paragraph."]
        );
    }

    #[test]
    fn test_summary_skips_rules_and_bold_labels() {
        let content = MINIMAL_RESUME.replace("A summary.", "**Note:** hidden\nVisible text.");
        let doc = parse_markdown_resume(&content);
        assert_eq!(doc.summary, vec!["Visible text."]);
    }

    #[test]
    fn test_summary_defaults_to_single_empty_paragraph() {
        let doc = parse_markdown_resume("## Skills\n- Rust\n");
        assert_eq!(doc.summary, vec![String::new()]);
    }

    #[test]
    fn test_summary_at_end_of_document_is_finalized() {
        let doc = parse_markdown_resume("## Professional Summary\n\nOnly a summary.\n");
        assert_eq!(doc.summary, vec!["Only a summary."]);
    }

    #[test]
    fn test_parse_summary_paragraphs_empty_input() {
        let lines: [&str; 0] = [];
        assert_eq!(parse_summary_paragraphs(&lines), vec![String::new()]);
    }

    #[test]
    fn test_parse_summary_paragraphs_blank_separator() {
        assert_eq!(parse_summary_paragraphs(&["a", "", "b"]), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_summary_paragraphs_collapses_breaks() {
        assert_eq!(
            parse_summary_paragraphs(&["", "a", "b", "", "", "c", ""]),
            vec!["a b", "c"]
        );
    }

    #[test]
    fn test_work_experience_entries() {
        let doc = parse_markdown_resume(MINIMAL_RESUME);
        assert_eq!(doc.work_experience.len(), 2);

        let first = &doc.work_experience[0];
        assert_eq!(first.title, "Expeditors - Senior Manager");
        assert_eq!(first.dates, "2025 - Present");
        assert_eq!(first.bullets, vec!["Led things", "Built things"]);

        let second = &doc.work_experience[1];
        assert_eq!(second.title, "Expeditors - Manager");
        assert_eq!(second.dates, "2016 - 2025");
        assert_eq!(second.bullets, vec!["Managed things"]);
    }

    #[test]
    fn test_job_title_with_parentheses_in_name() {
        let content = MINIMAL_RESUME.replace(
            "### Expeditors - Senior Manager (2025 - Present)",
            "### Manager (Operations) - ACME (2020 - 2022)",
        );
        let doc = parse_markdown_resume(&content);
        let job = &doc.work_experience[0];
        assert_eq!(job.title, "Manager (Operations) - ACME");
        assert_eq!(job.dates, "2020 - 2022");
    }

    #[test]
    fn test_job_title_multiple_parentheses_groups() {
        let (title, dates) = parse_job_heading("Director (Eng) (Ops) - Corp (2018 - 2023)").unwrap();
        assert_eq!(title, "Director (Eng) (Ops) - Corp");
        assert_eq!(dates, "2018 - 2023");
    }

    #[test]
    fn test_trailing_parenthetical_is_read_as_dates() {
        let (title, dates) = parse_job_heading("ACME - Engineer (Remote)").unwrap();
        assert_eq!(title, "ACME - Engineer");
        assert_eq!(dates, "Remote");
    }

    #[test]
    fn test_job_without_dates_is_kept_with_diagnostic() {
        let content = MINIMAL_RESUME.replace(
            "### Expeditors - Senior Manager (2025 - Present)",
            "### Expeditors - Senior Manager",
        );
        let mut parser = ResumeParser::new(&content);
        let doc = parser.parse();

        assert_eq!(doc.work_experience.len(), 2);
        let job = &doc.work_experience[0];
        assert_eq!(job.title, "Expeditors - Senior Manager");
        assert_eq!(job.dates, "");
        assert_eq!(job.bullets, vec!["Led things", "Built things"]);

        let diagnostics = parser.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("missing dates"));
        assert_eq!(diagnostics[0].line, 15);
    }

    #[test]
    fn test_empty_job_heading_is_skipped() {
        let mut parser = ResumeParser::new("## Work Experience\n### \n- orphan\n### A (2020)\n- kept\n");
        let doc = parser.parse();
        assert_eq!(doc.work_experience.len(), 1);
        assert_eq!(doc.work_experience[0].bullets, vec!["kept"]);
        assert_eq!(parser.diagnostics().len(), 1);
    }

    #[test]
    fn test_well_formed_resume_has_no_diagnostics() {
        let mut parser = ResumeParser::new(MINIMAL_RESUME);
        parser.parse();
        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn test_star_bullets_accepted() {
        let content = MINIMAL_RESUME.replace("- Leadership", "* Leadership");
        let doc = parse_markdown_resume(&content);
        assert_eq!(doc.skills, vec!["Leadership", "Python"]);
    }

    #[test]
    fn test_skills_and_certifications() {
        let doc = parse_markdown_resume(MINIMAL_RESUME);
        assert_eq!(doc.skills, vec!["Leadership", "Python"]);
        assert_eq!(doc.certifications, vec!["Some Cert"]);
    }

    #[test]
    fn test_no_certifications() {
        let content = MINIMAL_RESUME.replace("## Certifications\n\n- Some Cert", "");
        let doc = parse_markdown_resume(&content);
        assert!(doc.certifications.is_empty());
    }

    #[test]
    fn test_education_entries() {
        let doc = parse_markdown_resume(MINIMAL_RESUME);
        assert_eq!(doc.education.len(), 1);
        assert_eq!(doc.education[0].name, "Washington State University");
        assert_eq!(doc.education[0].items, vec!["Bachelor of Arts in MIS"]);
    }

    #[test]
    fn test_school_flushed_when_education_is_last_section() {
        let doc = parse_markdown_resume("## Education\n### School A\n- one\n### School B\n- two\n");
        let names: Vec<_> = doc.education.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["School A", "School B"]);
    }

    #[test]
    fn test_school_flushed_when_leaving_education_for_skills() {
        let doc = parse_markdown_resume("## Education\n### School A\n- one\n## Skills\n- Rust\n");
        assert_eq!(doc.education.len(), 1);
        assert_eq!(doc.education[0].items, vec!["one"]);
        assert_eq!(doc.skills, vec!["Rust"]);
    }

    #[test]
    fn test_no_work_experience() {
        let content = MINIMAL_RESUME.replace(
            "### Expeditors - Senior Manager (2025 - Present)\n\n- Led things\n- Built things\n\n\
             ### Expeditors - Manager (2016 - 2025)\n\n- Managed things",
            "",
        );
        let doc = parse_markdown_resume(&content);
        assert!(doc.work_experience.is_empty());
    }

    #[test]
    fn test_bullets_before_any_job_are_dropped() {
        let doc = parse_markdown_resume("## Work Experience\n- stray\n### A (2020)\n- real\n");
        assert_eq!(doc.work_experience.len(), 1);
        assert_eq!(doc.work_experience[0].bullets, vec!["real"]);
    }

    #[test]
    fn test_section_from_heading() {
        assert_eq!(Section::from_heading("## Skills"), Some(Section::Skills));
        assert_eq!(Section::from_heading("## Skill"), None);
        assert_eq!(Section::from_heading("### Skills"), None);
    }
}
