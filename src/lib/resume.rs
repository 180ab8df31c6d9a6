//! Structured résumé record produced by the markdown parser.
//!
//! A [`ResumeDocument`] is built once per run, projected into the HTML template
//! and then dropped. Every collection keeps the order in which entries appear in
//! the source markdown.

/// One position in the work history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobEntry {
    /// Heading text with the trailing date group stripped,
    /// e.g. `Expeditors - Senior Manager`
    pub title: String,
    /// Free-text range taken from the last parenthesized group,
    /// e.g. `2025 - Present`. Empty when the heading carried no group.
    pub dates: String,
    pub bullets: Vec<String>,
}

impl JobEntry {
    pub fn new(title: impl Into<String>, dates: impl Into<String>) -> Self {
        JobEntry {
            title: title.into(),
            dates: dates.into(),
            bullets: Vec::new(),
        }
    }
}

/// One institution in the education section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchoolEntry {
    pub name: String,
    pub items: Vec<String>,
}

impl SchoolEntry {
    pub fn new(name: impl Into<String>) -> Self {
        SchoolEntry {
            name: name.into(),
            items: Vec::new(),
        }
    }
}

/// The complete résumé as read from markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeDocument {
    pub location: String,
    /// Never empty: a document without summary text holds a single empty paragraph.
    pub summary: Vec<String>,
    pub work_experience: Vec<JobEntry>,
    pub skills: Vec<String>,
    pub education: Vec<SchoolEntry>,
    pub certifications: Vec<String>,
}

impl Default for ResumeDocument {
    fn default() -> Self {
        ResumeDocument {
            location: String::new(),
            summary: vec![String::new()],
            work_experience: Vec::new(),
            skills: Vec::new(),
            education: Vec::new(),
            certifications: Vec::new(),
        }
    }
}
