//! Projects a [`ResumeDocument`] onto the styled HTML template.
//!
//! The template is designed independently of the generator. The contract
//! between the two is the set of element ids below: they are all checked up
//! front, and a template missing any of them is rejected before a single node
//! is touched.

use crate::dom::{
    append_child, clear_children, create_element, create_text, find_all, find_by_id,
    following_siblings, get_attr, has_class, insert_after, is_element, remove_subtree, set_text,
};
use crate::resume::{JobEntry, ResumeDocument, SchoolEntry};
use crate::SiteError;
use log::{debug, info, warn};
use markup5ever_rcdom::{Handle, RcDom};
use std::rc::Rc;

pub const CONTACT_BUTTONS_ID: &str = "resume-buttons-contact-2";
pub const SUMMARY_TEXT_ID: &str = "resume-text-summary";
pub const WORK_SECTION_ID: &str = "resume-section-work";
pub const WORK_DIVIDER_ID: &str = "resume-divider-work";
pub const SKILLS_BUTTONS_ID: &str = "resume-buttons-skills";
pub const EDUCATION_SECTION_ID: &str = "resume-section-education";
pub const EDUCATION_DIVIDER_ID: &str = "resume-divider-education";
pub const CERTIFICATIONS_LIST_ID: &str = "resume-list-education-certifications";
/// Optional: education entries are regenerated up to this heading.
pub const CERTIFICATIONS_HEADING_ID: &str = "resume-text-education-certifications";

/// Element ids the generator cannot work without.
pub const REQUIRED_IDS: [&str; 8] = [
    CONTACT_BUTTONS_ID,
    SUMMARY_TEXT_ID,
    WORK_SECTION_ID,
    WORK_DIVIDER_ID,
    SKILLS_BUTTONS_ID,
    EDUCATION_SECTION_ID,
    EDUCATION_DIVIDER_ID,
    CERTIFICATIONS_LIST_ID,
];

/// Class on the element that carries a job's date range.
pub const JOB_DATES_CLASS: &str = "job-dates";

/// Required ids absent from the document, in [`REQUIRED_IDS`] order.
pub fn missing_anchor_ids(dom: &RcDom) -> Vec<&'static str> {
    REQUIRED_IDS
        .iter()
        .copied()
        .filter(|id| find_by_id(&dom.document, id).is_none())
        .collect()
}

/// Fails with every missing anchor listed when the template is incomplete.
pub fn validate_html_structure(dom: &RcDom) -> Result<(), SiteError> {
    let missing = missing_anchor_ids(dom);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SiteError::TemplateError {
            missing: missing.into_iter().map(String::from).collect(),
        })
    }
}

/// Rewrites every résumé section of `dom` from `doc`.
///
/// The anchors are validated first; on error the tree is left untouched.
pub fn apply_resume(dom: &RcDom, doc: &ResumeDocument) -> Result<(), SiteError> {
    validate_html_structure(dom)?;
    info!("HTML structure validated");

    let root = &dom.document;
    update_location(root, &doc.location);
    update_summary(root, &doc.summary);
    update_work_experience(root, &doc.work_experience);
    update_skills(root, &doc.skills);
    update_education(root, &doc.education);
    update_certifications(root, &doc.certifications);
    Ok(())
}

/// Replaces the label of the contact button that has no link target.
fn update_location(root: &Handle, location: &str) {
    if location.is_empty() {
        return;
    }
    let Some(contact) = find_by_id(root, CONTACT_BUTTONS_ID) else {
        return;
    };

    let buttons = find_all(&contact, &|node: &Handle| {
        is_element(node, "a") && has_class(node, "button")
    });
    for button in buttons.iter().filter(|b| get_attr(b, "href").is_none()) {
        let labels = find_all(button, &|node: &Handle| {
            is_element(node, "span") && has_class(node, "label")
        });
        if let Some(label) = labels.first() {
            set_text(label, location);
            debug!("Updated location");
        }
    }
}

fn update_summary(root: &Handle, paragraphs: &[String]) {
    let Some(summary) = find_by_id(root, SUMMARY_TEXT_ID) else {
        return;
    };
    clear_children(&summary);
    for paragraph in paragraphs {
        append_child(&summary, text_element("span", vec![("class", "p")], paragraph));
    }
    debug!("Updated summary ({} paragraphs)", paragraphs.len());
}

fn update_work_experience(root: &Handle, jobs: &[JobEntry]) {
    if find_by_id(root, WORK_SECTION_ID).is_none() {
        return;
    }
    let Some(divider) = find_by_id(root, WORK_DIVIDER_ID) else {
        return;
    };

    for sibling in following_siblings(&divider) {
        remove_subtree(&sibling);
    }

    let mut anchor = divider;
    for job in jobs {
        let heading = job_heading(job);
        insert_after(&anchor, heading.clone());
        let list = bullet_list(&job.bullets);
        insert_after(&heading, list.clone());
        anchor = list;
    }
    info!("Generated {} work entries", jobs.len());
}

/// `h2.style2 > span.p` holding the title and, when present, the dates.
fn job_heading(job: &JobEntry) -> Handle {
    let heading = create_element("h2", vec![("class", "style2")]);
    let outer = create_element("span", vec![("class", "p")]);
    append_child(&outer, create_text(&job.title));

    if !job.dates.is_empty() {
        append_child(&outer, create_element("br", vec![]));
        let dates = create_element("span", vec![("class", JOB_DATES_CLASS)]);
        let sup = create_element("sup", vec![]);
        append_child(&sup, text_element("sub", vec![], &format!("({})", job.dates)));
        append_child(&dates, sup);
        append_child(&outer, dates);
    }

    append_child(&heading, outer);
    heading
}

fn update_skills(root: &Handle, skills: &[String]) {
    if skills.is_empty() {
        return;
    }
    let Some(container) = find_by_id(root, SKILLS_BUTTONS_ID) else {
        return;
    };
    clear_children(&container);
    for (idx, skill) in skills.iter().enumerate() {
        let item = create_element("li", vec![]);
        let class = format!("button n{:02}", idx + 1);
        append_child(
            &item,
            text_element("a", vec![("class", &class), ("role", "button")], skill),
        );
        append_child(&container, item);
    }
    debug!("Updated skills ({} items)", skills.len());
}

fn update_education(root: &Handle, schools: &[SchoolEntry]) {
    if find_by_id(root, EDUCATION_SECTION_ID).is_none() {
        return;
    }
    let Some(divider) = find_by_id(root, EDUCATION_DIVIDER_ID) else {
        return;
    };

    let stop = find_by_id(root, CERTIFICATIONS_HEADING_ID);
    for sibling in following_siblings(&divider) {
        if stop.as_ref().is_some_and(|s| Rc::ptr_eq(s, &sibling)) {
            break;
        }
        remove_subtree(&sibling);
    }

    let mut anchor = divider;
    for school in schools {
        let name = text_element("p", vec![("class", "style2")], &school.name);
        insert_after(&anchor, name.clone());
        let list = bullet_list(&school.items);
        insert_after(&name, list.clone());
        anchor = list;
    }
    info!("Generated {} education entries", schools.len());
}

fn update_certifications(root: &Handle, certifications: &[String]) {
    if certifications.is_empty() {
        return;
    }
    // Without the certifications heading, education regeneration removes the list.
    let Some(container) = find_by_id(root, CERTIFICATIONS_LIST_ID) else {
        warn!(
            "{} not found after education update, skipping certifications",
            CERTIFICATIONS_LIST_ID
        );
        return;
    };
    clear_children(&container);
    append_child(&container, unordered_list(certifications));
    debug!("Updated certifications ({} items)", certifications.len());
}

fn text_element(tag: &str, attrs: Vec<(&str, &str)>, text: &str) -> Handle {
    let node = create_element(tag, attrs);
    append_child(&node, create_text(text));
    node
}

/// `ul > li > p` per item.
fn unordered_list(items: &[String]) -> Handle {
    let list = create_element("ul", vec![]);
    for item in items {
        let li = create_element("li", vec![]);
        append_child(&li, text_element("p", vec![], item));
        append_child(&list, li);
    }
    list
}

/// `div.style1.list` wrapping an unordered list.
fn bullet_list(items: &[String]) -> Handle {
    let container = create_element("div", vec![("class", "style1 list")]);
    append_child(&container, unordered_list(items));
    container
}
