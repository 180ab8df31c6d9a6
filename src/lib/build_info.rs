//! Build provenance stamped into the generated page.
//!
//! Each build leaves two meta elements in `<head>` (`build-sha`, `build-time`)
//! and one `<!-- build: ... -->` comment. Stamping is idempotent: artifacts of
//! previous runs are found by name and updated where they are.

use crate::dom::{
    append_child, comment_of, create_comment, create_element, find_all, find_element, get_attr,
    is_blank_text, is_element, remove_subtree, replace_node, set_attr,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use markup5ever_rcdom::{Handle, RcDom};
use std::env;

pub const BUILD_SHA_META: &str = "build-sha";
pub const BUILD_TIME_META: &str = "build-time";
pub const COMMENT_MARKER: &str = "build:";
/// Revision used when the environment does not provide one.
pub const LOCAL_REVISION: &str = "local";
pub const DEFAULT_REVISION_ENV: &str = "GITHUB_SHA";

const SHORT_REVISION_LEN: usize = 7;

/// Revision and time of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStamp {
    /// First 7 characters of the revision id, or `local`
    pub revision: String,
    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`
    pub timestamp: String,
}

impl BuildStamp {
    pub fn new(revision: Option<&str>, time: DateTime<Utc>) -> Self {
        let revision = match revision.map(str::trim) {
            Some(rev) if !rev.is_empty() => rev.chars().take(SHORT_REVISION_LEN).collect(),
            _ => LOCAL_REVISION.to_string(),
        };
        BuildStamp {
            revision,
            timestamp: time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }

    /// Stamp for "now", reading the revision from `var`.
    pub fn from_env(var: &str) -> Self {
        let revision = env::var(var).ok();
        BuildStamp::new(revision.as_deref(), Utc::now())
    }

    pub fn comment_text(&self) -> String {
        format!(" {} {} {} ", COMMENT_MARKER, self.revision, self.timestamp)
    }

    /// Writes the stamp into `dom`. Returns false, leaving the tree untouched,
    /// when the document has no `<head>`.
    pub fn apply(&self, dom: &RcDom) -> bool {
        let root = &dom.document;
        let Some(head) = find_element(root, "head") else {
            warn!("No <head> element found; build info not injected");
            return false;
        };

        upsert_meta(root, &head, BUILD_SHA_META, &self.revision);
        upsert_meta(root, &head, BUILD_TIME_META, &self.timestamp);
        upsert_comment(root, &head, &self.comment_text());
        collapse_blank_text(&head);

        debug!("Build info: sha={} time={}", self.revision, self.timestamp);
        true
    }
}

/// Stamps `dom` using the revision found in `revision_env` and the current time.
pub fn inject_build_info(dom: &RcDom, revision_env: &str) -> BuildStamp {
    let stamp = BuildStamp::from_env(revision_env);
    stamp.apply(dom);
    stamp
}

fn upsert_meta(root: &Handle, head: &Handle, name: &str, content: &str) {
    let existing = find_all(root, &|node: &Handle| {
        is_element(node, "meta") && get_attr(node, "name").as_deref() == Some(name)
    });

    match existing.split_first() {
        Some((first, duplicates)) => {
            set_attr(first, "content", content);
            for duplicate in duplicates {
                remove_subtree(duplicate);
            }
        }
        None => append_child(
            head,
            create_element("meta", vec![("name", name), ("content", content)]),
        ),
    }
}

fn upsert_comment(root: &Handle, head: &Handle, text: &str) {
    let existing = find_all(root, &|node: &Handle| {
        comment_of(node).is_some_and(|c| c.trim_start().starts_with(COMMENT_MARKER))
    });

    match existing.split_first() {
        Some((first, duplicates)) => {
            replace_node(first, create_comment(text));
            for duplicate in duplicates {
                remove_subtree(duplicate);
            }
        }
        None => append_child(head, create_comment(text)),
    }
}

/// Drops whitespace-only text nodes that directly follow another one.
fn collapse_blank_text(parent: &Handle) {
    let children: Vec<Handle> = parent.children.borrow().clone();
    let mut previous_blank = false;
    for child in children {
        let blank = is_blank_text(&child);
        if blank && previous_blank {
            remove_subtree(&child);
        } else {
            previous_blank = blank;
        }
    }
}
