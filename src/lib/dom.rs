//! Owned, mutable HTML tree and the edit primitives the template mutator uses.
//!
//! The template is parsed with html5ever into an `RcDom`; all edits go through
//! the small set of functions below (find by id, remove subtree, insert after,
//! replace children) so that parent links stay consistent.

use crate::SiteError;
use html5ever::tendril::TendrilSink;
use html5ever::{
    ns, parse_document, serialize, serialize::SerializeOpts, Attribute, LocalName, QualName,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Parses a full HTML document.
pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// Serializes the whole document, doctype included.
pub fn serialize_document(dom: &RcDom) -> Result<String, SiteError> {
    let mut output = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut output, &document, SerializeOpts::default()).map_err(|e| {
        SiteError::render_error(format!("HTML serialization failed: {}", e))
    })?;
    String::from_utf8(output)
        .map_err(|e| SiteError::render_error(format!("UTF-8 conversion failed: {}", e)))
}

/// Creates a detached element in the HTML namespace.
pub fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

pub fn create_comment(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Comment {
            contents: text.to_string().into(),
        },
    })
}

/// Local tag name, `None` for non-element nodes.
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn is_element(node: &Handle, tag: &str) -> bool {
    matches!(&node.data, NodeData::Element { name, .. } if &*name.local == tag)
}

pub fn get_attr(node: &Handle, attr: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Sets or overwrites an attribute on an element. No-op for other nodes.
pub fn set_attr(node: &Handle, attr: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == attr) {
            Some(existing) => existing.value = value.to_string().into(),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr)),
                value: value.to_string().into(),
            }),
        }
    }
}

/// Whether the element's `class` attribute lists `class`.
pub fn has_class(node: &Handle, class: &str) -> bool {
    get_attr(node, "class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Text node contents, `None` for other nodes.
pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub fn comment_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Comment { contents } => Some(contents.to_string()),
        _ => None,
    }
}

/// Concatenated text of the node and all its descendants.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// Depth-first, document-order search below (and including) `root`.
pub fn find_first<F>(root: &Handle, predicate: &F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    if predicate(root) {
        return Some(root.clone());
    }
    for child in root.children.borrow().iter() {
        if let Some(found) = find_first(child, predicate) {
            return Some(found);
        }
    }
    None
}

/// Every matching node below (and including) `root`, in document order.
pub fn find_all<F>(root: &Handle, predicate: &F) -> Vec<Handle>
where
    F: Fn(&Handle) -> bool,
{
    let mut found = Vec::new();
    collect_matching(root, predicate, &mut found);
    found
}

fn collect_matching<F>(node: &Handle, predicate: &F, found: &mut Vec<Handle>)
where
    F: Fn(&Handle) -> bool,
{
    if predicate(node) {
        found.push(node.clone());
    }
    for child in node.children.borrow().iter() {
        collect_matching(child, predicate, found);
    }
}

pub fn find_by_id(root: &Handle, id: &str) -> Option<Handle> {
    find_first(root, &|node: &Handle| get_attr(node, "id").as_deref() == Some(id))
}

/// First element with the given tag name.
pub fn find_element(root: &Handle, tag: &str) -> Option<Handle> {
    find_first(root, &|node: &Handle| is_element(node, tag))
}

fn index_in_parent(parent: &Handle, node: &Handle) -> Option<usize> {
    parent
        .children
        .borrow()
        .iter()
        .position(|child| Rc::ptr_eq(child, node))
}

/// Appends a detached node as the last child of `parent`.
pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Inserts a detached node directly after `anchor`. Returns false when the
/// anchor has no parent.
pub fn insert_after(anchor: &Handle, node: Handle) -> bool {
    let Some(parent) = parent_of(anchor) else {
        return false;
    };
    let Some(idx) = index_in_parent(&parent, anchor) else {
        return false;
    };
    node.parent.set(Some(Rc::downgrade(&parent)));
    parent.children.borrow_mut().insert(idx + 1, node);
    true
}

/// Detaches `node` (and its whole subtree) from its parent.
pub fn remove_subtree(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        if let Some(idx) = index_in_parent(&parent, node) {
            parent.children.borrow_mut().remove(idx);
        }
    }
    node.parent.set(None);
}

/// Swaps `old` for the detached `new` at the same position.
pub fn replace_node(old: &Handle, new: Handle) -> bool {
    let Some(parent) = parent_of(old) else {
        return false;
    };
    let Some(idx) = index_in_parent(&parent, old) else {
        return false;
    };
    new.parent.set(Some(Rc::downgrade(&parent)));
    let removed = std::mem::replace(&mut parent.children.borrow_mut()[idx], new);
    removed.parent.set(None);
    true
}

/// Removes every child of `node`.
pub fn clear_children(node: &Handle) {
    for child in node.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
}

/// Replaces the children of `node` with `children`, in order.
pub fn replace_children(node: &Handle, children: Vec<Handle>) {
    clear_children(node);
    for child in children {
        append_child(node, child);
    }
}

/// Replaces the children of `node` with a single text node.
pub fn set_text(node: &Handle, text: &str) {
    replace_children(node, vec![create_text(text)]);
}

/// Siblings after `node`, in order. Empty for a detached node.
pub fn following_siblings(node: &Handle) -> Vec<Handle> {
    let Some(parent) = parent_of(node) else {
        return Vec::new();
    };
    let Some(idx) = index_in_parent(&parent, node) else {
        return Vec::new();
    };
    let siblings = parent.children.borrow()[idx + 1..].to_vec();
    siblings
}

/// Whitespace-only text node.
pub fn is_blank_text(node: &Handle) -> bool {
    text_of(node).is_some_and(|t| t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>T</title></head>
<body><div id="list"><p id="a">A</p><p id="b">B</p><p id="c">C</p></div></body></html>"#;

    fn ids(nodes: &[Handle]) -> Vec<String> {
        nodes.iter().filter_map(|n| get_attr(n, "id")).collect()
    }

    #[test]
    fn test_find_by_id_and_text() {
        let dom = parse_html(PAGE);
        let b = find_by_id(&dom.document, "b").unwrap();
        assert_eq!(tag_name(&b).as_deref(), Some("p"));
        assert_eq!(text_content(&b), "B");
        assert!(find_by_id(&dom.document, "missing").is_none());
    }

    #[test]
    fn test_following_siblings_and_remove() {
        let dom = parse_html(PAGE);
        let a = find_by_id(&dom.document, "a").unwrap();
        let rest = following_siblings(&a);
        assert_eq!(ids(&rest), vec!["b", "c"]);

        for node in rest {
            remove_subtree(&node);
        }
        let list = find_by_id(&dom.document, "list").unwrap();
        assert_eq!(list.children.borrow().len(), 1);
        assert!(find_by_id(&dom.document, "c").is_none());
    }

    #[test]
    fn test_insert_after_keeps_order() {
        let dom = parse_html(PAGE);
        let a = find_by_id(&dom.document, "a").unwrap();
        let x = create_element("p", vec![("id", "x")]);
        assert!(insert_after(&a, x.clone()));
        let y = create_element("p", vec![("id", "y")]);
        assert!(insert_after(&x, y));

        let list = find_by_id(&dom.document, "list").unwrap();
        let children: Vec<Handle> = list.children.borrow().clone();
        assert_eq!(ids(&children), vec!["a", "x", "y", "b", "c"]);
        assert!(Rc::ptr_eq(&parent_of(&x).unwrap(), &list));
    }

    #[test]
    fn test_insert_after_detached_anchor_fails() {
        let lonely = create_element("p", vec![]);
        assert!(!insert_after(&lonely, create_text("x")));
    }

    #[test]
    fn test_replace_children_and_set_text() {
        let dom = parse_html(PAGE);
        let list = find_by_id(&dom.document, "list").unwrap();
        replace_children(&list, vec![create_element("span", vec![("class", "p")])]);
        assert_eq!(list.children.borrow().len(), 1);

        let span = find_element(&list, "span").unwrap();
        set_text(&span, "hello & <bye>");
        let html = serialize_document(&dom).unwrap();
        assert!(html.contains(r#"<span class="p">hello &amp; &lt;bye&gt;</span>"#));
    }

    #[test]
    fn test_replace_node() {
        let dom = parse_html(PAGE);
        let b = find_by_id(&dom.document, "b").unwrap();
        assert!(replace_node(&b, create_comment(" gone ")));
        let html = serialize_document(&dom).unwrap();
        assert!(html.contains(r#"<p id="a">A</p><!-- gone --><p id="c">C</p>"#));
        assert!(parent_of(&b).is_none());
    }

    #[test]
    fn test_attrs_and_classes() {
        let node = create_element("a", vec![("class", "button n01")]);
        assert!(has_class(&node, "button"));
        assert!(!has_class(&node, "butt"));
        set_attr(&node, "role", "button");
        set_attr(&node, "class", "label");
        assert_eq!(get_attr(&node, "role").as_deref(), Some("button"));
        assert!(has_class(&node, "label"));
    }

    #[test]
    fn test_serialize_keeps_doctype() {
        let dom = parse_html(PAGE);
        let html = serialize_document(&dom).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>T</title>"));
    }
}
