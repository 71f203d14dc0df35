use crate::error::FillError;
use crate::fill::FillTarget;
use crate::types::{AttributeBag, ElementHandle};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::Instant;

static DISPLAY_NONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|;)\s*display\s*:\s*none\b").unwrap());

static VISIBILITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*visibility\s*:\s*(visible|hidden|collapse)\b").unwrap()
});

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<ElementHandle>,
    pub children: Vec<ElementHandle>,
}

/// Notifications dispatched on a field so page scripts see the new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldEvent {
    Focus,
    Input,
    Change,
    Blur,
}

/// Fillable element shapes: text/email/tel/url inputs, untyped inputs, textareas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Url,
    Untyped,
    TextArea,
}

impl FieldKind {
    /// Free-text fields a canned answer can go into.
    pub fn accepts_free_text(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Untyped | FieldKind::TextArea)
    }
}

/// Arena-backed page snapshot plus the mutable field state a fill pass
/// touches (values, focus, dispatched events, highlights).
#[derive(Debug, Clone)]
pub struct PageDocument {
    nodes: Vec<Node>,
    values: HashMap<ElementHandle, String>,
    highlights: HashMap<ElementHandle, Instant>,
    events: Vec<(ElementHandle, FieldEvent)>,
    focused: Option<ElementHandle>,
}

impl Default for PageDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    tag: "#document".to_string(),
                    attributes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            values: HashMap::new(),
            highlights: HashMap::new(),
            events: Vec::new(),
            focused: None,
        }
    }

    pub fn root(&self) -> ElementHandle {
        ElementHandle(0)
    }

    // ===== CONSTRUCTION =====

    pub fn append_element(
        &mut self,
        parent: ElementHandle,
        tag: &str,
        attributes: Vec<(String, String)>,
    ) -> ElementHandle {
        let handle = ElementHandle(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: attributes
                    .into_iter()
                    .map(|(k, v)| (k.to_ascii_lowercase(), v))
                    .collect(),
            },
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(handle);
        }
        handle
    }

    pub fn append_text(&mut self, parent: ElementHandle, text: &str) {
        let handle = ElementHandle(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::Text(text.to_string()),
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(handle);
        }
    }

    /// Remove a subtree from the page, as a script or navigation would.
    /// Handles into it stay valid as indices but reject every write.
    pub fn detach(&mut self, handle: ElementHandle) {
        let Some(parent) = self.nodes.get(handle.0).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.retain(|c| *c != handle);
        }
        self.nodes[handle.0].parent = None;
        if self.focused == Some(handle) {
            self.focused = None;
        }
    }

    // ===== TREE QUERIES =====

    pub fn node(&self, handle: ElementHandle) -> Option<&Node> {
        self.nodes.get(handle.0)
    }

    pub fn tag(&self, handle: ElementHandle) -> Option<&str> {
        match &self.node(handle)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, handle: ElementHandle, name: &str) -> Option<&str> {
        match &self.node(handle)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_attr(&self, handle: ElementHandle, name: &str) -> bool {
        self.attr(handle, name).is_some()
    }

    pub fn parent(&self, handle: ElementHandle) -> Option<ElementHandle> {
        self.node(handle)?.parent
    }

    /// Ancestors from the parent upward, ending with the document root.
    pub fn ancestors(&self, handle: ElementHandle) -> Vec<ElementHandle> {
        let mut chain = Vec::new();
        let mut current = self.parent(handle);
        while let Some(id) = current {
            chain.push(id);
            current = self.parent(id);
        }
        chain
    }

    pub fn is_attached(&self, handle: ElementHandle) -> bool {
        if handle == self.root() {
            return true;
        }
        if self.node(handle).is_none() {
            return false;
        }
        self.ancestors(handle).last() == Some(&self.root())
    }

    /// All attached elements in document order.
    pub fn elements(&self) -> Vec<ElementHandle> {
        let mut ordered = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if id != self.root() && self.tag(id).is_some() {
                ordered.push(id);
            }
            if let Some(node) = self.node(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        ordered
    }

    /// Concatenated descendant text, walked with an explicit stack so
    /// nesting depth is bounded by the heap.
    pub fn text_content(&self, handle: ElementHandle) -> String {
        let mut text = String::new();
        let mut stack = vec![handle];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Text(t) => text.push_str(t),
                NodeKind::Element { .. } => stack.extend(node.children.iter().rev().copied()),
            }
        }
        text
    }

    pub fn previous_element_sibling(&self, handle: ElementHandle) -> Option<ElementHandle> {
        let parent = self.parent(handle)?;
        let siblings = &self.node(parent)?.children;
        let position = siblings.iter().position(|c| *c == handle)?;
        siblings[..position]
            .iter()
            .rev()
            .find(|c| self.tag(**c).is_some())
            .copied()
    }

    fn is_body_or_root(&self, handle: ElementHandle) -> bool {
        handle == self.root() || matches!(self.tag(handle), Some("body") | Some("html"))
    }

    /// Ancestors strictly below `<body>` (or the root when there is no body).
    pub fn ancestors_within_body(&self, handle: ElementHandle) -> Vec<ElementHandle> {
        self.ancestors(handle)
            .into_iter()
            .take_while(|id| !self.is_body_or_root(*id))
            .collect()
    }

    // ===== LABELS =====

    /// Label for a field: an explicit `<label for=id>`, else the nearest
    /// enclosing `<label>`, else a preceding sibling `<label>` or `<span>`.
    pub fn find_label(&self, handle: ElementHandle) -> Option<ElementHandle> {
        if let Some(id) = self.attr(handle, "id").filter(|id| !id.is_empty()) {
            let explicit = self
                .elements()
                .into_iter()
                .find(|e| self.tag(*e) == Some("label") && self.attr(*e, "for") == Some(id));
            if explicit.is_some() {
                return explicit;
            }
        }

        if let Some(enclosing) = self
            .ancestors_within_body(handle)
            .into_iter()
            .find(|a| self.tag(*a) == Some("label"))
        {
            return Some(enclosing);
        }

        self.previous_element_sibling(handle)
            .filter(|s| matches!(self.tag(*s), Some("label") | Some("span")))
    }

    pub fn label_text(&self, handle: ElementHandle) -> Option<String> {
        let label = self.find_label(handle)?;
        let text = self.text_content(label).trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    // ===== FORM FIELDS =====

    pub fn field_kind(&self, handle: ElementHandle) -> Option<FieldKind> {
        match self.tag(handle)? {
            "textarea" => Some(FieldKind::TextArea),
            "input" => match self.attr(handle, "type") {
                None => Some(FieldKind::Untyped),
                Some(t) => match t.trim().to_ascii_lowercase().as_str() {
                    "text" => Some(FieldKind::Text),
                    "email" => Some(FieldKind::Email),
                    "tel" => Some(FieldKind::Tel),
                    "url" => Some(FieldKind::Url),
                    _ => None,
                },
            },
            _ => None,
        }
    }

    /// Attached fillable fields in document order.
    pub fn form_fields(&self) -> Vec<(ElementHandle, FieldKind)> {
        self.elements()
            .into_iter()
            .filter_map(|e| self.field_kind(e).map(|kind| (e, kind)))
            .collect()
    }

    pub fn attribute_bag(&self, handle: ElementHandle) -> AttributeBag {
        let get = |name: &str| self.attr(handle, name).map(str::to_string);
        AttributeBag {
            name: get("name"),
            id: get("id"),
            placeholder: get("placeholder"),
            aria_label: get("aria-label"),
            input_type: get("type"),
        }
    }

    fn declares_display_none(&self, handle: ElementHandle) -> bool {
        self.has_attr(handle, "hidden")
            || self
                .attr(handle, "style")
                .is_some_and(|s| DISPLAY_NONE_REGEX.is_match(s))
    }

    fn declared_visibility(&self, handle: ElementHandle) -> Option<bool> {
        let style = self.attr(handle, "style")?;
        let caps = VISIBILITY_REGEX.captures_iter(style).last()?;
        Some(caps[1].eq_ignore_ascii_case("visible"))
    }

    fn has_zero_dimension(&self, handle: ElementHandle) -> bool {
        ["data-width", "data-height"].iter().any(|name| {
            self.attr(handle, name)
                .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
                .is_some_and(|size| size <= 0.0)
        })
    }

    /// Rendered, not display:none anywhere up the tree, not visibility:hidden
    /// by its nearest declaration, and not recorded with a zero-size box.
    pub fn is_visible(&self, handle: ElementHandle) -> bool {
        if !self.is_attached(handle) {
            return false;
        }

        let mut chain = vec![handle];
        chain.extend(self.ancestors(handle));

        if chain.iter().any(|id| self.declares_display_none(*id)) {
            return false;
        }
        if let Some(visible) = chain.iter().find_map(|id| self.declared_visibility(*id)) {
            if !visible {
                return false;
            }
        }
        !self.has_zero_dimension(handle)
    }

    pub fn is_editable(&self, handle: ElementHandle) -> bool {
        !self.has_attr(handle, "disabled") && !self.has_attr(handle, "readonly")
    }

    /// Current value: what a fill wrote, else the value the snapshot carried.
    pub fn value(&self, handle: ElementHandle) -> String {
        if let Some(value) = self.values.get(&handle) {
            return value.clone();
        }
        match self.tag(handle) {
            Some("textarea") => self.text_content(handle),
            Some("input") => self.attr(handle, "value").unwrap_or_default().to_string(),
            _ => String::new(),
        }
    }

    // ===== FOCUS, EVENTS, HIGHLIGHTS =====

    pub fn focused(&self) -> Option<ElementHandle> {
        self.focused
    }

    pub fn set_focused(&mut self, handle: Option<ElementHandle>) {
        self.focused = handle;
    }

    pub fn events_for(&self, handle: ElementHandle) -> Vec<FieldEvent> {
        self.events
            .iter()
            .filter(|(h, _)| *h == handle)
            .map(|(_, e)| *e)
            .collect()
    }

    pub fn is_highlighted(&self, handle: ElementHandle) -> bool {
        self.highlights
            .get(&handle)
            .is_some_and(|until| *until > Instant::now())
    }

    fn writable(&self, handle: ElementHandle) -> Result<(), FillError> {
        if self.node(handle).is_none() {
            return Err(FillError::UnknownElement(handle));
        }
        if !self.is_attached(handle) {
            return Err(FillError::Detached(handle));
        }
        if self.field_kind(handle).is_none() || !self.is_editable(handle) {
            return Err(FillError::NotEditable(handle));
        }
        Ok(())
    }
}

impl FillTarget for PageDocument {
    fn focus(&mut self, handle: ElementHandle) -> Result<(), FillError> {
        self.writable(handle)?;
        self.focused = Some(handle);
        self.events.push((handle, FieldEvent::Focus));
        Ok(())
    }

    fn set_value(&mut self, handle: ElementHandle, value: &str) -> Result<(), FillError> {
        self.writable(handle)?;
        self.values.insert(handle, value.to_string());
        Ok(())
    }

    fn dispatch(&mut self, handle: ElementHandle, event: FieldEvent) -> Result<(), FillError> {
        self.writable(handle)?;
        self.events.push((handle, event));
        Ok(())
    }

    fn highlight(&mut self, handle: ElementHandle, duration: Duration) -> Result<(), FillError> {
        self.writable(handle)?;
        self.highlights.insert(handle, Instant::now() + duration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let mut doc = PageDocument::new();
        let div = doc.append_element(doc.root(), "div", vec![]);
        doc.append_text(div, "Tell me ");
        let b = doc.append_element(div, "b", vec![]);
        doc.append_text(b, "about yourself");
        assert_eq!(doc.text_content(div), "Tell me about yourself");
    }

    #[test]
    fn test_text_content_of_deeply_nested_page() {
        let mut doc = PageDocument::new();
        let outer = doc.append_element(doc.root(), "div", vec![]);
        let mut current = outer;
        for _ in 0..100_000 {
            current = doc.append_element(current, "div", vec![]);
        }
        doc.append_text(current, "Why do you want to work here?");
        doc.append_element(current, "textarea", vec![]);

        assert_eq!(doc.text_content(outer), "Why do you want to work here?");
        assert_eq!(doc.text_content(doc.root()), "Why do you want to work here?");
    }

    #[test]
    fn test_label_resolution_order() {
        let mut doc = PageDocument::new();
        let body = doc.append_element(doc.root(), "body", vec![]);
        let explicit = doc.append_element(body, "label", attrs(&[("for", "mail")]));
        doc.append_text(explicit, "Email");
        let wrapper = doc.append_element(body, "label", vec![]);
        doc.append_text(wrapper, "Wrapped");
        let input = doc.append_element(wrapper, "input", attrs(&[("id", "mail")]));
        assert_eq!(doc.find_label(input), Some(explicit));

        let span = doc.append_element(body, "span", vec![]);
        doc.append_text(span, "Phone");
        let phone = doc.append_element(body, "input", vec![]);
        assert_eq!(doc.label_text(phone).as_deref(), Some("Phone"));
    }

    #[test]
    fn test_display_none_is_inherited() {
        let mut doc = PageDocument::new();
        let section = doc.append_element(doc.root(), "div", attrs(&[("style", "color: red; display: none")]));
        let input = doc.append_element(section, "input", vec![]);
        assert!(!doc.is_visible(input));
    }

    #[test]
    fn test_nearest_visibility_declaration_wins() {
        let mut doc = PageDocument::new();
        let outer = doc.append_element(doc.root(), "div", attrs(&[("style", "visibility:hidden")]));
        let inner = doc.append_element(outer, "div", attrs(&[("style", "visibility: visible")]));
        let shown = doc.append_element(inner, "input", vec![]);
        let hidden = doc.append_element(outer, "input", vec![]);
        assert!(doc.is_visible(shown));
        assert!(!doc.is_visible(hidden));
    }

    #[test]
    fn test_zero_size_is_hidden() {
        let mut doc = PageDocument::new();
        let input = doc.append_element(doc.root(), "input", attrs(&[("data-width", "0"), ("data-height", "20")]));
        assert!(!doc.is_visible(input));
    }

    #[test]
    fn test_detached_field_rejects_writes() {
        let mut doc = PageDocument::new();
        let form = doc.append_element(doc.root(), "form", vec![]);
        let input = doc.append_element(form, "input", vec![]);
        doc.detach(form);
        assert!(!doc.is_attached(input));
        assert_eq!(doc.set_value(input, "x"), Err(FillError::Detached(input)));
        assert!(doc.form_fields().is_empty());
    }

    #[test]
    fn test_initial_values() {
        let mut doc = PageDocument::new();
        let input = doc.append_element(doc.root(), "input", attrs(&[("value", "prefilled")]));
        let area = doc.append_element(doc.root(), "textarea", vec![]);
        doc.append_text(area, "draft");
        assert_eq!(doc.value(input), "prefilled");
        assert_eq!(doc.value(area), "draft");
    }

    #[test]
    fn test_field_kinds() {
        let mut doc = PageDocument::new();
        let text = doc.append_element(doc.root(), "input", attrs(&[("type", "TEXT")]));
        let hidden = doc.append_element(doc.root(), "input", attrs(&[("type", "hidden")]));
        let untyped = doc.append_element(doc.root(), "input", vec![]);
        assert_eq!(doc.field_kind(text), Some(FieldKind::Text));
        assert_eq!(doc.field_kind(hidden), None);
        assert_eq!(doc.field_kind(untyped), Some(FieldKind::Untyped));
    }
}
