//! In-memory host page: selector-addressed elements, an overlay layer for
//! injected UI, and mutation watchers.
//!
//! Every write is delivered to live watchers as one `MutationBatch`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::core::sanitize::escape_text;

// =============================================================================
// PAGE CONTENT
// =============================================================================

/// Text and attributes of one page element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementContent {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl ElementContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), attributes: BTreeMap::new() }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// One edit to page content
#[derive(Debug, Clone, PartialEq)]
pub enum DomEdit {
    Set { selector: String, content: ElementContent },
    Remove { selector: String },
    /// Churn with no content change (re-render, animation, lazy load)
    Touch { selector: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: String,
    pub kind: MutationKind,
}

/// Records delivered together, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Subtree observer on the document body. Dropping it disconnects.
#[derive(Debug)]
pub struct MutationWatcher {
    rx: mpsc::UnboundedReceiver<MutationBatch>,
}

impl MutationWatcher {
    /// Next batch; None once the document is gone
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        self.rx.recv().await
    }
}

// =============================================================================
// UI TREE
// =============================================================================

/// Escaped text. The only way to put text into a `UiNode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeText(String);

impl SafeText {
    pub fn new(untrusted: &str) -> Self {
        SafeText(escape_text(untrusted))
    }

    pub fn as_html(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub id: Option<String>,
    pub class: Option<String>,
    pub style: Option<String>,
    pub children: Vec<UiNode>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self { tag, id: None, class: None, style: None, children: Vec::new() }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn with_style(mut self, style: String) -> Self {
        self.style = Some(style);
        self
    }

    pub fn child(mut self, node: impl Into<UiNode>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append untrusted text, escaped
    pub fn text(mut self, untrusted: &str) -> Self {
        self.children.push(UiNode::Text(SafeText::new(untrusted)));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiNode {
    Element(Element),
    Text(SafeText),
}

impl From<Element> for UiNode {
    fn from(element: Element) -> Self {
        UiNode::Element(element)
    }
}

impl UiNode {
    pub fn id(&self) -> Option<&str> {
        match self {
            UiNode::Element(el) => el.id.as_deref(),
            UiNode::Text(_) => None,
        }
    }

    /// Depth-first search by id, including self
    pub fn find(&self, id: &str) -> Option<&UiNode> {
        if self.id() == Some(id) {
            return Some(self);
        }
        match self {
            UiNode::Element(el) => el.children.iter().find_map(|c| c.find(id)),
            UiNode::Text(_) => None,
        }
    }

    fn count_id(&self, id: &str) -> usize {
        let own = usize::from(self.id() == Some(id));
        match self {
            UiNode::Element(el) => own + el.children.iter().map(|c| c.count_id(id)).sum::<usize>(),
            UiNode::Text(_) => own,
        }
    }

    /// Concatenated (escaped) text of the subtree
    pub fn rendered_text(&self) -> String {
        match self {
            UiNode::Text(t) => t.as_html().to_string(),
            UiNode::Element(el) => el.children.iter().map(UiNode::rendered_text).collect(),
        }
    }

    /// Inline style of an element node
    pub fn style(&self) -> Option<&str> {
        match self {
            UiNode::Element(el) => el.style.as_deref(),
            UiNode::Text(_) => None,
        }
    }

    /// Serialize as HTML
    pub fn to_html(&self) -> String {
        match self {
            UiNode::Text(t) => t.as_html().to_string(),
            UiNode::Element(el) => {
                let mut out = format!("<{}", el.tag);
                for (name, value) in [("id", &el.id), ("class", &el.class), ("style", &el.style)] {
                    if let Some(value) = value {
                        out.push_str(&format!(" {}=\"{}\"", name, escape_text(value)));
                    }
                }
                out.push('>');
                for child in &el.children {
                    out.push_str(&child.to_html());
                }
                out.push_str(&format!("</{}>", el.tag));
                out
            }
        }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

#[derive(Debug, Default)]
struct DocumentInner {
    elements: HashMap<String, ElementContent>,
    overlays: Vec<UiNode>,
    watchers: Vec<mpsc::UnboundedSender<MutationBatch>>,
}

impl DocumentInner {
    fn notify(&mut self, batch: MutationBatch) {
        if batch.is_empty() {
            return;
        }
        self.watchers.retain(|tx| tx.send(batch.clone()).is_ok());
    }
}

/// Shared handle to one page's document
#[derive(Debug, Clone, Default)]
pub struct PageDocument {
    inner: Arc<Mutex<DocumentInner>>,
}

impl PageDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DocumentInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a body subtree watcher
    pub fn observe(&self) -> MutationWatcher {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().watchers.push(tx);
        MutationWatcher { rx }
    }

    /// Live watchers (closed ones are pruned on the next delivery)
    pub fn watcher_count(&self) -> usize {
        let mut inner = self.lock();
        inner.watchers.retain(|tx| !tx.is_closed());
        inner.watchers.len()
    }

    /// Apply edits as a single mutation batch
    pub fn apply(&self, edits: Vec<DomEdit>) {
        let mut inner = self.lock();
        let mut batch = MutationBatch::default();
        for edit in edits {
            match edit {
                DomEdit::Set { selector, content } => {
                    let kind = match inner.elements.get(&selector) {
                        None => MutationKind::ChildList,
                        Some(prev) if prev.attributes != content.attributes => MutationKind::Attributes,
                        Some(_) => MutationKind::CharacterData,
                    };
                    inner.elements.insert(selector.clone(), content);
                    batch.records.push(MutationRecord { target: selector, kind });
                }
                DomEdit::Remove { selector } => {
                    if inner.elements.remove(&selector).is_some() {
                        batch.records.push(MutationRecord { target: selector, kind: MutationKind::ChildList });
                    }
                }
                DomEdit::Touch { selector } => {
                    batch.records.push(MutationRecord { target: selector, kind: MutationKind::Attributes });
                }
            }
        }
        inner.notify(batch);
    }

    pub fn set(&self, selector: &str, content: ElementContent) {
        self.apply(vec![DomEdit::Set { selector: selector.to_string(), content }]);
    }

    pub fn touch(&self, selector: &str) {
        self.apply(vec![DomEdit::Touch { selector: selector.to_string() }]);
    }

    /// Text of the element at `selector`
    pub fn query_text(&self, selector: &str) -> Option<String> {
        self.lock().elements.get(selector).map(|e| e.text.clone())
    }

    /// Attribute of the element at `selector`
    pub fn query_attr(&self, selector: &str, attr: &str) -> Option<String> {
        self.lock()
            .elements
            .get(selector)
            .and_then(|e| e.attributes.get(attr).cloned())
    }

    /// Append a node to the body
    pub fn insert_overlay(&self, node: UiNode) {
        let mut inner = self.lock();
        let target = node.id().unwrap_or("body").to_string();
        inner.overlays.push(node);
        inner.notify(MutationBatch {
            records: vec![MutationRecord { target, kind: MutationKind::ChildList }],
        });
    }

    /// Remove every body-level node with this id. Returns how many were removed.
    pub fn remove_by_id(&self, id: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.overlays.len();
        inner.overlays.retain(|n| n.id() != Some(id));
        let removed = before - inner.overlays.len();
        if removed > 0 {
            inner.notify(MutationBatch {
                records: vec![MutationRecord { target: id.to_string(), kind: MutationKind::ChildList }],
            });
        }
        removed
    }

    /// Swap a body-level node in place. False if no node has this id.
    pub fn replace_by_id(&self, id: &str, node: UiNode) -> bool {
        let mut inner = self.lock();
        let Some(slot) = inner.overlays.iter_mut().find(|n| n.id() == Some(id)) else {
            return false;
        };
        *slot = node;
        inner.notify(MutationBatch {
            records: vec![MutationRecord { target: id.to_string(), kind: MutationKind::ChildList }],
        });
        true
    }

    /// Find a node anywhere in the overlay layer
    pub fn get_by_id(&self, id: &str) -> Option<UiNode> {
        self.lock().overlays.iter().find_map(|n| n.find(id)).cloned()
    }

    /// Number of nodes carrying this id anywhere in the overlay layer
    pub fn count_by_id(&self, id: &str) -> usize {
        self.lock().overlays.iter().map(|n| n.count_id(id)).sum()
    }
}
