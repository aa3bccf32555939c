//! In-memory component tree standing in for a real toolkit.

use std::collections::BTreeMap;
use std::fmt;

use crate::locator::{Locator, TextPredicate};
use crate::render::{RendererLookup, RendererSource};
use crate::result::{RenderError, TransportError};
use crate::transport::{ComponentHandle, ComponentId};

/// Attribute naming the component a label describes
pub const LABEL_FOR_ATTRIBUTE: &str = "labelFor";

/// Node of the mock tree, built with chained setters
pub struct MockComponent {
    id: ComponentId,
    kind: String,
    text: Option<String>,
    attributes: BTreeMap<String, String>,
    children: Vec<MockComponent>,
    renderer: Option<Box<dyn RendererSource>>,
}

impl fmt::Debug for MockComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockComponent")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("text", &self.text)
            .field("attributes", &self.attributes)
            .field("children", &self.children)
            .field("renderer", &self.renderer.as_ref().map(|r| r.describe()))
            .finish()
    }
}

impl MockComponent {
    /// Component of widget kind `kind`
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: ComponentId(0),
            kind: kind.into(),
            text: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            renderer: None,
        }
    }

    /// Set the visible text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the `name` attribute
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        self.attribute("name", name)
    }

    /// Attach this label to the component whose `name` is `target`
    #[must_use]
    pub fn label_for(self, target: impl Into<String>) -> Self {
        self.attribute(LABEL_FOR_ATTRIBUTE, target)
    }

    /// Set an attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: MockComponent) -> Self {
        self.children.push(child);
        self
    }

    /// Make this component a renderer source
    #[must_use]
    pub fn renderer(mut self, source: impl RendererSource + 'static) -> Self {
        self.renderer = Some(Box::new(source));
        self
    }

    /// Identity, assigned when the component joins a `MockUi`
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Widget kind
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Visible text
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Attribute value
    #[must_use]
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Children in order
    #[must_use]
    pub fn children(&self) -> &[MockComponent] {
        &self.children
    }

    fn handle(&self) -> ComponentHandle {
        ComponentHandle::new(self.id, self.kind.clone())
    }

    fn assign_ids(&mut self, next: &mut u64) {
        *next += 1;
        self.id = ComponentId(*next);
        for child in &mut self.children {
            child.assign_ids(next);
        }
    }

    fn find(&self, id: ComponentId) -> Option<&Self> {
        self.find_where(&|c: &Self| c.id == id)
    }

    fn find_where<P: Fn(&Self) -> bool>(&self, predicate: &P) -> Option<&Self> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_where(predicate))
    }

    fn find_mut(&mut self, id: ComponentId) -> Option<&mut Self> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    fn remove_where<P: Fn(&Self) -> bool>(&mut self, predicate: &P) -> usize {
        let before = self.children.len();
        self.children.retain(|c| !predicate(c));
        let removed = before - self.children.len();
        removed
            + self
                .children
                .iter_mut()
                .map(|c| c.remove_where(predicate))
                .sum::<usize>()
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }
}

/// Mock UI state: a forest of components owned by the UI thread
#[derive(Debug, Default)]
pub struct MockUi {
    roots: Vec<MockComponent>,
    next_id: u64,
}

impl MockUi {
    /// Empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level component
    #[must_use]
    pub fn with_root(mut self, root: MockComponent) -> Self {
        self.add_root(root);
        self
    }

    /// Add a top-level component and return its id
    pub fn add_root(&mut self, mut root: MockComponent) -> ComponentId {
        root.assign_ids(&mut self.next_id);
        let id = root.id;
        self.roots.push(root);
        id
    }

    /// Append `child` under `parent`; `None` if the parent does not exist
    pub fn add_child(&mut self, parent: ComponentId, mut child: MockComponent) -> Option<ComponentId> {
        let mut next = self.next_id;
        let parent = self.roots.iter_mut().find_map(|r| r.find_mut(parent))?;
        child.assign_ids(&mut next);
        let id = child.id;
        parent.children.push(child);
        self.next_id = next;
        Some(id)
    }

    /// Remove every subtree whose root satisfies `predicate`
    pub fn remove_where<P: Fn(&MockComponent) -> bool>(&mut self, predicate: P) -> usize {
        let before = self.roots.len();
        self.roots.retain(|r| !predicate(r));
        let removed = before - self.roots.len();
        removed
            + self
                .roots
                .iter_mut()
                .map(|r| r.remove_where(&predicate))
                .sum::<usize>()
    }

    /// Swap the renderer source of `id`. Returns `false` if `id` is unknown.
    pub fn replace_renderer(&mut self, id: ComponentId, source: impl RendererSource + 'static) -> bool {
        match self.roots.iter_mut().find_map(|r| r.find_mut(id)) {
            Some(component) => {
                component.renderer = Some(Box::new(source));
                true
            }
            None => false,
        }
    }

    /// Component by id
    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<&MockComponent> {
        self.roots.iter().find_map(|r| r.find(id))
    }

    /// Number of components in the tree
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.iter().map(MockComponent::count).sum()
    }

    /// Whether the tree is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Evaluate `locator` in pre-order, optionally below `scope` only.
    ///
    /// The locator is compiled once per query: text patterns are built and
    /// label anchors resolved before the tree is walked.
    pub fn query(
        &self,
        scope: Option<ComponentId>,
        locator: &Locator,
    ) -> Result<Vec<ComponentHandle>, TransportError> {
        let search_roots: &[MockComponent] = match scope {
            Some(id) => &self
                .component(id)
                .ok_or(TransportError::StaleComponent { id })?
                .children,
            None => &self.roots,
        };
        let matcher = self.compile(locator)?;
        let mut found = Vec::new();
        let mut ancestors = Vec::new();
        for root in search_roots {
            collect(root, &mut ancestors, &matcher, &mut found);
        }
        Ok(found)
    }

    fn compile<'q>(&self, locator: &'q Locator) -> Result<Matcher<'q>, TransportError> {
        Ok(match locator {
            Locator::Any => Matcher::Any,
            Locator::Type { kind } => Matcher::Type(kind),
            Locator::Text { text, matching } => Matcher::Text(
                matching
                    .compile(text)
                    .map_err(|e| TransportError::rejected(format!("bad text pattern: {e}")))?,
            ),
            Locator::Attribute { name, value } => Matcher::Attribute { name, value },
            Locator::XPath { expression } => {
                return Err(TransportError::rejected(format!(
                    "xpath is not supported by the mock remote: {expression}"
                )))
            }
            Locator::LabeledBy { label } => Matcher::Id(self.label_target(*label)?),
            Locator::All { of } => Matcher::All(
                of.iter()
                    .map(|part| self.compile(part))
                    .collect::<Result<_, _>>()?,
            ),
            Locator::Path { steps } => Matcher::Path(
                steps
                    .iter()
                    .map(|step| self.compile(step))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Component a label describes: the one named by its `labelFor`
    /// attribute, else its next sibling.
    fn label_target(&self, label: ComponentId) -> Result<Option<ComponentId>, TransportError> {
        let component = self
            .component(label)
            .ok_or(TransportError::StaleComponent { id: label })?;
        Ok(match component.attribute_value(LABEL_FOR_ATTRIBUTE) {
            Some(name) => self
                .roots
                .iter()
                .find_map(|r| r.find_where(&|c: &MockComponent| c.attribute_value("name") == Some(name)))
                .map(MockComponent::id),
            None => next_sibling(&self.roots, label),
        })
    }
}

/// Locator prepared for evaluation against many nodes
enum Matcher<'q> {
    Any,
    Type(&'q str),
    Text(TextPredicate),
    Attribute { name: &'q str, value: &'q str },
    Id(Option<ComponentId>),
    All(Vec<Matcher<'q>>),
    Path(Vec<Matcher<'q>>),
}

fn next_sibling(siblings: &[MockComponent], id: ComponentId) -> Option<ComponentId> {
    for (i, component) in siblings.iter().enumerate() {
        if component.id == id {
            return siblings.get(i + 1).map(MockComponent::id);
        }
        if let Some(found) = next_sibling(&component.children, id) {
            return Some(found);
        }
    }
    None
}

impl RendererLookup for MockUi {
    fn renderer_source(&self, id: ComponentId) -> Result<&dyn RendererSource, RenderError> {
        let component = self.component(id).ok_or(RenderError::SourceNotFound)?;
        component
            .renderer
            .as_deref()
            .ok_or(RenderError::NotARendererSource)
    }

    fn describe_component(&self, id: ComponentId) -> String {
        match self.component(id) {
            Some(c) => match &c.renderer {
                Some(source) => format!("{} '{}' {id}", c.kind, source.describe()),
                None => format!("{}{id}", c.kind),
            },
            None => id.to_string(),
        }
    }
}

fn collect<'a>(
    node: &'a MockComponent,
    ancestors: &mut Vec<&'a MockComponent>,
    matcher: &Matcher<'_>,
    found: &mut Vec<ComponentHandle>,
) {
    if matches(node, ancestors, matcher) {
        found.push(node.handle());
    }
    ancestors.push(node);
    for child in &node.children {
        collect(child, ancestors, matcher, found);
    }
    ancestors.pop();
}

/// Whether `node`, below `ancestors` (outermost first), satisfies `matcher`
fn matches(node: &MockComponent, ancestors: &[&MockComponent], matcher: &Matcher<'_>) -> bool {
    match matcher {
        Matcher::Any => true,
        Matcher::Type(kind) => node.kind == *kind,
        Matcher::Text(predicate) => node.text.as_deref().is_some_and(|t| predicate.is_match(t)),
        Matcher::Attribute { name, value } => node.attribute_value(name) == Some(*value),
        Matcher::Id(target) => *target == Some(node.id),
        Matcher::All(parts) => parts.iter().all(|part| matches(node, ancestors, part)),
        Matcher::Path(steps) => {
            let Some((last, outer)) = steps.split_last() else {
                return true;
            };
            if !matches(node, ancestors, last) {
                return false;
            }
            // Outer steps must match a top-down subsequence of the ancestors.
            let mut pending = outer.iter().peekable();
            for (depth, ancestor) in ancestors.iter().enumerate() {
                let Some(step) = pending.peek() else { break };
                if matches(ancestor, &ancestors[..depth], step) {
                    pending.next();
                }
            }
            pending.peek().is_none()
        }
    }
}
