//! Arena-backed document tree
//!
//! Nodes live in a flat vector and reference each other by [`NodeId`]. Child
//! lists are index vectors, so rewriting structure means replacing a vector
//! rather than relinking pointers. Detached nodes stay in the arena; only
//! nodes reachable from the root are serialized.

/// Index of a node in its [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Attribute with its unescaped value
///
/// `raw` holds the value as it was escaped in the source. It is dropped as
/// soon as the value is rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub raw: Option<String>,
}

/// Element node: tag, ordered attributes, ordered children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
    /// Source wrote this childless element as `<X></X>` rather than `<X />`
    pub explicit_close: bool,
}

/// Node kinds preserved by the reader
///
/// Text, comment and instruction payloads are kept exactly as they appeared
/// in the source (still escaped) so untouched parts re-serialize verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    Declaration(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// A parsed structural document
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    pub(crate) prolog: Vec<NodeId>,
    pub(crate) root: NodeId,
    pub(crate) epilog: Vec<NodeId>,
}

impl Document {
    /// Create a document holding a single empty root element
    pub fn new(root_name: &str) -> Self {
        let root = Node::Element(Element {
            name: root_name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            explicit_close: false,
        });
        Self {
            nodes: vec![root],
            prolog: Vec::new(),
            root: NodeId(0),
            epilog: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of nodes in the arena, detached ones included
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.nodes.get(id.0) {
            Some(Node::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0) {
            Some(Node::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Tag name, if the node is an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// All children, text and markup
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only, in document order
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.element(*child).is_some())
    }

    /// First direct child element with the given tag
    pub fn find_child(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.child_elements(id).find(|child| self.tag(*child) == Some(tag))
    }

    /// Follow a chain of child tags from `id`
    pub fn find_path(&self, id: NodeId, tags: &[&str]) -> Option<NodeId> {
        tags.iter()
            .try_fold(id, |current, tag| self.find_child(current, tag))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, appending it when absent. Returns false for non-elements.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(attribute) => {
                attribute.value = value.to_string();
                attribute.raw = None;
            }
            None => element.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
                raw: None,
            }),
        }
        true
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::Element(Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            explicit_close: false,
        }))
    }

    /// Create a text node from already-escaped markup text
    pub fn create_text(&mut self, raw: &str) -> NodeId {
        self.push(Node::Text(raw.to_string()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        match self.element_mut(parent) {
            Some(element) => {
                element.children.push(child);
                true
            }
            None => false,
        }
    }

    /// Detach `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(element) = self.element_mut(parent) else {
            return false;
        };
        match element.children.iter().position(|c| *c == child) {
            Some(index) => {
                element.children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Swap the whole child list of `parent`, returning the old one
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> Vec<NodeId> {
        match self.element_mut(parent) {
            Some(element) => std::mem::replace(&mut element.children, children),
            None => Vec::new(),
        }
    }

    /// Copy the subtree rooted at `id` into fresh arena slots
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let copied = match self.node(id).clone() {
            Node::Element(mut element) => {
                let originals = std::mem::take(&mut element.children);
                element.children = originals
                    .into_iter()
                    .map(|child| self.deep_copy(child))
                    .collect();
                Node::Element(element)
            }
            other => other,
        };
        self.push(copied)
    }

    /// Concatenated raw text of direct text children
    pub fn text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|child| match self.node(*child) {
                Node::Text(raw) | Node::CData(raw) => Some(raw.as_str()),
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}
