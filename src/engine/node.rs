//! Nodes of the retained tree.

use std::fmt;

use super::style::Style;

/// Stable handle to a node.
///
/// Ids come from a per-tree counter and are never reused, so a stale id can
/// only ever miss; it can never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The single root created with the tree.
    Root,
    /// Flex container.
    Box,
    /// Text run. Its own string is the first span; child text nodes are
    /// inline spans with style overrides.
    Text,
}

/// Geometry written by the layout pass, relative to the parent's border box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComputedLayout {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) style: Style,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) text: String,
    pub(crate) focusable: bool,
    pub(crate) is_static: bool,
    pub(crate) layout: ComputedLayout,
    /// Bumped whenever this node's measurable content changes.
    pub(crate) content_version: u64,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, style: Style) -> Self {
        Self {
            id,
            kind,
            style,
            children: Vec::new(),
            parent: None,
            text: String::new(),
            focusable: false,
            is_static: false,
            layout: ComputedLayout::default(),
            content_version: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_focusable(&self) -> bool {
        self.focusable
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }
}
