//! The retained node tree and its mutation API.
//!
//! The tree owns every node in a flat map keyed by [`NodeId`]. Mutations
//! bump a generation counter; layouts read back through
//! [`NodeTree::layout`] are only returned while they are current.

use std::collections::HashMap;

use super::node::{ComputedLayout, Node, NodeId, NodeKind};
use super::style::{Style, TextStyle};
use crate::error::{EngineError, Result};
use crate::types::Display;

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    generation: u64,
    layout_generation: Option<u64>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new(root, NodeKind::Root, Style::default()));
        Self {
            nodes,
            root,
            next_id: 1,
            generation: 0,
            layout_generation: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Incremented by every mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(EngineError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(EngineError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Children of `id`; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// `id` and all of its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// A text node with at least one box child is laid out as a container.
    pub fn has_box_child(&self, id: NodeId) -> bool {
        self.children(id)
            .iter()
            .any(|c| self.get(*c).is_some_and(|n| n.kind == NodeKind::Box))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Create a detached node. Only `Box` and `Text` nodes can be created.
    pub fn create_node(&mut self, kind: NodeKind, style: Style) -> Result<NodeId> {
        if kind == NodeKind::Root {
            return Err(EngineError::RootNotAllowed);
        }
        style.validate()?;

        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, kind, style));
        self.touch();
        Ok(id)
    }

    /// Create a detached text node with content.
    pub fn create_text(&mut self, text: impl Into<String>, style: Style) -> Result<NodeId> {
        let id = self.create_node(NodeKind::Text, style)?;
        self.set_text(id, text)?;
        Ok(id)
    }

    /// Merge a partial style into the node's style.
    pub fn set_style(&mut self, id: NodeId, patch: &Style) -> Result<()> {
        let mut merged = self.node(id)?.style.clone();
        merged.merge(patch);
        self.replace_style(id, merged)
    }

    pub fn replace_style(&mut self, id: NodeId, style: Style) -> Result<()> {
        style.validate()?;
        let node = self.node_mut(id)?;
        if node.style == style {
            return Ok(());
        }
        node.style = style;
        self.bump_content(id);
        self.touch();
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        let node = self.node_mut(id)?;
        if node.kind != NodeKind::Text {
            return Err(EngineError::NotText(id));
        }
        if node.text == text {
            return Ok(());
        }
        node.text = text;
        self.bump_content(id);
        self.touch();
        Ok(())
    }

    /// Insert `child` under `parent` at `index`, clamped to the child count.
    ///
    /// A child that already has a parent is moved.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(EngineError::RootNotAllowed);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(EngineError::Cycle { parent, child });
        }
        let parent_kind = self.node(parent)?.kind;
        let child_kind = self.node(child)?.kind;
        if parent_kind == NodeKind::Text && child_kind == NodeKind::Text && self.has_box_child(child)
        {
            return Err(EngineError::InvalidChild {
                parent,
                child,
                reason: "a text container cannot be nested inside text",
            });
        }

        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child);
        }

        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.bump_content(parent);
        self.touch();
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, child, usize::MAX)
    }

    /// Detach `child` from `parent`. The subtree stays alive and can be
    /// reinserted; use [`destroy`](Self::destroy) to free it.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.parent(child) != Some(parent) {
            return Err(EngineError::NotAChild { parent, child });
        }
        self.detach(parent, child);
        self.touch();
        Ok(())
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
        self.bump_content(parent);
    }

    /// Detach and free `id` with its whole subtree. Returns the freed ids.
    pub fn destroy(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        if id == self.root {
            return Err(EngineError::RootNotAllowed);
        }
        self.node(id)?;
        if let Some(parent) = self.parent(id) {
            self.detach(parent, id);
        }
        let removed = self.descendants(id);
        for node in &removed {
            self.nodes.remove(node);
        }
        self.touch();
        Ok(removed)
    }

    /// Remove and free every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let children = self.node(id)?.children.clone();
        let mut removed = Vec::new();
        for child in children {
            removed.extend(self.destroy(child)?);
        }
        Ok(removed)
    }

    pub fn set_focusable(&mut self, id: NodeId, focusable: bool) -> Result<()> {
        self.node_mut(id)?.focusable = focusable;
        Ok(())
    }

    pub fn set_static(&mut self, id: NodeId, is_static: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.is_static != is_static {
            node.is_static = is_static;
            self.touch();
        }
        Ok(())
    }

    /// Bump the content version of `id` and of every enclosing text node,
    /// since a span change alters the flattened text of its ancestors.
    fn bump_content(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(next) = current {
            let Some(node) = self.nodes.get_mut(&next) else {
                break;
            };
            node.content_version += 1;
            let parent = node.parent;
            current = match parent {
                Some(parent) if self.nodes.get(&parent).is_some_and(|p| p.is_text()) => {
                    Some(parent)
                }
                _ => None,
            };
        }
    }

    // =========================================================================
    // Layout results
    // =========================================================================

    /// Computed geometry of `id`, or `None` when the tree changed since the
    /// last layout pass.
    pub fn layout(&self, id: NodeId) -> Option<ComputedLayout> {
        if !self.is_layout_fresh() {
            return None;
        }
        self.nodes.get(&id).map(|n| n.layout)
    }

    pub fn is_layout_fresh(&self) -> bool {
        self.layout_generation == Some(self.generation)
    }

    pub(crate) fn set_computed_layout(&mut self, id: NodeId, layout: ComputedLayout) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.layout = layout;
        }
    }

    pub(crate) fn mark_layout_fresh(&mut self) {
        self.layout_generation = Some(self.generation);
    }

    /// Force the next layout pass even without a tree mutation (resize).
    pub(crate) fn invalidate_layout(&mut self) {
        self.layout_generation = None;
    }

    /// Absolute position of `id`'s border box, summed from the root.
    pub fn absolute_position(&self, id: NodeId) -> (i32, i32) {
        let (mut x, mut y) = (0, 0);
        let mut current = Some(id);
        while let Some(next) = current {
            let Some(node) = self.nodes.get(&next) else {
                break;
            };
            x += node.layout.x;
            y += node.layout.y;
            current = node.parent;
        }
        (x, y)
    }

    // =========================================================================
    // Inline text
    // =========================================================================

    /// Flatten a text node and its inline span children into one string.
    ///
    /// Span styles are expressed as SGR sequences relative to the node's own
    /// style: each span starts with a reset plus its overrides and is
    /// followed by a reset back to the enclosing span.
    pub fn styled_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.get(id) {
            out.push_str(&node.text);
            for child in &node.children {
                self.push_span(*child, &TextStyle::default(), &mut out);
            }
        }
        out
    }

    fn push_span(&self, id: NodeId, enclosing: &TextStyle, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.kind != NodeKind::Text || node.style.display == Some(Display::None) {
            return;
        }

        let style = node.style.text_style().inherit(enclosing);
        let restyled = style != *enclosing;
        if restyled {
            out.push_str(RESET);
            style.write_sgr(out);
        }
        out.push_str(&node.text);
        for child in &node.children {
            self.push_span(*child, &style, out);
        }
        if restyled {
            out.push_str(RESET);
            enclosing.write_sgr(out);
        }
    }
}
