//! The mutable side of a mounted instance.
//!
//! A [`Document`] owns the node tree, the focus registry and the exit
//! request. Every tree mutation goes through it so focusable nodes are
//! registered when they become attached and unregistered (and blurred)
//! when they are detached or destroyed.

use tracing::debug;

use crate::engine::{NodeId, NodeKind, NodeTree, Style};
use crate::error::{EngineError, Result};
use crate::layout::text_measure::natural_size;
use crate::state::FocusManager;
use crate::types::Size;

/// How the host asked the instance to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitRequest {
    Ok,
    Error(String),
}

#[derive(Debug, Default)]
pub struct Document {
    tree: NodeTree,
    focus: FocusManager,
    /// Nodes created by `append_static`, destroyed once emitted.
    transient_static: Vec<NodeId>,
    exit: Option<ExitRequest>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Changes whenever the tree is mutated.
    pub fn generation(&self) -> u64 {
        self.tree.generation()
    }

    // =========================================================================
    // Tree mutation
    // =========================================================================

    pub fn create_node(&mut self, kind: NodeKind, style: Style) -> Result<NodeId> {
        self.tree.create_node(kind, style)
    }

    pub fn create_text(&mut self, text: impl Into<String>, style: Style) -> Result<NodeId> {
        self.tree.create_text(text, style)
    }

    pub fn set_style(&mut self, id: NodeId, patch: &Style) -> Result<()> {
        self.tree.set_style(id, patch)
    }

    pub fn replace_style(&mut self, id: NodeId, style: Style) -> Result<()> {
        self.tree.replace_style(id, style)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        self.tree.set_text(id, text)
    }

    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        let was_attached = self.tree.is_attached(child);
        self.tree.insert_child(parent, child, index)?;
        let attached = self.tree.is_attached(child);
        if attached && !was_attached {
            self.register_subtree(child);
        } else if was_attached && !attached {
            self.unregister_subtree(child);
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, child, usize::MAX)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.tree.remove_child(parent, child)?;
        self.unregister_subtree(child);
        Ok(())
    }

    /// Free `id` and its subtree.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        for removed in self.tree.destroy(id)? {
            self.focus.unregister(removed);
        }
        self.transient_static.retain(|&n| n != id);
        Ok(())
    }

    pub fn set_focusable(&mut self, id: NodeId, focusable: bool) -> Result<()> {
        self.tree.set_focusable(id, focusable)?;
        if focusable && self.tree.is_attached(id) {
            self.focus.register(id);
        } else if !focusable {
            self.focus.unregister(id);
        }
        Ok(())
    }

    pub fn set_static(&mut self, id: NodeId, is_static: bool) -> Result<()> {
        self.tree.set_static(id, is_static)
    }

    /// Queue `content` to be printed once above the live region.
    ///
    /// The content may carry SGR sequences and newlines. It is painted by
    /// the next pass and then freed.
    pub fn append_static(&mut self, content: impl Into<String>) -> Result<NodeId> {
        let id = self.tree.create_text(content, Style::new())?;
        self.tree.set_static(id, true)?;
        let root = self.tree.root();
        self.tree.append_child(root, id)?;
        self.transient_static.push(id);
        Ok(id)
    }

    /// Size of `id`: its computed layout when the layout is fresh, otherwise
    /// the natural size of a text node's content.
    pub fn measure_text(&self, id: NodeId) -> Result<Size> {
        let node = self.tree.node(id)?;
        if let Some(layout) = self.tree.layout(id) {
            return Ok(Size {
                width: layout.width,
                height: layout.height,
            });
        }
        if !node.is_text() {
            return Err(EngineError::StaleLayout);
        }
        let (width, height) = natural_size(&self.tree.styled_text(id));
        Ok(Size {
            width: width.min(u16::MAX as usize) as u16,
            height: height.min(u16::MAX as usize) as u16,
        })
    }

    /// Static regions were printed: free what `append_static` created and
    /// empty host-owned static nodes so nothing is printed twice.
    pub(crate) fn release_static(&mut self, emitted: &[NodeId]) -> Result<()> {
        for &id in emitted {
            if self.transient_static.contains(&id) {
                self.destroy(id)?;
                continue;
            }
            for removed in self.tree.clear_children(id)? {
                self.focus.unregister(removed);
            }
            if self.tree.get(id).is_some_and(|n| n.is_text()) {
                self.tree.set_text(id, "")?;
            }
        }
        if !emitted.is_empty() {
            debug!(regions = emitted.len(), "static regions released");
        }
        Ok(())
    }

    fn register_subtree(&mut self, id: NodeId) {
        for node in self.tree.descendants(id) {
            if self.tree.get(node).is_some_and(|n| n.is_focusable()) {
                self.focus.register(node);
            }
        }
    }

    fn unregister_subtree(&mut self, id: NodeId) {
        for node in self.tree.descendants(id) {
            self.focus.unregister(node);
        }
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn focus_manager(&self) -> &FocusManager {
        &self.focus
    }

    pub fn focus_manager_mut(&mut self) -> &mut FocusManager {
        &mut self.focus
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focus.focused()
    }

    pub fn focus(&mut self, id: NodeId) -> bool {
        self.focus.focus(id)
    }

    pub fn focus_next(&mut self) -> bool {
        self.focus.focus_next()
    }

    pub fn focus_previous(&mut self) -> bool {
        self.focus.focus_previous()
    }

    pub fn blur(&mut self) {
        self.focus.blur();
    }

    // =========================================================================
    // Exit
    // =========================================================================

    /// Ask the instance to unmount after the current tick.
    pub fn exit(&mut self) {
        self.exit.get_or_insert(ExitRequest::Ok);
    }

    pub fn exit_with_error(&mut self, message: impl Into<String>) {
        self.exit.get_or_insert(ExitRequest::Error(message.into()));
    }

    pub fn exit_requested(&self) -> Option<&ExitRequest> {
        self.exit.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focusable_box(doc: &mut Document) -> NodeId {
        let id = doc.create_node(NodeKind::Box, Style::new()).unwrap();
        doc.set_focusable(id, true).unwrap();
        id
    }

    #[test]
    fn test_focusables_register_on_attach() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = focusable_box(&mut doc);
        assert!(doc.focus_manager().focusables().is_empty());

        doc.append_child(root, a).unwrap();
        assert_eq!(doc.focus_manager().focusables(), &[a]);
    }

    #[test]
    fn test_subtree_registers_in_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let container = doc.create_node(NodeKind::Box, Style::new()).unwrap();
        let a = focusable_box(&mut doc);
        let b = focusable_box(&mut doc);
        doc.append_child(container, b).unwrap();
        doc.insert_child(container, a, 0).unwrap();

        doc.append_child(root, container).unwrap();
        assert_eq!(doc.focus_manager().focusables(), &[a, b]);
    }

    #[test]
    fn test_detach_unregisters_and_blurs() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = focusable_box(&mut doc);
        doc.append_child(root, a).unwrap();
        assert!(doc.focus(a));

        doc.remove_child(root, a).unwrap();
        assert_eq!(doc.focused(), None);
        assert!(doc.focus_manager().focusables().is_empty());
    }

    #[test]
    fn test_destroy_unregisters() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = focusable_box(&mut doc);
        doc.append_child(root, a).unwrap();
        doc.destroy(a).unwrap();
        assert!(doc.focus_manager().focusables().is_empty());
        assert!(doc.tree().get(a).is_none());
    }

    #[test]
    fn test_append_static_is_released_after_emit() {
        let mut doc = Document::new();
        let id = doc.append_static("done").unwrap();
        assert!(doc.tree().node(id).unwrap().is_static());
        assert!(doc.tree().is_attached(id));

        doc.release_static(&[id]).unwrap();
        assert!(doc.tree().get(id).is_none());
    }

    #[test]
    fn test_host_static_node_is_emptied() {
        let mut doc = Document::new();
        let root = doc.root();
        let log = doc.create_node(NodeKind::Box, Style::new()).unwrap();
        doc.set_static(log, true).unwrap();
        doc.append_child(root, log).unwrap();
        let line = doc.create_text("x", Style::new()).unwrap();
        doc.append_child(log, line).unwrap();

        doc.release_static(&[log]).unwrap();
        assert!(doc.tree().get(log).is_some());
        assert!(doc.tree().children(log).is_empty());
        assert!(doc.tree().get(line).is_none());
    }

    #[test]
    fn test_measure_text_without_layout() {
        let mut doc = Document::new();
        let t = doc.create_text("ab\nc", Style::new()).unwrap();
        assert_eq!(doc.measure_text(t).unwrap(), Size { width: 2, height: 2 });

        let b = doc.create_node(NodeKind::Box, Style::new()).unwrap();
        assert!(matches!(doc.measure_text(b), Err(EngineError::StaleLayout)));
    }

    #[test]
    fn test_first_exit_request_wins() {
        let mut doc = Document::new();
        doc.exit_with_error("boom");
        doc.exit();
        assert_eq!(doc.exit_requested(), Some(&ExitRequest::Error("boom".into())));
    }
}
