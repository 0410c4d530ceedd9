//! Frame compositing.
//!
//! Walks the laid-out tree depth first in child order and paints every
//! visible node into a [`FrameBuffer`]: background, border, then either the
//! node's text or its children. Absolutely positioned nodes are deferred
//! and painted on top once the in-flow pass is done. Static nodes never
//! reach the live buffer; each is painted into a buffer of its own and
//! exported as ANSI lines.

use std::collections::VecDeque;

use tracing::trace;

use crate::engine::{Edges, Node, NodeId, NodeKind, NodeTree, TextStyle};
use crate::error::{EngineError, Result};
use crate::layout::text_measure::{layout_lines, strip_ansi};
use crate::layout::{compute_layout, MeasureCache};
use crate::renderer::{row_to_ansi, styled_graphemes, FrameBuffer};
use crate::types::{Attr, CellStyle, ClipRect, Display, Overflow, Position};

/// Output of one compositing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The live region, diffed against the previous pass.
    pub live: FrameBuffer,
    /// Rows of static regions painted in this pass, top to bottom.
    pub static_lines: Vec<String>,
    /// Static nodes whose content went into `static_lines`.
    pub static_nodes: Vec<NodeId>,
}

impl Frame {
    /// Number of rows that belong to static regions.
    pub fn static_rows(&self) -> usize {
        self.static_lines.len()
    }

    pub fn has_static(&self) -> bool {
        !self.static_lines.is_empty()
    }
}

/// Composite the tree into a frame `width` columns wide.
///
/// The live region is as tall as the root's layout, capped at `max_height`.
/// Fails with [`EngineError::StaleLayout`] if the tree changed since the
/// last layout pass.
pub fn compose(tree: &NodeTree, width: u16, max_height: Option<u16>) -> Result<Frame> {
    let root = tree.root();
    let Some(root_layout) = tree.layout(root) else {
        return Err(EngineError::StaleLayout);
    };

    let height = max_height.map_or(root_layout.height, |max| root_layout.height.min(max));
    let mut live = FrameBuffer::new(width, height);
    let bounds = live.bounds();

    let mut painter = Painter::new(tree, false);
    painter.paint(&mut live, root, (0, 0), bounds, TextStyle::default(), true);
    painter.paint_deferred(&mut live);

    let mut static_lines = Vec::new();
    let mut static_nodes = Vec::new();
    for (id, inherited) in std::mem::take(&mut painter.statics) {
        if !has_content(tree, id) {
            continue;
        }
        let lines = paint_static(tree, id, inherited);
        trace!(node = %id, rows = lines.len(), "static region composited");
        static_lines.extend(lines);
        static_nodes.push(id);
    }

    Ok(Frame {
        live,
        static_lines,
        static_nodes,
    })
}

/// Lay out and composite `tree` at `width` columns, returning the frame as
/// plain text: static rows first, then every row of the live region.
///
/// ```
/// use weft::{render_to_string, NodeTree, Style};
///
/// let mut tree = NodeTree::new();
/// let root = tree.root();
/// let text = tree.create_text("hello", Style::new()).unwrap();
/// tree.append_child(root, text).unwrap();
///
/// assert_eq!(render_to_string(&mut tree, 20).unwrap(), "hello");
/// ```
pub fn render_to_string(tree: &mut NodeTree, width: u16) -> Result<String> {
    let mut cache = MeasureCache::new();
    compute_layout(tree, width, None, &mut cache);
    let frame = compose(tree, width, None)?;

    let mut lines: Vec<String> = frame
        .static_lines
        .iter()
        .map(|line| strip_ansi(line).trim_end().to_string())
        .collect();
    lines.extend(frame.live.to_plain_lines());
    Ok(lines.join("\n"))
}

fn has_content(tree: &NodeTree, id: NodeId) -> bool {
    tree.get(id)
        .is_some_and(|node| !node.children().is_empty() || !node.text().is_empty())
}

/// Paint a static subtree into its own buffer with the node at the origin.
fn paint_static(tree: &NodeTree, id: NodeId, inherited: TextStyle) -> Vec<String> {
    let Some(layout) = tree.layout(id) else {
        return Vec::new();
    };
    if layout.width == 0 || layout.height == 0 {
        return Vec::new();
    }
    let mut buffer = FrameBuffer::new(layout.width, layout.height);
    let bounds = buffer.bounds();

    let mut painter = Painter::new(tree, true);
    painter.paint(&mut buffer, id, (-layout.x, -layout.y), bounds, inherited, true);
    painter.paint_deferred(&mut buffer);

    (0..buffer.height()).map(|y| row_to_ansi(buffer.row(y))).collect()
}

// =============================================================================
// Painter
// =============================================================================

/// An absolutely positioned node waiting for the in-flow pass to finish.
struct Deferred {
    id: NodeId,
    origin: (i32, i32),
    clip: ClipRect,
    inherited: TextStyle,
}

struct Painter<'t> {
    tree: &'t NodeTree,
    /// Painting the inside of a static region: nested static flags are
    /// ignored.
    in_static: bool,
    deferred: VecDeque<Deferred>,
    statics: Vec<(NodeId, TextStyle)>,
}

impl<'t> Painter<'t> {
    fn new(tree: &'t NodeTree, in_static: bool) -> Self {
        Self {
            tree,
            in_static,
            deferred: VecDeque::new(),
            statics: Vec::new(),
        }
    }

    /// Paint `id` and its subtree. `origin` is the absolute position of the
    /// parent's border box.
    fn paint(
        &mut self,
        buffer: &mut FrameBuffer,
        id: NodeId,
        origin: (i32, i32),
        clip: ClipRect,
        inherited: TextStyle,
        is_subject: bool,
    ) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let style = node.style();
        if style.display == Some(Display::None) {
            return;
        }
        if node.is_static() && !self.in_static && node.kind() != NodeKind::Root {
            self.statics.push((id, inherited));
            return;
        }
        if !is_subject && style.position == Some(Position::Absolute) {
            self.deferred.push_back(Deferred {
                id,
                origin,
                clip,
                inherited,
            });
            return;
        }

        let layout = self.tree.layout(id).unwrap_or_default();
        let x = origin.0 + layout.x;
        let y = origin.1 + layout.y;
        let rect = ClipRect::new(x, y, layout.width, layout.height);
        if layout.width == 0 || layout.height == 0 {
            return;
        }

        let text_style = style.text_style().inherit(&inherited);

        if node.kind() != NodeKind::Text {
            if let Some(background) = style.background {
                buffer.fill_rect(&rect, background, &clip);
            }
        }

        if let Some(border) = style.border_style.filter(|b| b.is_visible()) {
            let border_style = CellStyle {
                fg: style.border_color.or(text_style.color).unwrap_or_default(),
                bg: Default::default(),
                attrs: Attr::NONE,
            };
            let sides = style.border_sides.unwrap_or_default();
            buffer.draw_border(&rect, border, sides, border_style, &clip);
        }

        let content = content_box(node, rect);
        let inner_clip = if style.overflow == Some(Overflow::Hidden) {
            content.intersect(&clip)
        } else {
            Some(clip)
        };
        let Some(inner_clip) = inner_clip else {
            return;
        };

        if node.kind() == NodeKind::Text && !self.tree.has_box_child(id) {
            self.paint_text(buffer, node, content, &inner_clip, text_style);
            return;
        }

        for &child in node.children() {
            self.paint(buffer, child, (x, y), inner_clip, text_style, false);
        }
    }

    fn paint_text(
        &self,
        buffer: &mut FrameBuffer,
        node: &Node,
        content: ClipRect,
        clip: &ClipRect,
        style: TextStyle,
    ) {
        if content.width == 0 || content.height == 0 {
            return;
        }
        let Some(clip) = content.intersect(clip) else {
            return;
        };

        let text = self.tree.styled_text(node.id());
        let wrap = node.style().wrap.unwrap_or_default();
        let base = style.to_cell_style();

        let lines = layout_lines(&text, content.width as usize, wrap);
        for (row, line) in lines.iter().enumerate().take(content.height as usize) {
            let y = content.y + row as i32;
            let mut x = content.x;
            for glyph in styled_graphemes(line, base) {
                buffer.set_glyph(x, y, glyph.grapheme, glyph.width, glyph.style, &clip);
                x += glyph.width as i32;
            }
        }
    }

    /// Paint deferred absolute nodes (and any they defer in turn) on top.
    fn paint_deferred(&mut self, buffer: &mut FrameBuffer) {
        while let Some(next) = self.deferred.pop_front() {
            self.paint(buffer, next.id, next.origin, next.clip, next.inherited, true);
        }
    }
}

/// The area inside the border and padding of `node` placed at `rect`.
fn content_box(node: &Node, rect: ClipRect) -> ClipRect {
    let style = node.style();
    let border = style.border_edges();
    let padding = style.padding.unwrap_or(Edges::ZERO);
    rect.inset(
        border.top.saturating_add(padding.top),
        border.right.saturating_add(padding.right),
        border.bottom.saturating_add(padding.bottom),
        border.left.saturating_add(padding.left),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Style;
    use crate::types::{BorderStyle, Dimension, FlexDirection, Glyph, Rgba, Sides, TextWrap};

    fn laid_out(tree: &mut NodeTree, width: u16) {
        compute_layout(tree, width, None, &mut MeasureCache::new());
    }

    fn text(tree: &mut NodeTree, parent: NodeId, content: &str, style: Style) -> NodeId {
        let id = tree.create_text(content, style).unwrap();
        tree.append_child(parent, id).unwrap();
        id
    }

    fn boxed(tree: &mut NodeTree, parent: NodeId, style: Style) -> NodeId {
        let id = tree.create_node(NodeKind::Box, style).unwrap();
        tree.append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_stale_layout_is_an_error() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        laid_out(&mut tree, 10);
        text(&mut tree, root, "x", Style::new());
        assert!(matches!(compose(&tree, 10, None), Err(EngineError::StaleLayout)));
    }

    #[test]
    fn test_stacked_text() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        text(&mut tree, root, "one", Style::new());
        text(&mut tree, root, "two", Style::new());
        assert_eq!(render_to_string(&mut tree, 10).unwrap(), "one\ntwo");
    }

    #[test]
    fn test_border_and_padding() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(
            &mut tree,
            root,
            Style::new()
                .border_style(BorderStyle::Single)
                .padding(Edges::xy(1, 0))
                .align_self(crate::types::AlignSelf::FlexStart),
        );
        text(&mut tree, b, "hi", Style::new());
        assert_eq!(
            render_to_string(&mut tree, 20).unwrap(),
            "┌────┐\n│ hi │\n└────┘"
        );
    }

    #[test]
    fn test_partial_border_sides() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(
            &mut tree,
            root,
            Style::new()
                .border_style(BorderStyle::Single)
                .border_sides(Sides::TOP | Sides::BOTTOM)
                .width(4),
        );
        text(&mut tree, b, "ab", Style::new());
        assert_eq!(render_to_string(&mut tree, 10).unwrap(), "────\nab\n────");
    }

    #[test]
    fn test_wrapped_text_in_narrow_box() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(&mut tree, root, Style::new().width(5));
        text(&mut tree, b, "aaa bbb", Style::new());
        assert_eq!(render_to_string(&mut tree, 20).unwrap(), "aaa\nbbb");
    }

    #[test]
    fn test_truncated_text() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(&mut tree, root, Style::new().width(6));
        text(&mut tree, b, "abcdefghij", Style::new().wrap(TextWrap::Truncate));
        assert_eq!(render_to_string(&mut tree, 20).unwrap(), "abcde…");
    }

    #[test]
    fn test_overflow_hidden_clips_children() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(
            &mut tree,
            root,
            Style::new()
                .height(1)
                .flex_direction(FlexDirection::Column)
                .overflow(Overflow::Hidden),
        );
        text(&mut tree, b, "shown", Style::new());
        text(&mut tree, b, "hidden", Style::new().flex_shrink(0.0));
        text(&mut tree, root, "after", Style::new());
        assert_eq!(render_to_string(&mut tree, 10).unwrap(), "shown\nafter");
    }

    #[test]
    fn test_wide_glyph_crossing_clip_is_omitted() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(
            &mut tree,
            root,
            Style::new().width(3).overflow(Overflow::Hidden),
        );
        text(&mut tree, b, "a中", Style::new().flex_shrink(0.0).width(4));
        laid_out(&mut tree, 10);
        let frame = compose(&tree, 10, None).unwrap();
        assert_eq!(frame.live.get(0, 0).unwrap().glyph, Glyph::Char('a'));
        assert_eq!(frame.live.get(1, 0).unwrap().glyph, Glyph::Char('中'));
        assert!(frame.live.get(2, 0).unwrap().glyph.is_continuation());

        let narrow = boxed(&mut tree, root, Style::new().width(2).overflow(Overflow::Hidden));
        text(&mut tree, narrow, "a中", Style::new().flex_shrink(0.0).width(4));
        laid_out(&mut tree, 10);
        let frame = compose(&tree, 10, None).unwrap();
        assert_eq!(frame.live.get(0, 1).unwrap().glyph, Glyph::Char('a'));
        assert_eq!(frame.live.get(1, 1).unwrap().glyph, Glyph::BLANK);
    }

    #[test]
    fn test_background_and_inherited_color() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(
            &mut tree,
            root,
            Style::new().width(4).background(Rgba::BLUE).color(Rgba::RED),
        );
        text(&mut tree, b, "x", Style::new().bold(true));
        laid_out(&mut tree, 10);
        let frame = compose(&tree, 10, None).unwrap();

        let x = frame.live.get(0, 0).unwrap();
        assert_eq!(x.fg, Rgba::RED);
        assert_eq!(x.bg, Rgba::BLUE);
        assert_eq!(x.attrs, Attr::BOLD);
        assert_eq!(frame.live.get(3, 0).unwrap().bg, Rgba::BLUE);
        assert_eq!(frame.live.get(4, 0).unwrap().bg, Rgba::TERMINAL_DEFAULT);
    }

    #[test]
    fn test_inline_spans_and_embedded_sgr() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let t = text(&mut tree, root, "a\x1b[32mb\x1b[0m", Style::new());
        let span = tree.create_text("c", Style::new().color(Rgba::RED)).unwrap();
        tree.append_child(t, span).unwrap();
        laid_out(&mut tree, 10);
        let frame = compose(&tree, 10, None).unwrap();

        assert_eq!(frame.live.row_text(0).trim_end(), "abc");
        assert_eq!(frame.live.get(0, 0).unwrap().fg, Rgba::TERMINAL_DEFAULT);
        assert_eq!(frame.live.get(1, 0).unwrap().fg, Rgba::GREEN);
        assert_eq!(frame.live.get(2, 0).unwrap().fg, Rgba::RED);
    }

    #[test]
    fn test_absolute_node_paints_on_top() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let overlay = tree
            .create_text(
                "X",
                Style::new()
                    .position(Position::Absolute)
                    .left(Dimension::Cells(1))
                    .top(Dimension::Cells(0)),
            )
            .unwrap();
        tree.append_child(root, overlay).unwrap();
        text(&mut tree, root, "abc", Style::new());
        assert_eq!(render_to_string(&mut tree, 10).unwrap(), "aXc");
    }

    #[test]
    fn test_static_node_is_exported_not_live() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let log = boxed(&mut tree, root, Style::new().flex_direction(FlexDirection::Column));
        tree.set_static(log, true).unwrap();
        text(&mut tree, log, "line 1", Style::new().color(Rgba::GREEN));
        text(&mut tree, log, "line 2", Style::new());
        text(&mut tree, root, "live", Style::new());
        laid_out(&mut tree, 20);

        let frame = compose(&tree, 20, None).unwrap();
        assert_eq!(frame.static_rows(), 2);
        assert_eq!(frame.static_nodes, vec![log]);
        assert_eq!(frame.static_lines[0], "\x1b[32mline 1\x1b[0m");
        assert_eq!(frame.static_lines[1], "line 2");
        assert_eq!(frame.live.to_plain_lines(), vec!["live".to_string()]);
    }

    #[test]
    fn test_empty_static_node_is_skipped() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let log = boxed(&mut tree, root, Style::new());
        tree.set_static(log, true).unwrap();
        laid_out(&mut tree, 20);
        let frame = compose(&tree, 20, None).unwrap();
        assert!(!frame.has_static());
        assert!(frame.static_nodes.is_empty());
    }

    #[test]
    fn test_max_height_caps_live_region() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        for i in 0..5 {
            text(&mut tree, root, &format!("row {i}"), Style::new());
        }
        laid_out(&mut tree, 10);
        let frame = compose(&tree, 10, Some(3)).unwrap();
        assert_eq!(frame.live.height(), 3);
        assert_eq!(frame.live.row_text(2).trim_end(), "row 2");
    }

    #[test]
    fn test_blank_rows_of_the_layout_are_kept() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let b = boxed(
            &mut tree,
            root,
            Style::new()
                .height(3)
                .flex_direction(FlexDirection::Column)
                .justify_content(crate::types::JustifyContent::Center),
        );
        text(&mut tree, b, "Test", Style::new());
        assert_eq!(render_to_string(&mut tree, 10).unwrap(), "\nTest\n");
    }

    #[test]
    fn test_display_none_is_skipped() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        text(&mut tree, root, "gone", Style::new().display(Display::None));
        text(&mut tree, root, "here", Style::new());
        assert_eq!(render_to_string(&mut tree, 10).unwrap(), "here");
    }
}
