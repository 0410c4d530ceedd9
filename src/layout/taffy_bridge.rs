//! Taffy bridge: flexbox layout for the node tree.
//!
//! Every pass converts the whole [`NodeTree`] into a fresh `TaffyTree`,
//! runs taffy's flexbox solver with a text measure callback and copies the
//! rounded results back into the tree as [`ComputedLayout`]s.

use std::collections::HashMap;

use taffy::{
    AlignContent as TaffyAlignContent, AlignItems as TaffyAlignItems,
    AlignSelf as TaffyAlignSelf, AvailableSpace, Dimension as TaffyDimension,
    Display as TaffyDisplay, FlexDirection as TaffyFlexDirection, FlexWrap as TaffyFlexWrap,
    JustifyContent as TaffyJustifyContent, LengthPercentage, LengthPercentageAuto,
    Overflow as TaffyOverflow, Point, Position as TaffyPosition, Rect, Size,
    Style as TaffyStyle, TaffyResult, TaffyTree,
};
use tracing::{debug, warn};

use crate::engine::{ComputedLayout, Edges, Node, NodeId, NodeKind, NodeTree, Style};
use crate::types::{
    AlignContent, AlignItems, AlignSelf, Dimension, Display, FlexDirection, FlexWrap,
    JustifyContent, Overflow, Position, TextWrap,
};

use super::text_measure::{measure_with, min_content_width, natural_size};

// =============================================================================
// DIMENSION CONVERSION
// =============================================================================

fn to_taffy_dimension(dim: Option<Dimension>) -> TaffyDimension {
    match dim.unwrap_or_default() {
        Dimension::Auto => TaffyDimension::Auto,
        Dimension::Cells(n) => TaffyDimension::Length(n as f32),
        Dimension::Percent(p) => TaffyDimension::Percent(p / 100.0),
    }
}

fn to_taffy_lpa(dim: Option<Dimension>) -> LengthPercentageAuto {
    match dim.unwrap_or_default() {
        Dimension::Auto => LengthPercentageAuto::Auto,
        Dimension::Cells(n) => LengthPercentageAuto::Length(n as f32),
        Dimension::Percent(p) => LengthPercentageAuto::Percent(p / 100.0),
    }
}

fn edges_lpa(edges: Edges) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(edges.top as f32),
        right: LengthPercentageAuto::Length(edges.right as f32),
        bottom: LengthPercentageAuto::Length(edges.bottom as f32),
        left: LengthPercentageAuto::Length(edges.left as f32),
    }
}

fn edges_lp(edges: Edges) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(edges.top as f32),
        right: LengthPercentage::Length(edges.right as f32),
        bottom: LengthPercentage::Length(edges.bottom as f32),
        left: LengthPercentage::Length(edges.left as f32),
    }
}

// =============================================================================
// ENUM CONVERSIONS
// =============================================================================

fn to_taffy_flex_direction(dir: FlexDirection) -> TaffyFlexDirection {
    match dir {
        FlexDirection::Row => TaffyFlexDirection::Row,
        FlexDirection::Column => TaffyFlexDirection::Column,
        FlexDirection::RowReverse => TaffyFlexDirection::RowReverse,
        FlexDirection::ColumnReverse => TaffyFlexDirection::ColumnReverse,
    }
}

fn to_taffy_flex_wrap(wrap: FlexWrap) -> TaffyFlexWrap {
    match wrap {
        FlexWrap::NoWrap => TaffyFlexWrap::NoWrap,
        FlexWrap::Wrap => TaffyFlexWrap::Wrap,
        FlexWrap::WrapReverse => TaffyFlexWrap::WrapReverse,
    }
}

fn to_taffy_justify_content(justify: JustifyContent) -> TaffyJustifyContent {
    match justify {
        JustifyContent::FlexStart => TaffyJustifyContent::FlexStart,
        JustifyContent::Center => TaffyJustifyContent::Center,
        JustifyContent::FlexEnd => TaffyJustifyContent::FlexEnd,
        JustifyContent::SpaceBetween => TaffyJustifyContent::SpaceBetween,
        JustifyContent::SpaceAround => TaffyJustifyContent::SpaceAround,
        JustifyContent::SpaceEvenly => TaffyJustifyContent::SpaceEvenly,
    }
}

fn to_taffy_align_items(align: AlignItems) -> TaffyAlignItems {
    match align {
        AlignItems::Stretch => TaffyAlignItems::Stretch,
        AlignItems::FlexStart => TaffyAlignItems::FlexStart,
        AlignItems::Center => TaffyAlignItems::Center,
        AlignItems::FlexEnd => TaffyAlignItems::FlexEnd,
        AlignItems::Baseline => TaffyAlignItems::Baseline,
    }
}

fn to_taffy_align_content(align: AlignContent) -> TaffyAlignContent {
    match align {
        AlignContent::Stretch => TaffyAlignContent::Stretch,
        AlignContent::FlexStart => TaffyAlignContent::FlexStart,
        AlignContent::Center => TaffyAlignContent::Center,
        AlignContent::FlexEnd => TaffyAlignContent::FlexEnd,
        AlignContent::SpaceBetween => TaffyAlignContent::SpaceBetween,
        AlignContent::SpaceAround => TaffyAlignContent::SpaceAround,
    }
}

fn to_taffy_align_self(align: AlignSelf) -> Option<TaffyAlignSelf> {
    match align {
        AlignSelf::Auto => None,
        AlignSelf::Stretch => Some(TaffyAlignSelf::Stretch),
        AlignSelf::FlexStart => Some(TaffyAlignSelf::FlexStart),
        AlignSelf::Center => Some(TaffyAlignSelf::Center),
        AlignSelf::FlexEnd => Some(TaffyAlignSelf::FlexEnd),
        AlignSelf::Baseline => Some(TaffyAlignSelf::Baseline),
    }
}

fn to_taffy_overflow(overflow: Overflow) -> TaffyOverflow {
    match overflow {
        Overflow::Visible => TaffyOverflow::Visible,
        Overflow::Hidden => TaffyOverflow::Clip,
    }
}

// =============================================================================
// STYLE BUILDING
// =============================================================================

/// Build the taffy style for one node, applying engine defaults for every
/// unset property.
fn build_style(node: &Node) -> TaffyStyle {
    let s: &Style = node.style();
    let default_direction = match node.kind() {
        NodeKind::Root => FlexDirection::Column,
        NodeKind::Box | NodeKind::Text => FlexDirection::Row,
    };
    let position = if node.is_static() {
        Position::Absolute
    } else {
        s.position.unwrap_or_default()
    };
    let gap = s.gap.unwrap_or(0);
    let overflow = to_taffy_overflow(s.overflow.unwrap_or_default());

    TaffyStyle {
        display: match s.display.unwrap_or_default() {
            Display::Flex => TaffyDisplay::Flex,
            Display::None => TaffyDisplay::None,
        },
        position: match position {
            Position::Relative => TaffyPosition::Relative,
            Position::Absolute => TaffyPosition::Absolute,
        },
        inset: Rect {
            top: to_taffy_lpa(s.top),
            right: to_taffy_lpa(s.right),
            bottom: to_taffy_lpa(s.bottom),
            left: to_taffy_lpa(s.left),
        },

        flex_direction: to_taffy_flex_direction(s.flex_direction.unwrap_or(default_direction)),
        flex_wrap: to_taffy_flex_wrap(s.flex_wrap.unwrap_or_default()),
        justify_content: s.justify_content.map(to_taffy_justify_content),
        align_items: s.align_items.map(to_taffy_align_items),
        align_content: s.align_content.map(to_taffy_align_content),

        flex_grow: s.flex_grow.unwrap_or(0.0),
        flex_shrink: s.flex_shrink.unwrap_or(1.0),
        flex_basis: to_taffy_dimension(s.flex_basis),
        align_self: s.align_self.and_then(to_taffy_align_self),

        size: Size {
            width: to_taffy_dimension(s.width),
            height: to_taffy_dimension(s.height),
        },
        min_size: Size {
            width: to_taffy_dimension(s.min_width),
            height: to_taffy_dimension(s.min_height),
        },
        max_size: Size {
            width: to_taffy_dimension(s.max_width),
            height: to_taffy_dimension(s.max_height),
        },

        margin: edges_lpa(s.margin.unwrap_or_default()),
        padding: edges_lp(s.padding.unwrap_or_default()),
        border: edges_lp(s.border_edges()),
        gap: Size {
            width: LengthPercentage::Length(s.column_gap.unwrap_or(gap) as f32),
            height: LengthPercentage::Length(s.row_gap.unwrap_or(gap) as f32),
        },
        overflow: Point {
            x: overflow,
            y: overflow,
        },

        ..Default::default()
    }
}

// =============================================================================
// TEXT MEASUREMENT
// =============================================================================

/// Context attached to measured text leaves.
#[derive(Debug, Clone)]
struct TextLeaf {
    node: NodeId,
    version: u64,
    text: String,
    wrap: TextWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Probe {
    MinContent,
    MaxContent,
    /// Fit into at most this many columns.
    Width(usize),
}

/// Memoised text measurements, keyed by node, content version and probe.
///
/// Taffy probes the same leaf several times per pass (min-content,
/// max-content, then a definite width), and unchanged text keeps its entries
/// across passes.
#[derive(Debug, Default)]
pub struct MeasureCache {
    entries: HashMap<(NodeId, u64, TextWrap, Probe), (usize, usize)>,
}

impl MeasureCache {
    const CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn measure(&mut self, leaf: &TextLeaf, probe: Probe) -> (usize, usize) {
        let key = (leaf.node, leaf.version, leaf.wrap, probe);
        if let Some(size) = self.entries.get(&key) {
            return *size;
        }
        if self.entries.len() >= Self::CAPACITY {
            self.entries.clear();
        }

        let size = match probe {
            Probe::MaxContent => natural_size(&leaf.text),
            Probe::MinContent => {
                let width = min_content_width(&leaf.text, leaf.wrap);
                let m = measure_with(&leaf.text, width.max(1), leaf.wrap);
                (width, m.height)
            }
            Probe::Width(width) => {
                let m = measure_with(&leaf.text, width, leaf.wrap);
                (m.width, m.height)
            }
        };
        self.entries.insert(key, size);
        size
    }
}

/// Whole cells from a solver float; NaN, infinities and negatives become 0.
fn to_cells(value: f32) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value + 1e-3).floor() as usize
}

fn measure_leaf(
    cache: &mut MeasureCache,
    known: Size<Option<f32>>,
    available: Size<AvailableSpace>,
    leaf: &TextLeaf,
) -> Size<f32> {
    if let Size {
        width: Some(width),
        height: Some(height),
    } = known
    {
        return Size { width, height };
    }

    let probe = match (known.width, available.width) {
        (Some(width), _) | (None, AvailableSpace::Definite(width)) => {
            match to_cells(width) {
                0 => Probe::MaxContent,
                cells => Probe::Width(cells),
            }
        }
        (None, AvailableSpace::MinContent) => Probe::MinContent,
        (None, AvailableSpace::MaxContent) => Probe::MaxContent,
    };
    let (width, height) = cache.measure(leaf, probe);

    Size {
        width: known.width.unwrap_or(width as f32),
        height: known.height.unwrap_or(height as f32),
    }
}

// =============================================================================
// TREE CONVERSION
// =============================================================================

struct Builder<'t> {
    tree: &'t NodeTree,
    taffy: TaffyTree<TextLeaf>,
    mapping: Vec<(NodeId, taffy::NodeId)>,
}

impl Builder<'_> {
    fn build(&mut self, id: NodeId, root_style: Option<TaffyStyle>) -> TaffyResult<Option<taffy::NodeId>> {
        let Some(node) = self.tree.get(id) else {
            return Ok(None);
        };
        let style = root_style.unwrap_or_else(|| build_style(node));

        let taffy_id = if node.kind() == NodeKind::Text && !self.tree.has_box_child(id) {
            let leaf = TextLeaf {
                node: id,
                version: node.content_version,
                text: self.tree.styled_text(id),
                wrap: node.style().wrap.unwrap_or_default(),
            };
            self.taffy.new_leaf_with_context(style, leaf)?
        } else {
            if node.kind() == NodeKind::Text && !node.text().is_empty() {
                debug!(node = %id, "text node with box children; own text is not laid out");
            }
            let mut children = Vec::with_capacity(node.children().len());
            for &child in node.children() {
                if let Some(child_id) = self.build(child, None)? {
                    children.push(child_id);
                }
            }
            self.taffy.new_with_children(style, &children)?
        };

        self.mapping.push((id, taffy_id));
        Ok(Some(taffy_id))
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Lay out the whole tree inside a container of `width` columns.
///
/// `height` pins the root's height (fullscreen); `None` lets content decide
/// (inline). The tree is marked fresh afterwards even if the solver fails,
/// in which case every node gets a zero-sized layout.
pub fn compute_layout(
    tree: &mut NodeTree,
    width: u16,
    height: Option<u16>,
    cache: &mut MeasureCache,
) {
    let root = tree.root();
    let mut root_style = tree.get(root).map(build_style).unwrap_or_default();
    root_style.size.width = TaffyDimension::Length(width as f32);
    if let Some(height) = height {
        root_style.size.height = TaffyDimension::Length(height as f32);
    }

    let mut builder = Builder {
        tree,
        taffy: TaffyTree::new(),
        mapping: Vec::new(),
    };

    let available = Size {
        width: AvailableSpace::Definite(width as f32),
        height: height.map_or(AvailableSpace::MaxContent, |h| AvailableSpace::Definite(h as f32)),
    };

    let solved = builder.build(root, Some(root_style)).and_then(|root_node| {
        let Some(root_node) = root_node else {
            return Ok(());
        };
        builder.taffy.compute_layout_with_measure(
            root_node,
            available,
            |known, available, _node, leaf, _style| match leaf {
                Some(leaf) => measure_leaf(cache, known, available, leaf),
                None => Size::ZERO,
            },
        )
    });

    let Builder { taffy, mapping, .. } = builder;
    let mut results = Vec::with_capacity(mapping.len());
    match solved {
        Ok(()) => {
            for (id, taffy_id) in mapping {
                let layout = match taffy.layout(taffy_id) {
                    Ok(layout) => to_computed(id, layout),
                    Err(error) => {
                        warn!(node = %id, %error, "missing layout result; using zero size");
                        ComputedLayout::default()
                    }
                };
                results.push((id, layout));
            }
        }
        Err(error) => {
            warn!(%error, "layout failed; falling back to zero-sized nodes");
            results.extend(mapping.into_iter().map(|(id, _)| (id, ComputedLayout::default())));
        }
    }

    for (id, layout) in results {
        tree.set_computed_layout(id, layout);
    }
    tree.mark_layout_fresh();
}

fn to_computed(id: NodeId, layout: &taffy::Layout) -> ComputedLayout {
    let values = [
        layout.location.x,
        layout.location.y,
        layout.size.width,
        layout.size.height,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        warn!(node = %id, ?values, "non-finite layout; using zero size");
        return ComputedLayout::default();
    }
    ComputedLayout {
        x: layout.location.x.round() as i32,
        y: layout.location.y.round() as i32,
        width: layout.size.width.round().clamp(0.0, u16::MAX as f32) as u16,
        height: layout.size.height.round().clamp(0.0, u16::MAX as f32) as u16,
    }
}
