//! Layout: flexbox geometry for the node tree.
//!
//! # Architecture
//!
//! Layout uses [Taffy](https://github.com/DioxusLabs/taffy) for W3C-compliant
//! flexbox computation. Each pass:
//!
//! 1. Converts node styles into Taffy styles
//! 2. Builds a Taffy tree mirroring the node tree
//! 3. Measures text leaves through [`text_measure`]
//! 4. Writes rounded results back as [`ComputedLayout`](crate::engine::ComputedLayout)s
//!
//! # Example
//!
//! ```
//! use weft::engine::{NodeKind, NodeTree, Style};
//! use weft::layout::{compute_layout, MeasureCache};
//!
//! let mut tree = NodeTree::new();
//! let panel = tree.create_node(NodeKind::Box, Style::new().width(20).height(3)).unwrap();
//! tree.append_child(tree.root(), panel).unwrap();
//!
//! compute_layout(&mut tree, 80, None, &mut MeasureCache::new());
//! assert_eq!(tree.layout(panel).unwrap().width, 20);
//! ```

pub mod text_measure;
mod taffy_bridge;

pub use taffy_bridge::{compute_layout, MeasureCache};
