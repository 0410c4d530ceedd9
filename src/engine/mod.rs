//! Retained node tree.
//!
//! - [`NodeTree`]: id allocation, parent/child bookkeeping, mutation API
//! - [`Node`]: kind, style, children, text and the computed layout
//! - [`Style`]: optional layout and appearance properties
//!
//! ```text
//! #0 Root (column, width = terminal columns)
//! ├── #1 Box  (row, gap 1)
//! │   ├── #2 Text "A"
//! │   └── #3 Text "B"
//! └── #4 Text "Hello " ── #5 Text "World" (inline span, red)
//! ```

mod node;
mod style;
mod tree;

pub use node::{ComputedLayout, Node, NodeId, NodeKind};
pub use style::{Edges, Style, StyleError, TextStyle};
pub use tree::NodeTree;
