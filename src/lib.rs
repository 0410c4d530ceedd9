//! # weft
//!
//! Retained-tree terminal rendering engine for Rust.
//!
//! A host (a component framework, or plain code) builds a tree of box and
//! text nodes through a small mutation API. weft lays the tree out with
//! flexbox ([taffy](https://github.com/DioxusLabs/taffy)), paints it into a
//! cell grid and writes only what changed to the terminal.
//!
//! ## Architecture
//!
//! ```text
//! Host ─► Document (NodeTree + focus) ─► layout ─► compose ─► DiffRenderer ─► terminal
//!              ▲                                                   │
//!              └────── InputParser ◄── stdin        static lines ──┘ (printed once)
//! ```
//!
//! Each mounted [`Instance`] owns its own document, focus state, input
//! subscribers and raw-mode state. All I/O happens on the thread that drives
//! the instance; other threads talk to it through a [`Remote`].
//!
//! ## Modules
//!
//! - [`types`] - Core value types (Dimension, Rgba, Cell, RenderMode, ...)
//! - [`engine`] - Node tree and styles
//! - [`layout`] - Taffy bridge and text measurement
//! - [`renderer`] - Frame buffer, diff and plain renderers
//! - [`pipeline`] - Compositor, document, scheduler, backends, mount
//! - [`input`] - Byte decoder and stdin reader
//! - [`state`] - Focus manager, subscribers, global keys
//!
//! ## Example
//!
//! ```
//! use weft::{render_to_string, FlexDirection, NodeKind, NodeTree, Style};
//!
//! let mut tree = NodeTree::new();
//! let row = tree
//!     .create_node(NodeKind::Box, Style::new().flex_direction(FlexDirection::Row).gap(1))
//!     .unwrap();
//! let left = tree.create_text("left", Style::new()).unwrap();
//! let right = tree.create_text("right", Style::new()).unwrap();
//! tree.append_child(row, left).unwrap();
//! tree.append_child(row, right).unwrap();
//! tree.append_child(tree.root(), row).unwrap();
//!
//! assert_eq!(render_to_string(&mut tree, 20).unwrap(), "left right");
//! ```

pub mod engine;
pub mod error;
pub mod input;
pub mod layout;
pub mod pipeline;
pub mod renderer;
pub mod state;
pub mod types;

pub use types::*;

pub use error::{EngineError, Result};

pub use engine::{ComputedLayout, Edges, Node, NodeId, NodeKind, NodeTree, Style, StyleError, TextStyle};

pub use layout::text_measure::{string_width, truncate_text, wrap_text, TruncatePosition};
pub use layout::{compute_layout, MeasureCache};

pub use renderer::{DiffRenderer, FrameBuffer, PlainRenderer, Renderer};

pub use pipeline::{
    compose, mount, mount_stdout, render_to_string, Backend, CrosstermBackend, Document, Frame,
    Instance, MountOptions, Remote, TestBackend,
};

pub use input::{Arrow, InputEvent, InputParser, Key};

pub use state::{FocusChange, FocusManager, Propagation, SubscribeOptions, SubscriptionId};
