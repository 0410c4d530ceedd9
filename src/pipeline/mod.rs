//! Rendering pipeline and instance lifecycle.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Document ─► compute_layout ─► compose ─► Frame ─► Renderer ─► Backend
//!    ▲                                       │
//!    │                                       └─ static lines (printed once)
//!    └── LoopEvent queue ◄── stdin reader, signals, Remote handles
//! ```
//!
//! ## Data Flow
//!
//! 1. **Document** - node tree, focus registry and exit request
//! 2. **compose** - paints laid-out nodes into a FrameBuffer, exports static regions
//! 3. **Instance** - drains events, runs at most one pass per tick, owns teardown

pub mod compose;
pub mod document;
pub mod mount;
pub mod scheduler;
pub mod terminal;

pub use compose::{compose, render_to_string, Frame};
pub use document::{Document, ExitRequest};
pub use mount::{mount, mount_stdout, FocusListenerId, Instance, MountOptions, ESCAPE_TIMEOUT};
pub use scheduler::{LoopEvent, Remote, Scheduler, Update};
pub use terminal::{
    best_effort_cleanup, install_panic_hook, Backend, CrosstermBackend, TestBackend, TestTerminal,
};
