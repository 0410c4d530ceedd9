//! Keyboard input: byte decoding and the stdin reader thread.
//!
//! - [`InputParser`]: stdin bytes to [`InputEvent`]s
//! - [`StdinReader`]: background thread feeding raw reads to the loop
//!
//! Dispatch to subscribers lives in [`crate::state`].

mod parser;
mod reader;

pub use parser::{Arrow, InputEvent, InputParser, Key, DEFAULT_PASTE_THRESHOLD};
pub use reader::{InputSink, StdinReader};
