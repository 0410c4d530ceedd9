//! Build log - static output above a live progress line
//!
//! A worker thread pretends to compile a handful of crates. Each finished
//! step is printed once into scrollback while the progress line below it is
//! redrawn in place. Pipe the output (`| cat`) to see the plain rendition.
//!
//! Run with: cargo run --example build_log

use std::fs::File;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use weft::pipeline::Document;
use weft::types::FlexDirection;
use weft::{mount_stdout, NodeKind, Rgba, Style};

const CRATES: &[&str] = &[
    "unicode-width",
    "bitflags",
    "taffy",
    "crossterm",
    "tracing",
    "weft",
];

fn init_logging() {
    let Ok(filter) = EnvFilter::try_from_env("WEFT_LOG") else {
        return;
    };
    let Ok(file) = File::create("build_log.log") else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

fn progress_bar(done: usize, total: usize, width: usize) -> String {
    let filled = done * width / total.max(1);
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width - filled))
}

fn main() -> weft::Result<()> {
    init_logging();
    let mut app = mount_stdout()?;
    let root = app.root();

    let status = app.create_node(
        NodeKind::Box,
        Style::new().flex_direction(FlexDirection::Row).gap(1),
    )?;
    app.append_child(root, status)?;
    let bar = app.create_text(progress_bar(0, CRATES.len(), 20), Style::new().color(Rgba::CYAN))?;
    let current = app.create_text("starting", Style::new().dim(true))?;
    app.append_child(status, bar)?;
    app.append_child(status, current)?;

    let remote = app.remote()?;
    let worker = thread::spawn(move || -> weft::Result<()> {
        for (i, name) in CRATES.iter().enumerate() {
            remote.update(move |doc: &mut Document| {
                let _ = doc.set_text(current, format!("compiling {name}"));
            })?;
            thread::sleep(Duration::from_millis(400));

            remote.update(move |doc: &mut Document| {
                let _ = doc.append_static(format!("\x1b[32m   Compiled\x1b[0m {name}"));
                let _ = doc.set_text(bar, progress_bar(i + 1, CRATES.len(), 20));
            })?;
        }
        remote.update(move |doc: &mut Document| {
            let _ = doc.set_text(current, "finished");
        })?;
        remote.exit()
    });

    let result = app.wait_until_exit();
    if let Ok(Err(err)) = worker.join() {
        tracing::warn!(%err, "worker stopped early");
    }
    result
}
