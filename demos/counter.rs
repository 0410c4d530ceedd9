//! Counter - keyboard input, focus and in-place updates
//!
//! - `+` / `-` change the count
//! - Tab moves between the two buttons, Enter presses the focused one
//! - `q` or Ctrl+C quits
//!
//! Run with: cargo run --example counter
//! Logs go to `counter.log` when `WEFT_LOG` is set, e.g. `WEFT_LOG=weft=debug`.

use std::cell::Cell;
use std::fs::File;
use std::rc::Rc;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use weft::pipeline::Document;
use weft::types::{AlignItems, BorderStyle, FlexDirection};
use weft::{
    mount_stdout, Edges, FocusChange, InputEvent, NodeId, NodeKind, Propagation, Rgba, Style,
    SubscribeOptions,
};

fn init_logging() {
    let Ok(filter) = EnvFilter::try_from_env("WEFT_LOG") else {
        return;
    };
    let Ok(file) = File::create("counter.log") else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

fn button_style(focused: bool) -> Style {
    Style::new()
        .border_style(BorderStyle::Round)
        .border_color(if focused { Rgba::CYAN } else { Rgba::GRAY })
        .padding(Edges::xy(1, 0))
}

fn show_count(doc: &mut Document, label: NodeId, count: i64) {
    let _ = doc.set_text(label, format!("Count: {count}"));
}

fn main() -> weft::Result<()> {
    init_logging();
    let mut app = mount_stdout()?;
    let root = app.root();

    let panel = app.create_node(
        NodeKind::Box,
        Style::new()
            .border_style(BorderStyle::Round)
            .padding(Edges::xy(1, 0))
            .gap(1)
            .width(30),
    )?;
    app.append_child(root, panel)?;

    let label = app.create_text("Count: 0", Style::new().bold(true))?;
    app.append_child(panel, label)?;

    let buttons = app.create_node(
        NodeKind::Box,
        Style::new()
            .flex_direction(FlexDirection::Row)
            .align_items(AlignItems::Center)
            .gap(2),
    )?;
    app.append_child(panel, buttons)?;

    let mut button_ids = Vec::new();
    for caption in ["-", "+"] {
        let button = app.create_node(NodeKind::Box, button_style(false))?;
        let text = app.create_text(caption, Style::new())?;
        app.append_child(button, text)?;
        app.set_focusable(button, true)?;
        app.append_child(buttons, button)?;
        button_ids.push(button);
    }
    let (minus, plus) = (button_ids[0], button_ids[1]);

    let hint = app.create_text(
        "tab: focus  enter: press  q: quit",
        Style::new().dim(true),
    )?;
    app.append_child(panel, hint)?;

    app.on_focus_change(|change: &FocusChange, doc: &mut Document| {
        if let Some(previous) = change.previous {
            let _ = doc.set_style(previous, &button_style(false));
        }
        if let Some(current) = change.current {
            let _ = doc.set_style(current, &button_style(true));
        }
    });

    let count = Rc::new(Cell::new(0i64));
    app.subscribe(
        move |event: &InputEvent, doc: &mut Document| {
            let Some(key) = event.as_key() else {
                return Propagation::Continue;
            };
            let step = if key.is_text('+') {
                1
            } else if key.is_text('-') {
                -1
            } else if key.return_key && doc.focused() == Some(plus) {
                1
            } else if key.return_key && doc.focused() == Some(minus) {
                -1
            } else if key.is_text('q') {
                doc.exit();
                return Propagation::Handled;
            } else {
                return Propagation::Continue;
            };
            count.set(count.get() + step);
            show_count(doc, label, count.get());
            Propagation::Handled
        },
        SubscribeOptions::default(),
    );

    app.wait_until_exit()
}
