//! End-to-end rendering through `Instance<TestBackend>`, checked by replaying
//! the emitted bytes on a VT screen model.

mod support;

use support::{has_escapes, Screen};
use weft::types::{AlignItems, BorderStyle, FlexDirection, JustifyContent, Rgba, TextWrap};
use weft::{
    mount, render_to_string, Edges, Instance, MountOptions, NodeId, NodeKind, RenderMode, Style,
    TestBackend,
};

fn mount_mode(width: u16, height: u16, mode: RenderMode) -> (TestBackend, Instance<TestBackend>) {
    let term = TestBackend::new(width, height);
    let options = MountOptions {
        mode: Some(mode),
        max_fps: 0,
        ..MountOptions::default()
    };
    let instance = mount(term.clone(), options).unwrap();
    (term, instance)
}

fn add_text(instance: &mut Instance<TestBackend>, text: &str) -> NodeId {
    let id = instance.create_text(text, Style::new()).unwrap();
    let root = instance.root();
    instance.append_child(root, id).unwrap();
    id
}

#[test]
fn inline_update_rewrites_in_place() {
    let (term, mut instance) = mount_mode(20, 6, RenderMode::Inline);
    let label = add_text(&mut instance, "Count: 0");
    instance.tick().unwrap();
    let first_pass = term.output().len();

    instance.set_text(label, "Count: 1").unwrap();
    instance.tick().unwrap();
    let second_pass = term.output().len() - first_pass;

    let screen = Screen::replay(20, 6, &term.output());
    assert_eq!(screen.text(), "Count: 1");
    assert!(second_pass < first_pass, "diff pass should only touch the changed cell");
}

#[test]
fn identical_frame_writes_nothing() {
    let (term, mut instance) = mount_mode(20, 6, RenderMode::Inline);
    let label = add_text(&mut instance, "same");
    instance.tick().unwrap();
    let writes = term.write_count();

    // A mutation that produces the same pixels.
    instance.set_text(label, "same").unwrap();
    instance.tick().unwrap();
    assert_eq!(term.write_count(), writes);
}

#[test]
fn static_lines_print_once_above_live_region() {
    let (term, mut instance) = mount_mode(30, 8, RenderMode::Inline);
    let status = add_text(&mut instance, "building...");
    instance.append_static("step 1 done").unwrap();
    instance.tick().unwrap();

    instance.append_static("\x1b[32mstep 2 done\x1b[0m").unwrap();
    instance.tick().unwrap();
    instance.set_text(status, "finished").unwrap();
    instance.tick().unwrap();
    instance.tick().unwrap();

    let output = term.output();
    assert_eq!(output.matches("step 1 done").count(), 1);
    assert_eq!(output.matches("step 2 done").count(), 1);

    let screen = Screen::replay(30, 8, &output);
    assert_eq!(screen.text(), "step 1 done\nstep 2 done\nfinished");
}

#[test]
fn host_static_subtree_is_emptied_after_emit() {
    let (term, mut instance) = mount_mode(30, 8, RenderMode::Inline);
    let root = instance.root();
    let log = instance.create_node(NodeKind::Box, Style::new()).unwrap();
    instance.set_static(log, true).unwrap();
    instance.append_child(root, log).unwrap();
    let line = instance.create_text("compiled weft", Style::new()).unwrap();
    instance.append_child(log, line).unwrap();
    add_text(&mut instance, "live");

    instance.tick().unwrap();
    assert!(instance.document().tree().children(log).is_empty());

    let next = instance.create_text("compiled demos", Style::new()).unwrap();
    instance.append_child(log, next).unwrap();
    instance.tick().unwrap();

    let screen = Screen::replay(30, 8, &term.output());
    assert_eq!(screen.text(), "compiled weft\ncompiled demos\nlive");
}

#[test]
fn shrinking_frame_erases_trailing_rows() {
    let (term, mut instance) = mount_mode(20, 6, RenderMode::Inline);
    add_text(&mut instance, "one");
    let two = add_text(&mut instance, "two");
    add_text(&mut instance, "three");
    instance.tick().unwrap();

    instance.destroy(two).unwrap();
    instance.tick().unwrap();

    let screen = Screen::replay(20, 6, &term.output());
    assert_eq!(screen.text(), "one\nthree");
}

#[test]
fn inline_frame_is_capped_below_terminal_height() {
    let (_term, mut instance) = mount_mode(20, 4, RenderMode::Inline);
    for i in 0..6 {
        add_text(&mut instance, &format!("row {i}"));
    }
    instance.tick().unwrap();
    assert_eq!(instance.last_frame(), "row 0\nrow 1\nrow 2");
}

#[test]
fn bordered_panel_in_fullscreen() {
    let (term, mut instance) = mount_mode(20, 6, RenderMode::Fullscreen);
    let root = instance.root();
    let panel = instance
        .create_node(
            NodeKind::Box,
            Style::new()
                .width(8)
                .border_style(BorderStyle::Round)
                .padding(Edges::xy(1, 0)),
        )
        .unwrap();
    instance.append_child(root, panel).unwrap();
    let body = instance.create_text("ok", Style::new()).unwrap();
    instance.append_child(panel, body).unwrap();
    instance.tick().unwrap();

    let screen = Screen::replay(20, 6, &term.output());
    assert!(screen.in_alt_screen());
    assert!(!screen.cursor_visible);
    assert_eq!(screen.lines()[..3], ["╭──────╮", "│ ok   │", "╰──────╯"]);
}

#[test]
fn fullscreen_static_lines_appear_after_leaving() {
    let (term, mut instance) = mount_mode(20, 6, RenderMode::Fullscreen);
    add_text(&mut instance, "dashboard");
    instance.append_static("saved report.txt").unwrap();
    instance.tick().unwrap();

    let during = Screen::replay(20, 6, &term.output());
    assert_eq!(during.text(), "dashboard");

    instance.unmount().unwrap();
    let after = Screen::replay(20, 6, &term.output());
    assert!(!after.in_alt_screen());
    assert!(after.cursor_visible);
    assert_eq!(after.text(), "saved report.txt");
}

#[test]
fn wide_glyphs_keep_columns_aligned() {
    let (term, mut instance) = mount_mode(20, 6, RenderMode::Inline);
    let label = add_text(&mut instance, "日本語x");
    instance.tick().unwrap();
    instance.set_text(label, "日本語y").unwrap();
    instance.tick().unwrap();

    let screen = Screen::replay(20, 6, &term.output());
    assert_eq!(screen.text(), "日本語y");
}

#[test]
fn row_layout_with_gap_and_wrapping() {
    let (term, mut instance) = mount_mode(12, 6, RenderMode::Inline);
    let root = instance.root();
    let row = instance
        .create_node(
            NodeKind::Box,
            Style::new().flex_direction(FlexDirection::Row).gap(1),
        )
        .unwrap();
    instance.append_child(root, row).unwrap();
    let label = instance.create_text("id:", Style::new()).unwrap();
    let value = instance
        .create_text("alpha beta", Style::new().flex_shrink(1.0))
        .unwrap();
    instance.append_child(row, label).unwrap();
    instance.append_child(row, value).unwrap();
    instance.tick().unwrap();

    let screen = Screen::replay(12, 6, &term.output());
    assert_eq!(screen.text(), "id: alpha\n    beta");
}

#[test]
fn write_external_keeps_live_region_below() {
    let (term, mut instance) = mount_mode(30, 6, RenderMode::Inline);
    add_text(&mut instance, "live");
    instance.tick().unwrap();

    instance.write_external("warning: slow disk\n").unwrap();
    instance.tick().unwrap();

    let screen = Screen::replay(30, 6, &term.output());
    assert_eq!(screen.text(), "warning: slow disk\nlive");
}

#[test]
fn resize_repaints_with_new_width() {
    let (term, mut instance) = mount_mode(20, 6, RenderMode::Inline);
    add_text(&mut instance, "aaaa bbbb cccc");
    instance.tick().unwrap();
    assert_eq!(instance.last_frame(), "aaaa bbbb cccc");

    term.set_size(10, 6);
    instance.resize(10, 6);
    instance.tick().unwrap();
    assert_eq!(instance.last_frame(), "aaaa bbbb\ncccc");

    let screen = Screen::replay(20, 6, &term.output());
    assert_eq!(screen.text(), "aaaa bbbb\ncccc");
}

#[test]
fn plain_mode_writes_no_escape_sequences() {
    let term = TestBackend::non_interactive(20, 6);
    let mut instance = mount(term.clone(), MountOptions::default()).unwrap();
    assert_eq!(instance.mode(), RenderMode::Plain);

    let title = instance
        .create_text("report", Style::new().bold(true).color(Rgba::CYAN))
        .unwrap();
    let root = instance.root();
    instance.append_child(root, title).unwrap();
    instance.append_static("\x1b[31merror\x1b[0m: none").unwrap();
    instance.tick().unwrap();
    instance.set_text(title, "report: ok").unwrap();
    instance.tick().unwrap();
    instance.unmount().unwrap();

    let output = term.output();
    assert!(!has_escapes(&output));
    assert_eq!(output, "error: none\nreport: ok\n");
}

#[test]
fn styled_text_reaches_terminal_as_sgr() {
    let (_term, mut instance) = mount_mode(20, 4, RenderMode::Inline);
    let root = instance.root();
    let line = instance
        .create_node(NodeKind::Text, Style::new().color(Rgba::RED))
        .unwrap();
    instance.append_child(root, line).unwrap();
    let warn = instance.create_text("warn", Style::new()).unwrap();
    instance.append_child(line, warn).unwrap();
    instance.tick().unwrap();

    assert_eq!(instance.last_frame(), "warn");
    assert!(instance.last_frame_ansi().contains("\x1b[31m"));
}

#[test]
fn centered_child_sits_on_middle_row() {
    let (_term, mut instance) = mount_mode(10, 6, RenderMode::Inline);
    let root = instance.root();
    let panel = instance
        .create_node(
            NodeKind::Box,
            Style::new().height(3).align_items(AlignItems::Center),
        )
        .unwrap();
    instance.append_child(root, panel).unwrap();
    let label = instance.create_text("Test", Style::new()).unwrap();
    instance.append_child(panel, label).unwrap();
    instance.tick().unwrap();

    assert_eq!(instance.last_frame(), "\nTest\n");
}

#[test]
fn justify_center_in_column() {
    let (_term, mut instance) = mount_mode(10, 6, RenderMode::Inline);
    let root = instance.root();
    let column = instance
        .create_node(
            NodeKind::Box,
            Style::new()
                .height(3)
                .flex_direction(FlexDirection::Column)
                .justify_content(JustifyContent::Center),
        )
        .unwrap();
    instance.append_child(root, column).unwrap();
    let label = instance.create_text("Test", Style::new()).unwrap();
    instance.append_child(column, label).unwrap();
    instance.tick().unwrap();

    assert_eq!(instance.last_frame(), "\nTest\n");
}

#[test]
fn row_gap_leaves_one_blank_column() {
    let (_term, mut instance) = mount_mode(10, 6, RenderMode::Inline);
    let root = instance.root();
    let row = instance
        .create_node(NodeKind::Box, Style::new().flex_direction(FlexDirection::Row).gap(1))
        .unwrap();
    instance.append_child(root, row).unwrap();
    for letter in ["A", "B"] {
        let cell = instance.create_text(letter, Style::new()).unwrap();
        instance.append_child(row, cell).unwrap();
    }
    instance.tick().unwrap();

    assert_eq!(instance.last_frame(), "A B");
}

#[test]
fn end_truncation_in_ten_column_box() {
    let (_term, mut instance) = mount_mode(20, 6, RenderMode::Inline);
    let root = instance.root();
    for content in ["Hello World!", "Hi there"] {
        let cell = instance.create_node(NodeKind::Box, Style::new().width(10)).unwrap();
        instance.append_child(root, cell).unwrap();
        let text = instance
            .create_text(content, Style::new().wrap(TextWrap::Truncate))
            .unwrap();
        instance.append_child(cell, text).unwrap();
    }
    instance.tick().unwrap();

    assert_eq!(instance.last_frame(), "Hello Wor…\nHi there");
}

#[test]
fn last_frame_matches_one_shot_render() {
    let (_term, mut instance) = mount_mode(24, 10, RenderMode::Inline);
    let root = instance.root();
    let panel = instance
        .create_node(
            NodeKind::Box,
            Style::new()
                .border_style(BorderStyle::Round)
                .padding(Edges::xy(1, 0))
                .height(5)
                .flex_direction(FlexDirection::Column)
                .justify_content(JustifyContent::Center),
        )
        .unwrap();
    instance.append_child(root, panel).unwrap();
    let title = instance.create_text("status", Style::new().bold(true)).unwrap();
    let body = instance
        .create_text("all checks passed on main", Style::new().color(Rgba::GREEN))
        .unwrap();
    instance.append_child(panel, title).unwrap();
    instance.append_child(panel, body).unwrap();
    instance.tick().unwrap();

    let mut snapshot = instance.document().tree().clone();
    let one_shot = render_to_string(&mut snapshot, 24).unwrap();
    assert_eq!(instance.last_frame(), one_shot);
    assert_eq!(one_shot.lines().count(), 5);
}
