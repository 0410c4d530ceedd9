//! Mount API - instance lifecycle and the event loop.
//!
//! [`mount`] takes a [`Backend`], picks a render mode and returns an
//! [`Instance`]. The instance owns everything: the [`Document`], the
//! renderer, the input parser and subscribers, raw-mode state and the event
//! queue. Nothing is process-wide except raw-mode ownership of the real
//! terminal and the panic hook.
//!
//! # Example
//!
//! ```
//! use weft::pipeline::{mount, MountOptions, TestBackend};
//! use weft::{RenderMode, Style};
//!
//! let term = TestBackend::new(20, 5);
//! let options = MountOptions {
//!     mode: Some(RenderMode::Inline),
//!     ..MountOptions::default()
//! };
//! let mut instance = mount(term.clone(), options).unwrap();
//!
//! let label = instance.create_text("Count: 0", Style::new()).unwrap();
//! instance.append_child(instance.root(), label).unwrap();
//! instance.tick().unwrap();
//! assert_eq!(instance.last_frame(), "Count: 0");
//!
//! instance.set_text(label, "Count: 1").unwrap();
//! instance.tick().unwrap();
//! assert_eq!(instance.last_frame(), "Count: 1");
//!
//! instance.unmount().unwrap();
//! ```

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::compose::compose;
use super::document::{Document, ExitRequest};
use super::scheduler::{LoopEvent, Remote, Scheduler};
use super::terminal::{install_panic_hook, Backend, CrosstermBackend};
use crate::engine::{NodeId, NodeKind, Style};
use crate::error::{EngineError, Result};
use crate::input::{InputEvent, InputParser, DEFAULT_PASTE_THRESHOLD};
use crate::layout::{compute_layout, MeasureCache};
use crate::renderer::{row_to_ansi, FrameBuffer, Renderer};
use crate::state::{
    FocusChange, GlobalAction, GlobalKeys, InputDispatcher, Propagation, SubscribeOptions,
    SubscriptionId,
};
use crate::types::{RenderMode, Size};

/// How long a partial sequence split across reads may wait for the rest of
/// its bytes before it is flushed.
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Focus listeners may trigger further focus changes; delivery stops after
/// this many rounds.
const MAX_FOCUS_ROUNDS: usize = 8;

const FALLBACK_SIZE: (u16, u16) = (80, 24);

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// `None` picks inline on a terminal and plain otherwise.
    pub mode: Option<RenderMode>,
    pub exit_on_ctrl_c: bool,
    /// Tab / Shift+Tab cycle focus, Esc blurs.
    pub focus_navigation: bool,
    /// Erase the live region on unmount.
    pub clear_on_exit: bool,
    /// Render passes per second at most. Zero disables throttling.
    pub max_fps: u32,
    /// Reads at least this long are treated as a paste. Zero disables it.
    pub paste_threshold: usize,
    /// Layout width; `None` uses the terminal width.
    pub width: Option<u16>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            mode: None,
            exit_on_ctrl_c: true,
            focus_navigation: true,
            clear_on_exit: false,
            max_fps: 30,
            paste_threshold: DEFAULT_PASTE_THRESHOLD,
            width: None,
        }
    }
}

impl MountOptions {
    /// Defaults overridden by `WEFT_MODE`, `WEFT_MAX_FPS` and `CI`.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`. `CI` wins over `WEFT_MODE`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("WEFT_MODE") {
            match RenderMode::parse(&value) {
                Some(mode) => self.mode = Some(mode),
                None => warn!(value = %value, "ignoring unknown WEFT_MODE"),
            }
        }
        if let Some(value) = lookup("WEFT_MAX_FPS") {
            match value.trim().parse() {
                Ok(fps) => self.max_fps = fps,
                Err(_) => warn!(value = %value, "ignoring invalid WEFT_MAX_FPS"),
            }
        }
        if lookup("CI").is_some_and(|v| !v.is_empty() && v != "0" && v != "false") {
            self.mode = Some(RenderMode::Plain);
        }
        self
    }
}

// =============================================================================
// Instance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusListenerId(u64);

type FocusListener = Box<dyn FnMut(&FocusChange, &mut Document)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawMode {
    Off,
    On,
    /// Enabling failed once; input stays disabled.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExitReason {
    Requested,
    Error(String),
    Signal(i32),
}

/// A mounted tree bound to a terminal.
pub struct Instance<B: Backend> {
    backend: B,
    document: Document,
    renderer: Renderer,
    mode: RenderMode,
    options: MountOptions,
    scheduler: Scheduler,
    parser: InputParser,
    dispatcher: InputDispatcher<Document>,
    global_keys: GlobalKeys,
    focus_listeners: Vec<(FocusListenerId, FocusListener)>,
    next_listener: u64,
    cache: MeasureCache,
    size: (u16, u16),
    raw: RawMode,
    input_started: bool,
    escape_since: Option<Instant>,
    rendered_generation: Option<u64>,
    force_render: bool,
    last_frame: Option<FrameBuffer>,
    exit: Option<ExitReason>,
    mounted: bool,
    #[cfg(unix)]
    signals: Option<super::terminal::SignalGuard>,
}

impl<B: Backend> std::fmt::Debug for Instance<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("mode", &self.mode)
            .field("size", &self.size)
            .field("raw", &self.raw)
            .field("mounted", &self.mounted)
            .field("nodes", &self.document.tree().len())
            .field("subscribers", &self.dispatcher.len())
            .finish()
    }
}

/// Mount an empty document on `backend`.
pub fn mount<B: Backend>(mut backend: B, options: MountOptions) -> Result<Instance<B>> {
    let size = match backend.size() {
        Ok((w, h)) if w > 0 && h > 0 => (w, h),
        Ok(_) | Err(_) => {
            warn!("terminal size unavailable, assuming 80x24");
            FALLBACK_SIZE
        }
    };
    let mode = options.mode.unwrap_or(if backend.is_interactive() {
        RenderMode::Inline
    } else {
        RenderMode::Plain
    });

    let mut renderer = Renderer::for_mode(mode);
    renderer.enter(&mut backend)?;
    backend.flush()?;

    let scheduler = Scheduler::new(options.max_fps);

    let owns_terminal = mode.is_interactive() && backend.owns_process_terminal();
    if owns_terminal {
        install_panic_hook();
    }
    #[cfg(unix)]
    let signals = if owns_terminal {
        match scheduler.remote().map(super::terminal::SignalGuard::new) {
            Some(Ok(guard)) => Some(guard),
            Some(Err(err)) => {
                warn!(error = %err, "signal handling unavailable");
                None
            }
            None => None,
        }
    } else {
        None
    };

    info!(?mode, width = size.0, height = size.1, "mounted");

    Ok(Instance {
        backend,
        document: Document::new(),
        renderer,
        mode,
        parser: InputParser::with_paste_threshold(options.paste_threshold),
        global_keys: GlobalKeys {
            exit_on_ctrl_c: options.exit_on_ctrl_c,
            focus_navigation: options.focus_navigation,
        },
        options,
        scheduler,
        dispatcher: InputDispatcher::new(),
        focus_listeners: Vec::new(),
        next_listener: 0,
        cache: MeasureCache::new(),
        size,
        raw: RawMode::Off,
        input_started: false,
        escape_since: None,
        rendered_generation: None,
        force_render: true,
        last_frame: None,
        exit: None,
        mounted: true,
        #[cfg(unix)]
        signals,
    })
}

/// Mount on the process's stdout with options from the environment.
pub fn mount_stdout() -> Result<Instance<CrosstermBackend>> {
    mount(CrosstermBackend::new(), MountOptions::from_env())
}

impl<B: Backend> Instance<B> {
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A thread-safe handle for queuing work into this instance.
    pub fn remote(&self) -> Result<Remote> {
        self.scheduler.remote().ok_or(EngineError::Unmounted)
    }

    pub fn is_raw_mode(&self) -> bool {
        self.raw == RawMode::On
    }

    /// Terminal columns and rows as last reported.
    pub fn terminal_size(&self) -> (u16, u16) {
        self.size
    }

    // =========================================================================
    // Tree mutation (mirrors Document)
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.document.root()
    }

    pub fn create_node(&mut self, kind: NodeKind, style: Style) -> Result<NodeId> {
        self.document.create_node(kind, style)
    }

    pub fn create_text(&mut self, text: impl Into<String>, style: Style) -> Result<NodeId> {
        self.document.create_text(text, style)
    }

    pub fn set_style(&mut self, id: NodeId, patch: &Style) -> Result<()> {
        self.document.set_style(id, patch)
    }

    pub fn replace_style(&mut self, id: NodeId, style: Style) -> Result<()> {
        self.document.replace_style(id, style)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        self.document.set_text(id, text)
    }

    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        self.document.insert_child(parent, child, index)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.document.append_child(parent, child)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.document.remove_child(parent, child)
    }

    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        self.document.destroy(id)
    }

    pub fn set_focusable(&mut self, id: NodeId, focusable: bool) -> Result<()> {
        self.document.set_focusable(id, focusable)
    }

    pub fn set_static(&mut self, id: NodeId, is_static: bool) -> Result<()> {
        self.document.set_static(id, is_static)
    }

    pub fn append_static(&mut self, content: impl Into<String>) -> Result<NodeId> {
        self.document.append_static(content)
    }

    pub fn measure_text(&self, id: NodeId) -> Result<Size> {
        self.document.measure_text(id)
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Add an input subscriber. The handler gets every decoded event that
    /// the global keys did not consume, with mutable access to the document.
    pub fn subscribe<F, R>(&mut self, handler: F, options: SubscribeOptions) -> SubscriptionId
    where
        F: FnMut(&InputEvent, &mut Document) -> R + 'static,
        R: Into<Propagation>,
    {
        let id = self.dispatcher.subscribe(handler, options);
        self.sync_raw_mode();
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let removed = self.dispatcher.unsubscribe(id);
        self.sync_raw_mode();
        removed
    }

    pub fn set_input_active(&mut self, id: SubscriptionId, active: bool) -> bool {
        let found = self.dispatcher.set_active(id, active);
        self.sync_raw_mode();
        found
    }

    /// Decode `bytes` and deliver the events, as if read from stdin.
    /// Ignored once unmounted.
    pub fn handle_input(&mut self, bytes: &[u8]) {
        if !self.mounted {
            return;
        }
        let events = self.parser.feed(bytes);
        self.escape_since = if self.parser.has_pending() {
            Some(self.escape_since.unwrap_or_else(Instant::now))
        } else {
            None
        };
        for event in events {
            self.dispatch_event(event);
        }
        self.deliver_focus_changes();
    }

    fn dispatch_event(&mut self, event: InputEvent) {
        if !self.mounted {
            return;
        }
        trace!(?event, "input");
        if let InputEvent::Key(key) = &event {
            match self.global_keys.handle(key, self.document.focus_manager_mut()) {
                GlobalAction::Exit => {
                    info!("exit requested by Ctrl+C");
                    self.document.exit();
                    return;
                }
                GlobalAction::Consumed => return,
                GlobalAction::Continue => {}
            }
        }
        self.dispatcher.dispatch(&event, &mut self.document);
    }

    /// Decode a partial sequence that has waited long enough.
    fn flush_stale_escape(&mut self, now: Instant) {
        let Some(since) = self.escape_since else {
            return;
        };
        if now.saturating_duration_since(since) < ESCAPE_TIMEOUT {
            return;
        }
        self.escape_since = None;
        for event in self.parser.flush_pending() {
            self.dispatch_event(event);
        }
    }

    /// Raw mode and the stdin reader follow the active subscribers.
    fn sync_raw_mode(&mut self) {
        if !self.mounted || !self.mode.is_interactive() {
            return;
        }
        let wanted = self.dispatcher.has_active();
        match (wanted, self.raw) {
            (true, RawMode::Off) => match self.backend.enable_raw_mode() {
                Ok(()) => {
                    info!("raw mode enabled");
                    self.raw = RawMode::On;
                    self.start_input();
                }
                Err(err) => {
                    warn!(error = %err, "raw mode unavailable, keyboard input disabled");
                    self.raw = RawMode::Unavailable;
                }
            },
            (false, RawMode::On) => {
                match self.backend.disable_raw_mode() {
                    Ok(()) => info!("raw mode disabled"),
                    Err(err) => warn!(error = %err, "failed to restore terminal mode"),
                }
                self.raw = RawMode::Off;
            }
            _ => {}
        }
    }

    fn start_input(&mut self) {
        if self.input_started {
            return;
        }
        let Some(remote) = self.scheduler.remote() else {
            return;
        };
        let sink = Box::new(move |bytes: Vec<u8>| remote.send(LoopEvent::Input(bytes)).is_ok());
        match self.backend.start_input(sink) {
            Ok(()) => self.input_started = true,
            Err(err) => warn!(error = %err, "failed to start input reader"),
        }
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Call `listener` with every focus change, after the input or update
    /// that caused it.
    pub fn on_focus_change<F>(&mut self, listener: F) -> FocusListenerId
    where
        F: FnMut(&FocusChange, &mut Document) + 'static,
    {
        let id = FocusListenerId(self.next_listener);
        self.next_listener += 1;
        self.focus_listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_focus_listener(&mut self, id: FocusListenerId) -> bool {
        let before = self.focus_listeners.len();
        self.focus_listeners.retain(|(l, _)| *l != id);
        self.focus_listeners.len() != before
    }

    fn deliver_focus_changes(&mut self) {
        for _ in 0..MAX_FOCUS_ROUNDS {
            let changes = self.document.focus_manager_mut().take_changes();
            if changes.is_empty() {
                return;
            }
            for change in &changes {
                debug!(previous = ?change.previous, current = ?change.current, "focus changed");
                for (_, listener) in &mut self.focus_listeners {
                    listener(change, &mut self.document);
                }
            }
        }
        warn!("focus listeners kept changing focus; dropping further changes");
        self.document.focus_manager_mut().take_changes();
    }

    // =========================================================================
    // Loop
    // =========================================================================

    /// Process queued events and render if anything changed.
    ///
    /// Returns `Ok(false)` once the instance has unmounted.
    pub fn tick(&mut self) -> Result<bool> {
        if !self.mounted {
            return Ok(false);
        }
        for event in self.scheduler.try_drain() {
            self.apply_event(event);
        }
        self.flush_stale_escape(Instant::now());
        self.deliver_focus_changes();

        if self.exit_reason().is_some() {
            self.unmount()?;
            return Ok(false);
        }

        self.sync_raw_mode();
        if self.needs_render() && self.scheduler.should_render_now(Instant::now()) {
            self.render_pass()?;
        }
        Ok(true)
    }

    /// Run the loop until exit is requested, then unmount.
    ///
    /// Returns the error passed to [`Document::exit_with_error`], or
    /// [`EngineError::Terminated`] after a termination signal.
    pub fn wait_until_exit(&mut self) -> Result<()> {
        while self.tick()? {
            let timeout = self.next_wakeup(Instant::now());
            self.scheduler.wait(timeout);
        }
        match self.exit.take() {
            None | Some(ExitReason::Requested) => Ok(()),
            Some(ExitReason::Error(message)) => Err(EngineError::Exited(message)),
            Some(ExitReason::Signal(signal)) => Err(EngineError::Terminated(signal)),
        }
    }

    fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        let frame = self.needs_render().then(|| self.scheduler.frame_delay(now));
        let escape = self
            .escape_since
            .map(|since| (since + ESCAPE_TIMEOUT).saturating_duration_since(now));
        match (frame, escape) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn apply_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Input(bytes) => self.handle_input(&bytes),
            LoopEvent::Resize(width, height) => self.resize(width, height),
            LoopEvent::Signal(signal) => {
                warn!(signal, "terminating");
                self.exit.get_or_insert(ExitReason::Signal(signal));
            }
            LoopEvent::Wake => self.force_render = true,
            LoopEvent::Update(update) => update(&mut self.document),
            LoopEvent::Exit => self.document.exit(),
        }
    }

    fn exit_reason(&mut self) -> Option<&ExitReason> {
        if self.exit.is_none() {
            self.exit = match self.document.exit_requested() {
                Some(ExitRequest::Ok) => Some(ExitReason::Requested),
                Some(ExitRequest::Error(message)) => Some(ExitReason::Error(message.clone())),
                None => None,
            };
        }
        self.exit.as_ref()
    }

    /// The terminal changed size: relayout and repaint in full.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width == 0 || height == 0 {
            return;
        }
        debug!(width, height, "resize");
        self.size = (width, height);
        self.renderer.invalidate();
        self.scheduler.reset_pacing();
        self.force_render = true;
    }

    /// Forget what is on screen; the next pass repaints fully.
    pub fn invalidate(&mut self) {
        self.renderer.invalidate();
        self.force_render = true;
    }

    fn needs_render(&self) -> bool {
        self.force_render || self.rendered_generation != Some(self.document.generation())
    }

    /// Render immediately, ignoring the frame throttle.
    pub fn render_now(&mut self) -> Result<()> {
        if !self.mounted {
            return Err(EngineError::Unmounted);
        }
        self.render_pass()
    }

    fn layout_width(&self) -> u16 {
        self.options.width.unwrap_or(self.size.0).max(1)
    }

    fn render_pass(&mut self) -> Result<()> {
        let width = self.layout_width();
        let rows = self.size.1;
        let (layout_height, max_height) = match self.mode {
            RenderMode::Inline => (None, Some(rows.saturating_sub(1).max(1))),
            RenderMode::Fullscreen => (Some(rows), Some(rows)),
            RenderMode::Plain => (None, None),
        };

        compute_layout(self.document.tree_mut(), width, layout_height, &mut self.cache);
        let frame = compose(self.document.tree(), width, max_height)?;

        let mut bytes = 0;
        if frame.has_static() {
            bytes += self.renderer.write_static(&frame.static_lines, &mut self.backend)?;
            self.document.release_static(&frame.static_nodes)?;
        }
        bytes += self.renderer.render(&frame.live, &mut self.backend)?;
        self.backend.flush()?;

        debug!(
            rows = frame.live.height(),
            bytes,
            static_rows = frame.static_rows(),
            "render pass"
        );
        self.last_frame = Some(frame.live);
        self.rendered_generation = Some(self.document.generation());
        self.force_render = false;
        self.scheduler.mark_rendered(Instant::now());
        Ok(())
    }

    /// Every row of the last live frame as plain text, joined with `\n`.
    /// Trailing spaces on each row are dropped; rows are not.
    pub fn last_frame(&self) -> String {
        self.last_frame
            .as_ref()
            .map(|frame| frame.to_plain_lines().join("\n"))
            .unwrap_or_default()
    }

    /// Like [`Instance::last_frame`], with SGR styling.
    pub fn last_frame_ansi(&self) -> String {
        self.last_frame
            .as_ref()
            .map(|frame| frame.rows().map(row_to_ansi).collect::<Vec<_>>().join("\n"))
            .unwrap_or_default()
    }

    /// Print text that is not part of the tree above the live region.
    pub fn write_external(&mut self, text: &str) -> Result<()> {
        if !self.mounted {
            return Err(EngineError::Unmounted);
        }
        self.renderer.write_external(text, &mut self.backend)?;
        self.backend.flush()?;
        self.force_render = true;
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Tear down: final pass, optional clear, terminal restore. Calling it
    /// again does nothing.
    pub fn unmount(&mut self) -> Result<()> {
        if !self.mounted {
            return Ok(());
        }
        let mut first_error: Option<EngineError> = None;
        let mut record = |result: Result<()>| {
            if let Err(err) = result {
                warn!(error = %err, "teardown step failed");
                first_error.get_or_insert(err);
            }
        };

        if self.needs_render() {
            record(self.render_pass());
        }
        self.mounted = false;

        if self.options.clear_on_exit {
            record(self.renderer.clear(&mut self.backend).map(drop).map_err(Into::into));
        }
        record(self.renderer.leave(&mut self.backend).map(drop).map_err(Into::into));
        record(self.backend.flush().map_err(Into::into));

        self.backend.stop_input();
        self.input_started = false;
        self.dispatcher.clear();
        self.parser.flush_pending();
        self.escape_since = None;
        if self.raw == RawMode::On {
            record(self.backend.disable_raw_mode().map_err(Into::into));
            info!("raw mode disabled");
        }
        self.raw = RawMode::Off;

        self.release_signals();
        self.scheduler.close();
        info!("unmounted");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<B: Backend> Instance<B> {
    #[cfg(unix)]
    fn release_signals(&mut self) {
        if let Some(guard) = self.signals.take() {
            guard.mark_restored();
        }
    }

    #[cfg(not(unix))]
    fn release_signals(&mut self) {}
}

impl<B: Backend> Drop for Instance<B> {
    fn drop(&mut self) {
        let _ = self.unmount();
    }
}

// =============================================================================
// Tests
// =============================================================================
