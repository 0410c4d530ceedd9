//! Raw terminal input decoding.
//!
//! A byte-at-a-time state machine turning stdin bytes into [`InputEvent`]s.
//! Partial sequences survive across reads, except for a bare ESC at the
//! end of a read, which is the Escape key.
//!
//! ```text
//!            ESC            [             0x40..=0x7E
//!   Idle ─────────► InEscape ───► InCsiParams ──────────► Idle (emit)
//!     │                │   O
//!     │                └───────► InSs3 ───────────────────► Idle (emit)
//!     │ 0xC0..=0xF7
//!     └──────────► InUtf8 ─── complete ───────────────────► Idle (emit)
//!
//!   CSI 200~ ──► InPaste ── CSI 201~ ──► Idle (emit Paste)
//! ```

use tracing::trace;

/// Longest CSI parameter run accepted before the sequence is discarded.
const MAX_CSI_LEN: usize = 64;

/// Default minimum size of a read treated as a paste.
pub const DEFAULT_PASTE_THRESHOLD: usize = 32;

const PASTE_END: &[u8] = b"\x1b[201~";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arrow {
    Up,
    Down,
    Left,
    Right,
}

/// A decoded key press.
///
/// Printable input carries its text in `character`; special keys set one of
/// the flags instead and leave `character` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Key {
    pub character: Option<String>,
    pub ctrl: bool,
    /// Alt/Option, sent as an ESC prefix or a modifier parameter.
    pub meta: bool,
    pub shift: bool,
    pub arrow: Option<Arrow>,
    /// F1 to F12.
    pub function_key: Option<u8>,
    pub return_key: bool,
    pub escape: bool,
    pub tab: bool,
    pub backspace: bool,
    pub delete: bool,
    pub page_up: bool,
    pub page_down: bool,
    pub home: bool,
    pub end: bool,
    pub insert: bool,
}

impl Key {
    /// A printable character. Uppercase letters report `shift`.
    pub fn char(c: char) -> Self {
        Self {
            character: Some(c.to_string()),
            shift: c.is_uppercase(),
            ..Self::default()
        }
    }

    /// Ctrl plus a character, e.g. `Key::ctrl('c')`.
    pub fn ctrl(c: char) -> Self {
        Self {
            character: Some(c.to_string()),
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn arrow(arrow: Arrow) -> Self {
        Self {
            arrow: Some(arrow),
            ..Self::default()
        }
    }

    pub fn function(n: u8) -> Self {
        Self {
            function_key: Some(n),
            ..Self::default()
        }
    }

    fn special(set: impl FnOnce(&mut Key)) -> Self {
        let mut key = Self::default();
        set(&mut key);
        key
    }

    pub fn return_key() -> Self {
        Self::special(|k| k.return_key = true)
    }

    pub fn escape() -> Self {
        Self::special(|k| k.escape = true)
    }

    pub fn tab() -> Self {
        Self::special(|k| k.tab = true)
    }

    pub fn backspace() -> Self {
        Self::special(|k| k.backspace = true)
    }

    /// Whether this is exactly Ctrl+`c` (no Alt).
    pub fn is_ctrl(&self, c: char) -> bool {
        self.ctrl && !self.meta && self.is_text(c)
    }

    /// Whether the key's text is `c`, ignoring modifiers.
    pub fn is_text(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.character.as_deref() == Some(c.encode_utf8(&mut buf))
    }

    fn with_modifiers(mut self, mods: Modifiers) -> Self {
        self.shift |= mods.shift;
        self.meta |= mods.meta;
        self.ctrl |= mods.ctrl;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    /// Text pasted in one go, bracketed or detected by size.
    Paste(String),
}

impl InputEvent {
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Self::Key(key) => Some(key),
            Self::Paste(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Modifiers {
    shift: bool,
    meta: bool,
    ctrl: bool,
}

impl Modifiers {
    /// xterm encoding: value = 1 + bits (shift 1, alt 2, ctrl 4, super 8).
    fn from_xterm(value: u32) -> Self {
        let bits = value.saturating_sub(1);
        Self {
            shift: bits & 1 != 0,
            meta: bits & (2 | 8) != 0,
            ctrl: bits & 4 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Idle,
    /// After ESC.
    InEscape,
    /// After ESC [, collecting parameter bytes.
    InCsiParams,
    /// After ESC O.
    InSs3,
    /// Collecting a multi-byte UTF-8 character.
    InUtf8 { expected: usize },
    /// Inside a bracketed paste.
    InPaste,
}

#[derive(Debug)]
pub struct InputParser {
    state: State,
    /// CSI parameters or UTF-8 bytes collected so far.
    seq: Vec<u8>,
    paste: Vec<u8>,
    /// An ESC prefix was seen: the next key is Alt-modified.
    meta: bool,
    paste_threshold: usize,
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InputParser {
    pub fn new() -> Self {
        Self::with_paste_threshold(DEFAULT_PASTE_THRESHOLD)
    }

    /// A threshold of zero disables size-based paste detection.
    pub fn with_paste_threshold(paste_threshold: usize) -> Self {
        Self {
            state: State::Idle,
            seq: Vec::with_capacity(MAX_CSI_LEN),
            paste: Vec::new(),
            meta: false,
            paste_threshold,
        }
    }

    /// Whether a partial sequence is waiting for more bytes.
    pub fn has_pending(&self) -> bool {
        self.state != State::Idle
    }

    /// Decode one read's worth of bytes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<InputEvent> {
        if let Some(text) = self.as_paste(bytes) {
            trace!(len = text.len(), "paste detected by size");
            return vec![InputEvent::Paste(text)];
        }

        let mut events = Vec::new();
        for &byte in bytes {
            if let Some(event) = self.process(byte) {
                events.push(event);
            }
        }

        if self.state == State::InEscape {
            let meta = std::mem::take(&mut self.meta);
            self.state = State::Idle;
            events.push(InputEvent::Key(Key {
                meta,
                ..Key::escape()
            }));
        }
        events
    }

    /// Abandon any partial sequence (a read timed out mid-sequence). A lone
    /// ESC never waits here: [`InputParser::feed`] decodes it at the end of
    /// its read.
    pub fn flush_pending(&mut self) -> Vec<InputEvent> {
        let events = match self.state {
            State::InPaste => {
                let text = String::from_utf8_lossy(&self.paste).into_owned();
                vec![InputEvent::Paste(text)]
            }
            _ => Vec::new(),
        };
        if self.state != State::Idle {
            trace!(state = ?self.state, "dropping partial input sequence");
        }
        self.state = State::Idle;
        self.seq.clear();
        self.paste.clear();
        self.meta = false;
        events
    }

    fn as_paste(&self, bytes: &[u8]) -> Option<String> {
        if self.paste_threshold == 0
            || bytes.len() < self.paste_threshold
            || self.state != State::Idle
        {
            return None;
        }
        let printable = bytes
            .iter()
            .all(|&b| (b >= 0x20 && b != 0x7F) || matches!(b, b'\n' | b'\r' | b'\t'));
        if !printable {
            return None;
        }
        std::str::from_utf8(bytes).ok().map(str::to_string)
    }

    fn process(&mut self, byte: u8) -> Option<InputEvent> {
        let event = match self.state {
            State::Idle => self.process_idle(byte),
            State::InEscape => self.process_escape(byte),
            State::InCsiParams => self.process_csi(byte),
            State::InSs3 => self.process_ss3(byte),
            State::InUtf8 { expected } => self.process_utf8(byte, expected),
            State::InPaste => return self.process_paste(byte),
        };
        event.map(|key| {
            let key = Key {
                meta: key.meta || std::mem::take(&mut self.meta),
                ..key
            };
            trace!(?key, "key decoded");
            InputEvent::Key(key)
        })
    }

    fn process_idle(&mut self, byte: u8) -> Option<Key> {
        match byte {
            0x1B => {
                self.state = State::InEscape;
                None
            }
            0x00 => Some(Key::ctrl(' ')),
            0x09 => Some(Key::tab()),
            0x0A | 0x0D => Some(Key::return_key()),
            0x08 | 0x7F => Some(Key::backspace()),
            0x01..=0x1A => Some(Key::ctrl((byte - 1 + b'a') as char)),
            0x1C => Some(Key::ctrl('\\')),
            0x1D => Some(Key::ctrl(']')),
            0x1E => Some(Key::ctrl('^')),
            0x1F => Some(Key::ctrl('_')),
            0x20..=0x7E => Some(Key::char(byte as char)),
            0xC0..=0xDF => self.begin_utf8(byte, 2),
            0xE0..=0xEF => self.begin_utf8(byte, 3),
            0xF0..=0xF7 => self.begin_utf8(byte, 4),
            _ => None,
        }
    }

    fn begin_utf8(&mut self, byte: u8, expected: usize) -> Option<Key> {
        self.seq.clear();
        self.seq.push(byte);
        self.state = State::InUtf8 { expected };
        None
    }

    fn process_utf8(&mut self, byte: u8, expected: usize) -> Option<Key> {
        if byte & 0xC0 != 0x80 {
            // Truncated character: drop it and decode this byte afresh.
            self.state = State::Idle;
            self.seq.clear();
            return self.process_idle(byte);
        }
        self.seq.push(byte);
        if self.seq.len() < expected {
            return None;
        }
        self.state = State::Idle;
        let decoded = std::str::from_utf8(&self.seq)
            .ok()
            .and_then(|s| s.chars().next());
        self.seq.clear();
        decoded.map(Key::char)
    }

    fn process_escape(&mut self, byte: u8) -> Option<Key> {
        match byte {
            b'[' => {
                self.state = State::InCsiParams;
                self.seq.clear();
                None
            }
            b'O' => {
                self.state = State::InSs3;
                None
            }
            0x1B => {
                // ESC ESC: Alt plus whatever the second ESC starts.
                self.meta = true;
                None
            }
            _ => {
                self.state = State::Idle;
                self.meta = true;
                self.process_idle(byte)
            }
        }
    }

    fn process_ss3(&mut self, byte: u8) -> Option<Key> {
        self.state = State::Idle;
        match byte {
            b'A' => Some(Key::arrow(Arrow::Up)),
            b'B' => Some(Key::arrow(Arrow::Down)),
            b'C' => Some(Key::arrow(Arrow::Right)),
            b'D' => Some(Key::arrow(Arrow::Left)),
            b'H' => Some(Key::special(|k| k.home = true)),
            b'F' => Some(Key::special(|k| k.end = true)),
            b'M' => Some(Key::return_key()),
            b'P'..=b'S' => Some(Key::function(byte - b'P' + 1)),
            _ => None,
        }
    }

    fn process_csi(&mut self, byte: u8) -> Option<Key> {
        match byte {
            0x20..=0x3F => {
                if self.seq.len() >= MAX_CSI_LEN {
                    trace!("oversized CSI sequence dropped");
                    self.state = State::Idle;
                    self.seq.clear();
                    return None;
                }
                self.seq.push(byte);
                None
            }
            0x40..=0x7E => {
                self.state = State::Idle;
                let params = std::mem::take(&mut self.seq);
                let key = self.csi_key(&params, byte);
                self.seq = params;
                self.seq.clear();
                key
            }
            _ => {
                self.state = State::Idle;
                self.seq.clear();
                None
            }
        }
    }

    fn csi_key(&mut self, params: &[u8], final_byte: u8) -> Option<Key> {
        let params = std::str::from_utf8(params).ok()?;
        let mut fields = params.split(';');
        let first = fields.next().unwrap_or("");
        let mods = fields
            .next()
            .and_then(|m| m.split(':').next())
            .and_then(|m| m.parse().ok())
            .map(Modifiers::from_xterm)
            .unwrap_or_default();

        let key = match final_byte {
            b'A' => Key::arrow(Arrow::Up),
            b'B' => Key::arrow(Arrow::Down),
            b'C' => Key::arrow(Arrow::Right),
            b'D' => Key::arrow(Arrow::Left),
            b'H' => Key::special(|k| k.home = true),
            b'F' => Key::special(|k| k.end = true),
            b'P'..=b'S' => Key::function(final_byte - b'P' + 1),
            b'Z' => Key {
                shift: true,
                ..Key::tab()
            },
            b'~' => return self.tilde_key(first, mods),
            b'u' => return kitty_key(params),
            _ => return None,
        };
        Some(key.with_modifiers(mods))
    }

    fn tilde_key(&mut self, first: &str, mods: Modifiers) -> Option<Key> {
        let key = match first.parse::<u32>().ok()? {
            1 | 7 => Key::special(|k| k.home = true),
            2 => Key::special(|k| k.insert = true),
            3 => Key::special(|k| k.delete = true),
            4 | 8 => Key::special(|k| k.end = true),
            5 => Key::special(|k| k.page_up = true),
            6 => Key::special(|k| k.page_down = true),
            n @ 11..=15 => Key::function((n - 10) as u8),
            n @ 17..=21 => Key::function((n - 11) as u8),
            n @ 23..=24 => Key::function((n - 12) as u8),
            200 => {
                self.state = State::InPaste;
                self.paste.clear();
                return None;
            }
            _ => return None,
        };
        Some(key.with_modifiers(mods))
    }

    fn process_paste(&mut self, byte: u8) -> Option<InputEvent> {
        self.paste.push(byte);
        if !self.paste.ends_with(PASTE_END) {
            return None;
        }
        self.paste.truncate(self.paste.len() - PASTE_END.len());
        self.state = State::Idle;
        let text = String::from_utf8_lossy(&self.paste).into_owned();
        self.paste.clear();
        trace!(len = text.len(), "bracketed paste");
        Some(InputEvent::Paste(text))
    }
}

/// `CSI keycode[:alternates] ; modifiers[:event] u` (kitty keyboard
/// protocol). Release events are dropped.
fn kitty_key(params: &str) -> Option<Key> {
    let mut fields = params.split(';');
    let code: u32 = fields.next()?.split(':').next()?.parse().ok()?;
    let mut modifier_field = fields.next().unwrap_or("").split(':');
    let mods = modifier_field
        .next()
        .and_then(|m| m.parse().ok())
        .map(Modifiers::from_xterm)
        .unwrap_or_default();
    if modifier_field.next() == Some("3") {
        return None;
    }

    let key = match code {
        9 => Key::tab(),
        13 => Key::return_key(),
        27 => Key::escape(),
        8 | 127 => Key::backspace(),
        57_399..=57_408 => Key::char(char::from_digit(code - 57_399, 10)?),
        57_344..=63_743 => return None,
        _ => Key {
            character: Some(char::from_u32(code)?.to_string()),
            ..Key::default()
        },
    };
    Some(key.with_modifiers(mods))
}
