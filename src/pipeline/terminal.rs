//! Terminal I/O behind the [`Backend`] trait.
//!
//! - [`CrosstermBackend`]: the process's stdout/stdin, raw mode via crossterm
//! - [`TestBackend`]: in-memory terminal with scriptable size, input and
//!   raw-mode availability
//!
//! Also home to the process-wide restore path: the panic hook and the
//! signal thread both fall back to [`best_effort_cleanup`].

use std::cell::RefCell;
use std::io::{self, IsTerminal, Write};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::{debug, warn};

use crate::input::{InputSink, StdinReader};
use crate::renderer::ansi;

/// Terminal operations an instance needs. Output goes through `Write`.
pub trait Backend: Write {
    /// Columns and rows.
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Whether output reaches an interactive terminal.
    fn is_interactive(&self) -> bool;

    fn enable_raw_mode(&mut self) -> io::Result<()>;

    fn disable_raw_mode(&mut self) -> io::Result<()>;

    /// Start forwarding raw input bytes to `sink`.
    fn start_input(&mut self, sink: InputSink) -> io::Result<()>;

    fn stop_input(&mut self);

    /// Whether the process-wide restore path (signal thread, panic hook)
    /// applies to this backend.
    fn owns_process_terminal(&self) -> bool {
        false
    }
}

// =============================================================================
// Real terminal
// =============================================================================

/// Set while some [`CrosstermBackend`] has the real terminal in raw mode.
static RAW_MODE_OWNED: AtomicBool = AtomicBool::new(false);

#[derive(Debug)]
pub struct CrosstermBackend {
    stdout: io::Stdout,
    interactive: bool,
    raw: bool,
    reader: Option<StdinReader>,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        let stdout = io::stdout();
        let interactive = stdout.is_terminal();
        Self {
            stdout,
            interactive,
            raw: false,
            reader: None,
        }
    }
}

impl Write for CrosstermBackend {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stdout.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

impl Backend for CrosstermBackend {
    fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        if self.raw {
            return Ok(());
        }
        if !io::stdin().is_terminal() {
            return Err(io::Error::other("stdin is not a terminal"));
        }
        if RAW_MODE_OWNED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(io::Error::other("raw mode is owned by another instance"));
        }
        if let Err(err) = crossterm::terminal::enable_raw_mode() {
            RAW_MODE_OWNED.store(false, Ordering::SeqCst);
            return Err(err);
        }
        ansi::enable_bracketed_paste(&mut self.stdout)?;
        self.stdout.flush()?;
        self.raw = true;
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if !self.raw {
            return Ok(());
        }
        self.raw = false;
        let paste = ansi::disable_bracketed_paste(&mut self.stdout).and_then(|_| self.stdout.flush());
        let result = crossterm::terminal::disable_raw_mode();
        RAW_MODE_OWNED.store(false, Ordering::SeqCst);
        paste.and(result)
    }

    fn start_input(&mut self, sink: InputSink) -> io::Result<()> {
        if self.reader.is_none() {
            self.reader = Some(StdinReader::spawn(sink)?);
        }
        Ok(())
    }

    fn stop_input(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
    }

    fn owns_process_terminal(&self) -> bool {
        self.interactive
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        self.stop_input();
        let _ = self.disable_raw_mode();
    }
}

/// Restore the real terminal without any instance state: reset styles,
/// leave the alternate screen, show the cursor, drop raw mode.
pub fn best_effort_cleanup() {
    let mut stdout = io::stdout();
    let _ = ansi::reset(&mut stdout);
    let _ = ansi::disable_bracketed_paste(&mut stdout);
    let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
    let _ = crossterm::execute!(stdout, crossterm::cursor::Show);
    if RAW_MODE_OWNED.swap(false, Ordering::SeqCst) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
    let _ = stdout.flush();
}

/// Chain a hook that restores the terminal before the previous panic hook
/// prints. Installed at most once per process.
pub fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

// =============================================================================
// Signals
// =============================================================================

/// How long the signal thread waits for the loop to tear down before it
/// restores the terminal itself.
pub const SIGNAL_GRACE: Duration = Duration::from_millis(500);

/// Forwards SIGWINCH as resizes and SIGINT/SIGTERM as termination requests.
///
/// After a termination signal the process exits with `128 + signal`, once
/// the loop reports the terminal restored or [`SIGNAL_GRACE`] passes.
#[cfg(unix)]
#[derive(Debug)]
pub(crate) struct SignalGuard {
    handle: signal_hook::iterator::Handle,
    restored: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl SignalGuard {
    pub(crate) fn new(remote: super::scheduler::Remote) -> io::Result<Self> {
        use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGWINCH};
        use signal_hook::iterator::Signals;

        use super::scheduler::LoopEvent;

        let mut signals = Signals::new([SIGINT, SIGTERM, SIGWINCH])?;
        let handle = signals.handle();
        let restored = Arc::new(AtomicBool::new(false));
        let restored_flag = restored.clone();
        let thread = std::thread::Builder::new()
            .name("weft-signals".into())
            .spawn(move || {
                for signal in signals.forever() {
                    match signal {
                        SIGWINCH => {
                            if let Ok((width, height)) = crossterm::terminal::size() {
                                debug!(width, height, "SIGWINCH received");
                                let _ = remote.resize(width, height);
                            }
                        }
                        SIGINT | SIGTERM => {
                            warn!(signal, "termination signal received");
                            if remote.send(LoopEvent::Signal(signal)).is_ok() {
                                wait_for(&restored_flag, SIGNAL_GRACE);
                            }
                            if !restored_flag.load(Ordering::SeqCst) {
                                best_effort_cleanup();
                            }
                            std::process::exit(128 + signal);
                        }
                        _ => {}
                    }
                }
            })?;
        Ok(Self {
            handle,
            restored,
            thread: Some(thread),
        })
    }

    /// The loop finished restoring the terminal.
    pub(crate) fn mark_restored(&self) {
        self.restored.store(true, Ordering::SeqCst);
    }
}

#[cfg(unix)]
fn wait_for(flag: &AtomicBool, limit: Duration) {
    let step = Duration::from_millis(10);
    let mut waited = Duration::ZERO;
    while !flag.load(Ordering::SeqCst) && waited < limit {
        std::thread::sleep(step);
        waited += step;
    }
}

#[cfg(unix)]
impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.mark_restored();
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// =============================================================================
// In-memory terminal
// =============================================================================

/// State shared by every clone of a [`TestBackend`].
#[derive(Default)]
pub struct TestTerminal {
    pub output: Vec<u8>,
    pub width: u16,
    pub height: u16,
    pub interactive: bool,
    pub raw_mode: bool,
    /// When false, `enable_raw_mode` fails the way a non-TTY stdin does.
    pub raw_mode_available: bool,
    pub raw_mode_transitions: usize,
    /// Number of `write` calls that carried bytes.
    pub writes: usize,
    pub flushes: usize,
    sink: Option<InputSink>,
}

/// In-memory [`Backend`]. Clones share one [`TestTerminal`], so a test can
/// keep a handle while the instance owns another.
///
/// ```
/// use std::io::Write;
/// use weft::pipeline::{Backend, TestBackend};
///
/// let term = TestBackend::new(20, 5);
/// let mut backend = term.clone();
/// backend.write_all(b"hi").unwrap();
/// assert_eq!(term.output(), "hi");
/// assert_eq!(backend.size().unwrap(), (20, 5));
/// ```
#[derive(Clone)]
pub struct TestBackend {
    inner: Rc<RefCell<TestTerminal>>,
}

impl std::fmt::Debug for TestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let term = self.inner.borrow();
        f.debug_struct("TestBackend")
            .field("width", &term.width)
            .field("height", &term.height)
            .field("interactive", &term.interactive)
            .field("raw_mode", &term.raw_mode)
            .field("bytes", &term.output.len())
            .finish()
    }
}

impl TestBackend {
    /// An interactive terminal of the given size.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TestTerminal {
                width,
                height,
                interactive: true,
                raw_mode_available: true,
                ..TestTerminal::default()
            })),
        }
    }

    /// Output redirected to a file or pipe.
    pub fn non_interactive(width: u16, height: u16) -> Self {
        let backend = Self::new(width, height);
        backend.inner.borrow_mut().interactive = false;
        backend
    }

    /// Make `enable_raw_mode` fail.
    pub fn without_raw_mode(self) -> Self {
        self.inner.borrow_mut().raw_mode_available = false;
        self
    }

    /// Everything written so far, lossily decoded.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow().output).into_owned()
    }

    pub fn output_bytes(&self) -> Vec<u8> {
        self.inner.borrow().output.clone()
    }

    /// Drain the output written so far.
    pub fn take_output(&self) -> String {
        let bytes = std::mem::take(&mut self.inner.borrow_mut().output);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn is_raw_mode(&self) -> bool {
        self.inner.borrow().raw_mode
    }

    pub fn raw_mode_transitions(&self) -> usize {
        self.inner.borrow().raw_mode_transitions
    }

    pub fn is_reading_input(&self) -> bool {
        self.inner.borrow().sink.is_some()
    }

    pub fn set_size(&self, width: u16, height: u16) {
        let mut term = self.inner.borrow_mut();
        term.width = width;
        term.height = height;
    }

    /// Deliver bytes as if typed. Dropped unless input was started.
    /// Returns whether they were delivered.
    pub fn push_input(&self, bytes: impl AsRef<[u8]>) -> bool {
        let mut term = self.inner.borrow_mut();
        match term.sink.as_mut() {
            Some(sink) => {
                let keep = sink(bytes.as_ref().to_vec());
                if !keep {
                    term.sink = None;
                }
                true
            }
            None => false,
        }
    }

    pub fn with_terminal<T>(&self, f: impl FnOnce(&TestTerminal) -> T) -> T {
        f(&self.inner.borrow())
    }
}

impl Write for TestBackend {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut term = self.inner.borrow_mut();
        if !buf.is_empty() {
            term.writes += 1;
        }
        term.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.borrow_mut().flushes += 1;
        Ok(())
    }
}

impl Backend for TestBackend {
    fn size(&self) -> io::Result<(u16, u16)> {
        let term = self.inner.borrow();
        Ok((term.width, term.height))
    }

    fn is_interactive(&self) -> bool {
        self.inner.borrow().interactive
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let mut term = self.inner.borrow_mut();
        if !term.raw_mode_available {
            return Err(io::Error::other("raw mode unavailable"));
        }
        if !term.raw_mode {
            term.raw_mode = true;
            term.raw_mode_transitions += 1;
        }
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> io::Result<()> {
        let mut term = self.inner.borrow_mut();
        if term.raw_mode {
            term.raw_mode = false;
            term.raw_mode_transitions += 1;
        }
        Ok(())
    }

    fn start_input(&mut self, sink: InputSink) -> io::Result<()> {
        self.inner.borrow_mut().sink = Some(sink);
        Ok(())
    }

    fn stop_input(&mut self) {
        self.inner.borrow_mut().sink = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn test_input_is_dropped_until_started() {
        let mut backend = TestBackend::new(10, 2);
        assert!(!backend.push_input("a"));

        let (tx, rx) = mpsc::channel();
        backend
            .start_input(Box::new(move |bytes| tx.send(bytes).is_ok()))
            .unwrap();
        assert!(backend.push_input("ab"));
        assert_eq!(rx.try_recv().unwrap(), b"ab");

        backend.stop_input();
        assert!(!backend.push_input("c"));
    }

    #[test]
    fn test_raw_mode_tracking() {
        let mut backend = TestBackend::new(10, 2);
        backend.enable_raw_mode().unwrap();
        backend.enable_raw_mode().unwrap();
        assert!(backend.is_raw_mode());
        backend.disable_raw_mode().unwrap();
        assert!(!backend.is_raw_mode());
        assert_eq!(backend.raw_mode_transitions(), 2);

        let mut broken = TestBackend::new(10, 2).without_raw_mode();
        assert!(broken.enable_raw_mode().is_err());
        assert!(!broken.is_raw_mode());
    }

    #[test]
    fn test_write_counting_and_take() {
        let mut backend = TestBackend::new(10, 2);
        backend.write_all(b"one").unwrap();
        backend.write_all(b"").unwrap();
        backend.write_all(b"two").unwrap();
        assert_eq!(backend.write_count(), 2);
        assert_eq!(backend.take_output(), "onetwo");
        assert_eq!(backend.output(), "");
    }

    #[test]
    fn test_non_interactive() {
        let backend = TestBackend::non_interactive(80, 24);
        assert!(!backend.is_interactive());
        assert_eq!(backend.size().unwrap(), (80, 24));
    }
}
