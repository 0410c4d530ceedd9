//! Event queue and frame pacing for one instance.
//!
//! Every asynchronous source (stdin reader, signal thread, [`Remote`]
//! handles on other threads) sends a [`LoopEvent`] into one channel. The
//! loop drains it on each tick and renders at most once per frame interval.

use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use super::document::Document;
use crate::error::{EngineError, Result};

/// A deferred document mutation queued from another thread.
pub type Update = Box<dyn FnOnce(&mut Document) + Send>;

pub enum LoopEvent {
    /// Raw bytes from stdin.
    Input(Vec<u8>),
    /// The terminal now has this many columns and rows.
    Resize(u16, u16),
    /// A termination signal arrived.
    Signal(i32),
    /// Render on the next tick even if the document did not change.
    Wake,
    Update(Update),
    Exit,
}

impl fmt::Debug for LoopEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(bytes) => f.debug_tuple("Input").field(&bytes.len()).finish(),
            Self::Resize(w, h) => f.debug_tuple("Resize").field(w).field(h).finish(),
            Self::Signal(sig) => f.debug_tuple("Signal").field(sig).finish(),
            Self::Wake => f.write_str("Wake"),
            Self::Update(_) => f.write_str("Update(..)"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

/// Thread-safe handle that queues work into a mounted instance.
///
/// Timers and I/O completions hold one of these instead of touching the
/// document directly. Every method fails with [`EngineError::Unmounted`]
/// once the instance is gone.
#[derive(Debug, Clone)]
pub struct Remote {
    tx: Sender<LoopEvent>,
}

impl Remote {
    /// Run `f` against the document on the loop thread.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Document) + Send + 'static,
    {
        self.send(LoopEvent::Update(Box::new(f)))
    }

    pub fn request_render(&self) -> Result<()> {
        self.send(LoopEvent::Wake)
    }

    pub fn resize(&self, width: u16, height: u16) -> Result<()> {
        self.send(LoopEvent::Resize(width, height))
    }

    pub fn exit(&self) -> Result<()> {
        self.send(LoopEvent::Exit)
    }

    /// Queue a raw loop event.
    pub fn send(&self, event: LoopEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| EngineError::Unmounted)
    }
}

#[derive(Debug)]
pub struct Scheduler {
    tx: Option<Sender<LoopEvent>>,
    rx: Receiver<LoopEvent>,
    buffered: VecDeque<LoopEvent>,
    frame_interval: Duration,
    last_render: Option<Instant>,
}

impl Scheduler {
    /// `max_fps` of zero disables throttling.
    pub fn new(max_fps: u32) -> Self {
        let (tx, rx) = mpsc::channel();
        let frame_interval = if max_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / max_fps
        };
        Self {
            tx: Some(tx),
            rx,
            buffered: VecDeque::new(),
            frame_interval,
            last_render: None,
        }
    }

    /// A new handle, or `None` once the scheduler is closed.
    pub fn remote(&self) -> Option<Remote> {
        self.tx.as_ref().map(|tx| Remote { tx: tx.clone() })
    }

    /// Drop the scheduler's own sender so outstanding remotes see
    /// [`EngineError::Unmounted`] once the receiver is dropped too.
    pub fn close(&mut self) {
        self.tx = None;
    }

    /// Everything queued so far, oldest first.
    pub fn try_drain(&mut self) -> Vec<LoopEvent> {
        let mut events: Vec<LoopEvent> = self.buffered.drain(..).collect();
        events.extend(self.rx.try_iter());
        events
    }

    /// Block until an event arrives or `timeout` passes. The event stays
    /// queued for the next [`Scheduler::try_drain`]. Returns whether one
    /// arrived.
    pub fn wait(&mut self, timeout: Option<Duration>) -> bool {
        if !self.buffered.is_empty() {
            return true;
        }
        let received = match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
            None => self.rx.recv().ok(),
        };
        match received {
            Some(event) => {
                self.buffered.push_back(event);
                true
            }
            None => false,
        }
    }

    /// How long until the next frame may be drawn; zero if now.
    pub fn frame_delay(&self, now: Instant) -> Duration {
        match self.last_render {
            Some(last) => (last + self.frame_interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    pub fn should_render_now(&self, now: Instant) -> bool {
        self.frame_delay(now).is_zero()
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
    }

    /// Forget the last frame time so the next pass is not throttled.
    pub fn reset_pacing(&mut self) {
        self.last_render = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_events_are_drained_in_order() {
        let mut scheduler = Scheduler::new(30);
        let remote = scheduler.remote().unwrap();
        remote.request_render().unwrap();
        remote.exit().unwrap();

        let events = scheduler.try_drain();
        assert!(matches!(events[..], [LoopEvent::Wake, LoopEvent::Exit]));
        assert!(scheduler.try_drain().is_empty());
    }

    #[test]
    fn test_update_runs_against_document() {
        let mut scheduler = Scheduler::new(30);
        let remote = scheduler.remote().unwrap();
        remote
            .update(|doc: &mut Document| {
                doc.append_static("from a thread").unwrap();
            })
            .unwrap();

        let mut doc = Document::new();
        for event in scheduler.try_drain() {
            if let LoopEvent::Update(f) = event {
                f(&mut doc);
            }
        }
        assert_eq!(doc.tree().children(doc.root()).len(), 1);
    }

    #[test]
    fn test_wait_buffers_event() {
        let mut scheduler = Scheduler::new(30);
        let remote = scheduler.remote().unwrap();
        std::thread::spawn(move || remote.resize(10, 4).unwrap());

        assert!(scheduler.wait(Some(Duration::from_secs(5))));
        assert!(matches!(scheduler.try_drain()[..], [LoopEvent::Resize(10, 4)]));
    }

    #[test]
    fn test_wait_times_out() {
        let mut scheduler = Scheduler::new(30);
        assert!(!scheduler.wait(Some(Duration::from_millis(5))));
    }

    #[test]
    fn test_frame_throttle() {
        let mut scheduler = Scheduler::new(10);
        let start = Instant::now();
        assert!(scheduler.should_render_now(start));

        scheduler.mark_rendered(start);
        assert!(!scheduler.should_render_now(start + Duration::from_millis(50)));
        assert!(scheduler.should_render_now(start + Duration::from_millis(100)));

        scheduler.reset_pacing();
        assert!(scheduler.should_render_now(start));
    }

    #[test]
    fn test_zero_fps_is_unthrottled() {
        let mut scheduler = Scheduler::new(0);
        let now = Instant::now();
        scheduler.mark_rendered(now);
        assert!(scheduler.should_render_now(now));
    }

    #[test]
    fn test_remote_fails_after_drop() {
        let mut scheduler = Scheduler::new(30);
        let remote = scheduler.remote().unwrap();
        scheduler.close();
        drop(scheduler);
        assert!(matches!(remote.exit(), Err(EngineError::Unmounted)));
    }
}
