//! Background stdin reader.
//!
//! Reads raw bytes on a dedicated thread and hands each read to a sink.
//! Decoding happens on the loop thread, so the reader never needs to know
//! about sequences. A blocking read cannot be interrupted: after
//! [`StdinReader::stop`] the thread exits on its next wake-up and whatever
//! it read then is discarded.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

const READ_BUFFER: usize = 4096;

/// Receives each chunk read from the input. Returning false stops the
/// reader.
pub type InputSink = Box<dyn FnMut(Vec<u8>) -> bool + Send>;

#[derive(Debug)]
pub struct StdinReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StdinReader {
    /// Start reading the process's stdin.
    pub fn spawn(sink: InputSink) -> io::Result<Self> {
        Self::spawn_from(io::stdin(), sink)
    }

    /// Start reading from any source.
    pub fn spawn_from<R>(mut source: R, mut sink: InputSink) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("weft-stdin".into())
            .spawn(move || {
                let mut buf = [0u8; READ_BUFFER];
                loop {
                    let n = match source.read(&mut buf) {
                        Ok(0) => {
                            debug!("input closed");
                            break;
                        }
                        Ok(n) => n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!(error = %e, "input read failed; reader stopped");
                            break;
                        }
                    };
                    if flag.load(Ordering::Acquire) || !sink(buf[..n].to_vec()) {
                        break;
                    }
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Ask the thread to stop. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Joining would block until the next keystroke.
        self.handle.take();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_chunks_reach_the_sink() {
        let (tx, rx) = mpsc::channel();
        let source = io::Cursor::new(b"abc".to_vec());
        let _reader = StdinReader::spawn_from(
            source,
            Box::new(move |bytes| tx.send(bytes).is_ok()),
        )
        .unwrap();

        let chunk = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(chunk, b"abc");
    }

    #[test]
    fn test_sink_returning_false_stops_reader() {
        let (tx, rx) = mpsc::channel();
        let source = io::Cursor::new(vec![b'x'; READ_BUFFER * 3]);
        let reader = StdinReader::spawn_from(
            source,
            Box::new(move |bytes| {
                tx.send(bytes.len()).ok();
                false
            }),
        )
        .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), READ_BUFFER);
        for _ in 0..100 {
            if !reader.is_running() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!reader.is_running());
        assert!(rx.try_recv().is_err());
    }
}
