//! Playback clock
//!
//! A background producer that wakes on a fixed period and, while playback
//! is enabled, posts a frame-advance event paired back-to-back with a
//! magnifier refresh. It blocks only on its own sleep and never touches
//! shared state; the play flag is a read-only atomic over here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::session::messages::AppEvent;

pub struct PlaybackClock {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackClock {
    /// Spawn the clock with the given target period between frames
    ///
    /// The sleep each cycle is the period minus the elapsed work time,
    /// floored at zero, so late cycles do not accumulate drift.
    pub fn spawn(events: Sender<AppEvent>, playing: Arc<AtomicBool>, period: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);

        let handle = thread::spawn(move || {
            loop {
                let started = Instant::now();

                if stop.load(Ordering::Relaxed) {
                    return;
                }

                if playing.load(Ordering::Relaxed) {
                    // Posted back-to-back so the magnifier never lags the
                    // displayed frame by more than one processed event
                    if events.send(AppEvent::FrameAdvanced).is_err()
                        || events.send(AppEvent::RefreshMagnifier).is_err()
                    {
                        return;
                    }
                }

                thread::sleep(period.saturating_sub(started.elapsed()));
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Stop the clock and wait for it to exit
    pub fn shut_down(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_no_events_while_paused() {
        let (tx, rx) = unbounded();
        let playing = Arc::new(AtomicBool::new(false));
        let clock = PlaybackClock::spawn(tx, Arc::clone(&playing), Duration::from_millis(5));

        thread::sleep(Duration::from_millis(40));
        assert!(rx.is_empty());
        clock.shut_down();
    }

    #[test]
    fn test_frame_advance_paired_with_magnifier_refresh() {
        let (tx, rx) = unbounded();
        let playing = Arc::new(AtomicBool::new(true));
        let clock = PlaybackClock::spawn(tx, Arc::clone(&playing), Duration::from_millis(5));

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(first, AppEvent::FrameAdvanced));
        assert!(matches!(second, AppEvent::RefreshMagnifier));

        clock.shut_down();
    }

    #[test]
    fn test_clock_exits_when_queue_closes() {
        let (tx, rx) = unbounded();
        let playing = Arc::new(AtomicBool::new(true));
        let _clock = PlaybackClock::spawn(tx, playing, Duration::from_millis(1));

        drop(rx);
        // The next send fails and the thread returns; shutdown via drop
        // only sets the flag, so nothing here can deadlock.
        thread::sleep(Duration::from_millis(20));
    }
}
