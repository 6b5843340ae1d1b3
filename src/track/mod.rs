//! Object tracking pipeline
//!
//! Drives an external per-frame tracker over every frame of the video,
//! tolerating per-frame failure: failures are recorded as sentinels, the
//! motion path simply does not grow across them, and velocity estimation
//! bridges the gaps with the nearest valid neighbors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use image::RgbaImage;

use crate::domain::{BoundingBox, Point};
use crate::session::messages::{AppEvent, TrackEvent};
use crate::video::VideoSource;

/// Contract with the external per-frame tracking algorithm
///
/// Frames and boxes are in panorama coordinates.
pub trait ObjectTracker: Send {
    fn init(&mut self, frame: &RgbaImage, bbox: BoundingBox);
    /// `None` signals tracking failure for this frame
    fn update(&mut self, frame: &RgbaImage) -> Option<BoundingBox>;
}

/// Complete per-frame record of one tracking run, in display coordinates
///
/// The cumulative path is stored once with per-frame prefix lengths: the
/// path at frame `i` is the first `path_len[i]` points. Failure frames
/// never extend it, so the prefix length equals the number of successful
/// frames seen so far.
#[derive(Debug, Clone, Default)]
pub struct TrackingSession {
    boxes: Vec<Option<BoundingBox>>,
    com: Vec<Option<Point>>,
    path: Vec<Point>,
    path_len: Vec<usize>,
    velocities: Vec<f64>,
}

impl TrackingSession {
    fn record_success(&mut self, bbox: BoundingBox) {
        let com = bbox.center();
        self.boxes.push(Some(bbox));
        self.com.push(Some(com));
        self.path.push(com);
        self.path_len.push(self.path.len());
    }

    fn record_failure(&mut self) {
        self.boxes.push(None);
        self.com.push(None);
        self.path_len.push(self.path.len());
    }

    pub fn frame_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn bounding_box(&self, frame: usize) -> Option<BoundingBox> {
        self.boxes.get(frame).copied().flatten()
    }

    pub fn com(&self, frame: usize) -> Option<Point> {
        self.com.get(frame).copied().flatten()
    }

    /// COM path accumulated up to and including `frame`
    pub fn path_at(&self, frame: usize) -> &[Point] {
        match self.path_len.get(frame) {
            Some(&len) => &self.path[..len],
            None => &[],
        }
    }

    /// Whether any frame tracked successfully
    pub fn has_com(&self) -> bool {
        !self.path.is_empty()
    }

    /// Index of the first frame the tracker lost the object on
    pub fn first_failure(&self) -> Option<usize> {
        self.com.iter().position(Option::is_none)
    }

    /// Velocity in px/s at `frame`, once computed
    pub fn velocity(&self, frame: usize) -> Option<f64> {
        self.velocities.get(frame).copied()
    }

    /// Recompute the whole velocity sequence from scratch
    ///
    /// Called when a session completes or the calibration changes; never
    /// patched incrementally.
    pub fn compute_velocities(&mut self, fps: f64) {
        self.velocities = compute_velocities(&self.com, fps);
    }
}

/// Time-weighted average speeds (px/s) over a COM sequence with gaps
///
/// Both endpoints and every failure frame get velocity 0. An interior
/// frame looks for the nearest non-failure COM backward and forward,
/// expanding the search until found or the sequence end is reached (the
/// neighbor then defaults to the current point), and averages the summed
/// distances over the total step count at the source frame rate.
pub fn compute_velocities(com: &[Option<Point>], fps: f64) -> Vec<f64> {
    assert!(fps > 0.0, "frame rate must be positive");
    let n = com.len();
    let mut velocities = vec![0.0; n];
    let seconds_per_frame = 1.0 / fps;

    for i in 1..n.saturating_sub(1) {
        let Some(current) = com[i] else {
            continue;
        };

        let ((before, back_steps), (after, fwd_steps)) = gap_neighbors(com, i, current);
        let total_dist = before.distance_to(current) + current.distance_to(after);
        velocities[i] = total_dist / ((back_steps + fwd_steps) as f64 * seconds_per_frame);
    }

    velocities
}

/// Nearest non-failure COMs around index `i` with their step counts
///
/// The search window expands until a valid COM is found; when a side runs
/// out, `reference` stands in and the step count is the distance to the
/// searched end of the sequence.
pub fn gap_neighbors(
    com: &[Option<Point>],
    i: usize,
    reference: Point,
) -> ((Point, usize), (Point, usize)) {
    let n = com.len();
    let before = (0..i)
        .rev()
        .find_map(|j| com[j].map(|p| (p, i - j)))
        .unwrap_or((reference, i));
    let after = (i + 1..n)
        .find_map(|j| com[j].map(|p| (p, j - i)))
        .unwrap_or((reference, n - 1 - i));
    (before, after)
}

/// An in-flight tracking worker
///
/// Cancellation is cooperative: the flag is polled once per frame and a
/// cancelled run discards its partial session.
pub struct TrackerRun {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TrackerRun {
    /// Spawn a worker that tracks through every frame of `source`
    ///
    /// The tracker must already be initialized on the target object. One
    /// progress event is posted per frame, then a completion (or
    /// cancellation) event.
    pub fn spawn(
        mut tracker: Box<dyn ObjectTracker>,
        source: Arc<VideoSource>,
        display_scale: (f64, f64),
        tx: Sender<AppEvent>,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            let mut session = TrackingSession::default();

            for (i, frame) in source.frames.iter().enumerate() {
                if cancel_flag.load(Ordering::Relaxed) {
                    log::info!("tracking cancelled at frame {i}");
                    let _ = tx.send(AppEvent::Track(TrackEvent::Cancelled));
                    return;
                }

                match tracker.update(&frame.image) {
                    Some(bbox) => {
                        session.record_success(bbox.scaled(display_scale.0, display_scale.1));
                    }
                    None => {
                        log::debug!("tracking failure at frame {i}");
                        session.record_failure();
                    }
                }

                if tx.send(AppEvent::Track(TrackEvent::Progress(i))).is_err() {
                    return;
                }
            }

            let _ = tx.send(AppEvent::Track(TrackEvent::Completed(Box::new(session))));
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Request a cooperative stop; the worker notices within one frame
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Cancel and wait for the worker to exit
    pub fn shut_down(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
