//! Session plumbing: the ordered event queue and its consumer loop
//!
//! Three activities share state through one single-consumer queue: the
//! playback clock and the tracking worker post events, and exactly one UI
//! context consumes them in arrival order and mutates state.

pub mod messages;
pub mod state;

pub use state::{AppState, TrackerFactory};

use crossbeam_channel::{Receiver, Sender, unbounded};

use messages::AppEvent;

/// The single-consumer ordered event queue
pub fn event_queue() -> (Sender<AppEvent>, Receiver<AppEvent>) {
    unbounded()
}

/// Consume events until a `Shutdown` arrives or every sender is gone
pub fn run_event_loop(state: &mut AppState, events: &Receiver<AppEvent>) {
    for event in events.iter() {
        if matches!(event, AppEvent::Shutdown) {
            break;
        }
        state.handle_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::messages::{Command, PointerMsg};
    use super::*;
    use crate::config::PanotrackConfig;
    use crate::domain::{BoundingBox, Point, ToolMode, UnitSystem};
    use crate::track::ObjectTracker;
    use crate::video::{LocatedFrame, VideoSource};
    use image::{Rgba, RgbaImage};

    /// Panorama-sized frames with a bright dot sweeping right; two frames
    /// in the middle lose the dot entirely.
    fn synthetic_source(frames: usize) -> VideoSource {
        let (w, h) = (480u32, 160u32);
        let panorama = RgbaImage::from_pixel(w, h, Rgba([20, 20, 20, 255]));

        let frames = (0..frames)
            .map(|i| {
                let mut img = RgbaImage::from_pixel(w, h, Rgba([20, 20, 20, 255]));
                if !(2..=3).contains(&i) {
                    let x0 = 10 + i as u32 * 8;
                    for y in 70..82 {
                        for x in x0..x0 + 12 {
                            img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
                        }
                    }
                }
                LocatedFrame {
                    image: img,
                    origin: (0, 0),
                }
            })
            .collect();

        VideoSource {
            panorama,
            frames,
            fps: 24.0,
        }
    }

    /// Finds the bright blob, failing on frames without one
    struct DotTracker;

    impl ObjectTracker for DotTracker {
        fn init(&mut self, _frame: &RgbaImage, _bbox: BoundingBox) {}

        fn update(&mut self, frame: &RgbaImage) -> Option<BoundingBox> {
            let mut min = (u32::MAX, u32::MAX);
            let mut max = (0u32, 0u32);
            for (x, y, px) in frame.enumerate_pixels() {
                if px[0] > 200 {
                    min = (min.0.min(x), min.1.min(y));
                    max = (max.0.max(x), max.1.max(y));
                }
            }
            if min.0 == u32::MAX {
                return None;
            }
            Some(BoundingBox::from_xywh(
                min.0 as f64,
                min.1 as f64,
                (max.0 - min.0) as f64,
                (max.1 - min.1) as f64,
            ))
        }
    }

    fn new_state(frames: usize) -> (AppState, Receiver<AppEvent>) {
        let (tx, rx) = event_queue();
        let state = AppState::new(
            synthetic_source(frames),
            PanotrackConfig::default(),
            Box::new(|| Box::new(DotTracker)),
            tx,
        );
        (state, rx)
    }

    fn draw_line(state: &mut AppState, from: Point, to: Point) {
        state.handle_event(AppEvent::Pointer(PointerMsg::Down(from)));
        state.handle_event(AppEvent::Pointer(PointerMsg::Move(from.midpoint(to))));
        state.handle_event(AppEvent::Pointer(PointerMsg::Move(to)));
        state.handle_event(AppEvent::Pointer(PointerMsg::Up(to)));
    }

    fn calibrate_100px_as_5m(state: &mut AppState) {
        state.handle_event(AppEvent::Command(Command::ToggleCalibration));
        draw_line(state, Point::new(10.0, 10.0), Point::new(110.0, 10.0));
        state.handle_event(AppEvent::Command(Command::SetCalibrationDistance {
            value: 5.0,
            units: UnitSystem::Metric,
        }));
    }

    #[test]
    fn test_end_to_end_metric_measurement() {
        let (mut state, _rx) = new_state(4);
        calibrate_100px_as_5m(&mut state);

        assert_eq!(state.calibration().ratio(), Some(0.05));
        assert_eq!(state.tool_mode(), ToolMode::Draw);

        // A 40 px measurement line must read 2.00 m
        draw_line(&mut state, Point::new(50.0, 50.0), Point::new(90.0, 50.0));
        let labels: Vec<String> = state
            .scene()
            .labels(|l| state.calibration().format_measure(l.pixel_len))
            .map(|(_, label)| label.text)
            .collect();
        assert!(labels.iter().any(|t| t == "2.00 m"), "labels: {labels:?}");
    }

    #[test]
    fn test_calibration_cancel_removes_line_and_locks_tools() {
        let (mut state, _rx) = new_state(4);
        state.handle_event(AppEvent::Command(Command::ToggleCalibration));
        draw_line(&mut state, Point::new(10.0, 10.0), Point::new(110.0, 10.0));
        assert_eq!(state.scene().len(), 1);

        state.handle_event(AppEvent::Command(Command::SetCalibrationDistance {
            value: 0.0,
            units: UnitSystem::Metric,
        }));

        assert!(state.scene().is_empty());
        assert!(!state.calibration().is_calibrated());
        assert_eq!(state.tool_mode(), ToolMode::Idle);
        assert!(!state.tool_availability().draw);
    }

    #[test]
    fn test_selected_line_distance_text() {
        let (mut state, _rx) = new_state(4);
        calibrate_100px_as_5m(&mut state);

        draw_line(&mut state, Point::new(50.0, 50.0), Point::new(90.0, 50.0));
        state.handle_event(AppEvent::Command(Command::SelectTool(ToolMode::Select)));
        state.handle_event(AppEvent::Pointer(PointerMsg::Down(Point::new(70.0, 50.0))));
        state.handle_event(AppEvent::Pointer(PointerMsg::Up(Point::new(70.0, 50.0))));

        assert_eq!(state.distance_text().as_deref(), Some("2.00 m"));
    }

    #[test]
    fn test_tracking_end_to_end_with_gap() {
        let (mut state, rx) = new_state(6);
        calibrate_100px_as_5m(&mut state);

        let (sx, sy) = state.display_scale();
        let bbox = BoundingBox::from_xywh(10.0 * sx, 70.0 * sy, 12.0 * sx, 12.0 * sy);
        state.handle_event(AppEvent::Command(Command::StartTracking { frame: 0, bbox }));
        assert!(state.is_tracking());

        // Feed worker events back into the consumer until the run lands
        while state.is_tracking() {
            let event = rx
                .recv_timeout(std::time::Duration::from_secs(5))
                .expect("tracking worker stalled");
            state.handle_event(event);
        }

        let session = state.session().expect("completed session");
        assert_eq!(session.frame_count(), 6);
        // Frames 2 and 3 fail: the path holds at two points until frame 4
        assert_eq!(session.path_at(1).len(), 2);
        assert_eq!(session.path_at(3).len(), 2);
        assert_eq!(session.path_at(5).len(), 4);
        assert_eq!(session.first_failure(), Some(2));
        assert!(state.status().contains("failure at frame 3"));

        // Calibration exists, so velocities were derived; endpoints rest
        assert_eq!(session.velocity(0), Some(0.0));
        assert_eq!(session.velocity(5), Some(0.0));
        assert!(session.velocity(1).unwrap() > 0.0);
        assert!(state.velocity_text().unwrap().starts_with("Vel: "));
    }

    #[test]
    fn test_new_session_replaces_old() {
        let (mut state, rx) = new_state(4);
        calibrate_100px_as_5m(&mut state);

        let bbox = BoundingBox::from_xywh(0.0, 0.0, 10.0, 10.0);
        for _ in 0..2 {
            state.handle_event(AppEvent::Command(Command::StartTracking { frame: 0, bbox }));
            while state.is_tracking() {
                let event = rx
                    .recv_timeout(std::time::Duration::from_secs(5))
                    .expect("tracking worker stalled");
                state.handle_event(event);
            }
        }

        let session = state.session().expect("completed session");
        assert_eq!(session.frame_count(), 4);
    }

    #[test]
    fn test_frame_advance_only_while_playing() {
        let (mut state, _rx) = new_state(4);
        assert_eq!(state.current_frame(), 0);

        state.handle_event(AppEvent::FrameAdvanced);
        assert_eq!(state.current_frame(), 0);

        state.handle_event(AppEvent::Command(Command::TogglePlay));
        state.handle_event(AppEvent::FrameAdvanced);
        state.handle_event(AppEvent::RefreshMagnifier);
        assert_eq!(state.current_frame(), 1);

        // Wraps at the end
        for _ in 0..3 {
            state.handle_event(AppEvent::FrameAdvanced);
        }
        assert_eq!(state.current_frame(), 0);
    }

    #[test]
    fn test_erase_over_two_overlapping_lines_removes_both() {
        let (mut state, _rx) = new_state(4);
        calibrate_100px_as_5m(&mut state);

        draw_line(&mut state, Point::new(40.0, 60.0), Point::new(80.0, 60.0));
        draw_line(&mut state, Point::new(60.0, 40.0), Point::new(60.0, 80.0));
        assert_eq!(state.scene().len(), 3);

        // Select one so handles exist, then erase at the crossing point
        state.handle_event(AppEvent::Command(Command::SelectTool(ToolMode::Select)));
        state.handle_event(AppEvent::Pointer(PointerMsg::Down(Point::new(60.0, 60.0))));
        state.handle_event(AppEvent::Pointer(PointerMsg::Up(Point::new(60.0, 60.0))));
        assert!(state.scene().selection().is_some());

        state.handle_event(AppEvent::Command(Command::SelectTool(ToolMode::Erase)));
        state.handle_event(AppEvent::Pointer(PointerMsg::Down(Point::new(60.0, 60.0))));

        assert_eq!(state.scene().len(), 1);
        assert!(state.scene().selection().is_none());
    }

    #[test]
    fn test_run_event_loop_stops_on_shutdown() {
        let (mut state, _rx) = new_state(4);

        // Queue a command followed by shutdown; the loop must process the
        // command and then return.
        let (tx, rx) = event_queue();
        tx.send(AppEvent::Command(Command::NextFrame)).unwrap();
        tx.send(AppEvent::Shutdown).unwrap();
        run_event_loop(&mut state, &rx);
        assert_eq!(state.current_frame(), 1);
    }
}
