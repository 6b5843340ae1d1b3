//! Application state owned by the UI consumer
//!
//! The only context allowed to mutate the scene store, calibration, and
//! tracking results. Everything it renders or reports is recomputed on
//! demand from current state; nothing is pushed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;
use image::RgbaImage;

use crate::calibrate::{self, Calibration};
use crate::config::PanotrackConfig;
use crate::domain::{CursorShape, LineId, Point, ToolMode, UnitSystem};
use crate::render::compositor::{self, Compositor};
use crate::render::magnifier;
use crate::scene::SceneStore;
use crate::session::messages::{AppEvent, Command, PointerMsg, TrackEvent};
use crate::tools::{PointerOutcome, ToolAvailability, ToolController};
use crate::track::{ObjectTracker, TrackerRun, TrackingSession};
use crate::video::VideoSource;

/// Builds a fresh tracker for each session
pub type TrackerFactory = Box<dyn Fn() -> Box<dyn ObjectTracker>>;

pub struct AppState {
    pub config: PanotrackConfig,
    source: Arc<VideoSource>,
    compositor: Compositor,
    scene: SceneStore,
    tools: ToolController,
    calibration: Calibration,
    session: Option<TrackingSession>,
    run: Option<TrackerRun>,
    tracker_factory: TrackerFactory,
    events: Sender<AppEvent>,
    playing: Arc<AtomicBool>,
    current_frame: usize,
    cursor_pos: Point,
    /// Calibration line waiting for its real distance
    pending_calibration: Option<(LineId, f64)>,
    show_path: bool,
    show_boxes: bool,
    show_velocity: bool,
    status: String,
}

impl AppState {
    pub fn new(
        source: VideoSource,
        config: PanotrackConfig,
        tracker_factory: TrackerFactory,
        events: Sender<AppEvent>,
    ) -> Self {
        let compositor = Compositor::new(&source);
        Self {
            config,
            source: Arc::new(source),
            compositor,
            scene: SceneStore::new(),
            tools: ToolController::new(),
            calibration: Calibration::new(),
            session: None,
            run: None,
            tracker_factory,
            events,
            playing: Arc::new(AtomicBool::new(false)),
            current_frame: 0,
            cursor_pos: Point::default(),
            pending_calibration: None,
            show_path: false,
            show_boxes: false,
            show_velocity: false,
            status: "Calibrate the ruler by dragging a line of a known distance".into(),
        }
    }

    /// Shared play flag for the playback clock (read-only over there)
    pub fn playing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.playing)
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Pointer(msg) => self.handle_pointer(msg),
            AppEvent::Command(cmd) => self.handle_command(cmd),
            AppEvent::FrameAdvanced => {
                if self.playing.load(Ordering::Relaxed) && self.source.frame_count() > 0 {
                    self.current_frame = (self.current_frame + 1) % self.source.frame_count();
                }
            }
            // Rendering is pulled from current state, so the paired
            // magnifier refresh needs no bookkeeping of its own; it exists
            // to keep magnifier redraws ordered right behind frame
            // advances.
            AppEvent::RefreshMagnifier => {}
            AppEvent::Track(event) => self.handle_track_event(event),
            AppEvent::Shutdown => {}
        }
    }

    // ------------------------------------------------------------------
    // Pointer handling
    // ------------------------------------------------------------------

    fn handle_pointer(&mut self, msg: PointerMsg) {
        match msg {
            PointerMsg::Down(p) => {
                self.cursor_pos = p;
                let outcome = self.tools.pointer_down(p, &mut self.scene);
                self.apply_outcome(outcome);
            }
            PointerMsg::Move(p) => {
                self.cursor_pos = p;
                let outcome = self.tools.pointer_move(p, &mut self.scene, self.config.line_color);
                self.apply_outcome(outcome);
            }
            PointerMsg::Up(p) => {
                self.cursor_pos = p;
                let show_labels =
                    self.config.show_distances && self.tools.mode() != ToolMode::Calibrate;
                let outcome = self.tools.pointer_up(&mut self.scene, show_labels);
                self.apply_outcome(outcome);
            }
        }
    }

    fn apply_outcome(&mut self, outcome: PointerOutcome) {
        match outcome {
            PointerOutcome::None => {}
            PointerOutcome::CalibrationReady { line, pixel_len } => {
                self.pending_calibration = Some((line, pixel_len));
                self.status = "Enter the known distance of the drawn line".into();
            }
            PointerOutcome::Erased(count) => {
                if count > 0 {
                    self.status = format!("Erased {count} line(s)");
                }
            }
            PointerOutcome::Cleared => {
                self.status = "All lines erased".into();
            }
        }
    }

    // ------------------------------------------------------------------
    // Command handling
    // ------------------------------------------------------------------

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SelectTool(mode) => {
                self.tools.select_tool(mode);
                if mode != ToolMode::Select {
                    self.scene.set_selection(None);
                }
                match self.tools.mode() {
                    ToolMode::Draw => self.status = "Draw a line by dragging on the image".into(),
                    ToolMode::Select => self.status = "Select a line to drag or resize".into(),
                    ToolMode::Erase => self.status = "Select a line to erase".into(),
                    ToolMode::ClearAll => {
                        self.status = "Press anywhere on the image to delete all lines".into();
                    }
                    ToolMode::Idle | ToolMode::Calibrate => {}
                }
            }

            Command::ToggleCalibration => {
                if self.tools.mode() == ToolMode::Calibrate {
                    // Leaving without completing; an unanswered
                    // calibration line goes away with the mode
                    if let Some((line, _)) = self.pending_calibration.take() {
                        self.scene.remove_line(line);
                    }
                    self.tools.finish_calibration(self.calibration.is_calibrated());
                    self.status = if self.calibration.is_calibrated() {
                        "Make a measurement by dragging a line".into()
                    } else {
                        "Calibrate the ruler by dragging a line of a known distance".into()
                    };
                } else {
                    self.tools.enter_calibration();
                    self.status =
                        "Entered calibration mode: drag a line of a known distance".into();
                }
            }

            Command::SetCalibrationDistance { value, units } => {
                self.finish_calibration_prompt(value, units);
            }

            Command::SetUnits(units) => {
                self.calibration.set_units(units);
                self.status = "Select a line to see the difference".into();
            }

            Command::SetVelocityUnit(unit) => self.config.velocity_unit = unit,
            Command::SetLineColor(color) => self.config.line_color = color,
            Command::SetPathColor(color) => self.config.path_color = color,

            Command::ToggleShowDistances => {
                self.config.show_distances = !self.config.show_distances;
                let ids: Vec<LineId> = self.scene.lines().map(|(id, _)| id).collect();
                for id in ids {
                    self.scene.set_label_visible(id, self.config.show_distances);
                }
            }

            Command::SetMagnifierSize(size) => self.config.magnifier_size = size,

            Command::ToggleShowPath => self.show_path = !self.show_path,
            Command::ToggleShowBoxes => self.show_boxes = !self.show_boxes,
            Command::ToggleShowVelocity => self.show_velocity = !self.show_velocity,

            Command::SetFrame(frame) => {
                self.playing.store(false, Ordering::Relaxed);
                self.current_frame = frame.min(self.source.frame_count().saturating_sub(1));
            }
            Command::NextFrame => {
                self.playing.store(false, Ordering::Relaxed);
                if self.source.frame_count() > 0 {
                    self.current_frame = (self.current_frame + 1) % self.source.frame_count();
                }
            }
            Command::PrevFrame => {
                self.playing.store(false, Ordering::Relaxed);
                let count = self.source.frame_count();
                if count > 0 {
                    self.current_frame = (self.current_frame + count - 1) % count;
                }
            }
            Command::TogglePlay => {
                let playing = self.playing.load(Ordering::Relaxed);
                self.playing.store(!playing, Ordering::Relaxed);
            }

            Command::StartTracking { frame, bbox } => self.start_tracking(frame, bbox),
            Command::CancelTracking => {
                if let Some(run) = self.run.take() {
                    run.cancel();
                    self.status = "Tracking cancelled".into();
                }
            }
        }
    }

    fn finish_calibration_prompt(&mut self, value: f64, units: UnitSystem) {
        let Some((line, pixel_len)) = self.pending_calibration.take() else {
            log::warn!("calibration distance received with no pending line");
            return;
        };

        if self.calibration.calibrate(pixel_len, value, units) {
            if self.config.show_distances {
                self.scene.set_label_visible(line, true);
            }
            self.tools.finish_calibration(true);
            self.status = format!(
                "Line set to {}",
                calibrate::format_value(value, units)
            );

            // A completed tracking session gains velocities as soon as a
            // calibration exists
            if let Some(session) = self.session.as_mut() {
                if session.has_com() {
                    session.compute_velocities(self.source.fps);
                    self.show_velocity = true;
                    self.status = "Velocity was added".into();
                }
            }
        } else {
            // Cancelled: the calibration line goes away and the previous
            // calibration (if any) stays in force
            self.scene.remove_line(line);
            self.tools.finish_calibration(self.calibration.is_calibrated());
            self.status = if self.calibration.is_calibrated() {
                "Make a measurement by dragging a line".into()
            } else {
                "Calibrate the ruler by dragging a line of a known distance".into()
            };
        }
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    fn start_tracking(&mut self, frame: usize, bbox: crate::domain::BoundingBox) {
        // Tear down the old run before constructing the new tracker
        if let Some(run) = self.run.take() {
            run.shut_down();
        }
        self.session = None;
        self.show_path = false;
        self.show_boxes = false;
        self.show_velocity = false;

        let Some(located) = self.source.frames.get(frame) else {
            log::warn!("tracking requested on missing frame {frame}");
            return;
        };

        let mut tracker = (self.tracker_factory)();
        tracker.init(&located.image, self.compositor.to_panorama(bbox));

        self.run = Some(TrackerRun::spawn(
            tracker,
            Arc::clone(&self.source),
            self.compositor.scale(),
            self.events.clone(),
        ));
        self.status = "Tracking object...".into();
    }

    fn handle_track_event(&mut self, event: TrackEvent) {
        match event {
            TrackEvent::Progress(frame) => {
                self.status = format!("Tracking {}/{}", frame + 1, self.source.frame_count());
            }

            TrackEvent::Completed(session) => {
                self.run = None;
                let mut session = *session;
                self.show_path = true;
                self.show_boxes = true;

                if self.calibration.is_calibrated() && session.has_com() {
                    session.compute_velocities(self.source.fps);
                    self.show_velocity = true;
                    self.status = "Velocity was added".into();
                } else {
                    self.status = "Calibrate distance to add velocity information".into();
                }

                if let Some(frame) = session.first_failure() {
                    self.status
                        .push_str(&format!(" Tracking failure at frame {}.", frame + 1));
                }

                self.session = Some(session);
            }

            TrackEvent::Cancelled => {
                self.run = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Query surface, recomputed on demand
    // ------------------------------------------------------------------

    /// The composited display image for the current frame with every
    /// visible overlay drawn in
    pub fn frame_image(&self) -> RgbaImage {
        let mut img = self.compositor.compose_base(&self.source, self.current_frame);

        compositor::draw_lines(
            &mut img,
            self.scene.lines().map(|(_, line)| line),
            crate::render::geometry::line::WIDTH,
        );

        let labels: Vec<_> = self
            .scene
            .labels(|line| self.calibration.format_measure(line.pixel_len))
            .map(|(_, label)| label)
            .collect();
        compositor::draw_label_plates(&mut img, labels.iter());

        if let Some(handles) = self.scene.selection() {
            compositor::draw_handles(&mut img, handles, None);
        }

        if let Some(session) = &self.session {
            if self.show_path {
                compositor::draw_path(
                    &mut img,
                    session.path_at(self.current_frame),
                    self.config.path_color,
                );
            }
            if let Some(bbox) = session.bounding_box(self.current_frame) {
                if self.show_boxes {
                    compositor::draw_bounding_box(&mut img, bbox);
                }
                if let Some(text) = self.velocity_text() {
                    compositor::draw_velocity_plate(&mut img, bbox, &text);
                }
            }
        }

        img
    }

    /// The magnified preview around the current cursor position
    pub fn magnifier_image(&self) -> RgbaImage {
        let base = self.compositor.compose_base(&self.source, self.current_frame);
        magnifier::view(
            &base,
            &self.scene,
            self.cursor_pos,
            self.config.magnifier_size,
        )
    }

    /// Formatted distance of the selected line, pixels while calibrating
    pub fn distance_text(&self) -> Option<String> {
        let id = self.scene.selected_line()?;
        let line = self.scene.line(id)?;
        if self.tools.mode() == ToolMode::Calibrate {
            Some(calibrate::format_value(line.pixel_len, UnitSystem::Pixels))
        } else {
            Some(self.calibration.format_measure(line.pixel_len))
        }
    }

    /// Formatted velocity readout for the current frame
    pub fn velocity_text(&self) -> Option<String> {
        if !self.show_velocity {
            return None;
        }
        let session = self.session.as_ref()?;
        let velocity = session.velocity(self.current_frame)?;
        let factor = self.calibration.velocity_factor(self.config.velocity_unit)?;
        Some(format!(
            "Vel: {:.1} {}",
            velocity * factor,
            self.config.velocity_unit.suffix()
        ))
    }

    /// Cursor to show: handles win, then the active tool decides
    pub fn cursor_shape(&self) -> CursorShape {
        if self.scene.handle_at(self.cursor_pos).is_some() {
            return CursorShape::Resize;
        }
        match self.tools.mode() {
            ToolMode::Select => CursorShape::Move,
            ToolMode::Draw | ToolMode::Calibrate => CursorShape::Crosshair,
            ToolMode::Erase => CursorShape::Delete,
            ToolMode::ClearAll => CursorShape::Clear,
            ToolMode::Idle => CursorShape::Default,
        }
    }

    pub fn tool_availability(&self) -> ToolAvailability {
        self.tools.availability()
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.tools.mode()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.compositor.display_size()
    }

    /// Panorama-to-display scale factors
    pub fn display_scale(&self) -> (f64, f64) {
        self.compositor.scale()
    }

    pub fn frame_count(&self) -> usize {
        self.source.frame_count()
    }

    pub fn fps(&self) -> f64 {
        self.source.fps
    }

    pub fn scene(&self) -> &SceneStore {
        &self.scene
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn session(&self) -> Option<&TrackingSession> {
        self.session.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.run.is_some()
    }
}
