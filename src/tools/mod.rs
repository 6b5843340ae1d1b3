//! Tool state machine for pointer-driven annotation
//!
//! One tool is active at a time; a drag sub-state lives between
//! `pointer_down` and `pointer_up`. Moves work on incremental deltas from
//! the last point so multi-step drags compose, and the provisional line in
//! Draw mode is deleted and redrawn every move so its pixel length is
//! always exact, never incrementally stretched.

use crate::domain::{LineId, Point, Rgb, ToolMode};
use crate::scene::SceneStore;

/// Which tools the palette may offer right now
///
/// Everything is locked until the first calibration; calibration mode
/// itself locks Erase and ClearAll so a stray click cannot disturb the
/// gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolAvailability {
    pub draw: bool,
    pub select: bool,
    pub erase: bool,
    pub clear: bool,
}

impl ToolAvailability {
    const ALL: Self = Self {
        draw: true,
        select: true,
        erase: true,
        clear: true,
    };

    const CALIBRATING: Self = Self {
        draw: true,
        select: true,
        erase: false,
        clear: false,
    };

    fn allows(&self, mode: ToolMode) -> bool {
        match mode {
            ToolMode::Idle => true,
            ToolMode::Draw | ToolMode::Calibrate => self.draw,
            ToolMode::Select => self.select,
            ToolMode::Erase => self.erase,
            ToolMode::ClearAll => self.clear,
        }
    }
}

/// Entity captured at drag start in Select mode
#[derive(Debug, Clone, Copy)]
enum DragTarget {
    Handle(usize),
    Line(LineId),
    Nothing,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    start: Point,
    last: Point,
    target: DragTarget,
}

/// What a finished gesture asks the application to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    None,
    /// A calibration line with positive pixel length was completed; the
    /// application must prompt for the real distance
    CalibrationReady { line: LineId, pixel_len: f64 },
    /// Lines removed under the pointer
    Erased(usize),
    /// The whole scene was emptied
    Cleared,
}

#[derive(Debug, Default)]
pub struct ToolController {
    mode: ToolMode,
    availability: ToolAvailability,
    drag: Option<DragState>,
    provisional: Option<LineId>,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn availability(&self) -> ToolAvailability {
        self.availability
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Switch tools from the palette; any in-progress drag is abandoned
    ///
    /// Calibration is not a palette tool: it enters through
    /// `enter_calibration`.
    pub fn select_tool(&mut self, mode: ToolMode) {
        debug_assert!(mode != ToolMode::Calibrate, "calibration has its own entry");
        if self.availability.allows(mode) {
            self.mode = mode;
        }
        self.reset_drag();
    }

    /// Enter calibration: the tool is forced to drawing behavior and
    /// Erase/ClearAll are locked
    pub fn enter_calibration(&mut self) {
        self.mode = ToolMode::Calibrate;
        self.availability = ToolAvailability::CALIBRATING;
        self.reset_drag();
    }

    /// Leave calibration, successfully or not
    ///
    /// With no calibration ever performed there is nothing meaningful to
    /// annotate, so Draw and Select lock again too.
    pub fn finish_calibration(&mut self, calibrated: bool) {
        self.reset_drag();
        if calibrated {
            self.availability = ToolAvailability::ALL;
            self.mode = ToolMode::Draw;
        } else {
            self.availability = ToolAvailability::default();
            self.mode = ToolMode::Idle;
        }
    }

    pub fn pointer_down(&mut self, p: Point, scene: &mut SceneStore) -> PointerOutcome {
        if !self.availability.allows(self.mode) {
            return PointerOutcome::None;
        }

        match self.mode {
            ToolMode::Idle => PointerOutcome::None,

            ToolMode::Draw | ToolMode::Calibrate => {
                self.drag = Some(DragState {
                    start: p,
                    last: p,
                    target: DragTarget::Nothing,
                });
                PointerOutcome::None
            }

            ToolMode::Select => {
                // Snapshot what sits under the pointer; the whole drag
                // applies to this capture
                let target = if let Some(index) = scene.handle_at(p) {
                    DragTarget::Handle(index)
                } else if let Some(&id) = scene.query_at(p).last() {
                    if scene.selected_line() != Some(id) {
                        scene.set_selection(Some(id));
                    }
                    DragTarget::Line(id)
                } else {
                    DragTarget::Nothing
                };

                self.drag = Some(DragState {
                    start: p,
                    last: p,
                    target,
                });
                PointerOutcome::None
            }

            ToolMode::Erase => {
                let hits = scene.query_at(p);
                let count = hits.len();
                for id in hits {
                    scene.remove_line(id);
                }
                if count > 0 {
                    log::debug!("erased {count} lines");
                }
                PointerOutcome::Erased(count)
            }

            ToolMode::ClearAll => {
                scene.clear();
                PointerOutcome::Cleared
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        p: Point,
        scene: &mut SceneStore,
        color: Rgb,
    ) -> PointerOutcome {
        let Some(drag) = self.drag.as_mut() else {
            return PointerOutcome::None;
        };
        let (dx, dy) = (p.x - drag.last.x, p.y - drag.last.y);
        drag.last = p;
        let start = drag.start;
        let target = drag.target;

        match self.mode {
            ToolMode::Draw | ToolMode::Calibrate => {
                // Delete-then-redraw keeps the stored pixel length exact
                if let Some(id) = self.provisional.take() {
                    scene.remove_line(id);
                }
                self.provisional = Some(scene.add_line(start, p, color));
            }

            ToolMode::Select => match target {
                DragTarget::Handle(index) => scene.drag_handle(index, dx, dy),
                DragTarget::Line(id) => {
                    if scene.line(id).is_some() {
                        scene.translate_line(id, dx, dy);
                    }
                }
                DragTarget::Nothing => {}
            },

            ToolMode::Idle | ToolMode::Erase | ToolMode::ClearAll => {}
        }

        PointerOutcome::None
    }

    pub fn pointer_up(&mut self, scene: &mut SceneStore, show_labels: bool) -> PointerOutcome {
        let outcome = match (self.mode, self.provisional) {
            (ToolMode::Calibrate, Some(id)) => {
                let pixel_len = scene.line(id).map_or(0.0, |l| l.pixel_len);
                if pixel_len > 0.0 {
                    PointerOutcome::CalibrationReady {
                        line: id,
                        pixel_len,
                    }
                } else {
                    PointerOutcome::None
                }
            }
            (ToolMode::Draw, Some(id)) => {
                if show_labels && scene.line(id).is_some() {
                    scene.set_label_visible(id, true);
                }
                PointerOutcome::None
            }
            _ => PointerOutcome::None,
        };

        // The drag resets no matter how the gesture ended, including on
        // the calibration-cancel path
        self.reset_drag();
        outcome
    }

    fn reset_drag(&mut self) {
        self.drag = None;
        self.provisional = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated_controller() -> ToolController {
        let mut tools = ToolController::new();
        tools.enter_calibration();
        tools.finish_calibration(true);
        tools
    }

    #[test]
    fn test_everything_locked_before_first_calibration() {
        let mut tools = ToolController::new();
        let mut scene = SceneStore::new();

        tools.select_tool(ToolMode::Draw);
        assert_eq!(tools.mode(), ToolMode::Idle);

        tools.pointer_down(Point::new(5.0, 5.0), &mut scene);
        tools.pointer_move(Point::new(20.0, 5.0), &mut scene, Rgb::WHITE);
        tools.pointer_up(&mut scene, true);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_draw_replaces_provisional_line_every_move() {
        let mut tools = calibrated_controller();
        let mut scene = SceneStore::new();
        tools.select_tool(ToolMode::Draw);

        tools.pointer_down(Point::new(0.0, 0.0), &mut scene);
        tools.pointer_move(Point::new(10.0, 0.0), &mut scene, Rgb::WHITE);
        assert_eq!(scene.len(), 1);
        tools.pointer_move(Point::new(30.0, 40.0), &mut scene, Rgb::WHITE);
        assert_eq!(scene.len(), 1);

        let (_, line) = scene.lines().next().unwrap();
        assert_eq!(line.a, Point::new(0.0, 0.0));
        assert_eq!(line.b, Point::new(30.0, 40.0));
        assert_eq!(line.pixel_len, 50.0);

        tools.pointer_up(&mut scene, true);
        assert!(!tools.is_dragging());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_drawn_line_gets_label_when_shown() {
        let mut tools = calibrated_controller();
        let mut scene = SceneStore::new();
        tools.select_tool(ToolMode::Draw);

        tools.pointer_down(Point::new(0.0, 0.0), &mut scene);
        tools.pointer_move(Point::new(10.0, 0.0), &mut scene, Rgb::WHITE);
        tools.pointer_up(&mut scene, true);

        let (id, _) = scene.lines().next().unwrap();
        assert!(scene.label_visible(id));
    }

    #[test]
    fn test_select_drag_moves_whole_line_incrementally() {
        let mut tools = calibrated_controller();
        let mut scene = SceneStore::new();
        let id = scene.add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Rgb::WHITE);
        tools.select_tool(ToolMode::Select);

        tools.pointer_down(Point::new(5.0, 0.0), &mut scene);
        assert_eq!(scene.selected_line(), Some(id));

        tools.pointer_move(Point::new(7.0, 1.0), &mut scene, Rgb::WHITE);
        tools.pointer_move(Point::new(10.0, 3.0), &mut scene, Rgb::WHITE);
        tools.pointer_up(&mut scene, true);

        // Net delta is (5, 3) applied step by step
        let line = scene.line(id).unwrap();
        assert_eq!(line.a, Point::new(5.0, 3.0));
        assert_eq!(line.b, Point::new(15.0, 3.0));
        assert_eq!(line.pixel_len, 10.0);
    }

    #[test]
    fn test_handle_drag_resizes_line() {
        let mut tools = calibrated_controller();
        let mut scene = SceneStore::new();
        let id = scene.add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Rgb::WHITE);
        scene.set_selection(Some(id));
        tools.select_tool(ToolMode::Select);

        tools.pointer_down(Point::new(10.0, 0.0), &mut scene);
        tools.pointer_move(Point::new(10.0, 10.0), &mut scene, Rgb::WHITE);
        tools.pointer_up(&mut scene, true);

        let line = scene.line(id).unwrap();
        assert_eq!(line.a, Point::new(0.0, 0.0));
        assert_eq!(line.b, Point::new(10.0, 10.0));
        assert!((line.pixel_len - 200.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_erase_removes_every_hit_line_and_handles() {
        let mut tools = calibrated_controller();
        let mut scene = SceneStore::new();
        let first = scene.add_line(Point::new(0.0, 10.0), Point::new(20.0, 10.0), Rgb::WHITE);
        let _second = scene.add_line(Point::new(10.0, 0.0), Point::new(10.0, 20.0), Rgb::WHITE);
        scene.set_selection(Some(first));
        tools.select_tool(ToolMode::Erase);

        let outcome = tools.pointer_down(Point::new(10.0, 10.0), &mut scene);

        assert_eq!(outcome, PointerOutcome::Erased(2));
        assert!(scene.is_empty());
        assert!(scene.selection().is_none());
    }

    #[test]
    fn test_clear_all_empties_scene_on_any_press() {
        let mut tools = calibrated_controller();
        let mut scene = SceneStore::new();
        scene.add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Rgb::WHITE);
        tools.select_tool(ToolMode::ClearAll);

        let outcome = tools.pointer_down(Point::new(500.0, 500.0), &mut scene);
        assert_eq!(outcome, PointerOutcome::Cleared);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_calibration_locks_erase_and_clear() {
        let mut tools = calibrated_controller();
        tools.enter_calibration();

        let avail = tools.availability();
        assert!(avail.draw && avail.select);
        assert!(!avail.erase && !avail.clear);

        let mut scene = SceneStore::new();
        scene.add_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Rgb::WHITE);
        tools.select_tool(ToolMode::Erase);
        tools.pointer_down(Point::new(5.0, 0.0), &mut scene);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_calibration_gesture_hands_off_with_positive_length() {
        let mut tools = ToolController::new();
        let mut scene = SceneStore::new();
        tools.enter_calibration();

        tools.pointer_down(Point::new(0.0, 0.0), &mut scene);
        tools.pointer_move(Point::new(100.0, 0.0), &mut scene, Rgb::WHITE);
        let outcome = tools.pointer_up(&mut scene, true);

        let (id, _) = scene.lines().next().unwrap();
        assert_eq!(
            outcome,
            PointerOutcome::CalibrationReady {
                line: id,
                pixel_len: 100.0
            }
        );
        assert!(!tools.is_dragging());
    }

    #[test]
    fn test_leaving_calibration_uncalibrated_locks_draw_and_select() {
        let mut tools = ToolController::new();
        tools.enter_calibration();
        tools.finish_calibration(false);

        assert_eq!(tools.mode(), ToolMode::Idle);
        assert_eq!(tools.availability(), ToolAvailability::default());
    }

    #[test]
    fn test_leaving_calibration_calibrated_returns_to_draw() {
        let mut tools = ToolController::new();
        tools.enter_calibration();
        tools.finish_calibration(true);

        assert_eq!(tools.mode(), ToolMode::Draw);
        assert_eq!(tools.availability(), ToolAvailability::ALL);
    }

    #[test]
    fn test_drag_state_resets_even_without_outcome() {
        let mut tools = ToolController::new();
        let mut scene = SceneStore::new();
        tools.enter_calibration();

        tools.pointer_down(Point::new(0.0, 0.0), &mut scene);
        assert!(tools.is_dragging());
        // No move: pointer_up has no line to hand off, but still resets
        let outcome = tools.pointer_up(&mut scene, true);
        assert_eq!(outcome, PointerOutcome::None);
        assert!(!tools.is_dragging());
    }
}
