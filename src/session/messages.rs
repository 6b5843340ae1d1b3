//! Message types for the annotation session
//!
//! Every mutation of shared state travels through these as ordered events
//! consumed by the single UI context; background workers only ever post,
//! never touch state directly.

use crate::domain::{BoundingBox, Point, Rgb, ToolMode, UnitSystem, VelocityUnit};
use crate::track::TrackingSession;

/// Pointer gestures in display-space coordinates
#[derive(Debug, Clone, Copy)]
pub enum PointerMsg {
    Down(Point),
    Move(Point),
    Up(Point),
}

/// Discrete commands from the UI layer
#[derive(Debug, Clone)]
pub enum Command {
    /// Pick a palette tool (calibration enters through its own toggle)
    SelectTool(ToolMode),
    /// Enter calibration mode, or leave it without completing
    ToggleCalibration,
    /// Answer to the calibration distance prompt; a non-positive value
    /// cancels
    SetCalibrationDistance { value: f64, units: UnitSystem },
    /// Switch the distance unit system, rescaling the ratio
    SetUnits(UnitSystem),
    SetVelocityUnit(VelocityUnit),
    SetLineColor(Rgb),
    SetPathColor(Rgb),
    /// Flip distance label visibility for every line
    ToggleShowDistances,
    SetMagnifierSize(u32),
    ToggleShowPath,
    ToggleShowBoxes,
    ToggleShowVelocity,
    /// Jump to a frame (pauses playback)
    SetFrame(usize),
    NextFrame,
    PrevFrame,
    TogglePlay,
    /// Start a tracking session on the object inside `bbox` (display
    /// space) at `frame`; any in-flight session is torn down first
    StartTracking { frame: usize, bbox: BoundingBox },
    CancelTracking,
}

/// Posted by the tracking worker
#[derive(Debug, Clone)]
pub enum TrackEvent {
    /// One frame processed
    Progress(usize),
    /// The run finished; the session replaces any previous one
    Completed(Box<TrackingSession>),
    /// The run was cancelled; partial results are discarded
    Cancelled,
}

/// Everything the UI consumer processes, strictly in arrival order
#[derive(Debug, Clone)]
pub enum AppEvent {
    Pointer(PointerMsg),
    Command(Command),
    /// Playback clock says the next frame is ready
    FrameAdvanced,
    /// Paired with `FrameAdvanced` back-to-back so the magnifier never
    /// lags the displayed frame by more than one processed event
    RefreshMagnifier,
    Track(TrackEvent),
    /// Ends the event loop
    Shutdown,
}
