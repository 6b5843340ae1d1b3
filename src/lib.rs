//! Calibrated distance measurement and object tracking over panoramic
//! video frames
//!
//! A video arrives pre-stitched: a fixed background panorama plus an
//! ordered list of located frames and a frame rate, consumed through the
//! [`video::Stitcher`] contract. On top of that this crate provides the
//! annotation and kinematics core: a scene store of measurement lines with
//! selection handles and distance labels, a pixel-to-real-world
//! calibration model, a tool state machine for pointer gestures, a
//! compositing pipeline with a magnified cursor-following preview, and an
//! object-tracking pipeline (through the [`track::ObjectTracker`]
//! contract) that tolerates per-frame failure while still producing a
//! continuous motion path and smoothed velocity estimates.
//!
//! All shared state is owned by a single UI consumer fed by one ordered
//! event queue; the playback clock and tracking worker only post events.

pub mod calibrate;
pub mod config;
pub mod domain;
pub mod playback;
pub mod render;
pub mod scene;
pub mod session;
pub mod tools;
pub mod track;
pub mod video;
