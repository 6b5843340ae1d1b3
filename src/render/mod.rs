//! Rendering pipeline: compositing, magnifier, and shared geometry

pub mod compositor;
pub mod geometry;
pub mod magnifier;
