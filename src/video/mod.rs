//! Video source assembled from the external stitcher collaborator
//!
//! The panorama construction itself lives outside this crate; only its
//! output contract is consumed here. A collaborator failure is fatal to
//! the session: no partial state is kept and the error is surfaced.

use std::path::Path;

use image::RgbaImage;
use thiserror::Error;

/// Fatal failures of the stitching collaborator
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("panorama construction failed: {0}")]
    Stitch(String),
    #[error("frame dump unavailable")]
    FrameDump,
    #[error("could not locate the frames in the panorama")]
    Locate,
}

/// One video frame and where it sits inside the panorama
#[derive(Debug, Clone)]
pub struct LocatedFrame {
    pub image: RgbaImage,
    /// Top-left corner in panorama pixels
    pub origin: (u32, u32),
}

/// Output contract of the external stitcher
pub trait Stitcher {
    fn stitch(&mut self, video_path: &Path) -> Result<RgbaImage, VideoError>;
    fn frame_dump(&mut self) -> Result<Vec<RgbaImage>, VideoError>;
    fn fps(&self) -> f64;
    fn locate_frames(
        &mut self,
        panorama: &RgbaImage,
        frames: Vec<RgbaImage>,
    ) -> Result<Vec<LocatedFrame>, VideoError>;
}

/// A fully stitched and located video, ready for display and tracking
#[derive(Debug, Clone)]
pub struct VideoSource {
    pub panorama: RgbaImage,
    pub frames: Vec<LocatedFrame>,
    pub fps: f64,
}

impl VideoSource {
    /// Run the stitcher pipeline end to end
    pub fn open(stitcher: &mut dyn Stitcher, video_path: &Path) -> Result<Self, VideoError> {
        let panorama = stitcher.stitch(video_path)?;
        log::info!(
            "panorama ready: {}x{}",
            panorama.width(),
            panorama.height()
        );

        let dump = stitcher.frame_dump()?;
        let frames = stitcher.locate_frames(&panorama, dump)?;
        log::info!("{} frames located", frames.len());

        Ok(Self {
            panorama,
            frames,
            fps: stitcher.fps(),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
