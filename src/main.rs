//! End-to-end demo session over a synthetic video
//!
//! Stands in for the real UI layer: a synthetic stitcher produces a
//! panorama and located frames with a bright marker sweeping across them
//! (losing it for a couple of frames), a brightness-blob tracker fills the
//! external tracking contract, and a scripted pointer session calibrates,
//! measures, and tracks through the ordered event queue.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};

use panotrack::config::PanotrackConfig;
use panotrack::domain::{BoundingBox, Point, UnitSystem};
use panotrack::playback::PlaybackClock;
use panotrack::session::messages::{AppEvent, Command, PointerMsg};
use panotrack::session::{self, AppState};
use panotrack::track::ObjectTracker;
use panotrack::video::{LocatedFrame, Stitcher, VideoError, VideoSource};

const PANO_WIDTH: u32 = 480;
const PANO_HEIGHT: u32 = 160;
const MARKER: u32 = 12;
const FRAMES: usize = 24;
/// Frames where the marker vanishes to exercise gap interpolation
const LOST_FRAMES: std::ops::RangeInclusive<usize> = 10..=11;

/// Stitcher collaborator producing a synthetic panorama and frame dump
struct DemoStitcher;

impl Stitcher for DemoStitcher {
    fn stitch(&mut self, _video_path: &Path) -> Result<RgbaImage, VideoError> {
        let mut pano = RgbaImage::new(PANO_WIDTH, PANO_HEIGHT);
        for (x, _, px) in pano.enumerate_pixels_mut() {
            let shade = 30 + (x * 80 / PANO_WIDTH) as u8;
            *px = Rgba([shade, shade, shade + 20, 255]);
        }
        Ok(pano)
    }

    fn frame_dump(&mut self) -> Result<Vec<RgbaImage>, VideoError> {
        let dump = (0..FRAMES)
            .map(|i| {
                let mut frame = RgbaImage::from_pixel(
                    PANO_WIDTH,
                    PANO_HEIGHT,
                    Rgba([25, 25, 40, 255]),
                );
                if !LOST_FRAMES.contains(&i) {
                    let x0 = 10 + i as u32 * ((PANO_WIDTH - MARKER - 20) / FRAMES as u32);
                    for y in 70..70 + MARKER {
                        for x in x0..x0 + MARKER {
                            frame.put_pixel(x, y, Rgba([255, 250, 240, 255]));
                        }
                    }
                }
                frame
            })
            .collect();
        Ok(dump)
    }

    fn fps(&self) -> f64 {
        24.0
    }

    fn locate_frames(
        &mut self,
        _panorama: &RgbaImage,
        frames: Vec<RgbaImage>,
    ) -> Result<Vec<LocatedFrame>, VideoError> {
        // Synthetic frames are panorama-sized canvases already in place
        Ok(frames
            .into_iter()
            .map(|image| LocatedFrame {
                image,
                origin: (0, 0),
            })
            .collect())
    }
}

/// Tracking collaborator: follows the brightest blob, failing when none
/// is present
struct BrightBlobTracker {
    threshold: u8,
}

impl ObjectTracker for BrightBlobTracker {
    fn init(&mut self, _frame: &RgbaImage, _bbox: BoundingBox) {}

    fn update(&mut self, frame: &RgbaImage) -> Option<BoundingBox> {
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0u32, 0u32);
        for (x, y, px) in frame.enumerate_pixels() {
            if px[0] >= self.threshold {
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

fn draw_line(tx: &crossbeam_channel::Sender<AppEvent>, from: Point, to: Point) -> Result<()> {
    tx.send(AppEvent::Pointer(PointerMsg::Down(from)))?;
    tx.send(AppEvent::Pointer(PointerMsg::Move(from.midpoint(to))))?;
    tx.send(AppEvent::Pointer(PointerMsg::Move(to)))?;
    tx.send(AppEvent::Pointer(PointerMsg::Up(to)))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PanotrackConfig::load();
    let period = Duration::from_millis(config.playback_delay_ms);

    let source = VideoSource::open(&mut DemoStitcher, Path::new("demo://synthetic"))
        .context("stitching collaborator failed")?;

    let (tx, rx) = session::event_queue();
    let mut state = AppState::new(
        source,
        config,
        Box::new(|| Box::new(BrightBlobTracker { threshold: 200 })),
        tx.clone(),
    );
    let clock = PlaybackClock::spawn(tx.clone(), state.playing_flag(), period);

    let (width, height) = state.display_size();
    println!("display fitted to {width}x{height}, {} frames", state.frame_count());

    // Calibrate: a 100 px line declared to span 5 meters
    tx.send(AppEvent::Command(Command::ToggleCalibration))?;
    draw_line(&tx, Point::new(20.0, 20.0), Point::new(120.0, 20.0))?;
    tx.send(AppEvent::Command(Command::SetCalibrationDistance {
        value: 5.0,
        units: UnitSystem::Metric,
    }))?;

    // Measure something: 40 px should read 2.00 m
    draw_line(&tx, Point::new(200.0, 120.0), Point::new(240.0, 120.0))?;

    // Track the marker from its frame-0 position
    let (sx, sy) = state.display_scale();
    let marker = BoundingBox::from_xywh(
        8.0 * sx,
        68.0 * sy,
        (MARKER + 4) as f64 * sx,
        (MARKER + 4) as f64 * sy,
    );
    tx.send(AppEvent::Command(Command::StartTracking {
        frame: 0,
        bbox: marker,
    }))?;

    // Consume the queue until the tracking session lands
    loop {
        let event = rx
            .recv_timeout(Duration::from_secs(10))
            .context("event queue stalled")?;
        state.handle_event(event);
        if state.session().is_some() && !state.is_tracking() {
            break;
        }
    }

    println!("status: {}", state.status());
    for text in state
        .scene()
        .labels(|line| state.calibration().format_measure(line.pixel_len))
        .map(|(_, label)| label.text)
    {
        println!("label: {text}");
    }

    let session = state.session().expect("tracking session completed");
    println!(
        "path holds {} points over {} frames",
        session.path_at(state.frame_count() - 1).len(),
        session.frame_count()
    );
    for frame in [1, 5, 10, 12, 20] {
        let velocity = session.velocity(frame).unwrap_or(0.0);
        println!("frame {frame:2}: {velocity:7.1} px/s");
    }

    // Let the playback clock drive a few frames through the queue; the
    // play flag only flips once the consumer processes the toggle
    tx.send(AppEvent::Command(Command::TogglePlay))?;
    for event in rx.try_iter() {
        state.handle_event(event);
    }
    std::thread::sleep(period * 5);
    tx.send(AppEvent::Command(Command::TogglePlay))?;
    for event in rx.try_iter() {
        state.handle_event(event);
    }
    println!("playback advanced to frame {}", state.current_frame() + 1);

    let out = Path::new("panotrack-demo.png");
    state.frame_image().save(out).context("saving demo frame")?;
    println!("annotated frame written to {}", out.display());

    clock.shut_down();
    Ok(())
}
