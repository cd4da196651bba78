use crate::core::aton::*;

use log::*;
use std::sync::{Mutex, PoisonError};

/// Terminal progress bar for the frame currently being received.
pub struct ProgressDisplay {
    reporter: ProgressReporter,
    frame: Mutex<Option<f64>>,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        ProgressDisplay {
            reporter: ProgressReporter::new(100, "Waiting"),
            frame: Mutex::new(None),
        }
    }

    pub fn hidden() -> Self {
        ProgressDisplay {
            reporter: ProgressReporter::hidden(),
            frame: Mutex::new(None),
        }
    }

    pub fn position(&self) -> usize {
        self.reporter.position()
    }

    pub fn done(&self) {
        self.reporter.done();
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ProgressDisplay {
    fn camera_changed(&self, fov: f32, matrix: &Matrix4x4) {
        let camera = Camera {
            fov,
            matrix: *matrix,
        };
        let p = camera.position();
        debug!("Camera: fov {} position ({}, {}, {})", fov, p[0], p[1], p[2]);
        if camera.world_to_camera().is_none() {
            warn!("Camera matrix is singular.");
        }
    }

    fn region_updated(&self, region: &Region) {
        trace!(
            "Region ({}, {}) - ({}, {})",
            region.x0,
            region.y0,
            region.x1,
            region.y1
        );
    }

    fn format_changed(&self, width: i32, height: i32) {
        self.reporter.set_message(format!("{}x{}", width, height));
        info!("Format: {}x{}", width, height);
    }

    fn connect_error(&self, error: &AtonError) {
        self.reporter.println(&format!("{}", error));
    }

    fn frame_changed(&self, frame: f64) {
        let mut current = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Some(frame);
        self.reporter.reset(&format!("Frame {}", format_frame(frame)));
    }

    fn progress_changed(&self, frame: f64, progress: i32) {
        let current = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == Some(frame) {
            self.reporter.set_position(progress.max(0) as usize);
        }
    }
}
