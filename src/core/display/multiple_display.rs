use super::display::Display;
use crate::core::error::AtonError;
use crate::core::framebuffer::Region;
use crate::core::transform::Matrix4x4;

use std::sync::Arc;

/// Forwards every notification to each registered display, in order.
#[derive(Default, Clone)]
pub struct MultipleDisplay {
    pub displays: Vec<Arc<dyn Display>>,
}

impl MultipleDisplay {
    pub fn new() -> Self {
        MultipleDisplay {
            displays: Vec::new(),
        }
    }

    pub fn add_display(&mut self, display: &Arc<dyn Display>) {
        self.displays.push(display.clone());
    }

    pub fn len(&self) -> usize {
        return self.displays.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.displays.is_empty();
    }
}

impl Display for MultipleDisplay {
    fn camera_changed(&self, fov: f32, matrix: &Matrix4x4) {
        for d in self.displays.iter() {
            d.camera_changed(fov, matrix);
        }
    }

    fn region_updated(&self, region: &Region) {
        for d in self.displays.iter() {
            d.region_updated(region);
        }
    }

    fn format_changed(&self, width: i32, height: i32) {
        for d in self.displays.iter() {
            d.format_changed(width, height);
        }
    }

    fn connect_error(&self, error: &AtonError) {
        for d in self.displays.iter() {
            d.connect_error(error);
        }
    }

    fn frame_changed(&self, frame: f64) {
        for d in self.displays.iter() {
            d.frame_changed(frame);
        }
    }

    fn progress_changed(&self, frame: f64, progress: i32) {
        for d in self.displays.iter() {
            d.progress_changed(frame, progress);
        }
    }
}
