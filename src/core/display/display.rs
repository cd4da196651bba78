use crate::core::error::AtonError;
use crate::core::framebuffer::Region;
use crate::core::transform::Matrix4x4;

/// Notifications from the receiver thread to the host application.
///
/// Called from the writer thread outside the frame lock. Implementations
/// must return quickly and must not call back into blocking receiver calls.
pub trait Display: Send + Sync {
    fn camera_changed(&self, fov: f32, matrix: &Matrix4x4);
    /// Display-space rectangle (y up) whose pixels were just replaced.
    fn region_updated(&self, region: &Region);
    fn format_changed(&self, width: i32, height: i32);

    fn connect_error(&self, error: &AtonError) {
        let _ = error;
    }

    fn frame_changed(&self, frame: f64) {
        let _ = frame;
    }

    fn progress_changed(&self, frame: f64, progress: i32) {
        let _ = (frame, progress);
    }
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay {}

impl Display for NullDisplay {
    fn camera_changed(&self, _fov: f32, _matrix: &Matrix4x4) {}
    fn region_updated(&self, _region: &Region) {}
    fn format_changed(&self, _width: i32, _height: i32) {}
}
