use crate::core::aton::*;

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq, Clone)]
pub enum DisplayEvent {
    CameraChanged { fov: f32, matrix: Matrix4x4 },
    RegionUpdated(Region),
    FormatChanged { width: i32, height: i32 },
    ConnectError(String),
    FrameChanged(f64),
    ProgressChanged { frame: f64, progress: i32 },
}

/// Keeps every notification so other threads can wait for one.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
    changed: Condvar,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        RecordingDisplay::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DisplayEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: DisplayEvent) {
        self.lock().push(event);
        self.changed.notify_all();
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn count<P>(&self, pred: P) -> usize
    where
        P: Fn(&DisplayEvent) -> bool,
    {
        self.lock().iter().filter(|e| pred(e)).count()
    }

    /// Blocks until `pred` holds for the recorded events. False on timeout.
    pub fn wait_until<P>(&self, pred: P, timeout: Duration) -> bool
    where
        P: Fn(&[DisplayEvent]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut events = self.lock();
        loop {
            if pred(&events) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            events = self
                .changed
                .wait_timeout(events, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

impl Display for RecordingDisplay {
    fn camera_changed(&self, fov: f32, matrix: &Matrix4x4) {
        self.push(DisplayEvent::CameraChanged {
            fov,
            matrix: *matrix,
        });
    }

    fn region_updated(&self, region: &Region) {
        self.push(DisplayEvent::RegionUpdated(*region));
    }

    fn format_changed(&self, width: i32, height: i32) {
        self.push(DisplayEvent::FormatChanged { width, height });
    }

    fn connect_error(&self, error: &AtonError) {
        self.push(DisplayEvent::ConnectError(error.to_string()));
    }

    fn frame_changed(&self, frame: f64) {
        self.push(DisplayEvent::FrameChanged(frame));
    }

    fn progress_changed(&self, frame: f64, progress: i32) {
        self.push(DisplayEvent::ProgressChanged { frame, progress });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_001() {
        let display = Arc::new(RecordingDisplay::new());
        let d = display.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            d.format_changed(4, 4);
        });
        let seen = display.wait_until(
            |events| events.contains(&DisplayEvent::FormatChanged { width: 4, height: 4 }),
            Duration::from_secs(5),
        );
        assert!(seen);
        t.join().unwrap();
        assert!(!display.wait_until(|events| events.len() > 1, Duration::from_millis(10)));
    }
}
