use super::listener::*;
use crate::core::display::Display;
use crate::core::error::*;
use crate::core::framebuffer::*;
use crate::core::protocol::*;
use crate::core::transform::Matrix4x4;

use log::*;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

const MAX_ACCEPT_ERRORS: u32 = 10;

/// Host-controlled switches, read by the writer on every packet.
#[derive(Debug, Default)]
pub struct ReceiverPolicy {
    aovs_enabled: AtomicBool,
    multi_frame_enabled: AtomicBool,
}

impl ReceiverPolicy {
    pub fn new(aovs_enabled: bool, multi_frame_enabled: bool) -> Self {
        ReceiverPolicy {
            aovs_enabled: AtomicBool::new(aovs_enabled),
            multi_frame_enabled: AtomicBool::new(multi_frame_enabled),
        }
    }

    pub fn aovs_enabled(&self) -> bool {
        self.aovs_enabled.load(Ordering::Acquire)
    }

    pub fn set_aovs_enabled(&self, enabled: bool) {
        self.aovs_enabled.store(enabled, Ordering::Release);
    }

    pub fn multi_frame_enabled(&self) -> bool {
        self.multi_frame_enabled.load(Ordering::Acquire)
    }

    pub fn set_multi_frame_enabled(&self, enabled: bool) {
        self.multi_frame_enabled.store(enabled, Ordering::Release);
    }
}

/// Frame table shared between the writer and any number of readers.
pub type SharedFrames = Arc<RwLock<FrameTable>>;

pub fn read_frames(frames: &SharedFrames) -> RwLockReadGuard<'_, FrameTable> {
    frames.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write_frames(frames: &SharedFrames) -> RwLockWriteGuard<'_, FrameTable> {
    frames.write().unwrap_or_else(PoisonError::into_inner)
}

/// Collected under the lock, delivered after it is released.
#[derive(Debug, PartialEq, Clone)]
enum Notification {
    Format(Resolution),
    Camera(f32, Matrix4x4),
    Frame(f64),
    Region(Region),
    Progress(f64, i32),
}

/// Writer-side bookkeeping that outlives a single connection.
#[derive(Debug, Default, Clone)]
struct PassState {
    active_aovs: Vec<String>,
    remaining_area: i64,
    last_elapsed_ms: i32,
    pass_delta_ms: i32,
    pass_resolution: Resolution,
    notified_format: Option<Resolution>,
    notified_frame: Option<f64>,
}

impl PassState {
    /// Updates the AOV names seen this pass. Returns false if the bucket is to be skipped.
    fn track_aov(&mut self, name: &str, aovs_enabled: bool) -> bool {
        let active = &mut self.active_aovs;
        if !active.iter().any(|a| a == name) {
            if aovs_enabled || active.is_empty() {
                active.push(String::from(name));
            } else if active.len() > 1 {
                active.truncate(1);
            }
        }
        return aovs_enabled || active.first().map(|a| a == name).unwrap_or(false);
    }
}

/// `100 - remaining * 100 / area`, clamped to `[0, 100]`.
fn progress_pct(remaining_area: i64, area: i64) -> i64 {
    if area <= 0 {
        return 100;
    }
    let progress = 100 - (remaining_area as i128 * 100) / area as i128;
    return progress.clamp(0, 100) as i64;
}

/// The protocol state machine. `run` is the body of the receiver thread.
pub struct ReceiverSession {
    frames: SharedFrames,
    policy: Arc<ReceiverPolicy>,
    display: Arc<dyn Display>,
    state: PassState,
}

impl ReceiverSession {
    pub fn new(frames: SharedFrames, policy: Arc<ReceiverPolicy>, display: Arc<dyn Display>) -> Self {
        ReceiverSession {
            frames,
            policy,
            display,
            state: PassState::default(),
        }
    }

    pub fn active_aovs(&self) -> &[String] {
        &self.state.active_aovs
    }

    /// Serves clients until a `Terminate` arrives or accepting keeps failing.
    pub fn run(&mut self, listener: &Listener) {
        let mut error_count = 0u32;
        loop {
            let connection = match listener.accept() {
                Ok(connection) => {
                    error_count = 0;
                    connection
                }
                Err(e) => {
                    error_count += 1;
                    error!("Accept error ({}/{}): {}", error_count, MAX_ACCEPT_ERRORS, e);
                    if error_count >= MAX_ACCEPT_ERRORS {
                        error!("Too many accept errors, receiver stopped.");
                        return;
                    }
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    std::thread::sleep(backoff);
                    continue;
                }
            };
            let peer = connection.peer_addr();
            debug!("Connection from {}", peer);
            for item in connection {
                match item {
                    Ok(packet) => {
                        if self.handle_packet(packet).is_break() {
                            info!("Receiver terminated by {}.", peer);
                            return;
                        }
                    }
                    Err(e) if e.ends_pass() => {
                        warn!("Dropping connection from {}: {}", peer, e);
                    }
                    Err(e) => {
                        error!("Connection from {}: {}", peer, e);
                    }
                }
            }
            debug!("Connection from {} closed", peer);
        }
    }

    /// Applies one packet. `Break` means the session is over.
    pub fn handle_packet(&mut self, packet: Packet) -> ControlFlow<()> {
        match packet {
            Packet::Data(ImagePacket::Open(open)) => {
                if let Err(e) = self.open_image(&open) {
                    warn!("Dropped OpenImage for frame {}: {}", open.frame, e);
                }
            }
            Packet::Data(ImagePacket::Bucket(bucket)) => {
                if let Err(e) = self.write_bucket(&bucket) {
                    warn!("Dropped bucket for \"{}\": {}", bucket.aov_name, e);
                }
            }
            Packet::Data(ImagePacket::Close) => {
                trace!("CloseImage");
            }
            Packet::Control(SessionControl::Terminate) => return ControlFlow::Break(()),
        }
        return ControlFlow::Continue(());
    }

    pub fn open_image(&mut self, open: &OpenImage) -> Result<()> {
        let resolution = Resolution::new(open.width, open.height);
        resolution.validate()?;
        let multi_frame = self.policy.multi_frame_enabled();
        let mut notes = Vec::new();
        {
            let mut frames = write_frames(&self.frames);
            let index = frames.open_frame(open.frame, resolution, multi_frame);
            if let Some(fb) = frames.get_mut(index) {
                if fb.is_resolution_changed(&resolution) {
                    fb.set_resolution(&resolution)?;
                }
                if !fb.is_empty()
                    && !self.state.active_aovs.is_empty()
                    && fb.is_aovs_changed(&self.state.active_aovs)
                {
                    debug!(
                        "AOVs changed from {:?} to {:?}",
                        fb.buffer_names(),
                        self.state.active_aovs
                    );
                    fb.clear_buffers();
                    fb.set_ready(false);
                }
                if fb.is_camera_changed(open.camera_fov, &open.camera_matrix) {
                    fb.set_camera(open.camera_fov, &open.camera_matrix);
                    notes.push(Notification::Camera(open.camera_fov, open.camera_matrix));
                }
                if fb.renderer_version() != open.renderer_version {
                    fb.set_renderer_version(open.renderer_version);
                }
            }
        }
        self.note_format(resolution, &mut notes);
        if self.state.notified_frame != Some(open.frame) {
            self.state.notified_frame = Some(open.frame);
            notes.push(Notification::Frame(open.frame));
        }

        self.state.remaining_area = open.region_area;
        self.state.pass_delta_ms = self.state.last_elapsed_ms;
        self.state.pass_resolution = resolution;
        self.state.active_aovs.clear();
        debug!(
            "OpenImage frame {} {}x{} (region {})",
            open.frame, open.width, open.height, open.region_area
        );
        self.notify(notes);
        return Ok(());
    }

    fn note_format(&mut self, resolution: Resolution, notes: &mut Vec<Notification>) {
        if self.state.notified_format != Some(resolution) {
            self.state.notified_format = Some(resolution);
            notes.push(Notification::Format(resolution));
        }
    }

    pub fn write_bucket(&mut self, bucket: &BucketData) -> Result<()> {
        let aovs_enabled = self.policy.aovs_enabled();
        if bucket.pixels.len() < bucket.sample_count() {
            return Err(AtonError::malformed(format!(
                "bucket holds {} samples, {} expected",
                bucket.pixels.len(),
                bucket.sample_count()
            )));
        }
        let pass_resolution = self.state.pass_resolution;
        Region::from_bucket(
            bucket.bucket_x,
            bucket.bucket_y,
            bucket.bucket_w,
            bucket.bucket_h,
            pass_resolution.height,
        )
        .ok_or_else(|| {
            AtonError::malformed(format!(
                "bucket {}x{} at ({}, {}) is out of range",
                bucket.bucket_w, bucket.bucket_h, bucket.bucket_x, bucket.bucket_y
            ))
        })?;

        let mut notes = Vec::new();
        let mut resized = false;
        {
            let mut frames = write_frames(&self.frames);
            let index = frames
                .current_index()
                .ok_or_else(|| AtonError::state("BucketData without an open image"))?;
            let fb = frames
                .get_mut(index)
                .ok_or_else(|| AtonError::state("current frame is gone"))?;

            if !self.state.track_aov(&bucket.aov_name, aovs_enabled) {
                trace!("Skipping \"{}\", AOVs are disabled", bucket.aov_name);
                return Ok(());
            }

            if fb.is_resolution_changed(&pass_resolution) {
                fb.set_resolution(&pass_resolution)?;
                resized = true;
            }

            let name = bucket.aov_name.as_str();
            if !fb.has_buffer(name) && (aovs_enabled || fb.is_empty()) {
                fb.add_buffer(name, bucket.samples_per_pixel.max(0) as usize)?;
            }

            let region = match fb.buffer_index(name) {
                Some(b) => fb.write_bucket(b, bucket)?,
                None => {
                    trace!("No buffer for \"{}\", pixels dropped", name);
                    fb.set_ready(true);
                    return Ok(());
                }
            };
            fb.set_ready(true);

            self.state.last_elapsed_ms = bucket.elapsed_ms;
            if fb.is_first_buffer(name) {
                self.state.remaining_area = self.state.remaining_area.saturating_sub(bucket.area());
                fb.set_progress(progress_pct(self.state.remaining_area, fb.resolution().area()));
                fb.set_ram(bucket.ram_bytes);
                fb.set_time(bucket.elapsed_ms, self.state.pass_delta_ms);
                notes.push(Notification::Region(region));
                notes.push(Notification::Progress(fb.frame(), fb.progress()));
            }
        }
        let mut ordered = Vec::new();
        if resized {
            self.note_format(pass_resolution, &mut ordered);
        }
        ordered.append(&mut notes);
        self.notify(ordered);
        return Ok(());
    }

    fn notify(&self, notes: Vec<Notification>) {
        for note in notes {
            match note {
                Notification::Format(res) => self.display.format_changed(res.width, res.height),
                Notification::Camera(fov, matrix) => self.display.camera_changed(fov, &matrix),
                Notification::Frame(frame) => self.display.frame_changed(frame),
                Notification::Region(region) => self.display.region_updated(&region),
                Notification::Progress(frame, progress) => {
                    self.display.progress_changed(frame, progress)
                }
            }
        }
    }
}
