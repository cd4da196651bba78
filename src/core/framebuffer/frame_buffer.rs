use super::region::*;
use crate::core::error::*;
use crate::core::protocol::BucketData;
use crate::core::transform::Matrix4x4;

use serde::Serialize;

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Camera {
    pub fov: f32,
    pub matrix: Matrix4x4,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            fov: 0.0,
            matrix: Matrix4x4::identity(),
        }
    }
}

impl Camera {
    pub fn position(&self) -> [f32; 3] {
        self.matrix.translation()
    }

    /// None if the matrix is singular.
    pub fn world_to_camera(&self) -> Option<Matrix4x4> {
        self.matrix.inverse()
    }
}

/// One AOV: `width * height * samples_per_pixel` floats, row 0 at the bottom.
#[derive(Debug, PartialEq, Clone)]
pub struct NamedBuffer {
    name: String,
    samples_per_pixel: usize,
    pixels: Vec<f32>,
}

impl NamedBuffer {
    pub fn new(name: &str, samples_per_pixel: usize, resolution: &Resolution) -> Result<Self> {
        let mut buffer = NamedBuffer {
            name: String::from(name),
            samples_per_pixel,
            pixels: Vec::new(),
        };
        buffer.pixels = buffer.allocate(resolution)?;
        return Ok(buffer);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.samples_per_pixel
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Zeroed storage for `resolution`. Fails instead of aborting when the
    /// size overflows or the allocation is refused.
    fn allocate(&self, resolution: &Resolution) -> Result<Vec<f32>> {
        let n = usize::try_from(resolution.area())
            .ok()
            .and_then(|area| area.checked_mul(self.samples_per_pixel))
            .ok_or_else(|| {
                AtonError::malformed(format!(
                    "\"{}\" at {}x{} with {} samples per pixel is too large",
                    self.name, resolution.width, resolution.height, self.samples_per_pixel
                ))
            })?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(n).map_err(|e| {
            AtonError::malformed(format!("cannot allocate \"{}\": {}", self.name, e))
        })?;
        pixels.resize(n, 0.0);
        return Ok(pixels);
    }

    fn offset(&self, width: i64, x: i64, y: i64) -> usize {
        return (y * width + x) as usize * self.samples_per_pixel;
    }
}

/// Per-frame summary for status display.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct FrameStats {
    pub frame: f64,
    pub width: i32,
    pub height: i32,
    pub progress_pct: i32,
    pub ram_bytes: i64,
    pub peak_ram_bytes: i64,
    pub elapsed_ms: i32,
    pub renderer_version: i32,
    pub channel_count: usize,
    pub ready: bool,
    pub frame_count: usize,
}

/// Pixel store for exactly one frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    frame: f64,
    resolution: Resolution,
    buffers: Vec<NamedBuffer>,
    camera: Camera,
    renderer_version: i32,
    ready: bool,
    progress: i32,
    ram_bytes: i64,
    peak_ram_bytes: i64,
    elapsed_ms: i32,
}

impl FrameBuffer {
    /// `resolution` is expected to have passed `Resolution::validate`.
    pub fn new(frame: f64, resolution: Resolution) -> Self {
        debug_assert!(resolution.validate().is_ok(), "{:?}", resolution);
        FrameBuffer {
            frame,
            resolution,
            buffers: Vec::new(),
            camera: Camera::default(),
            renderer_version: 0,
            ready: false,
            progress: 0,
            ram_bytes: 0,
            peak_ram_bytes: 0,
            elapsed_ms: 0,
        }
    }

    pub fn frame(&self) -> f64 {
        self.frame
    }

    pub fn set_frame(&mut self, frame: f64) {
        self.frame = frame;
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_resolution_changed(&self, resolution: &Resolution) -> bool {
        self.resolution != *resolution
    }

    /// Reallocates every channel for the new size. Old pixels are not kept.
    ///
    /// On error the buffer is left untouched.
    pub fn set_resolution(&mut self, resolution: &Resolution) -> Result<()> {
        resolution.validate()?;
        let pixels = self
            .buffers
            .iter()
            .map(|b| b.allocate(resolution))
            .collect::<Result<Vec<_>>>()?;
        for (buffer, pixels) in self.buffers.iter_mut().zip(pixels) {
            buffer.pixels = pixels;
        }
        self.resolution = *resolution;
        return Ok(());
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn buffers(&self) -> &[NamedBuffer] {
        &self.buffers
    }

    pub fn buffer_names(&self) -> Vec<String> {
        self.buffers.iter().map(|b| b.name.clone()).collect()
    }

    pub fn buffer_index(&self, name: &str) -> Option<usize> {
        self.buffers.iter().position(|b| b.name == name)
    }

    pub fn has_buffer(&self, name: &str) -> bool {
        self.buffer_index(name).is_some()
    }

    pub fn is_first_buffer(&self, name: &str) -> bool {
        self.buffers.first().map(|b| b.name == name).unwrap_or(false)
    }

    /// Adds a channel (or returns the existing one with that name).
    pub fn add_buffer(&mut self, name: &str, samples_per_pixel: usize) -> Result<usize> {
        if let Some(index) = self.buffer_index(name) {
            return Ok(index);
        }
        let buffer = NamedBuffer::new(name, samples_per_pixel, &self.resolution)?;
        self.buffers.push(buffer);
        return Ok(self.buffers.len() - 1);
    }

    pub fn clear_buffers(&mut self) {
        self.buffers.clear();
    }

    /// True if the AOV names seen during a pass differ from this buffer's channels.
    pub fn is_aovs_changed(&self, aovs: &[String]) -> bool {
        if aovs.len() != self.buffers.len() {
            return true;
        }
        return !aovs.iter().zip(self.buffers.iter()).all(|(a, b)| *a == b.name);
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn is_camera_changed(&self, fov: f32, matrix: &Matrix4x4) -> bool {
        self.camera.fov != fov || self.camera.matrix != *matrix
    }

    pub fn set_camera(&mut self, fov: f32, matrix: &Matrix4x4) {
        self.camera = Camera {
            fov,
            matrix: *matrix,
        };
    }

    pub fn renderer_version(&self) -> i32 {
        self.renderer_version
    }

    pub fn set_renderer_version(&mut self, version: i32) {
        self.renderer_version = version;
    }

    pub fn progress(&self) -> i32 {
        self.progress
    }

    pub fn set_progress(&mut self, progress: i64) {
        self.progress = progress.clamp(0, 100) as i32;
    }

    pub fn ram_bytes(&self) -> i64 {
        self.ram_bytes
    }

    pub fn peak_ram_bytes(&self) -> i64 {
        self.peak_ram_bytes
    }

    pub fn set_ram(&mut self, ram_bytes: i64) {
        self.ram_bytes = ram_bytes;
        self.peak_ram_bytes = i64::max(self.peak_ram_bytes, ram_bytes);
    }

    pub fn elapsed_ms(&self) -> i32 {
        self.elapsed_ms
    }

    /// `delta_ms` is the renderer clock at the start of the pass.
    pub fn set_time(&mut self, time_ms: i32, delta_ms: i32) {
        self.elapsed_ms = if delta_ms > time_ms {
            time_ms
        } else {
            time_ms - delta_ms
        };
    }

    /// Copies a bucket into channel `index`, flipping it vertically.
    ///
    /// Source row `y` lands on row `height - (y + bucket_y) - 1`. Pixels outside
    /// the frame are dropped. Returns the display-space rectangle written, or a
    /// `MalformedPacket` error if that rectangle does not fit in `i32`.
    pub fn write_bucket(&mut self, index: usize, bucket: &BucketData) -> Result<Region> {
        let region = Region::from_bucket(
            bucket.bucket_x,
            bucket.bucket_y,
            bucket.bucket_w,
            bucket.bucket_h,
            self.resolution.height,
        )
        .ok_or_else(|| {
            AtonError::malformed(format!(
                "bucket {}x{} at ({}, {}) is out of range",
                bucket.bucket_w, bucket.bucket_h, bucket.bucket_x, bucket.bucket_y
            ))
        })?;
        let width = self.resolution.width as i64;
        let height = self.resolution.height as i64;
        let buffer = self
            .buffers
            .get_mut(index)
            .ok_or_else(|| AtonError::state(format!("no channel {}", index)))?;
        let src_spp = bucket.samples_per_pixel.max(0) as usize;
        let n = usize::min(src_spp, buffer.samples_per_pixel);
        if n == 0 {
            return Ok(region);
        }

        let (bx, by) = (bucket.bucket_x as i64, bucket.bucket_y as i64);
        let (bw, bh) = (bucket.bucket_w.max(0) as i64, bucket.bucket_h.max(0) as i64);
        // only the part of the bucket inside the frame
        let rows = i64::max(0, -by)..i64::min(bh, height - by);
        let cols = i64::max(0, -bx)..i64::min(bw, width - bx);
        for y in rows {
            let ypos = height - (y + by) - 1;
            for x in cols.clone() {
                let src = (y * bw + x) as usize * src_spp;
                let samples = bucket.pixels.get(src..src + n).ok_or_else(|| {
                    AtonError::malformed(format!(
                        "bucket holds {} samples, {} expected",
                        bucket.pixels.len(),
                        bucket.sample_count()
                    ))
                })?;
                let dst = buffer.offset(width, x + bx, ypos);
                buffer.pixels[dst..dst + n].copy_from_slice(samples);
            }
        }
        return Ok(region);
    }

    /// Sample `component` of pixel (x, y) in channel `index`, y up.
    pub fn pixel(&self, index: usize, x: i32, y: i32, component: usize) -> Option<f32> {
        if !self.resolution.contains(x, y) {
            return None;
        }
        let buffer = self.buffers.get(index)?;
        if component >= buffer.samples_per_pixel {
            return None;
        }
        let offset = buffer.offset(self.resolution.width as i64, x as i64, y as i64);
        return buffer.pixels.get(offset + component).copied();
    }

    pub fn stats(&self, frame_count: usize) -> FrameStats {
        FrameStats {
            frame: self.frame,
            width: self.resolution.width,
            height: self.resolution.height,
            progress_pct: self.progress,
            ram_bytes: self.ram_bytes,
            peak_ram_bytes: self.peak_ram_bytes,
            elapsed_ms: self.elapsed_ms,
            renderer_version: self.renderer_version,
            channel_count: self.buffers.len(),
            ready: self.ready,
            frame_count,
        }
    }
}
