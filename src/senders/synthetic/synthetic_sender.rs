use crate::core::aton::*;

use log::*;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

pub const BUCKET_SIZE: i32 = 64;

#[derive(Debug, Clone)]
pub struct SenderOptions {
    /// `host:port` of the receiver.
    pub address: String,
    pub width: i32,
    pub height: i32,
    pub bucket_size: i32,
    pub aovs: Vec<String>,
    pub frames: Vec<f64>,
    /// Progressive passes per frame, each on its own connection.
    pub passes: usize,
    pub terminate: bool,
    pub renderer_version: i32,
    pub camera_fov: f32,
}

impl Default for SenderOptions {
    fn default() -> Self {
        SenderOptions {
            address: format!("127.0.0.1:{}", DEFAULT_PORT),
            width: 640,
            height: 480,
            bucket_size: BUCKET_SIZE,
            aovs: vec![String::from("RGBA")],
            frames: vec![1.0],
            passes: 1,
            terminate: false,
            renderer_version: 5000200,
            camera_fov: 54.4,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize)]
pub struct SendSummary {
    pub connections: usize,
    pub buckets: usize,
    pub bytes: usize,
}

/// Samples per pixel a renderer would use for a well-known AOV name.
pub fn samples_per_pixel(aov: &str) -> i32 {
    match aov {
        "RGBA" => 4,
        "RGB" | "N" | "P" | "motionvector" => 3,
        "Z" | "A" | "ID" => 1,
        _ => 4,
    }
}

/// Splits `width` x `height` into buckets of at most `size`, in scanline order
/// from the top. Rectangles are `(x, y, w, h)` in renderer space (y down).
pub fn gen_buckets(width: i32, height: i32, size: i32) -> Vec<(i32, i32, i32, i32)> {
    let size = size.max(1);
    let ranges = |n: i32| -> Vec<(i32, i32)> {
        (0..n)
            .step_by(size as usize)
            .map(|t0| (t0, i32::min(t0 + size, n)))
            .filter(|(t0, t1)| t0 < t1)
            .collect()
    };
    let xranges = ranges(width);
    let yranges = ranges(height);
    let mut buckets = Vec::with_capacity(xranges.len() * yranges.len());
    for (y0, y1) in yranges.iter() {
        for (x0, x1) in xranges.iter() {
            buckets.push((*x0, *y0, x1 - x0, y1 - y0));
        }
    }
    return buckets;
}

/// A stand-in renderer: procedural test image, streamed bucket by bucket.
pub struct SyntheticSender {
    options: SenderOptions,
}

impl SyntheticSender {
    pub fn new(options: SenderOptions) -> Self {
        SyntheticSender { options }
    }

    pub fn options(&self) -> &SenderOptions {
        &self.options
    }

    fn camera_matrix(&self, frame: f64) -> Matrix4x4 {
        Matrix4x4::translate(0.1 * frame as f32, 1.0, 5.0)
    }

    /// Value of sample `c` at pixel (x, y). Later passes converge on the final image.
    fn sample(&self, aov: &str, frame: f64, pass: usize, x: i32, y: i32, c: usize) -> f32 {
        let w = self.options.width.max(1) as f32;
        let h = self.options.height.max(1) as f32;
        let u = (x as f32 + 0.5) / w;
        let v = (y as f32 + 0.5) / h;
        let weight = (pass + 1) as f32 / self.options.passes.max(1) as f32;
        let value = match aov {
            "Z" => 1.0 + 10.0 * v,
            "N" => [u * 2.0 - 1.0, v * 2.0 - 1.0, 1.0][c.min(2)],
            "P" => [u, v, frame as f32][c.min(2)],
            _ => {
                let checker = ((x / 16 + y / 16) % 2) as f32;
                let phase = (frame as f32 * 0.25).fract();
                match c {
                    0 => u,
                    1 => (v + phase).fract(),
                    2 => 0.25 + 0.5 * checker,
                    _ => 1.0,
                }
            }
        };
        return value * weight;
    }

    pub fn shade_bucket(
        &self,
        aov: &str,
        frame: f64,
        pass: usize,
        rect: (i32, i32, i32, i32),
    ) -> BucketData {
        let (bx, by, bw, bh) = rect;
        let spp = samples_per_pixel(aov);
        let mut pixels = Vec::with_capacity((bw * bh * spp) as usize);
        for y in 0..bh {
            for x in 0..bw {
                for c in 0..spp as usize {
                    pixels.push(self.sample(aov, frame, pass, bx + x, by + y, c));
                }
            }
        }
        BucketData {
            aov_name: String::from(aov),
            bucket_x: bx,
            bucket_y: by,
            bucket_w: bw,
            bucket_h: bh,
            samples_per_pixel: spp,
            ram_bytes: 0,
            elapsed_ms: 0,
            pixels,
        }
    }

    fn open_image(&self, frame: f64) -> OpenImage {
        OpenImage {
            width: self.options.width,
            height: self.options.height,
            region_area: self.options.width as i64 * self.options.height as i64,
            renderer_version: self.options.renderer_version,
            camera_fov: self.options.camera_fov,
            camera_matrix: self.camera_matrix(frame),
            frame,
        }
    }

    /// One IPR pass over one frame on a fresh connection.
    pub fn send_pass(
        &self,
        frame: f64,
        pass: usize,
        clock: &Instant,
        summary: &mut SendSummary,
    ) -> Result<()> {
        let rects = gen_buckets(self.options.width, self.options.height, self.options.bucket_size);
        let mut client = Client::new(&self.options.address)?;
        summary.connections += 1;
        let open = Packet::from(self.open_image(frame));
        summary.bytes += encode_packet(&open).len();
        client.send(&open)?;

        let mut ram_bytes = 0i64;
        for aov in self.options.aovs.iter() {
            let buckets: Vec<BucketData> = rects
                .par_iter()
                .map(|rect| self.shade_bucket(aov, frame, pass, *rect))
                .collect();
            for mut bucket in buckets {
                ram_bytes += (bucket.pixels.len() * std::mem::size_of::<f32>()) as i64;
                bucket.ram_bytes = ram_bytes;
                bucket.elapsed_ms = clock.elapsed().as_millis().min(i32::MAX as u128) as i32;
                let packet = Packet::from(bucket);
                summary.bytes += encode_packet(&packet).len();
                client.send(&packet)?;
                summary.buckets += 1;
            }
        }
        client.close_image()?;
        client.disconnect()?;
        debug!("Frame {} pass {} sent", frame, pass + 1);
        return Ok(());
    }

    /// Sends every pass of every frame, then `Terminate` if asked to.
    pub fn run(&self) -> Result<SendSummary> {
        let clock = Instant::now();
        let mut summary = SendSummary::default();
        for frame in self.options.frames.iter() {
            for pass in 0..self.options.passes.max(1) {
                self.send_pass(*frame, pass, &clock, &mut summary)?;
            }
            info!("Frame {} sent", format_frame(*frame));
        }
        if self.options.terminate {
            let mut client = Client::new(&self.options.address)?;
            client.terminate()?;
            client.disconnect()?;
            summary.connections += 1;
        }
        return Ok(summary);
    }
}
