use super::listener::*;
use super::session::*;
use crate::core::display::Display;
use crate::core::error::*;
use crate::core::framebuffer::*;
use crate::core::misc::format_status;
use crate::core::options::ReceiverOptions;
use crate::core::protocol::*;

use log::*;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

/// What to sample: an AOV by name and one of its per-pixel components.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Channel<'a> {
    pub aov: &'a str,
    pub component: usize,
}

impl<'a> Channel<'a> {
    pub fn new(aov: &'a str, component: usize) -> Self {
        Channel { aov, component }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    addr: SocketAddr,
    active: ActiveStream,
}

/// Receives images on a background thread and serves pixels to any thread.
pub struct Receiver {
    options: ReceiverOptions,
    frames: SharedFrames,
    policy: Arc<ReceiverPolicy>,
    display: Arc<dyn Display>,
    worker: Option<Worker>,
}

impl Receiver {
    pub fn new(options: ReceiverOptions, display: Arc<dyn Display>) -> Self {
        Receiver {
            options,
            frames: Arc::new(RwLock::new(FrameTable::new())),
            policy: Arc::new(ReceiverPolicy::new(
                options.aovs_enabled,
                options.multi_frame_enabled,
            )),
            display,
            worker: None,
        }
    }

    pub fn options(&self) -> ReceiverOptions {
        ReceiverOptions {
            port: self.options.port,
            aovs_enabled: self.aovs_enabled(),
            multi_frame_enabled: self.multi_frame_enabled(),
        }
    }

    /// Starts listening on the configured port.
    pub fn start(&mut self) -> Result<()> {
        self.open_connection(self.options.port)
    }

    /// Binds `port` and starts the receiver thread, stopping any previous one.
    ///
    /// A bind failure is also reported through `Display::connect_error`.
    pub fn open_connection(&mut self, port: u16) -> Result<()> {
        self.close_connection();
        let listener = match Listener::bind(port) {
            Ok(listener) => listener,
            Err(e) => {
                error!("{}", e);
                self.display.connect_error(&e);
                return Err(e);
            }
        };
        let addr = listener.local_addr()?;
        let active = listener.active_stream();
        let mut session = ReceiverSession::new(
            self.frames.clone(),
            self.policy.clone(),
            self.display.clone(),
        );
        let handle = std::thread::Builder::new()
            .name(String::from("aton-receiver"))
            .spawn(move || {
                session.run(&listener);
            })?;
        info!("Listening on port {}", addr.port());
        self.options.port = port;
        self.worker = Some(Worker {
            handle,
            addr,
            active,
        });
        return Ok(());
    }

    /// Stops the receiver thread and waits for it.
    ///
    /// A stalled client is cut off first, then the thread is told to
    /// terminate through its own port.
    pub fn close_connection(&mut self) {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return,
        };
        if !worker.handle.is_finished() {
            worker.active.shutdown();
            let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, worker.addr.port()));
            let sent = TcpStream::connect(addr).and_then(|mut stream| {
                write_packet(&mut stream, &Packet::Control(SessionControl::Terminate))
            });
            if let Err(e) = sent {
                error!("Could not stop receiver on port {}: {}", addr.port(), e);
                return;
            }
        }
        if worker.handle.join().is_err() {
            error!("Receiver thread panicked.");
        }
        debug!("Receiver on port {} closed", worker.addr.port());
    }

    /// Blocks until a client sends `Terminate`.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.handle.join().is_err() {
                error!("Receiver thread panicked.");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.worker.as_ref().map(|w| w.addr)
    }

    pub fn aovs_enabled(&self) -> bool {
        self.policy.aovs_enabled()
    }

    pub fn set_aovs_enabled(&self, enabled: bool) {
        self.policy.set_aovs_enabled(enabled);
    }

    pub fn multi_frame_enabled(&self) -> bool {
        self.policy.multi_frame_enabled()
    }

    pub fn set_multi_frame_enabled(&self, enabled: bool) {
        self.policy.set_multi_frame_enabled(enabled);
    }

    fn with_frame<T, F>(&self, frame: f64, f: F) -> Option<T>
    where
        F: FnOnce(&FrameBuffer) -> T,
    {
        let frames = read_frames(&self.frames);
        let multi_frame = self.policy.multi_frame_enabled();
        return frames.resolve(frame, multi_frame).map(f);
    }

    fn buffer_for(&self, fb: &FrameBuffer, channel: &Channel) -> Option<usize> {
        if !fb.is_ready() {
            return None;
        }
        if self.policy.aovs_enabled() {
            return fb.buffer_index(channel.aov);
        }
        return Some(0);
    }

    /// One sample, y up. 0 when out of range, not ready or unknown.
    pub fn read_pixel(&self, frame: f64, x: i32, y: i32, channel: &Channel) -> f32 {
        self.with_frame(frame, |fb| {
            self.buffer_for(fb, channel)
                .and_then(|b| fb.pixel(b, x, y, channel.component))
                .unwrap_or(0.0)
        })
        .unwrap_or(0.0)
    }

    /// Fills `out` with the samples of row `y` starting at column `x0`.
    pub fn read_row(&self, frame: f64, y: i32, x0: i32, out: &mut [f32], channel: &Channel) {
        let filled = self.with_frame(frame, |fb| {
            let b = self.buffer_for(fb, channel);
            for (i, v) in out.iter_mut().enumerate() {
                let x = x0 + i as i32;
                *v = b
                    .and_then(|b| fb.pixel(b, x, y, channel.component))
                    .unwrap_or(0.0);
            }
        });
        if filled.is_none() {
            out.fill(0.0);
        }
    }

    /// Row-major samples of `region`, bottom row first.
    pub fn read_region(&self, frame: f64, region: &Region, channel: &Channel) -> Vec<f32> {
        let width = region.width() as usize;
        let mut values = vec![0.0; region.area() as usize];
        if width == 0 {
            return values;
        }
        self.with_frame(frame, |fb| {
            let b = self.buffer_for(fb, channel);
            for (row, chunk) in values.chunks_exact_mut(width).enumerate() {
                let y = region.y0 + row as i32;
                for (i, v) in chunk.iter_mut().enumerate() {
                    let x = region.x0 + i as i32;
                    *v = b
                        .and_then(|b| fb.pixel(b, x, y, channel.component))
                        .unwrap_or(0.0);
                }
            }
        });
        return values;
    }

    pub fn frame_buffer_stats(&self, frame: f64) -> Option<FrameStats> {
        let frames = read_frames(&self.frames);
        let multi_frame = self.policy.multi_frame_enabled();
        let count = frames.len();
        return frames.resolve(frame, multi_frame).map(|fb| fb.stats(count));
    }

    pub fn status_line(&self, frame: f64) -> Option<String> {
        self.frame_buffer_stats(frame).map(|s| format_status(&s))
    }

    pub fn channel_names(&self, frame: f64) -> Vec<String> {
        self.with_frame(frame, |fb| fb.buffer_names())
            .unwrap_or_default()
    }

    pub fn frames(&self) -> Vec<f64> {
        read_frames(&self.frames).frames()
    }

    pub fn resolution(&self, frame: f64) -> Option<Resolution> {
        self.with_frame(frame, |fb| fb.resolution())
    }

    pub fn camera(&self, frame: f64) -> Option<Camera> {
        self.with_frame(frame, |fb| *fb.camera())
    }

    /// Drops every frame. Buckets are rejected until the next `OpenImage`.
    pub fn clear_all(&self) {
        write_frames(&self.frames).clear();
        info!("Cleared all frames.");
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.close_connection();
    }
}
