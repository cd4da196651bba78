use crate::core::aton::BYTES_PER_MB;
use crate::core::framebuffer::FrameStats;

/// `arch*1000000 + major*10000 + minor*100 + fix` as `arch.major.minor.fix`.
pub fn version_string(version: i32) -> String {
    let v = version.max(0);
    let arch = v / 1000000;
    let major = (v % 1000000) / 10000;
    let minor = (v % 10000) / 100;
    let fix = v % 100;
    return format!("{}.{}.{}.{}", arch, major, minor, fix);
}

/// `HHh:MMm:SSs`
pub fn format_elapsed(time_ms: i32) -> String {
    let t = time_ms.max(0);
    let hour = t / 3600000;
    let minute = (t % 3600000) / 60000;
    let second = (t % 60000) / 1000;
    return format!("{:02}h:{:02}m:{:02}s", hour, minute, second);
}

/// Whole frames are zero padded (`0012`), sub-frames printed as is (`12.5`).
pub fn format_frame(frame: f64) -> String {
    if frame.fract() == 0.0 && frame.abs() < 1e15 {
        return format!("{:04}", frame as i64);
    }
    return format!("{}", frame);
}

pub fn format_status(stats: &FrameStats) -> String {
    format!(
        "Renderer: {} | Memory: {}MB / {}MB | Time: {} | Frame: {} ({}) | Progress: {}%",
        version_string(stats.renderer_version),
        stats.ram_bytes / BYTES_PER_MB,
        stats.peak_ram_bytes / BYTES_PER_MB,
        format_elapsed(stats.elapsed_ms),
        format_frame(stats.frame),
        stats.frame_count,
        stats.progress_pct
    )
}
