//! Wire decoding. Pure parsing: nothing here touches shared state.

use super::packet::*;
use crate::core::aton::{MAX_AOV_NAME_LEN, MAX_BUCKET_SAMPLES};
use crate::core::error::*;
use crate::core::framebuffer::Resolution;
use crate::core::transform::Matrix4x4;

use std::io::{ErrorKind, Read};

fn read_bytes<R: Read>(reader: &mut R, buf: &mut [u8], context: &'static str) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            Err(AtonError::truncated(context, buf.len()))
        }
        Err(e) => Err(AtonError::from(e)),
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R, context: &'static str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    read_bytes(reader, &mut buf, context)?;
    return Ok(buf);
}

fn read_i32<R: Read>(reader: &mut R, context: &'static str) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array(reader, context)?))
}

fn read_i64<R: Read>(reader: &mut R, context: &'static str) -> Result<i64> {
    Ok(i64::from_le_bytes(read_array(reader, context)?))
}

fn read_f32<R: Read>(reader: &mut R, context: &'static str) -> Result<f32> {
    Ok(f32::from_le_bytes(read_array(reader, context)?))
}

fn read_f64<R: Read>(reader: &mut R, context: &'static str) -> Result<f64> {
    Ok(f64::from_le_bytes(read_array(reader, context)?))
}

fn read_non_negative<R: Read>(reader: &mut R, context: &'static str) -> Result<i32> {
    let v = read_i32(reader, context)?;
    if v < 0 {
        let msg = format!("{} must not be negative (got {})", context, v);
        return Err(AtonError::malformed(msg));
    }
    return Ok(v);
}

fn read_string<R: Read>(reader: &mut R, context: &'static str) -> Result<String> {
    let len = read_non_negative(reader, context)? as usize;
    if len > MAX_AOV_NAME_LEN {
        let msg = format!("{} is {} bytes long (limit {})", context, len, MAX_AOV_NAME_LEN);
        return Err(AtonError::malformed(msg));
    }
    let mut buf = vec![0u8; len];
    read_bytes(reader, &mut buf, context)?;
    while buf.last() == Some(&0) {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| AtonError::malformed(format!("{} is not UTF-8", context)))
}

/// Reads the type tag. `Ok(None)` means the stream ended cleanly on a packet boundary.
fn read_tag<R: Read>(reader: &mut R) -> Result<Option<i32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(AtonError::truncated("packet type", buf.len()));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(AtonError::from(e)),
        }
    }
    return Ok(Some(i32::from_le_bytes(buf)));
}

fn read_open_image<R: Read>(reader: &mut R) -> Result<OpenImage> {
    let width = read_non_negative(reader, "OpenImage.width")?;
    let height = read_non_negative(reader, "OpenImage.height")?;
    Resolution::new(width, height).validate()?;
    let region_area = read_i64(reader, "OpenImage.region_area")?;
    let renderer_version = read_i32(reader, "OpenImage.version")?;
    let camera_fov = read_f32(reader, "OpenImage.camera_fov")?;
    let mut m = [0.0f32; 16];
    for v in m.iter_mut() {
        *v = read_f32(reader, "OpenImage.camera_matrix")?;
    }
    let frame = read_f64(reader, "OpenImage.frame")?;
    Ok(OpenImage {
        width,
        height,
        region_area,
        renderer_version,
        camera_fov,
        camera_matrix: Matrix4x4::from(m),
        frame,
    })
}

fn read_bucket_data<R: Read>(reader: &mut R) -> Result<BucketData> {
    let aov_name = read_string(reader, "BucketData.aov_name")?;
    let bucket_x = read_i32(reader, "BucketData.bucket_x")?;
    let bucket_y = read_i32(reader, "BucketData.bucket_y")?;
    let bucket_w = read_non_negative(reader, "BucketData.bucket_w")?;
    let bucket_h = read_non_negative(reader, "BucketData.bucket_h")?;
    let samples_per_pixel = read_non_negative(reader, "BucketData.samples_per_pixel")?;
    let ram_bytes = read_i64(reader, "BucketData.ram_bytes")?;
    let elapsed_ms = read_i32(reader, "BucketData.elapsed_ms")?;

    let count = (bucket_w as usize)
        .checked_mul(bucket_h as usize)
        .and_then(|n| n.checked_mul(samples_per_pixel as usize))
        .filter(|n| *n <= MAX_BUCKET_SAMPLES)
        .ok_or_else(|| {
            AtonError::malformed(format!(
                "bucket {}x{}x{} exceeds the sample limit",
                bucket_w, bucket_h, samples_per_pixel
            ))
        })?;

    let mut raw = vec![0u8; count * 4];
    read_bytes(reader, &mut raw, "BucketData.pixels")?;
    let pixels = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(BucketData {
        aov_name,
        bucket_x,
        bucket_y,
        bucket_w,
        bucket_h,
        samples_per_pixel,
        ram_bytes,
        elapsed_ms,
        pixels,
    })
}

/// Decodes exactly one packet.
///
/// Returns `Ok(None)` at a clean end of stream. A stream that ends inside a
/// packet is a `TruncatedPacket` error; the caller should drop the connection.
pub fn read_packet<R: Read>(reader: &mut R) -> Result<Option<Packet>> {
    let tag = match read_tag(reader)? {
        Some(tag) => tag,
        None => return Ok(None),
    };
    let packet_type = PacketType::from_tag(tag)
        .ok_or_else(|| AtonError::malformed(format!("unknown packet type {}", tag)))?;
    let packet = match packet_type {
        PacketType::OpenImage => Packet::from(read_open_image(reader)?),
        PacketType::BucketData => Packet::from(read_bucket_data(reader)?),
        PacketType::CloseImage => Packet::Data(ImagePacket::Close),
        PacketType::Terminate => Packet::Control(SessionControl::Terminate),
    };
    return Ok(Some(packet));
}
