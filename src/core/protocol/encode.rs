use super::packet::*;

use std::io::Write;

fn put_i32(buffer: &mut Vec<u8>, v: i32) {
    buffer.extend_from_slice(&v.to_le_bytes());
}

fn put_i64(buffer: &mut Vec<u8>, v: i64) {
    buffer.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(buffer: &mut Vec<u8>, v: f32) {
    buffer.extend_from_slice(&v.to_le_bytes());
}

fn put_string(buffer: &mut Vec<u8>, s: &str) {
    put_i32(buffer, s.len() as i32);
    buffer.extend_from_slice(s.as_bytes());
}

pub fn encode_open_image(buffer: &mut Vec<u8>, open: &OpenImage) {
    put_i32(buffer, PacketType::OpenImage.tag());
    put_i32(buffer, open.width);
    put_i32(buffer, open.height);
    put_i64(buffer, open.region_area);
    put_i32(buffer, open.renderer_version);
    put_f32(buffer, open.camera_fov);
    for v in open.camera_matrix.as_slice() {
        put_f32(buffer, *v);
    }
    buffer.extend_from_slice(&open.frame.to_le_bytes());
}

pub fn encode_bucket_data(buffer: &mut Vec<u8>, bucket: &BucketData) {
    put_i32(buffer, PacketType::BucketData.tag());
    put_string(buffer, &bucket.aov_name);
    put_i32(buffer, bucket.bucket_x);
    put_i32(buffer, bucket.bucket_y);
    put_i32(buffer, bucket.bucket_w);
    put_i32(buffer, bucket.bucket_h);
    put_i32(buffer, bucket.samples_per_pixel);
    put_i64(buffer, bucket.ram_bytes);
    put_i32(buffer, bucket.elapsed_ms);
    buffer.reserve(bucket.pixels.len() * 4);
    for f in bucket.pixels.iter() {
        put_f32(buffer, *f);
    }
}

pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    let mut buffer = Vec::new();
    match packet {
        Packet::Data(ImagePacket::Open(open)) => encode_open_image(&mut buffer, open),
        Packet::Data(ImagePacket::Bucket(bucket)) => encode_bucket_data(&mut buffer, bucket),
        Packet::Data(ImagePacket::Close) => put_i32(&mut buffer, PacketType::CloseImage.tag()),
        Packet::Control(SessionControl::Terminate) => {
            put_i32(&mut buffer, PacketType::Terminate.tag())
        }
    }
    return buffer;
}

pub fn write_packet<W: Write>(writer: &mut W, packet: &Packet) -> std::io::Result<()> {
    writer.write_all(&encode_packet(packet))
}
