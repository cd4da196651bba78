use crate::core::transform::Matrix4x4;

/// Type tags as they appear on the wire.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum PacketType {
    OpenImage = 0,
    BucketData = 1,
    CloseImage = 2,
    Terminate = 9,
}

impl PacketType {
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(PacketType::OpenImage),
            1 => Some(PacketType::BucketData),
            2 => Some(PacketType::CloseImage),
            9 => Some(PacketType::Terminate),
            _ => None,
        }
    }

    pub fn tag(self) -> i32 {
        self as i32
    }
}

/// Start of a new image (or a new IPR pass over the same image).
#[derive(Debug, PartialEq, Clone)]
pub struct OpenImage {
    pub width: i32,
    pub height: i32,
    pub region_area: i64,
    pub renderer_version: i32,
    pub camera_fov: f32,
    pub camera_matrix: Matrix4x4,
    pub frame: f64,
}

/// One rectangular bucket of pixels for one AOV.
///
/// `pixels` is scanline-major with the samples of each pixel interleaved;
/// row 0 is the top of the bucket.
#[derive(Debug, PartialEq, Clone)]
pub struct BucketData {
    pub aov_name: String,
    pub bucket_x: i32,
    pub bucket_y: i32,
    pub bucket_w: i32,
    pub bucket_h: i32,
    pub samples_per_pixel: i32,
    pub ram_bytes: i64,
    pub elapsed_ms: i32,
    pub pixels: Vec<f32>,
}

impl BucketData {
    pub fn area(&self) -> i64 {
        return self.bucket_w as i64 * self.bucket_h as i64;
    }

    /// Number of floats the payload must hold. Saturates instead of overflowing.
    pub fn sample_count(&self) -> usize {
        let w = self.bucket_w.max(0) as usize;
        let h = self.bucket_h.max(0) as usize;
        let spp = self.samples_per_pixel.max(0) as usize;
        return w.saturating_mul(h).saturating_mul(spp);
    }
}

/// Renderer data.
#[derive(Debug, PartialEq, Clone)]
pub enum ImagePacket {
    Open(OpenImage),
    Bucket(BucketData),
    Close,
}

/// Session control, carried over the same socket but never applied to a frame.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SessionControl {
    Terminate,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Packet {
    Data(ImagePacket),
    Control(SessionControl),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Data(ImagePacket::Open(_)) => PacketType::OpenImage,
            Packet::Data(ImagePacket::Bucket(_)) => PacketType::BucketData,
            Packet::Data(ImagePacket::Close) => PacketType::CloseImage,
            Packet::Control(SessionControl::Terminate) => PacketType::Terminate,
        }
    }

    /// True for packets after which nothing more is read from the connection.
    pub fn ends_stream(&self) -> bool {
        matches!(
            self,
            Packet::Data(ImagePacket::Close) | Packet::Control(SessionControl::Terminate)
        )
    }
}

impl From<OpenImage> for Packet {
    fn from(p: OpenImage) -> Self {
        Packet::Data(ImagePacket::Open(p))
    }
}

impl From<BucketData> for Packet {
    fn from(p: BucketData) -> Self {
        Packet::Data(ImagePacket::Bucket(p))
    }
}

impl From<SessionControl> for Packet {
    fn from(c: SessionControl) -> Self {
        Packet::Control(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        for t in [
            PacketType::OpenImage,
            PacketType::BucketData,
            PacketType::CloseImage,
            PacketType::Terminate,
        ] {
            assert_eq!(PacketType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(PacketType::Terminate.tag(), 9);
        assert_eq!(PacketType::from_tag(3), None);
        assert_eq!(PacketType::from_tag(-1), None);
    }

    #[test]
    fn test_ends_stream() {
        assert!(Packet::Data(ImagePacket::Close).ends_stream());
        assert!(Packet::from(SessionControl::Terminate).ends_stream());
        let bucket = BucketData {
            aov_name: "RGBA".into(),
            bucket_x: 0,
            bucket_y: 0,
            bucket_w: 2,
            bucket_h: 1,
            samples_per_pixel: 3,
            ram_bytes: 0,
            elapsed_ms: 0,
            pixels: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        assert_eq!(bucket.sample_count(), 6);
        let mut wide = bucket.clone();
        wide.bucket_w = i32::MAX;
        wide.bucket_h = i32::MAX;
        wide.samples_per_pixel = i32::MAX;
        assert_eq!(wide.sample_count(), usize::MAX);
        let packet = Packet::from(bucket);
        assert!(!packet.ends_stream());
        assert_eq!(packet.packet_type(), PacketType::BucketData);
    }
}
