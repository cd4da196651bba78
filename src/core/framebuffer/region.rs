use crate::core::aton::MAX_IMAGE_AREA;
use crate::core::error::*;

use serde::{Deserialize, Serialize};

/// Image resolution, owned by value by every frame buffer.
#[derive(Debug, PartialEq, Eq, Default, Copy, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: i32,
    pub height: i32,
}

impl Resolution {
    pub fn new(width: i32, height: i32) -> Self {
        Resolution { width, height }
    }

    pub fn area(&self) -> i64 {
        return self.width as i64 * self.height as i64;
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        0 <= x && x < self.width && 0 <= y && y < self.height
    }

    /// Rejects negative sizes and images larger than `MAX_IMAGE_AREA` pixels.
    pub fn validate(&self) -> Result<()> {
        if self.width < 0 || self.height < 0 || self.area() > MAX_IMAGE_AREA {
            return Err(AtonError::malformed(format!(
                "impossible resolution {}x{}",
                self.width, self.height
            )));
        }
        return Ok(());
    }
}

/// Pixel rectangle `[x0, x1) x [y0, y1)` in display space (y up, row 0 at the bottom).
#[derive(Debug, PartialEq, Eq, Default, Copy, Clone, Serialize, Deserialize)]
pub struct Region {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Region {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Region { x0, y0, x1, y1 }
    }

    /// Display-space rectangle covered by a bucket given in renderer space (y down).
    ///
    /// None if a corner does not fit in `i32`.
    pub fn from_bucket(x: i32, y: i32, w: i32, h: i32, height: i32) -> Option<Self> {
        let top = height.checked_sub(y)?;
        Some(Region::new(x, top.checked_sub(h)?, x.checked_add(w)?, top))
    }

    pub fn width(&self) -> i32 {
        i32::max(0, self.x1 - self.x0)
    }

    pub fn height(&self) -> i32 {
        i32::max(0, self.y1 - self.y0)
    }

    pub fn area(&self) -> i64 {
        return self.width() as i64 * self.height() as i64;
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.x0 <= x && x < self.x1 && self.y0 <= y && y < self.y1
    }
}
