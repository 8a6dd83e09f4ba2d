use serde::Serialize;

/// Axis-aligned face box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Builds a box from `(x1, y1, x2, y2)` corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            top: y1,
            left: x1,
            width: (x2 - x1).max(0.0),
            height: (y2 - y1).max(0.0),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.left.max(other.left);
        let iy1 = self.top.max(other.top);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Clips the box to a `frame_width` × `frame_height` frame.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let x1 = self.left.clamp(0.0, fw);
        let y1 = self.top.clamp(0.0, fh);
        let x2 = self.right().clamp(0.0, fw);
        let y2 = self.bottom().clamp(0.0, fh);
        Self::from_corners(x1, y1, x2, y2)
    }
}
