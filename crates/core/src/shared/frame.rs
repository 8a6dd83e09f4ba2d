use ndarray::ArrayView3;

use crate::shared::bounding_box::BoundingBox;

/// A captured frame: contiguous RGB bytes in row-major order.
///
/// `sequence` counts frames in capture order so consumers can tell a fresh
/// frame from one they have already analysed.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            sequence,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Square crop centered on `face`, with the side scaled by `scale`
    /// relative to the longer box edge, clipped to the frame.
    ///
    /// Returns `None` when the clipped crop is empty.
    pub fn square_crop(&self, face: &BoundingBox, scale: f64) -> Option<Frame> {
        let (cx, cy) = face.center();
        let half = face.width.max(face.height) * scale / 2.0;

        let x1 = (cx - half).max(0.0).round() as usize;
        let y1 = (cy - half).max(0.0).round() as usize;
        let x2 = ((cx + half).round().max(0.0) as usize).min(self.width as usize);
        let y2 = ((cy + half).round().max(0.0) as usize).min(self.height as usize);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let channels = self.channels as usize;
        let row_bytes = self.width as usize * channels;
        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * channels);
        for row in y1..y2 {
            let start = row * row_bytes + x1 * channels;
            data.extend_from_slice(&self.data[start..start + (x2 - x1) * channels]);
        }

        Some(Frame::new(
            data,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.channels,
            self.sequence,
        ))
    }
}
