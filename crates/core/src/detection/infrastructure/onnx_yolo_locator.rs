/// YOLO face locator using ONNX Runtime via `ort`.
///
/// Letterboxes the frame, runs inference, and turns the raw rows into
/// frame-space boxes filtered by confidence and greedy NMS.
use std::path::Path;
use std::sync::Mutex;

use crate::detection::domain::face_locator::{FaceLocator, LocatedFace};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::load_session;

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloLocator {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloLocator {
    /// Loads the model. The input resolution comes from the model's NCHW
    /// input shape, falling back to 640 for dynamic shapes.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_size = session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceLocator for OnnxYoloLocator {
    fn locate(&self, frame: &Frame) -> Result<Vec<LocatedFace>, Box<dyn std::error::Error>> {
        let (input, transform) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let candidates = decode_rows(data, &shape, self.confidence, &transform)?;
        Ok(nms(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|face| LocatedFace {
                bounding_box: face.bounding_box.clamp_to(frame.width(), frame.height()),
                confidence: face.confidence,
            })
            .filter(|face| face.bounding_box.area() > 0.0)
            .collect())
    }
}

/// Maps letterboxed model coordinates back to frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl Letterbox {
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size` as an NCHW
/// float tensor in `[0, 1]`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x: pad_x as f64,
            pad_y: pad_y as f64,
        },
    )
}

/// Parses YOLO output rows `[cx, cy, w, h, conf, ...]`.
///
/// Accepts `[1, features, detections]` (transposed export) as well as
/// `[1, detections, features]`; trailing keypoint columns are ignored.
fn decode_rows(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    transform: &Letterbox,
) -> Result<Vec<LocatedFace>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(format!("YOLO output too small for shape {shape:?}").into());
    }

    let value = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let mut faces = Vec::new();
    for i in 0..num_dets {
        let conf = value(i, 4);
        if conf < confidence {
            continue;
        }
        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let (x1, y1) = transform.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = transform.to_frame(cx + w / 2.0, cy + h / 2.0);
        faces.push(LocatedFace {
            bounding_box: BoundingBox::from_corners(x1, y1, x2, y2),
            confidence: conf,
        });
    }
    Ok(faces)
}

/// Greedy NMS: highest confidence first, suppressing overlapping boxes.
fn nms(mut faces: Vec<LocatedFace>, iou_thresh: f64) -> Vec<LocatedFace> {
    faces.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<LocatedFace> = Vec::with_capacity(faces.len());
    for face in faces {
        if kept
            .iter()
            .all(|k| k.bounding_box.iou(&face.bounding_box) <= iou_thresh)
        {
            kept.push(face);
        }
    }
    kept
}
