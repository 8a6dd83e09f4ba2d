pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Maximum embedding distance still counted as a match.
///
/// Suits 128-d face descriptors. L2-normalised ArcFace embeddings of the
/// same person typically sit around 0.8 to 1.1 apart, so tune this with
/// `--threshold` or `match_threshold` when using the ArcFace embedder.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Detection loop cadence in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Label shown for faces without a match.
pub const UNKNOWN_LABEL: &str = "unknown";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
