use crate::shared::frame::Frame;

/// A live source of frames (camera, stream, file played in real time).
///
/// Sources decode independently of their consumers; callers only ever see
/// the most recent frame.
pub trait FrameSource: Send + Sync {
    /// True once at least one frame has been decoded.
    fn is_frame_ready(&self) -> bool;

    /// The most recent frame. Errors when no frame is ready.
    fn current_frame(&self) -> Result<Frame, Box<dyn std::error::Error>>;
}
