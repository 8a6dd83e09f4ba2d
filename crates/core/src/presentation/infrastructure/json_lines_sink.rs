use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::presentation::domain::detection_sink::DetectionSink;
use crate::recognition::domain::detected_face::DetectedFace;

#[derive(Serialize)]
struct Snapshot<'a> {
    tick: u64,
    timestamp_ms: u128,
    faces: &'a [DetectedFace],
}

/// Writes one JSON object per published face set, newline-delimited.
///
/// Each line is the complete current set; consumers replace rather than
/// merge.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    tick: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, tick: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> DetectionSink for JsonLinesSink<W> {
    fn publish(&mut self, faces: Vec<DetectedFace>) -> Result<(), Box<dyn std::error::Error>> {
        self.tick += 1;
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let snapshot = Snapshot {
            tick: self.tick,
            timestamp_ms,
            faces: &faces,
        };
        serde_json::to_writer(&mut self.writer, &snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
