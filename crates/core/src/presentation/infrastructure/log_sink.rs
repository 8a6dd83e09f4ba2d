use crate::presentation::domain::detection_sink::DetectionSink;
use crate::recognition::domain::detected_face::DetectedFace;

/// Reports each published face set through the `log` facade.
///
/// Logs only when the set of captions changes, so a static scene does not
/// flood the output every tick.
#[derive(Default)]
pub struct LogSink {
    last: Vec<String>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectionSink for LogSink {
    fn publish(&mut self, faces: Vec<DetectedFace>) -> Result<(), Box<dyn std::error::Error>> {
        let captions: Vec<String> = faces.iter().map(|f| f.to_string()).collect();
        if captions == self.last {
            return Ok(());
        }
        if faces.is_empty() {
            log::info!("No faces in view");
        }
        for face in &faces {
            let b = face.bounding_box();
            log::info!(
                "{face} at ({:.0}, {:.0}) {:.0}x{:.0}",
                b.left,
                b.top,
                b.width,
                b.height
            );
        }
        self.last = captions;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    fn face() -> DetectedFace {
        DetectedFace::DetectionOnly {
            bounding_box: BoundingBox::new(0.0, 0.0, 5.0, 5.0),
        }
    }

    #[test]
    fn test_tracks_last_captions() {
        let mut sink = LogSink::new();

        sink.publish(vec![face()]).unwrap();
        assert_eq!(sink.last, vec!["face".to_string()]);

        sink.publish(Vec::new()).unwrap();
        assert!(sink.last.is_empty());
    }
}
