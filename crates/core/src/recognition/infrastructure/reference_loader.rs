use std::path::{Path, PathBuf};

use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceLoadError {
    #[error("known faces directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Collects reference embeddings from a `<dir>/<label>/<image>` tree.
///
/// Each image contributes the embedding of its most confident face.
/// Images that cannot be decoded or analysed, or that hold no usable face,
/// are skipped with a warning. So are blank labels and labels that end up
/// with no embedding at all. Labels and images are visited in
/// lexicographic order.
pub fn load_reference_faces(
    dir: &Path,
    analyzer: &dyn FaceAnalyzer,
) -> Result<Vec<(String, Embedding)>, ReferenceLoadError> {
    if !dir.is_dir() {
        return Err(ReferenceLoadError::MissingDirectory(dir.to_path_buf()));
    }

    let mut references = Vec::new();
    for label_dir in sorted_entries(dir)?.into_iter().filter(|p| p.is_dir()) {
        let Some(label) = label_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let label = label.trim().to_string();
        if label.is_empty() {
            log::warn!("Skipping unnamed label directory {}", label_dir.display());
            continue;
        }

        let before = references.len();
        for image_path in sorted_entries(&label_dir)?
            .into_iter()
            .filter(|p| p.is_file() && has_image_extension(p))
        {
            let frame = match read_frame(&image_path) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Skipping {}: {e}", image_path.display());
                    continue;
                }
            };
            match analyzer.detect_single(&frame) {
                Ok(Some(face)) if face.embedding.is_finite() => {
                    references.push((label.clone(), face.embedding))
                }
                Ok(Some(_)) => log::warn!(
                    "Skipping {}: embedding is not finite",
                    image_path.display()
                ),
                Ok(None) => log::warn!("No face found in {}", image_path.display()),
                Err(e) => log::warn!("Face analysis failed on {}: {e}", image_path.display()),
            }
        }

        let loaded = references.len() - before;
        if loaded == 0 {
            log::warn!("No usable reference images for '{label}'");
        } else {
            log::info!("Loaded {loaded} reference(s) for '{label}'");
        }
    }
    Ok(references)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ReferenceLoadError> {
    let io_err = |source: std::io::Error| ReferenceLoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = std::fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    paths.sort();
    Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_frame(path: &Path) -> Result<Frame, image::ImageError> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::detected_face::{FaceObservation, SingleFace};
    use crate::recognition::domain::recognition_state::RecognitionState;
    use crate::shared::bounding_box::BoundingBox;

    /// Finds a face unless the image is pure black; embeds the first pixel.
    /// Pure red fails analysis and pure blue yields a NaN embedding.
    struct PixelAnalyzer;

    impl FaceAnalyzer for PixelAnalyzer {
        fn detect_all(
            &self,
            _frame: &Frame,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }

        fn detect_single(
            &self,
            frame: &Frame,
        ) -> Result<Option<SingleFace>, Box<dyn std::error::Error>> {
            let px = &frame.data()[..3];
            if px == [0, 0, 0] {
                return Ok(None);
            }
            if px == [255, 0, 0] {
                return Err("model failure".into());
            }
            if px == [0, 0, 255] {
                return Ok(Some(SingleFace {
                    bounding_box: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                    embedding: Embedding::new(vec![f32::NAN, 0.0, 0.0]),
                }));
            }
            Ok(Some(SingleFace {
                bounding_box: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                embedding: Embedding::new(px.iter().map(|v| *v as f32).collect()),
            }))
        }
    }

    fn write_image(dir: &Path, label: &str, file: &str, rgb: [u8; 3]) {
        let label_dir = dir.join(label);
        std::fs::create_dir_all(&label_dir).unwrap();
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb(rgb));
        img.save(label_dir.join(file)).unwrap();
    }

    #[test]
    fn test_loads_labels_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "bob", "1.png", [3, 3, 3]);
        write_image(dir.path(), "ada", "b.png", [2, 2, 2]);
        write_image(dir.path(), "ada", "a.png", [1, 1, 1]);

        let refs = load_reference_faces(dir.path(), &PixelAnalyzer).unwrap();

        let summary: Vec<(&str, f32)> = refs
            .iter()
            .map(|(name, e)| (name.as_str(), e.values()[0]))
            .collect();
        assert_eq!(summary, vec![("ada", 1.0), ("ada", 2.0), ("bob", 3.0)]);
    }

    #[test]
    fn test_skips_images_without_face_and_non_images() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "ada", "face.png", [9, 9, 9]);
        write_image(dir.path(), "ada", "blank.png", [0, 0, 0]);
        write_image(dir.path(), "ghost", "blank.png", [0, 0, 0]);
        std::fs::write(dir.path().join("ada").join("notes.txt"), "hi").unwrap();
        std::fs::write(dir.path().join("stray.png"), "not in a label dir").unwrap();

        let refs = load_reference_faces(dir.path(), &PixelAnalyzer).unwrap();

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0, "ada");
    }

    #[test]
    fn test_skips_undecodable_image() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "ada", "good.png", [5, 5, 5]);
        std::fs::write(dir.path().join("ada").join("broken.jpg"), b"garbage").unwrap();

        let refs = load_reference_faces(dir.path(), &PixelAnalyzer).unwrap();

        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_analysis_failure_skips_only_that_image() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "ada", "a.png", [255, 0, 0]);
        write_image(dir.path(), "ada", "b.png", [7, 7, 7]);
        write_image(dir.path(), "bob", "a.png", [8, 8, 8]);

        let refs = load_reference_faces(dir.path(), &PixelAnalyzer).unwrap();

        let names: Vec<&str> = refs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["ada", "bob"]);
        assert_eq!(refs[0].1.values()[0], 7.0);
    }

    #[test]
    fn test_non_finite_embedding_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "ada", "a.png", [0, 0, 255]);
        write_image(dir.path(), "ada", "b.png", [4, 4, 4]);

        let refs = load_reference_faces(dir.path(), &PixelAnalyzer).unwrap();

        assert_eq!(refs.len(), 1);
        assert!(refs.iter().all(|(_, e)| e.is_finite()));
    }

    #[test]
    fn test_blank_label_directory_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "   ", "a.png", [6, 6, 6]);
        write_image(dir.path(), " ada ", "a.png", [5, 5, 5]);

        let refs = load_reference_faces(dir.path(), &PixelAnalyzer).unwrap();

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0, "ada");

        let state = RecognitionState::new(0.6);
        assert_eq!(state.register_all(refs), Ok(1));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_reference_faces(&dir.path().join("nope"), &PixelAnalyzer);
        assert!(matches!(result, Err(ReferenceLoadError::MissingDirectory(_))));
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        assert!(has_image_extension(Path::new("a/B.JPG")));
        assert!(!has_image_extension(Path::new("a/b.gif")));
        assert!(!has_image_extension(Path::new("a/noext")));
    }
}
