pub mod arcface_embedder;
pub mod composite_face_analyzer;
pub mod genderage_estimator;
pub mod reference_loader;
