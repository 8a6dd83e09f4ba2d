use std::path::Path;
use std::sync::Mutex;

use crate::shared::frame::Frame;

/// Return the preferred ONNX execution providers for the current platform.
///
/// An empty list means ONNX Runtime's default CPU provider.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Loads a model into a session shared behind a mutex.
///
/// `Session::run` needs `&mut self`; the mutex lets one session serve both
/// the detection loop and registration.
pub fn load_session(
    model_path: &Path,
) -> Result<Mutex<ort::session::Session>, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(Mutex::new(session))
}

/// Runs a single-input model and returns its first output flattened.
pub fn run_single(
    session: &Mutex<ort::session::Session>,
    input: ndarray::Array4<f32>,
) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let input_value = ort::value::Tensor::from_array(input)?;
    let mut session = session
        .lock()
        .map_err(|e| format!("Lock poisoned: {e}"))?;
    let outputs = session.run(ort::inputs![input_value])?;
    if outputs.len() == 0 {
        return Err("model produced no outputs".into());
    }
    let array = outputs[0].try_extract_array::<f32>()?;
    Ok(array.iter().copied().collect())
}

/// Nearest-neighbor resize of an RGB crop into a `1×3×size×size` tensor,
/// mapping each byte through `normalize`.
pub fn crop_to_nchw(
    crop: &Frame,
    size: usize,
    normalize: impl Fn(u8) -> f32,
) -> ndarray::Array4<f32> {
    let src_w = crop.width() as usize;
    let src_h = crop.height() as usize;
    let src = crop.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }
    for y in 0..size {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / size as f64) as usize).min(src_h - 1);
        for x in 0..size {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / size as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = normalize(src[[src_y, src_x, c]]);
            }
        }
    }
    tensor
}
