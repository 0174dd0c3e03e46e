use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::Session;
use ort::value::ValueType;

/// Opens an ONNX Runtime session on the platform accelerator when one is
/// available. ONNX Runtime falls back to its CPU provider on its own when
/// the accelerator refuses the graph.
pub fn open_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let (accelerator, providers) = accelerator_providers();
    log::debug!("Opening {} with {accelerator}", model_path.display());
    let session = Session::builder()?
        .with_execution_providers(providers)?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Spatial size of the first NCHW input, or `None` when it is dynamic.
pub fn square_input_size(session: &Session) -> Option<u32> {
    let input = session.inputs().first()?;
    match input.dtype() {
        ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
            Some(shape[2] as u32)
        }
        _ => None,
    }
}

#[cfg(target_os = "macos")]
fn accelerator_providers() -> (&'static str, Vec<ExecutionProviderDispatch>) {
    (
        "CoreML",
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()],
    )
}

#[cfg(target_os = "windows")]
fn accelerator_providers() -> (&'static str, Vec<ExecutionProviderDispatch>) {
    (
        "DirectML",
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()],
    )
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn accelerator_providers() -> (&'static str, Vec<ExecutionProviderDispatch>) {
    ("CPU", Vec::new())
}
