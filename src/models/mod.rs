//! Inference adapters

pub mod inference;
pub mod linear;
pub mod loader;
pub mod onnx;

pub use inference::ChurnModel;
pub use linear::LinearChurnModel;
pub use loader::{load_model, ModelLoader};
pub use onnx::OnnxChurnModel;
