pub mod aggregate;
pub mod annotate;
pub mod color_utils;
pub mod config;
pub mod detection;
pub mod detector;
pub mod identify;
pub mod image_input;
pub mod labels;
pub mod model_access;
pub mod onnx_session;
pub mod remote;
pub mod report;
pub mod yolo;
