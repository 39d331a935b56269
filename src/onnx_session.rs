//! ONNX Runtime session construction and device selection.

use anyhow::{anyhow, bail, Result};
use log::Level;
use ort::{
    execution_providers::{CPUExecutionProvider, CoreMLExecutionProvider, ExecutionProvider},
    logging::LogLevel,
    session::Session,
};
use std::fs;
use std::path::Path;

use crate::color_utils::symbols;

fn log_level_from_ort(level: LogLevel) -> Level {
    match level {
        LogLevel::Verbose => Level::Trace,
        LogLevel::Info => Level::Trace,
        LogLevel::Warning => Level::Debug,
        LogLevel::Error => Level::Info,
        LogLevel::Fatal => Level::Error,
    }
}

fn ort_level_from_log(level: Level) -> LogLevel {
    match level {
        // ONNX's own info level is closer to trace in practice
        Level::Trace => LogLevel::Verbose,
        Level::Debug => LogLevel::Warning,
        Level::Info => LogLevel::Error,
        Level::Warn => LogLevel::Error,
        Level::Error => LogLevel::Fatal,
    }
}

#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub device: String,
    pub reason: String,
}

/// Determine the inference device from the user's preference.
pub fn determine_optimal_device(requested_device: &str) -> DeviceSelection {
    match requested_device {
        "auto" => {
            let coreml = CoreMLExecutionProvider::default();
            match coreml.is_available() {
                Ok(true) => DeviceSelection {
                    device: "coreml".to_string(),
                    reason: "Auto-selected CoreML (available)".to_string(),
                },
                _ => DeviceSelection {
                    device: "cpu".to_string(),
                    reason: "Auto-selected CPU (CoreML not available)".to_string(),
                },
            }
        }
        other => DeviceSelection {
            device: other.to_string(),
            reason: format!("User explicitly chose {other}"),
        },
    }
}

/// Create an ONNX Runtime session from a model file.
pub fn create_session(model_path: &Path, device: &str) -> Result<Session> {
    let bytes = fs::read(model_path)
        .map_err(|e| anyhow!("failed to read model file {}: {e}", model_path.display()))?;
    if bytes.is_empty() {
        bail!(
            "model file is empty (0 bytes): {}; not a valid ONNX model",
            model_path.display()
        );
    }

    let execution_providers = match device {
        "coreml" => match CoreMLExecutionProvider::default().is_available() {
            Ok(true) => vec![
                CoreMLExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ],
            _ => {
                log::warn!(
                    "{}CoreML not available, falling back to CPU",
                    symbols::warning()
                );
                vec![CPUExecutionProvider::default().build()]
            }
        },
        "cpu" => {
            log::info!("🖥️  Using CPU execution provider");
            vec![CPUExecutionProvider::default().build()]
        }
        _ => {
            log::warn!(
                "{}Unknown device '{device}', using CPU",
                symbols::warning()
            );
            vec![CPUExecutionProvider::default().build()]
        }
    };

    // Route ORT's logger through ours at whatever level we have enabled
    let ort_log_level = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
    ]
    .into_iter()
    .find(|&lvl| log::log_enabled!(lvl))
    .map(ort_level_from_log)
    .unwrap_or(LogLevel::Fatal);

    let session = Session::builder()
        .map_err(|e| anyhow!("failed to create session builder: {e}"))?
        .with_logger(Box::new(|level, _, _, _, msg| {
            let log_level = log_level_from_ort(level);
            log::log!(log_level, "[onnx] {msg}")
        }))
        .map_err(|e| anyhow!("failed to set logger: {e}"))?
        .with_log_level(ort_log_level)
        .map_err(|e| anyhow!("failed to set log level: {e}"))?
        .with_execution_providers(execution_providers)
        .map_err(|e| anyhow!("failed to set execution providers: {e}"))?
        .commit_from_memory(&bytes)
        .map_err(|e| anyhow!("model unavailable: failed to load {}: {e}", model_path.display()))?;

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_device_is_honored() {
        let selection = determine_optimal_device("cpu");
        assert_eq!(selection.device, "cpu");
        assert!(selection.reason.contains("explicitly"));
    }

    #[test]
    fn test_auto_resolves_to_concrete_device() {
        let selection = determine_optimal_device("auto");
        assert!(selection.device == "cpu" || selection.device == "coreml");
    }

    #[test]
    fn test_missing_model_file_errors() {
        let result = create_session(Path::new("/nonexistent/model.onnx"), "cpu");
        assert!(result.is_err());
    }
}
