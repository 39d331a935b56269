//! Model file resolution: CLI path, environment variable, or cached download.

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::color_utils::symbols;

pub const MODEL_PATH_ENV: &str = "SHELFSCAN_MODEL_PATH";
pub const MODEL_CACHE_DIR_ENV: &str = "SHELFSCAN_MODEL_CACHE_DIR";

/// Resolve the model file to load, in precedence order: CLI path, env var,
/// cached download from a URL. No source at all is a configuration error.
pub fn resolve_model_path(
    model_path: Option<&str>,
    model_url: Option<&str>,
    model_checksum: Option<&str>,
) -> Result<PathBuf> {
    if let Some(path) = model_path {
        let path = PathBuf::from(path);
        if !path.is_file() {
            bail!("model file does not exist: {}", path.display());
        }
        return Ok(path);
    }

    if let Ok(path) = std::env::var(MODEL_PATH_ENV) {
        let path = PathBuf::from(path);
        if !path.is_file() {
            bail!(
                "{MODEL_PATH_ENV} points to a missing file: {}",
                path.display()
            );
        }
        log::debug!("⚙️  Using model from {MODEL_PATH_ENV}: {}", path.display());
        return Ok(path);
    }

    if let Some(url) = model_url {
        return cached_download(url, model_checksum);
    }

    bail!(
        "no product model available: pass --model-path, set {MODEL_PATH_ENV}, \
         or provide --model-url"
    )
}

/// Cache directory for downloaded models, with env override and tilde
/// expansion.
pub fn get_model_cache_dir() -> Result<PathBuf> {
    if let Ok(cache_dir) = std::env::var(MODEL_CACHE_DIR_ENV) {
        if let Some(stripped) = cache_dir.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                return Ok(home_dir.join(stripped));
            }
        }
        return Ok(PathBuf::from(cache_dir));
    }

    dirs::cache_dir()
        .map(|dir| dir.join("shelfscan").join("models"))
        .ok_or_else(|| anyhow!("unable to determine cache directory"))
}

pub fn calculate_md5_bytes(bytes: &[u8]) -> String {
    let mut hasher = md5::Context::new();
    hasher.consume(bytes);
    format!("{:x}", hasher.compute())
}

pub fn calculate_md5(path: &Path) -> Result<String> {
    let contents = fs::read(path)?;
    Ok(calculate_md5_bytes(&contents))
}

fn filename_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("model.onnx")
        .to_string()
}

/// Download the model if the cache doesn't already hold a valid copy.
fn cached_download(url: &str, checksum: Option<&str>) -> Result<PathBuf> {
    let cache_dir = get_model_cache_dir()?;
    let dest = cache_dir.join(filename_from_url(url));

    if dest.is_file() {
        match checksum {
            Some(expected) => {
                let actual = calculate_md5(&dest)?;
                if actual == expected {
                    log::debug!("♻️  Reusing cached model: {}", dest.display());
                    return Ok(dest);
                }
                log::warn!(
                    "{}Cached model checksum mismatch (expected {expected}, got {actual}), re-downloading",
                    symbols::warning()
                );
            }
            None => {
                log::debug!("♻️  Reusing cached model: {}", dest.display());
                return Ok(dest);
            }
        }
    }

    download_model(url, &dest)?;

    if let Some(expected) = checksum {
        let actual = calculate_md5(&dest)?;
        if actual != expected {
            fs::remove_file(&dest).ok();
            bail!("downloaded model failed checksum verification: expected {expected}, got {actual}");
        }
        log::debug!("✓ Model checksum verified: {expected}");
    }

    Ok(dest)
}

fn download_model(url: &str, output_path: &Path) -> Result<()> {
    log::info!("📥 Downloading model from: {url}");

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Stream into a sibling temp file and rename into place only once the
    // download completes, so a failure mid-stream never leaves a truncated
    // model at the cache path for later runs to pick up.
    let file_name = output_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("model.onnx");
    let temp_path = output_path.with_file_name(format!("{file_name}.part"));

    if let Err(e) = stream_to_file(url, &temp_path) {
        fs::remove_file(&temp_path).ok();
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, output_path) {
        fs::remove_file(&temp_path).ok();
        return Err(anyhow!(
            "failed to move downloaded model into place at {}: {e}",
            output_path.display()
        ));
    }

    log::info!(
        "{} Model downloaded to: {}",
        symbols::completed_successfully(),
        output_path.display()
    );

    Ok(())
}

fn stream_to_file(url: &str, output_path: &Path) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| anyhow!("failed to send HTTP request: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("model download failed with status: {status}");
    }

    let content_length = response.content_length();
    let progress_bar = match content_length {
        Some(length) => {
            let pb = ProgressBar::new(length);
            let style = ProgressStyle::default_bar()
                .template(
                    "[{elapsed_precise}] [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
                )
                .map_err(|e| anyhow!("failed to create progress style: {e}"))?
                .progress_chars("#> ");
            pb.set_style(style);
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_message("Downloading model (unknown size)...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    };

    let mut file = fs::File::create(output_path).with_context(|| {
        format!("failed to create output file {}", output_path.display())
    })?;

    let mut downloaded = 0u64;
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| anyhow!("failed to read response data: {e}"))?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .with_context(|| format!("failed to write to {}", output_path.display()))?;
        downloaded += bytes_read as u64;
        progress_bar.set_position(downloaded);
    }

    file.flush()?;
    file.sync_all()?;
    drop(file);

    progress_bar.finish_and_clear();

    if downloaded == 0 {
        bail!("downloaded model is empty (0 bytes); likely a network or server issue");
    }

    if let Some(expected_length) = content_length {
        if downloaded != expected_length {
            bail!(
                "download truncated: expected {expected_length} bytes, got {downloaded} bytes"
            );
        }
    }

    Ok(())
}
