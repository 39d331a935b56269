//! Input collection: files, directories, and glob patterns.

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::color_utils::symbols;

/// Check if a file has a supported image extension.
pub fn is_supported_image_file(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => matches!(
            ext.to_string_lossy().to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

fn find_images_in_directory(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() && is_supported_image_file(&path) {
            image_files.push(path);
        }
    }

    image_files.sort();
    Ok(image_files)
}

fn looks_like_glob(source: &str) -> bool {
    source.contains('*') || source.contains('?') || source.contains('[')
}

/// Collect image files from the given sources. In strict mode a missing or
/// unsupported source is an error; in permissive mode it is a warning and
/// the source is skipped.
pub fn collect_images(sources: &[String], strict: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    for source in sources {
        let source_path = Path::new(source);

        if source_path.is_file() {
            if is_supported_image_file(source_path) {
                image_files.push(source_path.to_path_buf());
            } else if strict {
                bail!(
                    "file is not a supported image format: {}",
                    source_path.display()
                );
            } else {
                log::warn!(
                    "{}Skipping unsupported file: {}",
                    symbols::warning(),
                    source_path.display()
                );
            }
        } else if source_path.is_dir() {
            image_files.extend(find_images_in_directory(source_path)?);
        } else if looks_like_glob(source) {
            let mut found_any = false;
            for path in glob::glob(source)?.flatten() {
                if path.is_file() && is_supported_image_file(&path) {
                    image_files.push(path);
                    found_any = true;
                }
            }
            if !found_any {
                if strict {
                    bail!("no image files found matching pattern: {source}");
                }
                log::warn!(
                    "{}No image files matching pattern: {source}",
                    symbols::warning()
                );
            }
        } else if strict {
            bail!("file does not exist: {source}");
        } else {
            log::warn!("{}File does not exist: {source}", symbols::warning());
        }
    }

    image_files.sort();
    image_files.dedup();

    if image_files.is_empty() && strict {
        bail!("no image files found in the specified sources");
    }

    Ok(image_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_supported_image_file() {
        assert!(is_supported_image_file(Path::new("shelf.jpg")));
        assert!(is_supported_image_file(Path::new("shelf.jpeg")));
        assert!(is_supported_image_file(Path::new("shelf.png")));
        assert!(is_supported_image_file(Path::new("shelf.webp")));
        assert!(is_supported_image_file(Path::new("SHELF.JPG")));

        assert!(!is_supported_image_file(Path::new("shelf.txt")));
        assert!(!is_supported_image_file(Path::new("shelf.gif")));
        assert!(!is_supported_image_file(Path::new("shelf")));
    }

    #[test]
    fn test_collect_from_directory() {
        let temp_dir = tempdir().unwrap();
        let dir_path = temp_dir.path();
        fs::write(dir_path.join("a.jpg"), b"fake").unwrap();
        fs::write(dir_path.join("b.png"), b"fake").unwrap();
        fs::write(dir_path.join("notes.txt"), b"text").unwrap();

        let sources = vec![dir_path.to_string_lossy().to_string()];
        let images = collect_images(&sources, true).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_strict_rejects_unsupported_file() {
        let temp_dir = tempdir().unwrap();
        let text_path = temp_dir.path().join("notes.txt");
        fs::write(&text_path, b"text").unwrap();

        let sources = vec![text_path.to_string_lossy().to_string()];
        assert!(collect_images(&sources, true).is_err());
    }

    #[test]
    fn test_permissive_skips_unsupported_file() {
        let temp_dir = tempdir().unwrap();
        let image_path = temp_dir.path().join("a.jpg");
        let text_path = temp_dir.path().join("notes.txt");
        fs::write(&image_path, b"fake").unwrap();
        fs::write(&text_path, b"text").unwrap();

        let sources = vec![
            image_path.to_string_lossy().to_string(),
            text_path.to_string_lossy().to_string(),
        ];
        let images = collect_images(&sources, false).unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_strict_rejects_missing_file() {
        let sources = vec!["/nonexistent/shelf.jpg".to_string()];
        assert!(collect_images(&sources, true).is_err());
    }

    #[test]
    fn test_duplicate_sources_are_deduplicated() {
        let temp_dir = tempdir().unwrap();
        let image_path = temp_dir.path().join("a.jpg");
        fs::write(&image_path, b"fake").unwrap();

        let source = image_path.to_string_lossy().to_string();
        let images = collect_images(&[source.clone(), source], true).unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_permissive_glob_with_no_matches_is_ok() {
        let temp_dir = tempdir().unwrap();
        let pattern = format!("{}/*.jpg", temp_dir.path().to_string_lossy());

        let images = collect_images(&[pattern], false).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_glob_pattern_matches_images() {
        let temp_dir = tempdir().unwrap();
        let dir_path = temp_dir.path();
        fs::write(dir_path.join("a.jpg"), b"fake").unwrap();
        fs::write(dir_path.join("b.jpg"), b"fake").unwrap();

        let pattern = format!("{}/*.jpg", dir_path.to_string_lossy());
        let images = collect_images(&[pattern], true).unwrap();
        assert_eq!(images.len(), 2);
    }
}
