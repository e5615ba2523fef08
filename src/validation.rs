// Carrier validation and capacity estimation shared by the GUI and CLI.
//
// Real format-aware validation belongs to production engines; these checks
// only gate obvious mistakes (missing file, unsupported extension) before a
// task is submitted.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp", "tif", "tiff", "jpg", "jpeg"];
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// Outcome of a pre-submission carrier check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            message: "OK".to_string(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("carrier file does not exist: {0}")]
    Missing(Utf8PathBuf),

    #[error("unsupported carrier type: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classify a path by extension, case-insensitively.
pub fn media_kind(path: &Utf8Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Audio)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Check whether `path` refers to a supported carrier file.
pub fn validate_carrier(path: &Utf8Path) -> ValidationResult {
    if !path.exists() {
        return ValidationResult::invalid("File not found");
    }
    match media_kind(path) {
        Some(_) => ValidationResult::ok(),
        None => {
            let ext = path.extension().unwrap_or("unknown");
            ValidationResult::invalid(format!("Unsupported file type: {ext}"))
        }
    }
}

/// Conservative payload capacity estimate for a carrier, in bytes.
pub fn estimate_capacity(path: &Utf8Path) -> Result<u64, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::Missing(path.to_path_buf()));
    }
    let kind = media_kind(path).ok_or_else(|| {
        ValidationError::Unsupported(path.extension().unwrap_or("unknown").to_string())
    })?;

    let file_size = fs::metadata(path)?.len();
    Ok(capacity_for(kind, file_size))
}

/// The estimate itself, kept separate from the filesystem lookups. A floor of
/// 1 KiB keeps the GUI from displaying useless zero estimates for tiny files.
pub fn capacity_for(kind: MediaKind, file_size: u64) -> u64 {
    let multiplier = match kind {
        MediaKind::Image => 4,
        MediaKind::Audio => 2,
        MediaKind::Video => 3,
    };
    (file_size * multiplier).max(1024)
}

/// All supported carrier extensions, sorted.
pub fn supported_extensions() -> Vec<&'static str> {
    let mut all: Vec<&'static str> = IMAGE_EXTENSIONS
        .iter()
        .chain(AUDIO_EXTENSIONS)
        .chain(VIDEO_EXTENSIONS)
        .copied()
        .collect();
    all.sort_unstable();
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_media_kind_by_extension() {
        assert_eq!(media_kind(Utf8Path::new("a.png")), Some(MediaKind::Image));
        assert_eq!(media_kind(Utf8Path::new("a.FLAC")), Some(MediaKind::Audio));
        assert_eq!(media_kind(Utf8Path::new("a.mkv")), Some(MediaKind::Video));
        assert_eq!(media_kind(Utf8Path::new("a.exe")), None);
        assert_eq!(media_kind(Utf8Path::new("noext")), None);
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_carrier(Utf8Path::new("/no/such/file.png"));
        assert!(!result.valid);
        assert_eq!(result.message, "File not found");
    }

    #[test]
    fn test_validate_unsupported_extension() {
        let mut temp = NamedTempFile::with_suffix(".exe").unwrap();
        writeln!(temp, "not a carrier").unwrap();
        let path = Utf8Path::from_path(temp.path()).unwrap();

        let result = validate_carrier(path);
        assert!(!result.valid);
        assert!(result.message.contains("Unsupported"));
    }

    #[test]
    fn test_validate_supported_carrier() {
        let mut temp = NamedTempFile::with_suffix(".png").unwrap();
        temp.write_all(&[0u8; 256]).unwrap();
        let path = Utf8Path::from_path(temp.path()).unwrap();

        assert!(validate_carrier(path).valid);
    }

    #[test]
    fn test_estimate_capacity_floor() {
        let mut temp = NamedTempFile::with_suffix(".png").unwrap();
        temp.write_all(&[0u8; 10]).unwrap();
        temp.flush().unwrap();
        let path = Utf8Path::from_path(temp.path()).unwrap();

        // 10 bytes * 4 is below the floor.
        assert_eq!(estimate_capacity(path).unwrap(), 1024);
    }

    #[test]
    fn test_estimate_capacity_missing() {
        assert!(matches!(
            estimate_capacity(Utf8Path::new("/no/such/file.wav")),
            Err(ValidationError::Missing(_))
        ));
    }

    #[test]
    fn test_supported_extensions_sorted_and_complete() {
        let all = supported_extensions();
        assert_eq!(
            all.len(),
            IMAGE_EXTENSIONS.len() + AUDIO_EXTENSIONS.len() + VIDEO_EXTENSIONS.len()
        );
        assert!(all.windows(2).all(|w| w[0] <= w[1]));
    }

    proptest! {
        #[test]
        fn prop_capacity_never_below_floor(size in 0u64..100_000_000) {
            prop_assert!(capacity_for(MediaKind::Image, size) >= 1024);
            prop_assert!(capacity_for(MediaKind::Audio, size) >= 1024);
            prop_assert!(capacity_for(MediaKind::Video, size) >= 1024);
        }

        #[test]
        fn prop_capacity_monotone_in_size(a in 0u64..50_000_000, b in 0u64..50_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(capacity_for(MediaKind::Image, lo) <= capacity_for(MediaKind::Image, hi));
        }
    }
}
