use std::ffi::OsStr;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jfif", "png", "gif", "bmp", "webp", "tiff", "tif",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "avi", "mkv", "mov", "wmv", "flv", "webm", "mpg", "mpeg", "3gp",
];

fn has_extension_in(path: &Path, table: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| table.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Determines if a file is a still image by extension.
pub fn is_image_file(path: &Path) -> bool {
    has_extension_in(path, IMAGE_EXTENSIONS)
}

/// Determines if a file is a video by extension.
pub fn is_video_file(path: &Path) -> bool {
    has_extension_in(path, VIDEO_EXTENSIONS)
}

/// Determines if a directory entry should be skipped as hidden.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(|name| name.starts_with('.'))
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_image_detection_is_case_insensitive() {
        assert!(is_image_file(&PathBuf::from("photo.JPG")));
        assert!(is_image_file(&PathBuf::from("photo.jpeg")));
        assert!(!is_image_file(&PathBuf::from("clip.mp4")));
        assert!(!is_image_file(&PathBuf::from("no_extension")));
    }

    #[test]
    fn test_video_detection() {
        assert!(is_video_file(&PathBuf::from("clip.MOV")));
        assert!(!is_video_file(&PathBuf::from("photo.png")));
    }

    #[test]
    fn test_hidden_files() {
        assert!(is_hidden(&PathBuf::from("/some/dir/.DS_Store")));
        assert!(!is_hidden(&PathBuf::from("/some/dir/photo.jpg")));
    }
}
