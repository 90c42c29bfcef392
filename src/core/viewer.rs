//! Pluggable decoding layer for media files.
//!
//! A `Viewer` turns a file on disk into an opaque in-memory payload and tells
//! the type-detection chain which files it is willing to handle. Concrete
//! presentation (windows, players, zoom) lives outside this crate; the
//! viewers here only produce the payloads the content cache accounts for.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::core::error::CoreError;
use crate::utils::file_detection::{is_image_file, is_video_file};

/// Media category assigned to an entity by the type-detection chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Whether rotate/flip edits can be persisted for this kind of media.
    pub fn supports_transforms(self) -> bool {
        matches!(self, MediaKind::Image)
    }
}

/// An opaque decoded payload held by an entity and accounted for by the cache.
pub trait MediaContent: Send + Sync {
    /// Approximate in-memory size in bytes, used for eviction accounting only.
    fn approx_size(&self) -> u64;
}

/// Decodes media files and accepts/rejects candidate paths by extension sniffing.
pub trait Viewer: Send + Sync {
    fn accepts(&self, path: &Path) -> bool;
    fn decode(&self, path: &Path) -> Result<Arc<dyn MediaContent>, CoreError>;
}

/// Decoded RGB8 pixel data for a still image.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl MediaContent for DecodedImage {
    fn approx_size(&self) -> u64 {
        self.pixels.len() as u64
    }
}

/// Placeholder payload for media that is handed to an external player or
/// editor rather than decoded in-process. Costs nothing in the cache.
pub struct ExternalPayload;

impl MediaContent for ExternalPayload {
    fn approx_size(&self) -> u64 {
        0
    }
}

/// Built-in viewer for still images, backed by the `image` crate.
pub struct ImageViewer;

impl Viewer for ImageViewer {
    fn accepts(&self, path: &Path) -> bool {
        is_image_file(path)
    }

    fn decode(&self, path: &Path) -> Result<Arc<dyn MediaContent>, CoreError> {
        let decoded = image::open(path)
            .map_err(|e| CoreError::Decode(format!("{}: {}", path.display(), e)))?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Arc::new(DecodedImage {
            width,
            height,
            pixels: rgb.into_raw(),
        }))
    }
}

/// Built-in viewer for videos. Playback is external, so decoding only yields
/// a zero-size placeholder payload.
pub struct VideoViewer;

impl Viewer for VideoViewer {
    fn accepts(&self, path: &Path) -> bool {
        is_video_file(path)
    }

    fn decode(&self, _path: &Path) -> Result<Arc<dyn MediaContent>, CoreError> {
        Ok(Arc::new(ExternalPayload))
    }
}

/// Mandatory fallback at the end of the detection chain. Accepts everything.
pub struct FallbackViewer;

impl Viewer for FallbackViewer {
    fn accepts(&self, _path: &Path) -> bool {
        true
    }

    fn decode(&self, _path: &Path) -> Result<Arc<dyn MediaContent>, CoreError> {
        Ok(Arc::new(ExternalPayload))
    }
}

/// Ordered first-match-wins chain of `(kind, viewer)` pairs.
///
/// Replaces subtype `instanceof` dispatch with an explicit strategy table;
/// the last entry must accept every path.
pub struct ViewerRegistry {
    entries: Vec<(MediaKind, Box<dyn Viewer>)>,
}

impl ViewerRegistry {
    /// Builds the default chain: images, then videos, then the fallback.
    pub fn with_default_viewers() -> Self {
        Self {
            entries: vec![
                (MediaKind::Image, Box::new(ImageViewer)),
                (MediaKind::Video, Box::new(VideoViewer)),
                (MediaKind::Other, Box::new(FallbackViewer)),
            ],
        }
    }

    /// Builds a registry from a custom chain. The caller must terminate the
    /// chain with a viewer that accepts everything.
    pub fn new(entries: Vec<(MediaKind, Box<dyn Viewer>)>) -> Self {
        Self { entries }
    }

    /// Returns the media kind of the first viewer that accepts the path.
    pub fn detect(&self, path: &Path) -> MediaKind {
        self.entries
            .iter()
            .find(|(_, viewer)| viewer.accepts(path))
            .map(|(kind, _)| *kind)
            .unwrap_or(MediaKind::Other)
    }

    /// Returns the viewer registered for a media kind, falling back to the
    /// last entry of the chain.
    pub fn viewer_for(&self, kind: MediaKind) -> &dyn Viewer {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .or_else(|| self.entries.last())
            .map(|(_, viewer)| viewer.as_ref())
            .expect("viewer chain must not be empty")
    }
}

/// Explicit registry of external editor commands keyed by media kind.
///
/// Injected into the collection layer instead of living as hidden static
/// per-subtype state, so tests can supply fakes.
#[derive(Debug, Clone, Default)]
pub struct EditorRegistry {
    editors: HashMap<MediaKind, String>,
}

impl EditorRegistry {
    pub fn set_editor(&mut self, kind: MediaKind, command: impl Into<String>) {
        self.editors.insert(kind, command.into());
    }

    pub fn editor_for(&self, kind: MediaKind) -> Option<&str> {
        self.editors.get(&kind).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detection_chain_first_match_wins() {
        let registry = ViewerRegistry::with_default_viewers();
        assert_eq!(registry.detect(&PathBuf::from("a.jpg")), MediaKind::Image);
        assert_eq!(registry.detect(&PathBuf::from("b.mkv")), MediaKind::Video);
        assert_eq!(registry.detect(&PathBuf::from("c.txt")), MediaKind::Other);
    }

    #[test]
    fn test_fallback_accepts_everything() {
        let registry = ViewerRegistry::with_default_viewers();
        assert_eq!(
            registry.detect(&PathBuf::from("strange.file.name")),
            MediaKind::Other
        );
    }

    #[test]
    fn test_editor_registry_lookup() {
        let mut editors = EditorRegistry::default();
        editors.set_editor(MediaKind::Image, "gimp");
        assert_eq!(editors.editor_for(MediaKind::Image), Some("gimp"));
        assert_eq!(editors.editor_for(MediaKind::Video), None);
    }
}
