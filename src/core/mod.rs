pub mod content_cache;
pub mod error;
pub mod file_list;
pub mod media_file;
pub mod saving;
pub mod search;
pub mod viewer;

/// Kind of a filesystem change notification delivered by an external watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Created,
    Deleted,
    Modified,
}

/// One change notification: the bare filename within the open directory plus
/// what happened to it.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub name: String,
    pub kind: FileChangeKind,
}

pub use content_cache::ContentCache;
pub use error::CoreError;
pub use file_list::MediaFileList;
pub use media_file::{Field, MediaFile, RenameRequest, RotateOp, SaveOutcome};
pub use saving::{SaveProgress, SaveReport, SavingTask};
pub use search::{SearchHit, SearchSession};
pub use viewer::{EditorRegistry, MediaContent, MediaKind, Viewer, ViewerRegistry};
