//! Directory-scoped collection of media files.
//!
//! Owns the ordered active list, the soft-deleted list and the cut clipboard
//! for one open directory, and implements directory scan, search/replace,
//! renumbering, delete/paste recovery and the per-entity commit hooks the
//! saving task drives.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::content_cache::ContentCache;
use crate::core::error::CoreError;
use crate::core::media_file::{digit_runs, MediaFile, SaveOutcome};
use crate::core::search::{SearchHit, SearchSession};
use crate::core::viewer::{EditorRegistry, MediaContent, ViewerRegistry};
use crate::core::{FileChangeEvent, FileChangeKind};
use crate::utils::file_detection::is_hidden;

/// The ordered in-memory model of one open directory.
///
/// All mutation happens on a single logical interactive thread; batch
/// operations (renumbering, bulk transforms, saving) must not interleave
/// with other mutation of the same list.
pub struct MediaFileList {
    directory: Option<PathBuf>,
    files: Vec<MediaFile>,
    deleted: Vec<MediaFile>,
    /// Ids of soft-deleted entities snapshotted by the last cut; `None` once
    /// consumed by paste or invalidated by an undelete.
    clipboard: Option<Vec<u64>>,
    counter_position: usize,
    viewers: ViewerRegistry,
    editors: EditorRegistry,
    cache: ContentCache,
    deleted_folder_name: String,
    max_decode_retries: u8,
    /// Renumber padding width used when the caller asks for auto width;
    /// 0 falls through to the width of the largest assigned value.
    default_counter_digits: usize,
    case_sensitive_search: bool,
}

impl MediaFileList {
    pub fn new(config: &AppConfig, viewers: ViewerRegistry, editors: EditorRegistry) -> Self {
        let cache = ContentCache::new(config.cache_min_free_memory_mb);
        Self::with_cache(config, viewers, editors, cache)
    }

    /// Constructor with an injected cache, used by tests to control the
    /// memory probe.
    pub fn with_cache(
        config: &AppConfig,
        viewers: ViewerRegistry,
        editors: EditorRegistry,
        cache: ContentCache,
    ) -> Self {
        Self {
            directory: None,
            files: Vec::new(),
            deleted: Vec::new(),
            clipboard: None,
            counter_position: 1,
            viewers,
            editors,
            cache,
            deleted_folder_name: config.deleted_folder_name.clone(),
            max_decode_retries: config.max_decode_retries,
            default_counter_digits: config.default_counter_digits,
            case_sensitive_search: config.case_sensitive_search,
        }
    }

    // ---- directory ------------------------------------------------------

    /// Opens a directory: flushes the stale content cache, resets all lists,
    /// recomputes the counter position and builds one entity per regular
    /// non-hidden immediate child, typed by the viewer chain.
    pub fn open_folder(&mut self, path: &Path) -> Result<(), CoreError> {
        if !path.is_dir() {
            return Err(CoreError::NotADirectory(path.to_path_buf()));
        }

        self.cache.flush_all(&mut self.files);
        self.files.clear();
        self.deleted.clear();
        self.clipboard = None;

        let mut children: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|e| CoreError::io(e, path))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|child| child.is_file() && !is_hidden(child))
            .collect();
        children.sort();

        self.counter_position = guess_counter_position(&children);

        for child in children {
            let kind = self.viewers.detect(&child);
            match MediaFile::new(child, kind, self.counter_position) {
                Ok(file) => self.files.push(file),
                // File vanished between listing and stat; skip it.
                Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
            }
        }

        tracing::info!(
            "Opened {} with {} files (counter position {})",
            path.display(),
            self.files.len(),
            self.counter_position
        );
        self.directory = Some(path.to_path_buf());
        Ok(())
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn counter_position(&self) -> usize {
        self.counter_position
    }

    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    pub fn file(&self, row: usize) -> Option<&MediaFile> {
        self.files.get(row)
    }

    pub fn file_mut(&mut self, row: usize) -> Option<&mut MediaFile> {
        self.files.get_mut(row)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn deleted_files(&self) -> &[MediaFile] {
        &self.deleted
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    /// External editor command for the media kind of a row, if configured.
    pub fn editor_for(&self, row: usize) -> Option<&str> {
        self.files
            .get(row)
            .and_then(|file| self.editors.editor_for(file.kind()))
    }

    // ---- external change reconciliation ---------------------------------

    /// Reconciles a filesystem change notification with the in-memory model.
    ///
    /// Creates are idempotent, deletes only drop the matching entity, and a
    /// modify without a known entity is treated as a create because some
    /// platforms occasionally drop create notifications.
    pub fn handle_change(&mut self, event: &FileChangeEvent) {
        let Some(dir) = self.directory.clone() else {
            return;
        };
        let existing = self
            .files
            .iter()
            .position(|f| f.on_disk_name() == event.name);

        match event.kind {
            FileChangeKind::Created => {
                if existing.is_none() {
                    self.add_scanned_file(dir.join(&event.name));
                }
            }
            FileChangeKind::Deleted => {
                if let Some(row) = existing {
                    let file = self.files.remove(row);
                    self.cache.flush(file.id());
                }
            }
            FileChangeKind::Modified => match existing {
                Some(row) => {
                    self.files[row].release_content();
                    self.cache.flush(self.files[row].id());
                }
                None => self.add_scanned_file(dir.join(&event.name)),
            },
        }
    }

    fn add_scanned_file(&mut self, path: PathBuf) {
        // Watch race: the file may already be gone again. Silently ignore.
        if !path.is_file() || is_hidden(&path) {
            return;
        }
        let kind = self.viewers.detect(&path);
        match MediaFile::new(path, kind, self.counter_position) {
            Ok(file) => self.files.push(file),
            Err(e) => tracing::warn!("Ignoring change event for unreadable file: {}", e),
        }
    }

    // ---- search / replace -----------------------------------------------

    /// Starts a search session scoped to the selection (if it has more than
    /// one row) or to the whole list from the selected row. Case sensitivity
    /// follows the configured search mode.
    pub fn init_search(&self, selection: &[usize]) -> SearchSession {
        SearchSession::new(selection, self.files.len(), self.case_sensitive_search)
    }

    pub fn search_next(&self, session: &mut SearchSession, text: &str) -> Option<SearchHit> {
        session.next_match(&self.files, text)
    }

    /// Replaces every remaining occurrence in the session's scope, resuming
    /// just past each inserted replacement so adjacent matches are handled.
    /// Returns the number of replacements.
    pub fn replace_all(
        &mut self,
        session: &mut SearchSession,
        search: &str,
        replace: &str,
    ) -> usize {
        let mut count = 0;
        while let Some(hit) = session.next_match(&self.files, search) {
            let file = &mut self.files[hit.row];
            let value = file.field_value(hit.field).to_string();
            let new_value = format!("{}{}{}", &value[..hit.start], replace, &value[hit.end..]);
            file.set_field_value(hit.field, &new_value);
            session.set_resume_offset(hit.start + replace.len());
            count += 1;
        }
        count
    }

    // ---- renumbering ----------------------------------------------------

    /// Assigns consecutive counters `start, start+step, …` to the target rows
    /// in their sorted order, so numbering reflects the selection's relative
    /// order regardless of how the rows were picked.
    pub fn renumber_absolute(&mut self, rows: &[usize], start: u64, step: u64, digits: usize) {
        let mut sorted = rows.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let values: Vec<u64> = (0..sorted.len() as u64).map(|k| start + k * step).collect();
        let width = self.effective_width(digits, values.iter().copied().max());
        for (&row, value) in sorted.iter().zip(values) {
            if let Some(file) = self.files.get_mut(row) {
                file.set_counter(&format!("{:0width$}", value, width = width));
            }
        }
    }

    /// Assigns `row * step + start` to each target row, so numbering reflects
    /// absolute list position and disjoint selections stay numerically
    /// consistent with where they sit in the full list.
    pub fn renumber_relative(&mut self, rows: &[usize], start: u64, step: u64, digits: usize) {
        let values: Vec<(usize, u64)> = rows
            .iter()
            .map(|&row| (row, row as u64 * step + start))
            .collect();
        let width = self.effective_width(digits, values.iter().map(|&(_, v)| v).max());
        for (row, value) in values {
            if let Some(file) = self.files.get_mut(row) {
                file.set_counter(&format!("{:0width$}", value, width = width));
            }
        }
    }

    /// Padding width for one renumber run: an explicit request wins, then the
    /// configured default, then the width of the largest assigned value.
    fn effective_width(&self, digits: usize, max_value: Option<u64>) -> usize {
        if digits > 0 {
            digits
        } else if self.default_counter_digits > 0 {
            self.default_counter_digits
        } else {
            max_value.unwrap_or(0).to_string().len()
        }
    }

    // ---- delete / clipboard / paste -------------------------------------

    /// Moves the given rows out of the active list into the soft-deleted
    /// list. With `cut_to_clipboard` the same subset additionally becomes the
    /// new clipboard, overwriting any previous cut.
    ///
    /// `rows` is taken by value semantics (a slice the caller owns), never an
    /// alias into this list, so removal cannot invalidate it.
    pub fn delete_files(&mut self, rows: &[usize], cut_to_clipboard: bool) {
        let mut sorted = rows.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        // Remove back to front so earlier indices stay valid, but keep the
        // deleted list in selection order.
        let mut moved = Vec::with_capacity(sorted.len());
        for &row in sorted.iter().rev() {
            if row < self.files.len() {
                moved.push(self.files.remove(row));
            }
        }
        moved.reverse();

        // Soft-deleted entities are invisible to the eviction scan, so their
        // payloads are released here instead of lingering until commit.
        for file in &mut moved {
            self.cache.flush(file.id());
            file.release_content();
        }

        let moved_ids: Vec<u64> = moved.iter().map(|f| f.id()).collect();
        self.deleted.append(&mut moved);

        if cut_to_clipboard {
            self.clipboard = Some(moved_ids);
        }
    }

    /// Re-inserts the cut entities at `index` and invalidates the clipboard.
    pub fn paste(&mut self, index: usize) {
        if let Some(ids) = self.clipboard.take() {
            self.restore_deleted(index, &ids);
        }
    }

    /// Recovers soft-deleted entities back into the active list at `index`.
    /// Recovered entities also leave the clipboard, cancelling a pending cut.
    pub fn un_delete_files(&mut self, index: usize, ids: &[u64]) {
        self.restore_deleted(index, ids);
        if let Some(clip) = &mut self.clipboard {
            clip.retain(|id| !ids.contains(id));
            if clip.is_empty() {
                self.clipboard = None;
            }
        }
    }

    fn restore_deleted(&mut self, index: usize, ids: &[u64]) {
        let mut insert_at = index.min(self.files.len());
        for &id in ids {
            if let Some(pos) = self.deleted.iter().position(|f| f.id() == id) {
                let file = self.deleted.remove(pos);
                self.files.insert(insert_at, file);
                insert_at += 1;
            }
        }
    }

    // ---- change accounting ----------------------------------------------

    /// Entities with pending edits plus pending soft-deletions.
    pub fn unsaved_changes(&self) -> usize {
        self.files.iter().filter(|f| f.is_changed()).count() + self.deleted.len()
    }

    // ---- commit hooks (driven by the saving task) ------------------------

    /// Relocates the soft-deleted entity at `index` to the deleted folder.
    /// On success the entity leaves the in-memory model; on failure it stays
    /// soft-deleted with its rename-error flag set.
    pub(crate) fn commit_deletion_at(&mut self, index: usize) -> Result<(), CoreError> {
        let Some(file) = self.deleted.get_mut(index) else {
            return Ok(());
        };
        file.move_to_deleted_folder(&self.deleted_folder_name)?;
        let file = self.deleted.remove(index);
        self.cache.flush(file.id());
        Ok(())
    }

    /// Runs one entity's two-phase commit and keeps cache membership in sync
    /// when the write invalidated its decoded content.
    pub(crate) fn commit_entity(&mut self, row: usize) -> SaveOutcome {
        let Some(file) = self.files.get_mut(row) else {
            return SaveOutcome::Successful;
        };
        let outcome = file.save_changes();
        if !file.content_valid() {
            let id = file.id();
            self.cache.flush(id);
        }
        outcome
    }

    pub(crate) fn pending_deletions(&self) -> usize {
        self.deleted.len()
    }

    // ---- content access --------------------------------------------------

    /// Returns the cached payload if it is valid, otherwise makes room in the
    /// cache, decodes through the registered viewer and registers the entity
    /// as the most recently used cache member.
    pub fn cached_or_load_content(&mut self, row: usize) -> Option<Arc<dyn MediaContent>> {
        self.load_content(row, false)
    }

    /// Retry variant for asynchronous decode-failure callbacks; consumes one
    /// retry instead of resetting the counter. Callers check
    /// [`can_retry_decode`](Self::can_retry_decode) before looping.
    pub fn retry_load_content(&mut self, row: usize) -> Option<Arc<dyn MediaContent>> {
        self.load_content(row, true)
    }

    pub fn can_retry_decode(&self, row: usize) -> bool {
        self.files
            .get(row)
            .map(|f| f.can_retry_decode(self.max_decode_retries))
            .unwrap_or(false)
    }

    fn load_content(&mut self, row: usize, retry: bool) -> Option<Arc<dyn MediaContent>> {
        if row >= self.files.len() {
            return None;
        }
        if !retry && self.files[row].content_valid() {
            return self.files[row].content();
        }

        self.cache.maintain_cache_size_by_flushing_oldest(&mut self.files);

        let kind = self.files[row].kind();
        let viewer = self.viewers.viewer_for(kind);
        if self.files[row].decode_with(viewer, retry) {
            let id = self.files[row].id();
            self.cache.add_as_latest(id);
            self.files[row].content()
        } else {
            None
        }
    }

    // ---- export ----------------------------------------------------------

    /// Writes one header line and one quoted line per active entity:
    /// absolute path, on-disk filename, prefix, counter, separator,
    /// description, extension, date.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<(), CoreError> {
        let io_err = |e: std::io::Error| {
            CoreError::io(e, self.directory.clone().unwrap_or_default())
        };
        writeln!(
            writer,
            "\"Path\",\"Filename\",\"Prefix\",\"Counter\",\"Separator\",\"Description\",\"Extension\",\"Date\""
        )
        .map_err(io_err)?;
        for file in &self.files {
            let fields = [
                file.path().display().to_string(),
                file.on_disk_name(),
                file.prefix().to_string(),
                file.counter().to_string(),
                file.separator().to_string(),
                file.description().to_string(),
                file.extension().to_string(),
                file.modified_date().to_string(),
            ];
            let line: Vec<String> = fields.iter().map(|f| csv_quote(f)).collect();
            writeln!(writer, "{}", line.join(",")).map_err(io_err)?;
        }
        Ok(())
    }
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Guesses which digit run in the directory's filenames is the counter: the
/// deepest run index present in every digit-bearing stem, so a directory of
/// `2024 trip 001.jpg`-style names picks the trailing run. Defaults to 1.
fn guess_counter_position(children: &[PathBuf]) -> usize {
    children
        .iter()
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
        .map(|stem| digit_runs(stem).len())
        .filter(|&count| count > 0)
        .min()
        .unwrap_or(1)
}
