//! In-memory wrapper for one on-disk media file and its pending edits.
//!
//! A `MediaFile` splits its filename into structured fields (prefix, counter,
//! separator, description, extension), tracks which fields the user changed
//! versus what is physically on disk, and commits those changes with a
//! two-phase rename that resolves naming conflicts arising only transiently
//! during a batch (e.g. two files swapping counters).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use filetime::FileTime;

use crate::core::error::CoreError;
use crate::core::viewer::{MediaContent, MediaKind, Viewer};

/// Timestamp format used for the user-visible modified-date string.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Characters that may separate the counter from the description.
pub const SEPARATORS: &[char] = &[' ', '-', '_'];

/// Outcome of one `save_changes` pass for a single entity.
///
/// `NeedsSecondTry` outranks `Error`, which outranks `Successful`: a pending
/// second try must stay visible to the orchestrator even if an independent
/// write also failed in the same pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Successful,
    NeedsSecondTry,
    Error,
}

impl SaveOutcome {
    fn rank(self) -> u8 {
        match self {
            SaveOutcome::Successful => 0,
            SaveOutcome::Error => 1,
            SaveOutcome::NeedsSecondTry => 2,
        }
    }

    /// Combines two outcomes, keeping the higher-priority one.
    pub fn worst(self, other: SaveOutcome) -> SaveOutcome {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// Requested clockwise rotation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOp {
    Clockwise,
    UpsideDown,
    CounterClockwise,
}

impl RotateOp {
    fn quarter_turns(self) -> u8 {
        match self {
            RotateOp::Clockwise => 1,
            RotateOp::UpsideDown => 2,
            RotateOp::CounterClockwise => 3,
        }
    }
}

/// Editable columns of an entity, in the fixed order search traverses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Prefix,
    Counter,
    Separator,
    Description,
    Extension,
    Date,
}

/// Column order used by the search/replace state machine.
pub const FIELD_SEARCH_ORDER: &[Field] = &[
    Field::Prefix,
    Field::Counter,
    Field::Separator,
    Field::Description,
    Field::Extension,
    Field::Date,
];

/// Per-field replacement patterns for `rename`. `None` leaves a field alone;
/// `Some` overwrites it after placeholder substitution.
#[derive(Debug, Clone, Default)]
pub struct RenameRequest {
    pub prefix: Option<String>,
    pub counter: Option<String>,
    pub separator: Option<String>,
    pub description: Option<String>,
    pub extension: Option<String>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// One on-disk media file plus its staged edits.
pub struct MediaFile {
    id: u64,
    path: PathBuf,
    kind: MediaKind,

    prefix: String,
    counter: String,
    separator: String,
    description: String,
    extension: String,
    modified_date: String,

    filename_changed: bool,
    date_changed: bool,
    rename_error: bool,
    timestamp_error: bool,
    transform_error: bool,

    // Pending transform: clockwise quarter-turns, then flips in post-rotation axes.
    rotation: u8,
    flip_horizontal: bool,
    flip_vertical: bool,

    content: Option<Arc<dyn MediaContent>>,
    decode_error: Option<String>,
    decode_retries: u8,
}

impl MediaFile {
    /// Creates an entity for an existing file, reading its modification time
    /// from disk and parsing its filename with the collection's counter position.
    pub fn new(path: PathBuf, kind: MediaKind, counter_position: usize) -> Result<Self, CoreError> {
        let metadata = fs::metadata(&path).map_err(|e| CoreError::io(e, &path))?;
        let modified = metadata.modified().map_err(|e| CoreError::io(e, &path))?;
        let formatted = DateTime::<Local>::from(modified).format(DATE_FORMAT).to_string();
        Ok(Self::detached(path, kind, counter_position, formatted))
    }

    /// Creates an entity without touching the filesystem. Unit tests use this
    /// to model files that only exist in memory.
    pub(crate) fn detached(
        path: PathBuf,
        kind: MediaKind,
        counter_position: usize,
        modified_date: String,
    ) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let (prefix, counter, separator, description, extension) =
            parse_filename(&name, counter_position);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            path,
            kind,
            prefix,
            counter,
            separator,
            description,
            extension,
            modified_date,
            filename_changed: false,
            date_changed: false,
            rename_error: false,
            timestamp_error: false,
            transform_error: false,
            rotation: 0,
            flip_horizontal: false,
            flip_vertical: false,
            content: None,
            decode_error: None,
            decode_retries: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn counter(&self) -> &str {
        &self.counter
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn modified_date(&self) -> &str {
        &self.modified_date
    }

    /// The filename composed from the current (possibly edited) fields.
    pub fn file_name(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.prefix, self.counter, self.separator, self.description, self.extension
        )
    }

    /// The name the file currently carries on disk.
    pub fn on_disk_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    }

    // ---- mutators -------------------------------------------------------

    pub fn set_prefix(&mut self, value: &str) {
        if value != self.prefix {
            self.prefix = value.to_string();
            self.filename_changed = true;
        }
    }

    pub fn set_counter(&mut self, value: &str) {
        if value != self.counter {
            self.counter = value.to_string();
            self.filename_changed = true;
        }
    }

    pub fn set_separator(&mut self, value: &str) {
        if value != self.separator {
            self.separator = value.to_string();
            self.filename_changed = true;
        }
    }

    pub fn set_description(&mut self, value: &str) {
        if value != self.description {
            self.description = value.to_string();
            self.filename_changed = true;
        }
    }

    pub fn set_extension(&mut self, value: &str) {
        if value != self.extension {
            self.extension = value.to_string();
            self.filename_changed = true;
        }
    }

    pub fn set_modified_date(&mut self, value: &str) {
        if value != self.modified_date {
            self.modified_date = value.to_string();
            self.date_changed = true;
        }
    }

    /// Applies the requested subset of field replacements.
    ///
    /// Placeholders (`%p` prefix, `%c` counter, `%s` separator, `%d`
    /// description, `%e` extension, `%m` date-only, `%t` time-only) are
    /// substituted against the pre-call field values before any field is
    /// overwritten, so one call sees an internally consistent tuple.
    pub fn rename(&mut self, request: &RenameRequest) {
        let prefix = request.prefix.as_deref().map(|p| self.substitute(p));
        let counter = request.counter.as_deref().map(|p| self.substitute(p));
        let separator = request.separator.as_deref().map(|p| self.substitute(p));
        let description = request.description.as_deref().map(|p| self.substitute(p));
        let extension = request.extension.as_deref().map(|p| self.substitute(p));

        if let Some(value) = prefix {
            self.set_prefix(&value);
        }
        if let Some(value) = counter {
            self.set_counter(&value);
        }
        if let Some(value) = separator {
            self.set_separator(&value);
        }
        if let Some(value) = description {
            self.set_description(&value);
        }
        if let Some(value) = extension {
            self.set_extension(&value);
        }
    }

    fn substitute(&self, pattern: &str) -> String {
        let mut result = String::with_capacity(pattern.len());
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                result.push(c);
                continue;
            }
            match chars.next() {
                Some('p') => result.push_str(&self.prefix),
                Some('c') => result.push_str(&self.counter),
                Some('s') => result.push_str(&self.separator),
                Some('d') => result.push_str(&self.description),
                Some('e') => result.push_str(&self.extension),
                Some('m') => result.push_str(self.date_part()),
                Some('t') => result.push_str(self.time_part()),
                Some(other) => {
                    result.push('%');
                    result.push(other);
                }
                None => result.push('%'),
            }
        }
        result
    }

    fn date_part(&self) -> &str {
        self.modified_date
            .split_once(' ')
            .map(|(date, _)| date)
            .unwrap_or(&self.modified_date)
    }

    fn time_part(&self) -> &str {
        self.modified_date
            .split_once(' ')
            .map(|(_, time)| time)
            .unwrap_or("")
    }

    // ---- transforms -----------------------------------------------------

    /// Composes a rotation with the pending one (modulo full turns).
    ///
    /// Flips are expressed in post-rotation screen axes, so whenever the
    /// quarter-turn parity changes, the pending horizontal/vertical flip
    /// flags swap roles.
    pub fn rotate(&mut self, op: RotateOp) {
        if !self.kind.supports_transforms() {
            return;
        }
        let old_parity = self.rotation % 2;
        self.rotation = (self.rotation + op.quarter_turns()) % 4;
        if self.rotation % 2 != old_parity {
            std::mem::swap(&mut self.flip_horizontal, &mut self.flip_vertical);
        }
    }

    pub fn flip_horizontally(&mut self) {
        if self.kind.supports_transforms() {
            self.flip_horizontal = !self.flip_horizontal;
        }
    }

    pub fn flip_vertically(&mut self) {
        if self.kind.supports_transforms() {
            self.flip_vertical = !self.flip_vertical;
        }
    }

    pub fn rotation_quarter_turns(&self) -> u8 {
        self.rotation
    }

    pub fn flips(&self) -> (bool, bool) {
        (self.flip_horizontal, self.flip_vertical)
    }

    pub fn has_pending_transform(&self) -> bool {
        self.rotation != 0 || self.flip_horizontal || self.flip_vertical
    }

    // ---- change tracking ------------------------------------------------

    pub fn is_changed(&self) -> bool {
        self.filename_changed || self.date_changed || self.has_pending_transform()
    }

    pub fn is_filename_changed(&self) -> bool {
        self.filename_changed
    }

    pub fn is_date_changed(&self) -> bool {
        self.date_changed
    }

    pub fn has_rename_error(&self) -> bool {
        self.rename_error
    }

    pub fn has_timestamp_error(&self) -> bool {
        self.timestamp_error
    }

    /// Single-character status summary, highest-priority condition first.
    pub fn status_char(&self) -> char {
        if self.rename_error {
            'R'
        } else if self.timestamp_error {
            'T'
        } else if self.transform_error {
            'X'
        } else if self.is_changed() {
            '*'
        } else {
            ' '
        }
    }

    // ---- save -----------------------------------------------------------

    /// Commits all pending changes of this entity to disk.
    ///
    /// Rename runs first; a target name occupied by another file is resolved
    /// by parking this file under a disambiguated temporary name and
    /// reporting `NeedsSecondTry` so a later pass retries the real target
    /// (free by then, because the conflicting file has moved away). The
    /// transform and timestamp writes are attempted regardless of the rename
    /// result; the timestamp goes last so re-encoding cannot clobber it.
    pub fn save_changes(&mut self) -> SaveOutcome {
        let mut outcome = SaveOutcome::Successful;
        if self.filename_changed {
            outcome = outcome.worst(self.try_rename());
        }
        if self.has_pending_transform() {
            outcome = outcome.worst(self.try_write_transform());
        }
        if self.date_changed {
            outcome = outcome.worst(self.try_write_timestamp());
        }
        outcome
    }

    fn try_rename(&mut self) -> SaveOutcome {
        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let target = parent.join(self.file_name());

        if target == self.path {
            // Fields recompose to the on-disk name; nothing to move.
            self.filename_changed = false;
            self.rename_error = false;
            return SaveOutcome::Successful;
        }

        if target.exists() {
            // Transient conflict: park under a free temporary name and retry
            // the real target on the next pass.
            let temporary = disambiguated_name(&target);
            match fs::rename(&self.path, &temporary) {
                Ok(()) => {
                    tracing::debug!(
                        "Target {} occupied, parked {} at {}",
                        target.display(),
                        self.path.display(),
                        temporary.display()
                    );
                    self.path = temporary;
                    self.rename_error = true;
                    SaveOutcome::NeedsSecondTry
                }
                Err(e) => {
                    tracing::warn!("Failed to park {}: {}", self.path.display(), e);
                    self.rename_error = true;
                    SaveOutcome::Error
                }
            }
        } else {
            match fs::rename(&self.path, &target) {
                Ok(()) => {
                    self.path = target;
                    self.filename_changed = false;
                    self.rename_error = false;
                    SaveOutcome::Successful
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to rename {} to {}: {}",
                        self.path.display(),
                        target.display(),
                        e
                    );
                    self.rename_error = true;
                    SaveOutcome::Error
                }
            }
        }
    }

    fn try_write_transform(&mut self) -> SaveOutcome {
        match self.write_transform() {
            Ok(()) => {
                self.rotation = 0;
                self.flip_horizontal = false;
                self.flip_vertical = false;
                self.transform_error = false;
                // The bytes on disk changed; any decoded payload is stale.
                self.release_content();
                SaveOutcome::Successful
            }
            Err(e) => {
                tracing::warn!("Failed to write transform for {}: {}", self.path.display(), e);
                self.transform_error = true;
                SaveOutcome::Error
            }
        }
    }

    fn write_transform(&self) -> Result<(), CoreError> {
        let mut img = image::open(&self.path)
            .map_err(|e| CoreError::Decode(format!("{}: {}", self.path.display(), e)))?;
        img = match self.rotation {
            1 => img.rotate90(),
            2 => img.rotate180(),
            3 => img.rotate270(),
            _ => img,
        };
        if self.flip_horizontal {
            img = img.fliph();
        }
        if self.flip_vertical {
            img = img.flipv();
        }
        img.save(&self.path)
            .map_err(|e| CoreError::Decode(format!("{}: {}", self.path.display(), e)))
    }

    fn try_write_timestamp(&mut self) -> SaveOutcome {
        match self.write_timestamp() {
            Ok(()) => {
                self.date_changed = false;
                self.timestamp_error = false;
                SaveOutcome::Successful
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to write timestamp for {}: {}",
                    self.path.display(),
                    e
                );
                self.timestamp_error = true;
                SaveOutcome::Error
            }
        }
    }

    fn write_timestamp(&self) -> Result<(), CoreError> {
        let naive = NaiveDateTime::parse_from_str(&self.modified_date, DATE_FORMAT)
            .map_err(|_| CoreError::DateParse(self.modified_date.clone()))?;
        let local = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| CoreError::DateParse(self.modified_date.clone()))?;
        let stamp = FileTime::from_unix_time(local.timestamp(), 0);
        // Creation time is not portably writable; modification time only.
        filetime::set_file_times(&self.path, stamp, stamp)
            .map_err(|e| CoreError::io(e, &self.path))
    }

    /// Relocates the physical file into the sibling deleted folder, creating
    /// it lazily and disambiguating the name on collision. The caller removes
    /// the entity from the active list only after this succeeds.
    pub fn move_to_deleted_folder(&mut self, folder_name: &str) -> Result<(), CoreError> {
        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let deleted_dir = parent.join(folder_name);
        if !deleted_dir.is_dir() {
            if let Err(e) = fs::create_dir_all(&deleted_dir) {
                self.rename_error = true;
                return Err(CoreError::io(e, &deleted_dir));
            }
        }
        let target = disambiguated_name(&deleted_dir.join(self.on_disk_name()));
        if let Err(e) = fs::rename(&self.path, &target) {
            self.rename_error = true;
            return Err(CoreError::io(e, &self.path));
        }
        self.path = target;
        Ok(())
    }

    // ---- content --------------------------------------------------------

    /// Content is valid when a payload is present and no decode error is recorded.
    pub fn content_valid(&self) -> bool {
        self.content.is_some() && self.decode_error.is_none()
    }

    pub fn content(&self) -> Option<Arc<dyn MediaContent>> {
        self.content.clone()
    }

    /// Approximate payload size, used only for eviction accounting.
    pub fn content_size(&self) -> u64 {
        self.content.as_ref().map(|c| c.approx_size()).unwrap_or(0)
    }

    /// Drops the decoded payload and any recorded decode error.
    pub fn release_content(&mut self) {
        self.content = None;
        self.decode_error = None;
    }

    pub fn decode_error(&self) -> Option<&str> {
        self.decode_error.as_deref()
    }

    pub fn decode_retries(&self) -> u8 {
        self.decode_retries
    }

    pub fn can_retry_decode(&self, max_retries: u8) -> bool {
        self.decode_retries < max_retries
    }

    /// Decodes the file through the given viewer and stores the result.
    ///
    /// A fresh attempt resets the retry counter; a retry increments it.
    /// Cancellation is not an error and does not consume a retry.
    pub(crate) fn decode_with(&mut self, viewer: &dyn Viewer, retry: bool) -> bool {
        if retry {
            self.decode_retries = self.decode_retries.saturating_add(1);
        } else {
            self.decode_retries = 0;
        }
        match viewer.decode(&self.path) {
            Ok(content) => {
                self.content = Some(content);
                self.decode_error = None;
                true
            }
            Err(CoreError::Cancelled) => {
                if retry {
                    self.decode_retries -= 1;
                }
                false
            }
            Err(e) => {
                tracing::warn!("Decode failed for {}: {}", self.path.display(), e);
                self.content = None;
                self.decode_error = Some(e.to_string());
                false
            }
        }
    }

    // ---- search ---------------------------------------------------------

    pub fn field_value(&self, field: Field) -> &str {
        match field {
            Field::Prefix => &self.prefix,
            Field::Counter => &self.counter,
            Field::Separator => &self.separator,
            Field::Description => &self.description,
            Field::Extension => &self.extension,
            Field::Date => &self.modified_date,
        }
    }

    /// Routes a full-value replacement through the dirtying setters.
    pub fn set_field_value(&mut self, field: Field, value: &str) {
        match field {
            Field::Prefix => self.set_prefix(value),
            Field::Counter => self.set_counter(value),
            Field::Separator => self.set_separator(value),
            Field::Description => self.set_description(value),
            Field::Extension => self.set_extension(value),
            Field::Date => self.set_modified_date(value),
        }
    }

    /// Substring search within one field, starting at a byte offset. Returns
    /// the matched byte range. Without `case_sensitive`, case folding is
    /// ASCII-only; non-ASCII text matches exactly either way.
    pub fn search_field(
        &self,
        field: Field,
        needle: &str,
        from: usize,
        case_sensitive: bool,
    ) -> Option<(usize, usize)> {
        let haystack = self.field_value(field);
        find_from(haystack, needle, from, case_sensitive).map(|start| (start, start + needle.len()))
    }
}

fn find_from(haystack: &str, needle: &str, from: usize, case_sensitive: bool) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    (from..=h.len() - n.len()).find(|&i| {
        haystack.is_char_boundary(i)
            && if case_sensitive {
                &h[i..i + n.len()] == n
            } else {
                h[i..i + n.len()].eq_ignore_ascii_case(n)
            }
    })
}

/// Splits a filename into `(prefix, counter, separator, description, extension)`.
///
/// The counter is the `counter_position`-th (1-based) run of ASCII digits in
/// the stem. If the stem has fewer digit runs than that, the whole stem
/// becomes the description. A single separator character directly after the
/// counter is peeled off the description.
pub fn parse_filename(
    name: &str,
    counter_position: usize,
) -> (String, String, String, String, String) {
    let (stem, extension) = split_extension(name);

    let runs = digit_runs(stem);
    if counter_position == 0 || runs.len() < counter_position {
        return (
            String::new(),
            String::new(),
            String::new(),
            stem.to_string(),
            extension.to_string(),
        );
    }

    let (start, end) = runs[counter_position - 1];
    let prefix = &stem[..start];
    let counter = &stem[start..end];
    let rest = &stem[end..];
    let (separator, description) = match rest.chars().next() {
        Some(c) if SEPARATORS.contains(&c) => (
            rest[..c.len_utf8()].to_string(),
            rest[c.len_utf8()..].to_string(),
        ),
        _ => (String::new(), rest.to_string()),
    };

    (
        prefix.to_string(),
        counter.to_string(),
        separator,
        description,
        extension.to_string(),
    )
}

/// Byte ranges of the maximal ASCII digit runs in a stem.
pub fn digit_runs(stem: &str) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut current: Option<usize> = None;
    for (i, b) in stem.bytes().enumerate() {
        if b.is_ascii_digit() {
            if current.is_none() {
                current = Some(i);
            }
        } else if let Some(start) = current.take() {
            runs.push((start, i));
        }
    }
    if let Some(start) = current {
        runs.push((start, stem.len()));
    }
    runs
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Returns `target` if it is free, otherwise the first `stem-1`, `stem-2`, …
/// sibling that does not exist yet.
pub(crate) fn disambiguated_name(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }
    let parent = target.parent().map(Path::to_path_buf).unwrap_or_default();
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let (stem, extension) = split_extension(name);
    for n in 1u32.. {
        let candidate = parent.join(format!("{}-{}{}", stem, n, extension));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("ran out of disambiguation suffixes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn image_entity(name: &str) -> MediaFile {
        MediaFile::detached(
            PathBuf::from(format!("/photos/{}", name)),
            MediaKind::Image,
            1,
            "2024-05-01 12:30:45".to_string(),
        )
    }

    #[test]
    fn test_parse_splits_around_counter() {
        let (prefix, counter, separator, description, extension) =
            parse_filename("IMG_0042-beach.jpg", 1);
        assert_eq!(prefix, "IMG_");
        assert_eq!(counter, "0042");
        assert_eq!(separator, "-");
        assert_eq!(description, "beach");
        assert_eq!(extension, ".jpg");
    }

    #[test]
    fn test_parse_uses_configured_digit_run() {
        let (prefix, counter, separator, description, extension) =
            parse_filename("2024 trip 007 sunset.jpg", 2);
        assert_eq!(prefix, "2024 trip ");
        assert_eq!(counter, "007");
        assert_eq!(separator, " ");
        assert_eq!(description, "sunset");
        assert_eq!(extension, ".jpg");
    }

    #[test]
    fn test_parse_without_digits_keeps_whole_stem_as_description() {
        let (prefix, counter, separator, description, extension) =
            parse_filename("holiday.png", 1);
        assert!(prefix.is_empty());
        assert!(counter.is_empty());
        assert!(separator.is_empty());
        assert_eq!(description, "holiday");
        assert_eq!(extension, ".png");
    }

    #[test]
    fn test_parse_too_few_runs_falls_back_to_description() {
        let (_, counter, _, description, _) = parse_filename("IMG_0042.jpg", 3);
        assert!(counter.is_empty());
        assert_eq!(description, "IMG_0042");
    }

    #[test]
    fn test_hidden_style_name_keeps_leading_dot_in_stem() {
        let (_, _, _, description, extension) = parse_filename(".hidden", 1);
        assert_eq!(description, ".hidden");
        assert!(extension.is_empty());
    }

    proptest! {
        #[test]
        fn prop_parse_reconstructs_original_name(
            name in "[A-Za-z0-9 _.-]{1,24}",
            position in 1usize..4,
        ) {
            let (prefix, counter, separator, description, extension) =
                parse_filename(&name, position);
            prop_assert_eq!(
                format!("{}{}{}{}{}", prefix, counter, separator, description, extension),
                name
            );
        }
    }

    #[test]
    fn test_setters_dirty_only_on_actual_change() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        assert!(!file.is_changed());

        file.set_description("beach");
        assert!(!file.is_changed());

        file.set_description("sunset");
        assert!(file.is_filename_changed());
        assert_eq!(file.file_name(), "IMG_0042-sunset.jpg");
    }

    #[test]
    fn test_set_modified_date_marks_timestamp_change_only() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        file.set_modified_date("2024-05-01 12:30:45");
        assert!(!file.is_changed());

        file.set_modified_date("2024-06-01 08:00:00");
        assert!(file.is_date_changed());
        assert!(!file.is_filename_changed());
    }

    #[test]
    fn test_rename_substitutes_pre_call_values() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        file.rename(&RenameRequest {
            prefix: Some("%d_".to_string()),
            description: Some("%p%c".to_string()),
            ..Default::default()
        });
        // Both placeholders resolved against the original tuple.
        assert_eq!(file.prefix(), "beach_");
        assert_eq!(file.description(), "IMG_0042");
        assert_eq!(file.counter(), "0042");
    }

    #[test]
    fn test_rename_date_and_time_tokens() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        file.rename(&RenameRequest {
            description: Some("%m at %t".to_string()),
            ..Default::default()
        });
        assert_eq!(file.description(), "2024-05-01 at 12:30:45");
    }

    #[test]
    fn test_rename_untouched_fields_stay() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        file.rename(&RenameRequest {
            counter: Some("0001".to_string()),
            ..Default::default()
        });
        assert_eq!(file.counter(), "0001");
        assert_eq!(file.prefix(), "IMG_");
        assert_eq!(file.description(), "beach");
    }

    #[test]
    fn test_rotation_composes_modulo_full_turn() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        file.rotate(RotateOp::Clockwise);
        file.rotate(RotateOp::UpsideDown);
        file.rotate(RotateOp::Clockwise);
        assert_eq!(file.rotation_quarter_turns(), 0);
        assert!(!file.is_changed());
    }

    #[test]
    fn test_parity_change_swaps_flip_axes() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        file.flip_horizontally();
        assert_eq!(file.flips(), (true, false));

        // 90 degrees changes axis parity: the flip moves to the other axis.
        file.rotate(RotateOp::Clockwise);
        assert_eq!(file.flips(), (false, true));

        // 180 degrees keeps parity: flips stay put.
        file.rotate(RotateOp::UpsideDown);
        assert_eq!(file.flips(), (false, true));
    }

    #[test]
    fn test_transforms_are_noops_for_unsupported_kinds() {
        let mut file = MediaFile::detached(
            PathBuf::from("/media/clip.mp4"),
            MediaKind::Video,
            1,
            "2024-05-01 12:30:45".to_string(),
        );
        file.rotate(RotateOp::Clockwise);
        file.flip_horizontally();
        file.flip_vertically();
        assert!(!file.has_pending_transform());
        assert!(!file.is_changed());
    }

    #[test]
    fn test_status_char_priority() {
        let mut file = image_entity("IMG_0042-beach.jpg");
        assert_eq!(file.status_char(), ' ');

        file.set_description("sunset");
        assert_eq!(file.status_char(), '*');

        file.timestamp_error = true;
        assert_eq!(file.status_char(), 'T');

        file.rename_error = true;
        assert_eq!(file.status_char(), 'R');
    }

    #[test]
    fn test_search_field_is_case_insensitive_and_offset_aware() {
        let file = image_entity("IMG_0042-Beach.jpg");
        assert_eq!(
            file.search_field(Field::Description, "beach", 0, false),
            Some((0, 5))
        );
        assert_eq!(file.search_field(Field::Description, "beach", 1, false), None);
        assert_eq!(file.search_field(Field::Prefix, "img", 0, false), Some((0, 3)));
    }

    #[test]
    fn test_search_field_honours_case_sensitive_mode() {
        let file = image_entity("IMG_0042-Beach.jpg");
        assert_eq!(file.search_field(Field::Description, "beach", 0, true), None);
        assert_eq!(
            file.search_field(Field::Description, "Beach", 0, true),
            Some((0, 5))
        );
    }

    #[test]
    fn test_retry_counter_bookkeeping() {
        let mut file = image_entity("IMG_0042-beach.jpg");

        struct FailingViewer;
        impl Viewer for FailingViewer {
            fn accepts(&self, _path: &Path) -> bool {
                true
            }
            fn decode(&self, _path: &Path) -> Result<Arc<dyn MediaContent>, CoreError> {
                Err(CoreError::Decode("broken".to_string()))
            }
        }

        assert!(!file.decode_with(&FailingViewer, false));
        assert_eq!(file.decode_retries(), 0);
        assert!(!file.content_valid());
        assert!(file.decode_error().is_some());

        assert!(!file.decode_with(&FailingViewer, true));
        assert!(!file.decode_with(&FailingViewer, true));
        assert_eq!(file.decode_retries(), 2);
        assert!(file.can_retry_decode(3));
        assert!(!file.decode_with(&FailingViewer, true));
        assert!(!file.can_retry_decode(3));

        // A fresh attempt resets the counter.
        assert!(!file.decode_with(&FailingViewer, false));
        assert_eq!(file.decode_retries(), 0);
    }

    #[test]
    fn test_cancelled_decode_consumes_no_retry() {
        let mut file = image_entity("IMG_0042-beach.jpg");

        struct CancellingViewer;
        impl Viewer for CancellingViewer {
            fn accepts(&self, _path: &Path) -> bool {
                true
            }
            fn decode(&self, _path: &Path) -> Result<Arc<dyn MediaContent>, CoreError> {
                Err(CoreError::Cancelled)
            }
        }

        assert!(!file.decode_with(&CancellingViewer, true));
        assert_eq!(file.decode_retries(), 0);
        assert!(file.decode_error().is_none());
    }
}
