//! Search/replace cursor over the structured fields of a file list.
//!
//! A `SearchSession` is an explicit value owned by the caller and re-created
//! before each search run, never hidden module state, so independent views
//! can each hold their own cursor without interference.

use crate::core::media_file::{Field, MediaFile, FIELD_SEARCH_ORDER};

/// One successful match: which row, which column, and the matched byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub row: usize,
    pub field: Field,
    pub start: usize,
    pub end: usize,
}

/// Cursor tracking where the last search left off.
#[derive(Debug, Clone)]
pub struct SearchSession {
    /// List row indices in traversal order.
    rows: Vec<usize>,
    in_selection: bool,
    /// Position within `rows`.
    cursor: usize,
    /// Index into `FIELD_SEARCH_ORDER` for the current row.
    column: usize,
    /// Byte offset within the current column where the next scan resumes.
    offset: usize,
    case_sensitive: bool,
    found: bool,
    matched_id: Option<u64>,
}

impl SearchSession {
    /// Decides the search scope: a selection of more than one row confines
    /// the search to those rows; otherwise the whole list is searched from
    /// the selected row (or row 0) to the end.
    pub fn new(selection: &[usize], list_len: usize, case_sensitive: bool) -> Self {
        let (rows, in_selection) = if selection.len() > 1 {
            (selection.to_vec(), true)
        } else {
            let start = selection.first().copied().unwrap_or(0).min(list_len);
            ((start..list_len).collect(), false)
        };
        Self {
            rows,
            in_selection,
            cursor: 0,
            column: 0,
            offset: 0,
            case_sensitive,
            found: false,
            matched_id: None,
        }
    }

    pub fn in_selection(&self) -> bool {
        self.in_selection
    }

    pub fn found(&self) -> bool {
        self.found
    }

    /// Id of the entity the last match landed in.
    pub fn matched_id(&self) -> Option<u64> {
        self.matched_id
    }

    /// Moves the resume offset, e.g. to just past replacement text so
    /// adjacent matches are not skipped.
    pub fn set_resume_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Advances to the next match.
    ///
    /// The current row is scanned column by column in the fixed field order,
    /// resuming at the stored offset; when the row is exhausted, the column
    /// and offset reset and the cursor moves to the next row in scope. On a
    /// hit the cursor stays put so the following call resumes behind the
    /// match.
    pub fn next_match(&mut self, files: &[MediaFile], text: &str) -> Option<SearchHit> {
        self.found = false;
        while self.cursor < self.rows.len() {
            let row = self.rows[self.cursor];
            let file = match files.get(row) {
                Some(file) => file,
                None => {
                    // Row vanished since the session started; skip it.
                    self.cursor += 1;
                    self.column = 0;
                    self.offset = 0;
                    continue;
                }
            };
            while self.column < FIELD_SEARCH_ORDER.len() {
                let field = FIELD_SEARCH_ORDER[self.column];
                if let Some((start, end)) =
                    file.search_field(field, text, self.offset, self.case_sensitive)
                {
                    self.offset = end;
                    self.found = true;
                    self.matched_id = Some(file.id());
                    return Some(SearchHit {
                        row,
                        field,
                        start,
                        end,
                    });
                }
                self.column += 1;
                self.offset = 0;
            }
            self.column = 0;
            self.offset = 0;
            self.cursor += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::viewer::MediaKind;
    use std::path::PathBuf;

    fn entity(name: &str) -> MediaFile {
        MediaFile::detached(
            PathBuf::from(format!("/photos/{}", name)),
            MediaKind::Image,
            1,
            "2024-05-01 12:30:45".to_string(),
        )
    }

    #[test]
    fn test_search_advances_across_rows() {
        let files = vec![
            entity("001-sunset.jpg"),
            entity("002-harbor.jpg"),
            entity("003-abcdef.jpg"),
        ];
        let mut session = SearchSession::new(&[], files.len(), false);

        let hit = session.next_match(&files, "abc").expect("match in row 2");
        assert_eq!(hit.row, 2);
        assert_eq!(hit.field, Field::Description);
        assert_eq!((hit.start, hit.end), (0, 3));
        assert!(session.found());
        assert_eq!(session.matched_id(), Some(files[2].id()));
    }

    #[test]
    fn test_search_scope_starts_at_selected_row() {
        let files = vec![
            entity("001-beach.jpg"),
            entity("002-beach.jpg"),
            entity("003-beach.jpg"),
        ];
        let mut session = SearchSession::new(&[1], files.len(), false);

        let hit = session.next_match(&files, "beach").unwrap();
        assert_eq!(hit.row, 1);
        let hit = session.next_match(&files, "beach").unwrap();
        assert_eq!(hit.row, 2);
        assert!(session.next_match(&files, "beach").is_none());
        assert!(!session.found());
    }

    #[test]
    fn test_multi_row_selection_confines_scope() {
        let files = vec![
            entity("001-beach.jpg"),
            entity("002-beach.jpg"),
            entity("003-beach.jpg"),
        ];
        let mut session = SearchSession::new(&[0, 2], files.len(), false);
        assert!(session.in_selection());

        assert_eq!(session.next_match(&files, "beach").unwrap().row, 0);
        assert_eq!(session.next_match(&files, "beach").unwrap().row, 2);
        assert!(session.next_match(&files, "beach").is_none());
    }

    #[test]
    fn test_repeated_matches_within_one_field() {
        let files = vec![entity("001-aa_aa.jpg")];
        let mut session = SearchSession::new(&[], files.len(), false);

        let first = session.next_match(&files, "aa").unwrap();
        assert_eq!((first.start, first.end), (0, 2));
        let second = session.next_match(&files, "aa").unwrap();
        assert_eq!((second.start, second.end), (3, 5));
        assert!(session.next_match(&files, "aa").is_none());
    }

    #[test]
    fn test_case_sensitive_session_skips_differently_cased_text() {
        let files = vec![entity("001-Beach.jpg"), entity("002-beach.jpg")];
        let mut session = SearchSession::new(&[], files.len(), true);

        let hit = session.next_match(&files, "beach").unwrap();
        assert_eq!(hit.row, 1);
        assert!(session.next_match(&files, "beach").is_none());
    }

    #[test]
    fn test_counter_column_is_searched_before_description() {
        let files = vec![entity("42-answer42.jpg")];
        let mut session = SearchSession::new(&[], files.len(), false);

        let first = session.next_match(&files, "42").unwrap();
        assert_eq!(first.field, Field::Counter);
        let second = session.next_match(&files, "42").unwrap();
        assert_eq!(second.field, Field::Description);
    }
}
