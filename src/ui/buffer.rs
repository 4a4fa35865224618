use super::input_metrics::{byte_offset, column_count, Layout};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorPosition {
    pub row: usize,
    pub col: usize,
}

/// What the terminal currently shows for a buffer: enough to erase it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawnState {
    pub rows: usize,
    pub cursor_row: usize,
}

/// Soft-wrapped edit buffer. Rows are display rows, not logical lines: the
/// submitted text is the rows joined with nothing between them.
///
/// Invariants: at least one row; the cursor always addresses an existing row
/// and a column within `0..=len(row)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditBuffer {
    rows: Vec<String>,
    cursor: CursorPosition,
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EditBuffer {
    pub fn new() -> Self {
        Self {
            rows: vec![String::new()],
            cursor: CursorPosition::default(),
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    pub fn current_row(&self) -> &str {
        &self.rows[self.cursor.row]
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(String::is_empty)
    }

    pub fn drawn(&self) -> DrawnState {
        DrawnState {
            rows: self.rows.len(),
            cursor_row: self.cursor.row,
        }
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.rows.push(String::new());
        self.cursor = CursorPosition::default();
    }

    pub fn to_flat_string(&self) -> String {
        self.rows.concat()
    }

    /// Inserts at the cursor. When the row's measured width reaches the
    /// terminal width the row is soft-wrapped: whatever follows the cursor
    /// moves to a new row below and the cursor lands at that row's start.
    pub fn insert_char(&mut self, ch: char, layout: Layout) {
        let CursorPosition { row, col } = self.cursor;
        let limit = layout.row_limit(row);
        let line = &mut self.rows[row];
        let at = byte_offset(line, col);
        line.insert(at, ch);

        let col = col + 1;
        if column_count(line) >= limit {
            // a row already full from an earlier join splits at the limit
            let split_col = col.min(limit);
            let tail = line.split_off(byte_offset(line, split_col));
            self.rows.insert(row + 1, tail);
            self.cursor = CursorPosition {
                row: row + 1,
                col: col - split_col,
            };
        } else {
            self.cursor.col = col;
        }
    }

    /// Removes the character left of the cursor, or joins the current row onto
    /// the previous one when the cursor sits at a row start. A join that would
    /// overflow the previous row pushes the overflow back into the next row.
    ///
    /// A join may leave a row that exactly fills its limit, so undoing a wrap
    /// gives back one row. The next insert on that row wraps it again.
    pub fn delete_backward(&mut self, layout: Layout) {
        let CursorPosition { row, col } = self.cursor;
        if col > 0 {
            let line = &mut self.rows[row];
            let start = byte_offset(line, col - 1);
            let end = byte_offset(line, col);
            line.replace_range(start..end, "");
            self.cursor.col = col - 1;
            return;
        }
        if row == 0 {
            return;
        }

        let current = self.rows.remove(row);
        let prev = row - 1;
        let join_col = column_count(&self.rows[prev]);
        self.rows[prev].push_str(&current);

        let limit = layout.row_limit(prev);
        let merged_len = column_count(&self.rows[prev]);
        if merged_len > limit {
            let split_col = limit.max(join_col);
            let line = &mut self.rows[prev];
            let overflow = line.split_off(byte_offset(line, split_col));
            if !overflow.is_empty() {
                self.rows.insert(row, overflow);
            }
        }
        self.cursor = CursorPosition {
            row: prev,
            col: join_col,
        };
    }

    pub fn move_left(&mut self) {
        let CursorPosition { row, col } = self.cursor;
        if col > 0 {
            self.cursor.col = col - 1;
        } else if row > 0 {
            self.cursor = CursorPosition {
                row: row - 1,
                col: column_count(&self.rows[row - 1]),
            };
        }
    }

    pub fn move_right(&mut self) {
        let CursorPosition { row, col } = self.cursor;
        if col < column_count(&self.rows[row]) {
            self.cursor.col = col + 1;
        } else if row + 1 < self.rows.len() {
            self.cursor = CursorPosition { row: row + 1, col: 0 };
        }
    }

    /// Replaces the contents, wrapping exactly as if `text` had been typed.
    pub fn set_text(&mut self, text: &str, layout: Layout) {
        self.clear();
        for ch in text.chars().filter(|ch| !ch.is_control()) {
            self.insert_char(ch, layout);
        }
    }
}
