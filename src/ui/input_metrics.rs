use unicode_width::UnicodeWidthChar;

/// Terminal width and prompt width as sampled for one keystroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub prompt_width: usize,
}

impl Layout {
    pub fn new(width: usize, prompt_width: usize) -> Self {
        Self {
            width: width.max(1),
            prompt_width,
        }
    }

    /// Columns available to buffer text on `row`. Row 0 shares its line with
    /// the prompt.
    pub fn row_limit(&self, row: usize) -> usize {
        if row == 0 {
            self.width.saturating_sub(self.prompt_width).max(1)
        } else {
            self.width
        }
    }
}

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

/// Length of a row in cursor columns.
pub fn column_count(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of cursor column `col`, clamped to the end of `text`.
pub fn byte_offset(text: &str, col: usize) -> usize {
    text.char_indices()
        .nth(col)
        .map_or(text.len(), |(idx, _)| idx)
}
