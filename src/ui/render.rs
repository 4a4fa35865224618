use crossterm::{
    cursor::{MoveDown, MoveLeft, MoveToColumn, MoveUp},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

use super::buffer::{DrawnState, EditBuffer};
use super::input_metrics::column_count;
use super::prompt::Prompt;

/// Inline redraw of the edit region. Assumes the terminal cursor sits where
/// the previous `refresh` (or the initial prompt print) left it.
#[derive(Debug, Default)]
pub struct ScreenRenderer;

impl ScreenRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Erases every displayed row, bottom-up, ending at column 0 of the first
    /// row of the edit region.
    pub fn clear<W: Write>(&self, out: &mut W, drawn: DrawnState) -> io::Result<()> {
        let rows = drawn.rows.max(1);
        let below = rows.saturating_sub(1).saturating_sub(drawn.cursor_row);
        if below > 0 {
            queue!(out, MoveDown(to_u16(below)))?;
        }
        for row in 0..rows {
            if row > 0 {
                queue!(out, MoveUp(1))?;
            }
            queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        }
        Ok(())
    }

    pub fn reprint<W: Write>(
        &self,
        out: &mut W,
        buffer: &EditBuffer,
        prompt: &Prompt,
    ) -> io::Result<()> {
        for (idx, row) in buffer.rows().iter().enumerate() {
            if idx == 0 {
                queue!(out, Print(&prompt.styled), Print(row))?;
            } else {
                queue!(out, Print("\r\n"), Print(row))?;
            }
        }
        Ok(())
    }

    /// Moves from the end of the last printed row to the buffer cursor.
    pub fn place_cursor<W: Write>(
        &self,
        out: &mut W,
        buffer: &EditBuffer,
        prompt: &Prompt,
    ) -> io::Result<()> {
        let cursor = buffer.cursor();
        let rows_behind = buffer.row_count() - 1 - cursor.row;
        if rows_behind == 0 {
            let columns_behind = column_count(buffer.current_row()) - cursor.col;
            if columns_behind > 0 {
                queue!(out, MoveLeft(to_u16(columns_behind)))?;
            }
            return Ok(());
        }

        // the last row may be shorter than the cursor row, so go up first and
        // land on an absolute column
        let target = if cursor.row == 0 {
            prompt.width + cursor.col
        } else {
            cursor.col
        };
        queue!(out, MoveUp(to_u16(rows_behind)), MoveToColumn(to_u16(target)))?;
        Ok(())
    }

    /// One atomic clear → reprint → place cursor pass, flushed once.
    pub fn refresh<W: Write>(
        &self,
        out: &mut W,
        before: DrawnState,
        buffer: &EditBuffer,
        prompt: &Prompt,
    ) -> io::Result<()> {
        self.clear(out, before)?;
        self.reprint(out, buffer, prompt)?;
        self.place_cursor(out, buffer, prompt)?;
        out.flush()
    }
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
