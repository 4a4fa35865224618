use anyhow::{Context, Result};
use crossterm::{queue, style::Print};
use std::io::{self, BufRead, Read, Write};

use super::buffer::EditBuffer;
use super::input_metrics::Layout;
use super::keys::{Key, KeyDecoder};
use super::prompt::Prompt;
use super::render::ScreenRenderer;
use crate::state::HistoryStore;
use crate::terminal::{self, RawModeGuard};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Interrupted,
    Eof,
}

/// Source of the terminal width, sampled before every redraw.
pub trait WidthSource {
    fn width(&self) -> usize;
}

impl WidthSource for usize {
    fn width(&self) -> usize {
        *self
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LiveWidth;

impl WidthSource for LiveWidth {
    fn width(&self) -> usize {
        terminal::terminal_width()
    }
}

/// Puts the terminal into raw mode for one `read_line`. The guard restores
/// the previous mode when dropped.
pub trait RawModeSource {
    type Guard;

    fn enter(&self) -> Result<Self::Guard>;
}

/// The process terminal, switched with termios.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalRawMode;

impl RawModeSource for TerminalRawMode {
    type Guard = RawModeGuard;

    fn enter(&self) -> Result<RawModeGuard> {
        RawModeGuard::enter()
    }
}

#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: EditBuffer,
    history: HistoryStore,
    decoder: KeyDecoder,
    renderer: ScreenRenderer,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: HistoryStore) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Reads one line with raw-mode editing, or as a plain line-buffered read
    /// when the terminal refuses raw mode. Raw mode is always left before
    /// this returns.
    pub fn read_line<R, W, S, M>(
        &mut self,
        input: &mut R,
        out: &mut W,
        prompt: &Prompt,
        width: &S,
        raw_mode: &M,
    ) -> Result<ReadOutcome>
    where
        R: BufRead,
        W: Write,
        S: WidthSource,
        M: RawModeSource,
    {
        match raw_mode.enter() {
            Ok(guard) => {
                let outcome = self.edit(input, out, prompt, width);
                drop(guard);
                outcome
            }
            Err(err) => {
                tracing::debug!("raw mode unavailable, reading line-buffered: {err:#}");
                self.read_cooked(input, out, prompt)
            }
        }
    }

    /// The raw editing loop: one byte at a time, decode, apply, redraw.
    pub fn edit<R, W, S>(
        &mut self,
        input: &mut R,
        out: &mut W,
        prompt: &Prompt,
        width: &S,
    ) -> Result<ReadOutcome>
    where
        R: BufRead,
        W: Write,
        S: WidthSource,
    {
        self.begin_session();
        queue!(out, Print(&prompt.styled))?;
        out.flush()?;

        let mut byte = [0u8; 1];
        loop {
            match input.read(&mut byte) {
                Ok(0) => {
                    finish_line(out)?;
                    return Ok(ReadOutcome::Eof);
                }
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err).context("failed to read from terminal"),
            }

            let Some(key) = self.decoder.feed(byte[0]) else {
                continue;
            };
            let layout = Layout::new(width.width(), prompt.width);
            let before = self.buffer.drawn();

            match key {
                Key::Enter => {
                    finish_line(out)?;
                    return Ok(ReadOutcome::Line(self.submit()));
                }
                Key::Interrupt => {
                    queue!(out, Print("^C"))?;
                    finish_line(out)?;
                    self.buffer.clear();
                    self.history.reset_browse();
                    return Ok(ReadOutcome::Interrupted);
                }
                Key::EndOfInput if self.buffer.is_empty() => {
                    finish_line(out)?;
                    return Ok(ReadOutcome::Eof);
                }
                Key::EndOfInput => continue,
                Key::Char(ch) => self.buffer.insert_char(ch, layout),
                Key::Backspace => self.buffer.delete_backward(layout),
                Key::Left => self.buffer.move_left(),
                Key::Right => self.buffer.move_right(),
                Key::Up => {
                    let entry = self.history.previous().to_string();
                    self.buffer.set_text(&entry, layout);
                }
                Key::Down => {
                    let entry = self.history.next().to_string();
                    self.buffer.set_text(&entry, layout);
                }
            }

            self.renderer
                .refresh(out, before, &self.buffer, prompt)
                .context("failed to redraw input")?;
        }
    }

    /// Fallback for non-tty input: the terminal does its own line editing.
    pub fn read_cooked<R, W>(
        &mut self,
        input: &mut R,
        out: &mut W,
        prompt: &Prompt,
    ) -> Result<ReadOutcome>
    where
        R: BufRead,
        W: Write,
    {
        self.begin_session();
        queue!(out, Print(&prompt.styled))?;
        out.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("failed to read from stdin")?;
        if read == 0 {
            return Ok(ReadOutcome::Eof);
        }
        // no width to honour here, the terminal already echoed the line
        self.buffer
            .set_text(line.trim_end_matches(['\n', '\r']), Layout::new(usize::MAX, 0));
        Ok(ReadOutcome::Line(self.submit()))
    }

    fn begin_session(&mut self) {
        self.buffer.clear();
        self.decoder.reset();
        self.history.reset_browse();
    }

    fn submit(&mut self) -> String {
        let line = self.buffer.to_flat_string();
        if !line.is_empty() {
            self.history.push(line.clone());
        }
        self.buffer.clear();
        line
    }
}

fn finish_line<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Print("\r\n"))?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    struct NoTerminal;

    impl RawModeSource for NoTerminal {
        type Guard = ();

        fn enter(&self) -> Result<()> {
            bail!("stdin is not a terminal")
        }
    }

    /// Records whether raw mode is currently on.
    #[derive(Default)]
    struct RecordingRawMode {
        active: Rc<Cell<bool>>,
    }

    struct RecordingGuard(Rc<Cell<bool>>);

    impl Drop for RecordingGuard {
        fn drop(&mut self) {
            self.0.set(false);
        }
    }

    impl RawModeSource for RecordingRawMode {
        type Guard = RecordingGuard;

        fn enter(&self) -> Result<RecordingGuard> {
            self.active.set(true);
            Ok(RecordingGuard(Rc::clone(&self.active)))
        }
    }

    fn prompt() -> Prompt {
        Prompt::plain("$ ")
    }

    fn run(editor: &mut LineEditor, bytes: &[u8], width: usize) -> (ReadOutcome, String) {
        let mut input = Cursor::new(bytes.to_vec());
        let mut out = Vec::new();
        let outcome = editor
            .edit(&mut input, &mut out, &prompt(), &width)
            .expect("edit session");
        (outcome, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn enter_submits_flattened_line() {
        let mut editor = LineEditor::new();
        let (outcome, output) = run(&mut editor, b"echo hi\n", 80);
        assert_eq!(outcome, ReadOutcome::Line("echo hi".to_string()));
        assert!(output.starts_with("$ "));
        assert!(output.ends_with("\r\n"));
        assert_eq!(editor.history().entries(), &["echo hi".to_string()]);
        assert!(editor.buffer().is_empty());
    }

    #[test]
    fn wrapped_input_is_submitted_as_one_line() {
        let mut editor = LineEditor::new();
        let (outcome, _) = run(&mut editor, b"0123456789abcdef\n", 10);
        assert_eq!(outcome, ReadOutcome::Line("0123456789abcdef".to_string()));
    }

    #[test]
    fn backspace_and_arrows_edit_in_place() {
        let mut editor = LineEditor::new();
        let (outcome, _) = run(&mut editor, b"lx\x7fs -a\x1b[D\x1b[D\x1b[D\x1b[D\x1b[C-\n", 80);
        assert_eq!(outcome, ReadOutcome::Line("ls- -a".to_string()));
    }

    #[test]
    fn up_and_down_recall_history() {
        let mut editor = LineEditor::new();
        run(&mut editor, b"first\n", 80);
        run(&mut editor, b"second\n", 80);

        let (outcome, _) = run(&mut editor, b"\x1b[A\x1b[A\x1b[B\n", 80);
        assert_eq!(outcome, ReadOutcome::Line("second".to_string()));

        let (outcome, _) = run(&mut editor, b"\x1b[A\x1b[B\n", 80);
        assert_eq!(outcome, ReadOutcome::Line(String::new()));

        let (outcome, _) = run(&mut editor, b"\x1b[A\x1b[A\x1b[A\x1b[A\n", 80);
        assert_eq!(outcome, ReadOutcome::Line("first".to_string()));
    }

    #[test]
    fn empty_lines_are_not_added_to_history() {
        let mut editor = LineEditor::new();
        run(&mut editor, b"\n", 80);
        assert!(editor.history().is_empty());
    }

    #[test]
    fn ctrl_c_discards_the_line() {
        let mut editor = LineEditor::new();
        let (outcome, output) = run(&mut editor, b"rm -rf\x03", 80);
        assert_eq!(outcome, ReadOutcome::Interrupted);
        assert!(output.contains("^C"));
        assert!(editor.buffer().is_empty());
        assert!(editor.history().is_empty());
    }

    #[test]
    fn ctrl_d_only_ends_input_on_empty_buffer() {
        let mut editor = LineEditor::new();
        let (outcome, _) = run(&mut editor, b"ab\x04c\n", 80);
        assert_eq!(outcome, ReadOutcome::Line("abc".to_string()));

        let (outcome, _) = run(&mut editor, b"\x04", 80);
        assert_eq!(outcome, ReadOutcome::Eof);
    }

    #[test]
    fn end_of_stream_is_eof() {
        let mut editor = LineEditor::new();
        let (outcome, _) = run(&mut editor, b"partial", 80);
        assert_eq!(outcome, ReadOutcome::Eof);
    }

    #[test]
    fn unknown_escape_sequences_leave_no_trace() {
        let mut editor = LineEditor::new();
        let (outcome, _) = run(&mut editor, b"a\x1b[3~b\n", 80);
        assert_eq!(outcome, ReadOutcome::Line("ab".to_string()));
    }

    #[test]
    fn cooked_fallback_reads_a_whole_line() {
        let mut editor = LineEditor::new();
        let mut input = Cursor::new(b"git status\r\nnext\n".to_vec());
        let mut out = Vec::new();
        let outcome = editor
            .read_cooked(&mut input, &mut out, &prompt())
            .expect("cooked read");
        assert_eq!(outcome, ReadOutcome::Line("git status".to_string()));
        assert_eq!(editor.history().len(), 1);

        let mut empty = Cursor::new(Vec::new());
        let outcome = editor
            .read_cooked(&mut empty, &mut out, &prompt())
            .expect("cooked read");
        assert_eq!(outcome, ReadOutcome::Eof);
    }

    #[test]
    fn read_line_falls_back_to_line_buffered_input_without_raw_mode() {
        let mut editor = LineEditor::new();
        let mut input = Cursor::new(b"git status\n".to_vec());
        let mut out = Vec::new();
        let outcome = editor
            .read_line(&mut input, &mut out, &prompt(), &80usize, &NoTerminal)
            .expect("cooked fallback");
        assert_eq!(outcome, ReadOutcome::Line("git status".to_string()));
        assert_eq!(editor.history().entries(), &["git status".to_string()]);
        assert_eq!(String::from_utf8(out).expect("utf8"), "$ ");
    }

    #[test]
    fn read_line_edits_in_raw_mode_and_leaves_it_before_returning() {
        let raw_mode = RecordingRawMode::default();
        let mut editor = LineEditor::new();
        let mut input = Cursor::new(b"ab\x7fc\n".to_vec());
        let outcome = editor
            .read_line(&mut input, &mut Vec::new(), &prompt(), &80usize, &raw_mode)
            .expect("raw edit");
        assert_eq!(outcome, ReadOutcome::Line("ac".to_string()));
        assert!(!raw_mode.active.get());
    }
}
