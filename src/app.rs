use anyhow::{bail, Result};
use crossterm::style::Stylize;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::history_log::HistoryLog;
use crate::state::HistoryStore;
use crate::terminal;
use crate::tools::TerminalPassthrough;
use crate::ui::{LineEditor, LiveWidth, ReadOutcome, TerminalRawMode};
use crate::util::parse_bool_str;

const EXIT_COMMAND: &str = "exit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Exit,
}

/// One interactive shell session: the editor, the passthrough and the
/// persisted log, driven line by line.
pub struct Session {
    config: Config,
    editor: LineEditor,
    passthrough: TerminalPassthrough,
    history_log: Option<HistoryLog>,
    interrupted: Arc<AtomicBool>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let history_log = config.history_file.clone().map(HistoryLog::new);
        let mut history = HistoryStore::new();
        if let Some(log) = &history_log {
            match log.load() {
                Ok(entries) => {
                    tracing::debug!(count = entries.len(), "seeded history");
                    history.extend(entries);
                }
                Err(err) => tracing::warn!("ignoring unreadable history log: {err:#}"),
            }
        }

        Self {
            passthrough: TerminalPassthrough::from_config(&config),
            editor: LineEditor::with_history(history),
            history_log,
            interrupted: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// Shares the flag a SIGINT handler sets while a command is running.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn passthrough(&self) -> &TerminalPassthrough {
        &self.passthrough
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        let mut input = stdin.lock();
        let mut stdout = io::stdout();

        loop {
            let prompt = self.passthrough.prompt();
            let outcome = if interactive {
                self.editor.read_line(
                    &mut input,
                    &mut stdout,
                    &prompt,
                    &LiveWidth,
                    &TerminalRawMode,
                )?
            } else {
                self.editor.read_cooked(&mut input, &mut stdout, &prompt)?
            };

            match outcome {
                ReadOutcome::Line(line) => {
                    if self.dispatch(&line, &mut stdout)? == Dispatch::Exit {
                        break;
                    }
                }
                ReadOutcome::Interrupted => continue,
                ReadOutcome::Eof => break,
            }
        }

        tracing::info!("session ended");
        Ok(())
    }

    /// Handles one submitted line. Command failures are reported on `out`
    /// and never end the session; only a failing writer does.
    pub fn dispatch<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Dispatch> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Dispatch::Continue);
        }
        self.record(line);

        if line == EXIT_COMMAND {
            return Ok(Dispatch::Exit);
        }

        let result = match line.strip_prefix(self.config.command_prefix.as_str()) {
            Some(builtin) => self.run_builtin(builtin.trim(), out),
            None => self.run_external(line, out),
        };

        if let Err(err) = result {
            tracing::warn!(line, "command failed: {err:#}");
            writeln!(out, "{} {err:#}", "error:".red().bold())?;
        }
        out.flush()?;
        Ok(Dispatch::Continue)
    }

    fn record(&self, line: &str) {
        if let Some(log) = &self.history_log {
            if let Err(err) = log.append(line) {
                tracing::warn!("failed to append to history log: {err:#}");
            }
        }
    }

    fn run_external<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()> {
        self.interrupted.store(false, Ordering::SeqCst);
        let outcome = self.passthrough.execute_command(line, out)?;
        if self.interrupted.swap(false, Ordering::SeqCst) {
            tracing::info!(line, "command interrupted");
            writeln!(out)?;
        } else if !outcome.success() {
            tracing::debug!(line, status = ?outcome.status, "command exited unsuccessfully");
        }
        Ok(())
    }

    fn run_builtin<W: Write>(&mut self, builtin: &str, out: &mut W) -> Result<()> {
        let (name, arg) = match builtin.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (builtin, None),
        };
        let prefix = &self.config.command_prefix;

        match name {
            "clear" => {
                terminal::clear_screen(out)?;
                self.passthrough.clear_cache();
            }
            "displayfullpath" => match arg {
                None | Some("") => self.passthrough.toggle_display_whole_path(),
                Some(value) => match parse_bool_str(value) {
                    Some(enabled) => self.passthrough.set_display_whole_path(enabled),
                    None => bail!("usage: {prefix}displayfullpath [enable|disable]"),
                },
            },
            "pwd" => writeln!(out, "{}", self.passthrough.current_dir().display())?,
            "ls" => {
                for name in self.passthrough.files_at_current_path()? {
                    writeln!(out, "{name}")?;
                }
            }
            "history" => {
                for (index, entry) in self.editor.history().entries().iter().enumerate() {
                    writeln!(out, "{:>5}  {entry}", index + 1)?;
                }
            }
            "help" => write_help(out, prefix)?,
            other => writeln!(
                out,
                "unknown command: {prefix}{other} (try {prefix}help)"
            )?,
        }
        Ok(())
    }
}

fn write_help<W: Write>(out: &mut W, prefix: &str) -> io::Result<()> {
    writeln!(out, "built-in commands:")?;
    writeln!(out, "  {prefix}clear                          clear the screen and output cache")?;
    writeln!(out, "  {prefix}displayfullpath [enable|disable] show the whole path in the prompt")?;
    writeln!(out, "  {prefix}pwd                            print the working directory")?;
    writeln!(out, "  {prefix}ls                             list files in the working directory")?;
    writeln!(out, "  {prefix}history                        list submitted lines")?;
    writeln!(out, "  {prefix}help                           show this message")?;
    writeln!(out, "  {EXIT_COMMAND}                            leave the shell")?;
    writeln!(out, "anything else runs through the system shell")
}
