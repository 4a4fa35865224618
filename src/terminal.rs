use anyhow::{anyhow, Context, Result};
use crossterm::{
    cursor::{MoveTo, Show},
    execute, queue,
    terminal::{Clear, ClearType},
};
use rustix::fd::{AsFd, BorrowedFd};
use rustix::termios::{self, LocalModes, OptionalActions, SpecialCodeIndex, Termios};
use std::fs::File;
use std::io::{self, Write};
use std::sync::{Mutex, Once};

pub const DEFAULT_TERMINAL_WIDTH: usize = 80;

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Attributes saved by the last successful `enable_raw_mode`. `None` while the
/// terminal is cooked.
static SAVED_TERMIOS: Mutex<Option<Termios>> = Mutex::new(None);

enum TerminalFd {
    Stdin(io::Stdin),
    DevTty(File),
}

impl AsFd for TerminalFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            TerminalFd::Stdin(stdin) => stdin.as_fd(),
            TerminalFd::DevTty(file) => file.as_fd(),
        }
    }
}

fn terminal_fd() -> io::Result<TerminalFd> {
    let stdin = io::stdin();
    if termios::isatty(&stdin) {
        Ok(TerminalFd::Stdin(stdin))
    } else {
        let file = File::options().read(true).write(true).open("/dev/tty")?;
        Ok(TerminalFd::DevTty(file))
    }
}

pub fn install_panic_hook_once() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = restore();
            original_hook(panic_info);
        }));
    });
}

/// Turns off canonical input, echo and signal generation so every keystroke
/// reaches the editor as bytes. Nested calls keep the first saved state.
pub fn enable_raw_mode() -> Result<()> {
    let fd = terminal_fd().context("failed to get terminal file descriptor")?;
    let mut attrs = termios::tcgetattr(&fd).context("failed to retrieve terminal attributes")?;

    {
        let mut saved = SAVED_TERMIOS
            .lock()
            .map_err(|e| anyhow!("terminal settings lock poisoned: {e}"))?;
        if saved.is_none() {
            *saved = Some(attrs.clone());
        }
    }

    attrs
        .local_modes
        .remove(LocalModes::ICANON | LocalModes::ECHO | LocalModes::ISIG);
    attrs.special_codes[SpecialCodeIndex::VMIN] = 1;
    attrs.special_codes[SpecialCodeIndex::VTIME] = 0;

    if let Err(err) = termios::tcsetattr(&fd, OptionalActions::Now, &attrs) {
        if let Ok(mut saved) = SAVED_TERMIOS.lock() {
            *saved = None;
        }
        return Err(err).context("failed to set terminal attributes");
    }
    Ok(())
}

/// Restores the attributes saved by `enable_raw_mode`. No-op if raw mode was
/// never enabled.
pub fn disable_raw_mode() -> Result<()> {
    let mut saved = SAVED_TERMIOS
        .lock()
        .map_err(|e| anyhow!("terminal settings lock poisoned: {e}"))?;

    if let Some(attrs) = saved.take() {
        let fd = terminal_fd().context("failed to get terminal file descriptor")?;
        termios::tcsetattr(&fd, OptionalActions::Now, &attrs)
            .context("failed to set terminal attributes")?;
    }
    Ok(())
}

pub fn is_raw_mode_enabled() -> bool {
    SAVED_TERMIOS
        .lock()
        .map(|saved| saved.is_some())
        .unwrap_or(false)
}

pub fn restore() -> Result<()> {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), Show);
    Ok(())
}

/// Raw mode for the lifetime of the guard.
#[derive(Debug)]
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn enter() -> Result<Self> {
        install_panic_hook_once();
        enable_raw_mode()?;
        Ok(Self { active: true })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn leave(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = self.leave() {
            tracing::warn!("failed to restore terminal attributes: {err:#}");
        }
    }
}

/// Column count of the controlling terminal, sampled on every call.
pub fn terminal_width() -> usize {
    match crossterm::terminal::size() {
        Ok((cols, _)) if cols > 0 => cols as usize,
        Ok(_) => DEFAULT_TERMINAL_WIDTH,
        Err(err) => {
            tracing::debug!("terminal width query failed, assuming {DEFAULT_TERMINAL_WIDTH}: {err}");
            DEFAULT_TERMINAL_WIDTH
        }
    }
}

pub fn clear_screen<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    out.flush()
}
