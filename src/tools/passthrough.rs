use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use super::cache::BoundedCache;
use crate::config::Config;
use crate::state::HistoryStore;
use crate::ui::Prompt;
use crate::util::home_dir;

const SHELL_OPERATORS: [char; 8] = ['&', ';', '|', '>', '<', '`', '$', '('];
const READ_CHUNK: usize = 4096;
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Result of one `execute_command` call. `status` is `None` for a directory
/// change handled without a subprocess.
#[derive(Debug)]
pub struct CommandOutcome {
    pub status: Option<ExitStatus>,
    pub output: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.status.map_or(true, |status| status.success())
    }
}

/// Runs shell commands on behalf of the editor while keeping a logical
/// working directory that outlives each spawned subprocess.
#[derive(Debug)]
pub struct TerminalPassthrough {
    shell_name: String,
    shell_program: String,
    current_dir: PathBuf,
    display_whole_path: bool,
    command_history: HistoryStore,
    input_cache: BoundedCache<String>,
    output_cache: BoundedCache<String>,
}

impl TerminalPassthrough {
    pub fn new(working_dir: PathBuf, cache_capacity: usize) -> Self {
        let current_dir = normalize_path(&working_dir);
        Self {
            shell_name: "devsh".to_string(),
            shell_program: "sh".to_string(),
            current_dir,
            display_whole_path: false,
            command_history: HistoryStore::new(),
            input_cache: BoundedCache::new(cache_capacity),
            output_cache: BoundedCache::new(cache_capacity),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut passthrough = Self::new(config.working_dir.clone(), config.cache_capacity);
        passthrough.shell_name = config.shell_name.clone();
        passthrough.shell_program = config.shell_program.clone();
        passthrough.display_whole_path = config.display_full_path;
        passthrough
    }

    pub fn with_shell_program(mut self, program: impl Into<String>) -> Self {
        self.shell_program = program.into();
        self
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn is_display_whole_path(&self) -> bool {
        self.display_whole_path
    }

    pub fn set_display_whole_path(&mut self, display_whole_path: bool) {
        self.display_whole_path = display_whole_path;
    }

    pub fn toggle_display_whole_path(&mut self) {
        self.display_whole_path = !self.display_whole_path;
    }

    /// The path as shown in the prompt: whole, or just the last segment.
    pub fn display_location(&self) -> String {
        if self.display_whole_path || is_root_path(&self.current_dir) {
            return self.current_dir.display().to_string();
        }
        self.current_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.current_dir.display().to_string())
    }

    pub fn prompt(&self) -> Prompt {
        Prompt::shell(&self.shell_name, &self.display_location())
    }

    pub fn command_history(&self) -> &HistoryStore {
        &self.command_history
    }

    pub fn previous_command(&mut self) -> String {
        self.command_history.previous().to_string()
    }

    pub fn next_command(&mut self) -> String {
        self.command_history.next().to_string()
    }

    pub fn cached_inputs(&self) -> Vec<String> {
        self.input_cache.to_vec()
    }

    pub fn cached_outputs(&self) -> Vec<String> {
        self.output_cache.to_vec()
    }

    pub fn most_recent_user_input(&self) -> Option<&str> {
        self.input_cache.latest().map(String::as_str)
    }

    pub fn most_recent_output(&self) -> Option<&str> {
        self.output_cache.latest().map(String::as_str)
    }

    pub fn clear_cache(&mut self) {
        self.input_cache.clear();
        self.output_cache.clear();
    }

    /// Entry names in the logical working directory, sorted.
    pub fn files_at_current_path(&self) -> Result<Vec<String>> {
        let mut names = fs::read_dir(&self.current_dir)
            .with_context(|| format!("Failed to read directory {}", self.current_dir.display()))?
            .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| {
                format!("Failed to list entries in {}", self.current_dir.display())
            })?;
        names.sort();
        Ok(names)
    }

    pub fn full_path_of(&self, file: &str) -> Option<PathBuf> {
        let path = normalize_path(&self.current_dir.join(file));
        path.exists().then_some(path)
    }

    /// Runs `command` to completion. Directory changes are applied to the
    /// logical working directory without a subprocess; everything else runs
    /// under `<shell> -c` with its stdout streamed to `out` and its stderr to
    /// the process stderr, both captured for the output cache.
    pub fn execute_command<W: Write>(
        &mut self,
        command: &str,
        out: &mut W,
    ) -> Result<CommandOutcome> {
        let command = command.trim();
        self.command_history.push(command);

        if let Some(target) = parse_change_dir(command) {
            return self.change_dir(command, target);
        }

        let outcome = self.run_subprocess(command, out)?;
        self.input_cache.push(command.to_string());
        self.output_cache.push(outcome.output.clone());
        Ok(outcome)
    }

    fn change_dir(&mut self, command: &str, target: &str) -> Result<CommandOutcome> {
        self.input_cache.push(command.to_string());
        match self.resolve_dir(target) {
            Ok(dir) => {
                tracing::debug!(from = %self.current_dir.display(), to = %dir.display(), "cd");
                self.current_dir = dir;
                self.output_cache.push(String::new());
                Ok(CommandOutcome {
                    status: None,
                    output: String::new(),
                })
            }
            Err(err) => {
                self.output_cache.push(format!("{err:#}"));
                Err(err)
            }
        }
    }

    fn resolve_dir(&self, target: &str) -> Result<PathBuf> {
        let target = strip_matching_quotes(target);
        let requested = match target {
            "" | "~" => home_dir().context("cd: HOME is not set")?,
            _ => match target.strip_prefix("~/") {
                Some(rest) => home_dir().context("cd: HOME is not set")?.join(rest),
                None => self.current_dir.join(target),
            },
        };

        let normalized = normalize_path(&requested);
        if !normalized.is_dir() {
            bail!("cd: no such directory: {target}");
        }
        Ok(normalized)
    }

    fn run_subprocess<W: Write>(&self, command: &str, out: &mut W) -> Result<CommandOutcome> {
        tracing::info!(command, cwd = %self.current_dir.display(), "spawning");
        let mut child = Command::new(&self.shell_program)
            .arg("-c")
            .arg(command)
            .current_dir(&self.current_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to launch `{command}`"))?;

        let stdout = child.stdout.take().context("child stdout was not captured")?;
        let stderr = child.stderr.take().context("child stderr was not captured")?;

        let (tx, rx) = mpsc::channel();
        spawn_pipe_reader(stdout, Stream::Stdout, tx.clone())?;
        spawn_pipe_reader(stderr, Stream::Stderr, tx)?;

        let mut captured = Captured::default();
        let status = loop {
            match rx.recv_timeout(EXIT_POLL_INTERVAL) {
                Ok(chunk) => captured.forward(chunk, out)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    break child
                        .wait()
                        .with_context(|| format!("Failed to wait for `{command}`"))?
                }
            }
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("Failed to wait for `{command}`"))?
            {
                break status;
            }
        };

        // Background jobs may keep the pipes open after the shell exits; only
        // take what is already buffered.
        while let Ok(chunk) = rx.recv_timeout(DRAIN_GRACE) {
            captured.forward(chunk, out)?;
        }
        tracing::info!(command, %status, "finished");

        Ok(CommandOutcome {
            status: Some(status),
            output: captured.into_output(),
        })
    }
}

type Chunk = (Stream, Vec<u8>);

#[derive(Clone, Copy, Debug)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Captured {
    /// Streams one chunk to its destination and keeps a copy.
    fn forward<W: Write>(&mut self, chunk: Chunk, out: &mut W) -> Result<()> {
        let (stream, bytes) = chunk;
        match stream {
            Stream::Stdout => {
                out.write_all(&bytes)
                    .and_then(|()| out.flush())
                    .context("Failed to stream command output")?;
                self.stdout.extend_from_slice(&bytes);
            }
            Stream::Stderr => {
                let mut stderr = io::stderr();
                if let Err(err) = stderr.write_all(&bytes).and_then(|()| stderr.flush()) {
                    tracing::debug!("failed to forward command stderr: {err}");
                }
                self.stderr.extend_from_slice(&bytes);
            }
        }
        Ok(())
    }

    fn into_output(self) -> String {
        let mut output = String::from_utf8_lossy(&self.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&self.stderr));
        output
    }
}

/// Reads `pipe` on its own thread until EOF, or until nobody is listening.
/// The thread is detached so a pipe held open by a background job never
/// blocks the caller.
fn spawn_pipe_reader<R>(mut pipe: R, stream: Stream, tx: Sender<Chunk>) -> Result<()>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("devsh-{stream:?}").to_lowercase())
        .spawn(move || {
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                let read = match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(read) => read,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::debug!("command {stream:?} pipe read failed: {err}");
                        break;
                    }
                };
                if tx.send((stream, chunk[..read].to_vec())).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start pipe reader thread")?;
    Ok(())
}

/// Returns the target of a plain `cd` command. Anything chained with shell
/// operators is left to the subprocess.
fn parse_change_dir(command: &str) -> Option<&str> {
    let rest = command.strip_prefix("cd")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    if rest.contains(SHELL_OPERATORS) {
        return None;
    }
    let target = rest.trim();
    let quoted = strip_matching_quotes(target) != target;
    if !quoted && target.split_whitespace().nth(1).is_some() {
        return None;
    }
    Some(target)
}

fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn is_root_path(path: &Path) -> bool {
    path.parent().is_none()
}

/// Lexical normalization: `.` dropped, `..` pops a segment and stops at the
/// root.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(seg) => out.push(seg),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir => out.push(component.as_os_str()),
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
        }
    }
    out
}
