use anyhow::{Context, Result};
use devshell::app::Session;
use devshell::config::Config;
use devshell::logging;
use signal_hook::consts::SIGINT;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    logging::init()?;
    logging::emit_config_snapshot(&config);
    tracing::info!(
        shell = %config.shell_name,
        cwd = %config.working_dir.display(),
        "starting session"
    );

    // Ctrl-C while a command runs reaches the child; the shell only notes it.
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&interrupted))
        .context("failed to install SIGINT handler")?;

    let mut session = Session::new(config).with_interrupt_flag(interrupted);
    session.run()
}
