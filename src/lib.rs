pub mod app;
pub mod config;
pub mod history_log;
pub mod logging;
pub mod state;
pub mod terminal;
pub mod tools;
pub mod ui;
pub mod util;
