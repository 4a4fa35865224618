pub mod buffer;
pub mod editor;
pub mod input_metrics;
pub mod keys;
pub mod prompt;
pub mod render;

pub use buffer::{CursorPosition, DrawnState, EditBuffer};
pub use editor::{
    LineEditor, LiveWidth, RawModeSource, ReadOutcome, TerminalRawMode, WidthSource,
};
pub use prompt::Prompt;
