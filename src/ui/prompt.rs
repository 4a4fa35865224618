use crossterm::style::{style, Stylize};

use super::input_metrics::display_width;

/// Prompt text as printed (may carry ANSI styling) plus its visible width,
/// which is what the wrap arithmetic needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub styled: String,
    pub width: usize,
}

impl Prompt {
    pub fn plain(text: &str) -> Self {
        Self {
            styled: text.to_string(),
            width: display_width(text),
        }
    }

    /// `<name> <location> ` with the name in bold blue and the location in
    /// bold yellow.
    pub fn shell(name: &str, location: &str) -> Self {
        let styled = format!(
            "{} {} ",
            style(name).bold().blue(),
            style(location).bold().yellow()
        );
        Self {
            styled,
            width: display_width(name) + display_width(location) + 2,
        }
    }
}
