mod cache;
mod passthrough;

pub use cache::BoundedCache;
pub use passthrough::{CommandOutcome, TerminalPassthrough};
