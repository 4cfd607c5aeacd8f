//! Widget state structs (rendering-agnostic)
//!
//! State-only structures for every display surface the protocol drives.
//! They hold data and report whether an update changed anything, but
//! contain no rendering logic; the TUI renders them with ratatui.

pub mod countdown;
pub mod indicator;
pub mod progress_bar;
pub mod text_window;

pub use countdown::CountdownState;
pub use indicator::IndicatorState;
pub use progress_bar::ProgressBarState;
pub use text_window::TextWindowState;
