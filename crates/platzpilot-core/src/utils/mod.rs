//! Utility functions for opening-hours display and open-now checks.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{current_day_hours, format_opening_hours, hours_for_day, is_open_at, is_open_now};
