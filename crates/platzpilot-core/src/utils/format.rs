use chrono::{Datelike, Local, Weekday};

use crate::models::Library;

/// Literal shown for a day with no opening interval
const CLOSED_LABEL: &str = "Closed";

/// Format one day's opening intervals for display.
///
/// An empty table renders as the `"Closed"` literal; otherwise each
/// interval becomes `"start-end"`, comma-separated in table order.
pub fn format_opening_hours(day: &[(String, String)]) -> String {
    if day.is_empty() {
        return CLOSED_LABEL.to_string();
    }
    day.iter()
        .map(|(open, close)| format!("{}-{}", open, close))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The display string for a library's hours on the given weekday.
pub fn hours_for_day(library: &Library, weekday: Weekday) -> String {
    format_opening_hours(library.opening_hours.for_weekday(weekday))
}

/// The display string for today's hours, by the local clock.
pub fn current_day_hours(library: &Library) -> String {
    hours_for_day(library, Local::now().weekday())
}

/// Whether the library is open at `time` (`"HH:MM"`) on `weekday`.
///
/// Bounds are inclusive; `"HH:MM"` strings compare correctly as text, so
/// no time parsing is needed.
pub fn is_open_at(library: &Library, weekday: Weekday, time: &str) -> bool {
    library
        .opening_hours
        .for_weekday(weekday)
        .iter()
        .any(|(open, close)| open.as_str() <= time && time <= close.as_str())
}

/// Whether the library is open right now, by the local clock.
pub fn is_open_now(library: &Library) -> bool {
    let now = Local::now();
    is_open_at(library, now.weekday(), &now.format("%H:%M").to_string())
}
