//! Derived statistics over a library snapshot.
//!
//! Pure read-side computations: nothing here performs I/O, caches, or
//! mutates state. All functions take the snapshot (or a record) they
//! operate on; callers obtain it from the synchronizer.

use crate::models::{Library, LibraryCategory, LibraryData};

/// Aggregate seat statistics for a set of libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStats {
    pub library_count: usize,
    pub total_seats: u64,
    pub total_free_seats: u64,
    /// Occupied share in percent, rounded. 0 when there are no seats at
    /// all; may leave [0, 100] for over-capacity inputs.
    pub occupancy_rate: i32,
}

/// Record counts per category. `All` comes first and equals the total
/// across every concrete category.
pub fn category_counts(data: &LibraryData) -> Vec<(LibraryCategory, usize)> {
    let mut counts = Vec::with_capacity(LibraryCategory::CONCRETE.len() + 1);
    counts.push((LibraryCategory::All, data.total_len()));
    for category in LibraryCategory::CONCRETE {
        counts.push((category, data.category_slice(category).len()));
    }
    counts
}

/// Seat statistics over a category's libraries (or any other selection).
pub fn category_stats(libraries: &[Library]) -> CategoryStats {
    let total_seats: u64 = libraries
        .iter()
        .map(|l| u64::from(l.available_seats))
        .sum();
    let total_free_seats: u64 = libraries
        .iter()
        .map(|l| u64::from(l.free_seats_currently))
        .sum();

    CategoryStats {
        library_count: libraries.len(),
        total_seats,
        total_free_seats,
        occupancy_rate: occupancy(total_seats as i64, total_free_seats as i64),
    }
}

/// How full a single library is, in rounded percent.
///
/// 0 when the library reports no seats at all. The server may report more
/// free seats than capacity; the result then goes negative rather than
/// being clamped.
pub fn occupancy_percentage(library: &Library) -> i32 {
    occupancy(
        i64::from(library.available_seats),
        i64::from(library.free_seats_currently),
    )
}

fn occupancy(seats: i64, free: i64) -> i32 {
    if seats <= 0 {
        return 0;
    }
    (((seats - free) as f64 / seats as f64) * 100.0).round() as i32
}
