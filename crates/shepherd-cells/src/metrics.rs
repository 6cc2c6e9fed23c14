//! Rolling-window attendance metrics.
//!
//! The window is the most recent `max(4, weeks)` records by date. The
//! growth indicator compares the newest `weeks` records against the
//! `weeks` records before them inside that window.

use serde::Serialize;

use shepherd_core::types::Cell;

/// A cell that sustains this average attendance is ready to multiply.
pub const MULTIPLY_THRESHOLD: i64 = 30;

/// Derived attendance metrics for one cell.
#[derive(Debug, Clone, Serialize)]
pub struct CellMetrics {
    pub total_members: usize,
    /// Mean of present-counts across the recent window, rounded; 0 with no
    /// records.
    pub avg_attendance: i64,
    /// Percent change between the two sub-windows. 100 when the previous
    /// sub-window is empty/zero but the latest is not; 0 when both are zero.
    pub growth_percent: i64,
    pub should_multiply: bool,
}

pub fn compute(cell: &Cell, weeks: usize) -> CellMetrics {
    let mut records: Vec<_> = cell.attendance_records.iter().collect();
    records.sort_by(|a, b| b.date.cmp(&a.date));

    let window: Vec<usize> = records
        .iter()
        .take(weeks.max(4))
        .map(|r| r.present.len())
        .collect();

    let avg_attendance = mean(&window).round() as i64;

    let last = &window[..weeks.min(window.len())];
    let prev = if window.len() > weeks {
        &window[weeks..(2 * weeks).min(window.len())]
    } else {
        &[]
    };
    let last_avg = mean(last);
    let prev_avg = mean(prev);
    let growth_percent = if prev_avg > 0.0 {
        ((last_avg - prev_avg) / prev_avg * 100.0).round() as i64
    } else if last_avg > 0.0 {
        100
    } else {
        0
    };

    CellMetrics {
        total_members: cell.members.len(),
        avg_attendance,
        growth_percent,
        should_multiply: avg_attendance >= MULTIPLY_THRESHOLD,
    }
}

fn mean(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    counts.iter().sum::<usize>() as f64 / counts.len() as f64
}
