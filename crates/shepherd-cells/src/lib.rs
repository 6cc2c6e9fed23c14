//! # Shepherd Cells
//!
//! Owns the cell lifecycle: membership management, attendance recording,
//! rolling-window metrics, and multiplication (splitting a grown cell into
//! a child cell with member reassignment).

pub mod engine;
pub mod metrics;

pub use engine::{
    AttendanceInput, AttendanceQuery, CellEngine, CellReport, CellUpdate, CreateCell,
    MultiplyInput,
};
pub use metrics::CellMetrics;
