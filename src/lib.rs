//! Attendance analytics for orientation scan records.
//!
//! The analytics core (`aggregate`, `filter`, `retention`, `growth`) is a set
//! of pure functions over `&[AttendanceRecord]`. The remaining modules load
//! records, cache and stream snapshots, and render reports.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod filter;
pub mod growth;
pub mod live;
pub mod models;
pub mod report;
pub mod retention;
pub mod source;

pub use aggregate::aggregate;
pub use filter::filter;
pub use growth::calculate_growth;
pub use models::{
    AttendanceRecord, AttendanceStats, FilterOptions, GrowthMetrics, RetentionAnalytics,
};
pub use retention::calculate_retention;
