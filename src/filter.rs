use crate::models::{AttendanceRecord, FilterOptions};

/// Returns the records matching every active option. An unset
/// `show_scanned_only` behaves as `false`.
pub fn filter(records: &[AttendanceRecord], options: &FilterOptions) -> Vec<AttendanceRecord> {
    records
        .iter()
        .filter(|record| matches(record, options))
        .cloned()
        .collect()
}

pub fn matches(record: &AttendanceRecord, options: &FilterOptions) -> bool {
    if let Some(branch) = options.branch.as_deref() {
        if record.subtitle != branch {
            return false;
        }
    }

    if let Some(session) = options.session.as_deref() {
        if !record.attended_session(session) {
            return false;
        }
    }

    if let Some(day) = options.day {
        if !record.has_day(day) {
            return false;
        }
    }

    if options.show_scanned_only == Some(true) && record.scanned.is_empty() {
        return false;
    }

    true
}

/// Keeps records whose leading extras tag is set, the upstream "reported" gate.
pub fn reported_only(records: &[AttendanceRecord]) -> Vec<AttendanceRecord> {
    records
        .iter()
        .filter(|record| record.extras.first().map(|e| e.value).unwrap_or(false))
        .cloned()
        .collect()
}
