use std::collections::BTreeMap;

use crate::aggregate;
use crate::models::{AttendanceRecord, ProgressivePoint, RetentionAnalytics, RetentionEntry};

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn calculate_retention(records: &[AttendanceRecord]) -> RetentionAnalytics {
    let registered = records.len();
    let attended = records.iter().filter(|r| r.attended_any()).count();
    let attendance_rate = percentage(attended, registered);
    let absentee_rate = if registered == 0 {
        0.0
    } else {
        100.0 - attendance_rate
    };

    let entry = |count: usize| RetentionEntry {
        registered,
        attended: count,
        retention_rate: percentage(count, registered),
    };

    let retention_by_session: BTreeMap<String, RetentionEntry> = aggregate::sessions(records)
        .into_iter()
        .map(|session| {
            let count = records
                .iter()
                .filter(|r| r.attended_session(&session))
                .count();
            (session, entry(count))
        })
        .collect();

    let days = aggregate::days(records);
    let retention_by_day: BTreeMap<u32, RetentionEntry> = days
        .iter()
        .map(|day| {
            let count = records.iter().filter(|r| r.has_day(*day)).count();
            (*day, entry(count))
        })
        .collect();

    // Having any day <= D is the same as the earliest day being <= D.
    let first_days: Vec<u32> = records.iter().filter_map(|r| r.first_day()).collect();
    let progressive_retention = days
        .iter()
        .map(|day| {
            let cumulative = first_days.iter().filter(|first| **first <= *day).count();
            ProgressivePoint {
                day: *day,
                cumulative_attended: cumulative,
                cumulative_retention: percentage(cumulative, registered),
            }
        })
        .collect();

    RetentionAnalytics {
        total_registered: registered,
        total_attended: attended,
        total_absent: registered - attended,
        attendance_rate,
        absentee_rate,
        retention_by_session,
        retention_by_day,
        progressive_retention,
    }
}

impl RetentionAnalytics {
    pub fn peak_retention_day(&self) -> Option<&ProgressivePoint> {
        let mut peak: Option<&ProgressivePoint> = None;
        for point in &self.progressive_retention {
            match peak {
                Some(best) if point.cumulative_retention <= best.cumulative_retention => {}
                _ => peak = Some(point),
            }
        }
        peak
    }

    pub fn best_session(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (session, entry) in &self.retention_by_session {
            if entry.retention_rate > best.map(|(_, rate)| rate).unwrap_or(-1.0) {
                best = Some((session.as_str(), entry.retention_rate));
            }
        }
        best
    }
}
