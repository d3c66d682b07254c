use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AttendanceRecord, AttendanceStats, ScannedCounts};

pub fn aggregate(records: &[AttendanceRecord]) -> AttendanceStats {
    let mut stats = AttendanceStats {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        let branch = record.subtitle.trim();
        if !branch.is_empty() {
            *stats.by_branch.entry(branch.to_string()).or_insert(0) += 1;
        }

        for (session, days) in &record.scanned {
            *stats.by_session.entry(session.clone()).or_insert(0) += days.len();
            let per_day = stats
                .session_attendance
                .entry(session.clone())
                .or_default();

            for day in days {
                *stats.by_day.entry(*day).or_insert(0) += 1;
                *per_day.entry(*day).or_insert(0) += 1;
            }
        }
    }

    stats
}

pub fn branches(records: &[AttendanceRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.subtitle.trim())
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn sessions(records: &[AttendanceRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|record| record.scanned.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn days(records: &[AttendanceRecord]) -> Vec<u32> {
    records
        .iter()
        .flat_map(|record| record.scanned_days())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Splits records by whether any session was ever recorded for them.
pub fn scanned_counts(records: &[AttendanceRecord]) -> ScannedCounts {
    let scanned = records
        .iter()
        .filter(|record| !record.scanned.is_empty())
        .count();

    ScannedCounts {
        scanned,
        unscanned: records.len() - scanned,
    }
}

pub fn total_attendance_by_session(records: &[AttendanceRecord]) -> BTreeMap<String, usize> {
    let mut totals = BTreeMap::new();
    for record in records {
        for (session, days) in &record.scanned {
            *totals.entry(session.clone()).or_insert(0) += days.len();
        }
    }
    totals
}

pub fn most_active_session(stats: &AttendanceStats) -> Option<(&str, usize)> {
    let mut best: Option<(&str, usize)> = None;
    for (session, count) in &stats.by_session {
        if *count > best.map(|(_, c)| c).unwrap_or(0) {
            best = Some((session.as_str(), *count));
        }
    }
    best
}

pub fn session_label(session: &str) -> String {
    match session {
        "Morning" | "Noon" | "Afternoon" => format!("{session} Session"),
        other => other.to_string(),
    }
}
