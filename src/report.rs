use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate;
use crate::growth::calculate_growth;
use crate::models::{
    AttendanceRecord, AttendanceStats, FilterOptions, GrowthMetrics, RetentionAnalytics,
};
use crate::retention::calculate_retention;

/// One decimal place, the precision the dashboard shows.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn build_report(
    label: Option<&str>,
    generated_at: DateTime<Utc>,
    options: &FilterOptions,
    records: &[AttendanceRecord],
) -> String {
    let stats = aggregate::aggregate(records);
    let retention = calculate_retention(records);
    let growth = calculate_growth(records);
    let scanned = aggregate::scanned_counts(records);

    let mut output = String::new();
    let scope = label.unwrap_or("all branches");

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        scope,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    if !options.is_empty() {
        let _ = writeln!(output, "Filters: {}", describe_filters(options));
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Registered: {}", stats.total);
    let _ = writeln!(
        output,
        "- Scanned records: {} ({} unscanned)",
        scanned.scanned, scanned.unscanned
    );
    let _ = writeln!(output, "- Branches: {}", stats.by_branch.len());
    match aggregate::most_active_session(&stats) {
        Some((session, count)) => {
            let _ = writeln!(
                output,
                "- Most active period: {} ({} scans)",
                aggregate::session_label(session),
                count
            );
        }
        None => {
            let _ = writeln!(output, "- Most active period: none recorded");
        }
    }

    write_branches(&mut output, &stats);
    write_sessions(&mut output, &stats);
    write_retention(&mut output, &retention);
    write_growth(&mut output, &growth);

    output
}

pub fn describe_filters(options: &FilterOptions) -> String {
    let mut parts = Vec::new();
    if let Some(branch) = &options.branch {
        parts.push(format!("branch {branch}"));
    }
    if let Some(session) = &options.session {
        parts.push(format!("session {}", aggregate::session_label(session)));
    }
    if let Some(day) = options.day {
        parts.push(format!("day {day}"));
    }
    if options.show_scanned_only == Some(true) {
        parts.push("scanned only".to_string());
    }
    parts.join(", ")
}

fn write_branches(output: &mut String, stats: &AttendanceStats) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Branches");

    if stats.by_branch.is_empty() {
        let _ = writeln!(output, "No branch information recorded.");
        return;
    }

    let branch_total: usize = stats.by_branch.values().sum();
    let mut branches: Vec<(&String, &usize)> = stats.by_branch.iter().collect();
    branches.sort_by(|a, b| b.1.cmp(a.1));
    for (branch, count) in branches {
        let share = *count as f64 / branch_total as f64 * 100.0;
        let _ = writeln!(output, "- {}: {} ({:.1}%)", branch, count, share);
    }
}

fn write_sessions(output: &mut String, stats: &AttendanceStats) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sessions");

    if stats.by_session.is_empty() {
        let _ = writeln!(output, "No scans recorded.");
        return;
    }

    for (session, count) in &stats.by_session {
        let _ = write!(output, "- {}: {} scans", aggregate::session_label(session), count);
        if let Some(per_day) = stats.session_attendance.get(session) {
            let days: Vec<String> = per_day
                .iter()
                .map(|(day, count)| format!("day {day}: {count}"))
                .collect();
            if !days.is_empty() {
                let _ = write!(output, " ({})", days.join(", "));
            }
        }
        let _ = writeln!(output);
    }
}

fn write_retention(output: &mut String, retention: &RetentionAnalytics) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Retention");
    let _ = writeln!(
        output,
        "- Attendance rate: {}% ({} of {})",
        round1(retention.attendance_rate),
        retention.total_attended,
        retention.total_registered
    );
    let _ = writeln!(
        output,
        "- Absentee rate: {}% ({} absent)",
        round1(retention.absentee_rate),
        retention.total_absent
    );

    if let Some(point) = retention.peak_retention_day() {
        let _ = writeln!(
            output,
            "- Peak retention: day {} at {}%",
            point.day,
            round1(point.cumulative_retention)
        );
    }
    if let Some((session, rate)) = retention.best_session() {
        let _ = writeln!(
            output,
            "- Best performing session: {} at {}%",
            aggregate::session_label(session),
            round1(rate)
        );
    }

    if !retention.progressive_retention.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "| Day | Attended | Retention | Cumulative | Cumulative % |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for point in &retention.progressive_retention {
            let (attended, rate) = retention
                .retention_by_day
                .get(&point.day)
                .map(|entry| (entry.attended, entry.retention_rate))
                .unwrap_or((0, 0.0));
            let _ = writeln!(
                output,
                "| {} | {} | {}% | {} | {}% |",
                point.day,
                attended,
                round1(rate),
                point.cumulative_attended,
                round1(point.cumulative_retention)
            );
        }
    }
}

fn write_growth(output: &mut String, growth: &GrowthMetrics) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Growth");

    if growth.daily_growth.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this window.");
        return;
    }

    let _ = writeln!(
        output,
        "- Average daily growth: {} new attendees/day",
        round1(growth.average_daily_growth())
    );
    for day in &growth.daily_growth {
        let _ = writeln!(
            output,
            "- Day {}: {} new, {} cumulative (growth {}%)",
            day.day,
            day.new_attendees,
            day.cumulative_attendees,
            round1(day.growth_rate)
        );
    }

    for (session, summary) in &growth.session_growth {
        let _ = writeln!(
            output,
            "- {}: {} scans, {:.1} per day, peak day {} with {}",
            aggregate::session_label(session),
            summary.total_attendees,
            summary.average_per_day,
            summary.peak_day,
            summary.peak_attendance
        );
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total_attendance: usize,
    pub report_date: DateTime<Utc>,
    pub filters: FilterOptions,
}

/// The JSON document produced by `export`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport<'a> {
    pub summary: ExportSummary,
    pub statistics: AttendanceStats,
    pub attendance_records: &'a [AttendanceRecord],
}

pub fn build_export<'a>(
    report_date: DateTime<Utc>,
    options: &FilterOptions,
    records: &'a [AttendanceRecord],
) -> ExportReport<'a> {
    let statistics = aggregate::aggregate(records);
    ExportReport {
        summary: ExportSummary {
            total_attendance: statistics.total,
            report_date,
            filters: options.clone(),
        },
        statistics,
        attendance_records: records,
    }
}

pub fn export_file_name(report_date: DateTime<Utc>) -> String {
    format!("attendance-report-{}.json", report_date.format("%Y-%m-%d"))
}

#[derive(Debug, Serialize)]
struct DayRow {
    day: u32,
    attended: usize,
    retention_rate: f64,
    cumulative_attended: usize,
    cumulative_retention: f64,
    new_attendees: usize,
    growth_rate: f64,
}

/// Writes one CSV row per scanned day combining retention and growth figures.
pub fn write_day_table_csv<W: std::io::Write>(
    writer: W,
    retention: &RetentionAnalytics,
    growth: &GrowthMetrics,
) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0usize;

    for point in &retention.progressive_retention {
        let (attended, retention_rate) = retention
            .retention_by_day
            .get(&point.day)
            .map(|entry| (entry.attended, entry.retention_rate))
            .unwrap_or((0, 0.0));
        let (new_attendees, growth_rate) = growth
            .daily_growth
            .iter()
            .find(|d| d.day == point.day)
            .map(|d| (d.new_attendees, d.growth_rate))
            .unwrap_or((0, 0.0));

        csv_writer.serialize(DayRow {
            day: point.day,
            attended,
            retention_rate: round1(retention_rate),
            cumulative_attended: point.cumulative_attended,
            cumulative_retention: round1(point.cumulative_retention),
            new_attendees,
            growth_rate: round1(growth_rate),
        })?;
        rows += 1;
    }

    csv_writer.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use chrono::TimeZone;

    fn sample() -> Vec<AttendanceRecord> {
        vec![
            record("A", "North", &[("Morning", &[1, 2])]),
            record("B", "South", &[("Noon", &[2])]),
            record("C", "North", &[]),
        ]
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 7, 9, 30, 0).unwrap()
    }

    #[test]
    fn report_includes_every_section() {
        let options = FilterOptions {
            branch: Some("North".to_string()),
            ..Default::default()
        };
        let report = build_report(Some("North"), generated_at(), &options, &sample());

        assert!(report.starts_with("# Attendance Report"));
        assert!(report.contains("Generated for North on 2025-07-07 09:30 UTC"));
        assert!(report.contains("Filters: branch North"));
        assert!(report.contains("- Registered: 3"));
        assert!(report.contains("- North: 2 (66.7%)"));
        assert!(report.contains("- Morning Session: 2 scans (day 1: 1, day 2: 1)"));
        assert!(report.contains("- Attendance rate: 66.7% (2 of 3)"));
        assert!(report.contains("| 2 | 2 | 66.7% | 2 | 66.7% |"));
        assert!(report.contains("- Day 2: 1 new, 2 cumulative (growth 100%)"));
    }

    #[test]
    fn empty_report_says_so() {
        let report = build_report(None, generated_at(), &FilterOptions::default(), &[]);

        assert!(report.contains("Generated for all branches"));
        assert!(!report.contains("Filters:"));
        assert!(report.contains("No branch information recorded."));
        assert!(report.contains("No scans recorded."));
        assert!(report.contains("No attendance recorded for this window."));
    }

    #[test]
    fn export_uses_camel_case_document() {
        let records = sample();
        let options = FilterOptions {
            show_scanned_only: Some(true),
            ..Default::default()
        };
        let export = build_export(generated_at(), &options, &records);
        let value = serde_json::to_value(&export).unwrap();

        assert_eq!(value["summary"]["totalAttendance"], 3);
        assert_eq!(value["summary"]["filters"]["showScannedOnly"], true);
        assert_eq!(value["statistics"]["bySession"]["Morning"], 2);
        assert_eq!(value["attendanceRecords"].as_array().map(Vec::len), Some(3));
        assert_eq!(
            export_file_name(generated_at()),
            "attendance-report-2025-07-07.json"
        );
    }

    #[test]
    fn csv_table_has_a_row_per_day() {
        let records = sample();
        let retention = calculate_retention(&records);
        let growth = calculate_growth(&records);
        let mut buffer = Vec::new();

        let rows = write_day_table_csv(&mut buffer, &retention, &growth).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(rows, 2);
        assert_eq!(
            lines[0],
            "day,attended,retention_rate,cumulative_attended,cumulative_retention,new_attendees,growth_rate"
        );
        assert_eq!(lines[1], "1,1,33.3,1,33.3,1,0.0");
        assert_eq!(lines[2], "2,2,66.7,2,66.7,1,100.0");
    }
}
