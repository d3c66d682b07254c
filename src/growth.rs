use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{AttendanceRecord, DailyGrowth, GrowthMetrics, SessionGrowth};

pub fn calculate_growth(records: &[AttendanceRecord]) -> GrowthMetrics {
    GrowthMetrics {
        daily_growth: daily_growth(records),
        session_growth: session_growth(records),
    }
}

fn daily_growth(records: &[AttendanceRecord]) -> Vec<DailyGrowth> {
    let mut attendees_by_day: BTreeMap<u32, HashSet<&str>> = BTreeMap::new();
    for record in records {
        for day in record.scanned_days() {
            attendees_by_day
                .entry(day)
                .or_default()
                .insert(record.code.as_str());
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut previous_size: Option<usize> = None;
    let mut growth = Vec::with_capacity(attendees_by_day.len());

    for (day, attendees) in &attendees_by_day {
        let new_attendees = attendees.iter().filter(|code| !seen.contains(*code)).count();
        seen.extend(attendees.iter().copied());

        let growth_rate = match previous_size {
            Some(size) => new_attendees as f64 / size.max(1) as f64 * 100.0,
            None => 0.0,
        };

        growth.push(DailyGrowth {
            day: *day,
            new_attendees,
            cumulative_attendees: seen.len(),
            growth_rate,
        });
        previous_size = Some(attendees.len());
    }

    growth
}

fn session_growth(records: &[AttendanceRecord]) -> BTreeMap<String, SessionGrowth> {
    // Days are kept in first-encountered order so peak ties resolve to the earliest seen.
    let mut per_session: BTreeMap<&str, (Vec<u32>, HashMap<u32, usize>)> = BTreeMap::new();
    for record in records {
        for (session, days) in &record.scanned {
            let (order, counts) = per_session.entry(session.as_str()).or_default();
            for day in days {
                let count = counts.entry(*day).or_insert(0);
                if *count == 0 {
                    order.push(*day);
                }
                *count += 1;
            }
        }
    }

    per_session
        .into_iter()
        .map(|(session, (order, counts))| {
            let total_attendees: usize = counts.values().sum();
            let average_per_day = if order.is_empty() {
                0.0
            } else {
                total_attendees as f64 / order.len() as f64
            };

            let mut peak_day = 0;
            let mut peak_attendance = 0;
            for day in &order {
                let count = counts[day];
                if count > peak_attendance {
                    peak_day = *day;
                    peak_attendance = count;
                }
            }

            (
                session.to_string(),
                SessionGrowth {
                    total_attendees,
                    average_per_day,
                    peak_day,
                    peak_attendance,
                },
            )
        })
        .collect()
}

impl GrowthMetrics {
    pub fn average_daily_growth(&self) -> f64 {
        if self.daily_growth.is_empty() {
            return 0.0;
        }
        let total: usize = self.daily_growth.iter().map(|d| d.new_attendees).sum();
        total as f64 / self.daily_growth.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    fn sample() -> Vec<AttendanceRecord> {
        vec![
            record("A", "X", &[("Morning", &[1, 2]), ("Noon", &[2])]),
            record("B", "X", &[("Morning", &[2, 3])]),
            record("C", "Y", &[("Noon", &[3])]),
            record("D", "Y", &[]),
        ]
    }

    #[test]
    fn daily_growth_tracks_first_seen_codes() {
        let growth = calculate_growth(&sample());
        let rows: Vec<(u32, usize, usize)> = growth
            .daily_growth
            .iter()
            .map(|d| (d.day, d.new_attendees, d.cumulative_attendees))
            .collect();

        assert_eq!(rows, vec![(1, 1, 1), (2, 1, 2), (3, 1, 3)]);
        assert_eq!(growth.daily_growth[0].growth_rate, 0.0);
        // Day 1 had one distinct attendee, day 2 had two.
        assert_eq!(growth.daily_growth[1].growth_rate, 100.0);
        assert_eq!(growth.daily_growth[2].growth_rate, 50.0);
        assert_eq!(growth.average_daily_growth(), 1.0);
    }

    #[test]
    fn cumulative_attendees_never_exceed_distinct_codes() {
        let growth = calculate_growth(&sample());
        assert!(growth
            .daily_growth
            .windows(2)
            .all(|w| w[0].cumulative_attendees <= w[1].cumulative_attendees));
        assert!(growth.daily_growth.last().unwrap().cumulative_attendees <= 4);
    }

    #[test]
    fn same_code_across_sessions_counts_once_per_day() {
        let records = vec![record("A", "X", &[("Morning", &[1]), ("Noon", &[1])])];
        let growth = calculate_growth(&records);

        assert_eq!(growth.daily_growth.len(), 1);
        assert_eq!(growth.daily_growth[0].new_attendees, 1);
    }

    #[test]
    fn session_growth_summarises_per_day_counts() {
        let growth = calculate_growth(&sample());
        let morning = &growth.session_growth["Morning"];

        assert_eq!(morning.total_attendees, 4);
        assert_eq!(morning.average_per_day, 4.0 / 3.0);
        assert_eq!(morning.peak_day, 2);
        assert_eq!(morning.peak_attendance, 2);
    }

    #[test]
    fn peak_ties_go_to_first_encountered_day() {
        let records = vec![
            record("A", "X", &[("Noon", &[3])]),
            record("B", "X", &[("Noon", &[2])]),
        ];
        let growth = calculate_growth(&records);

        assert_eq!(growth.session_growth["Noon"].peak_day, 3);
        assert_eq!(growth.session_growth["Noon"].peak_attendance, 1);
    }

    #[test]
    fn session_without_days_is_zeroed() {
        let records = vec![record("A", "X", &[("Afternoon", &[])])];
        let growth = calculate_growth(&records);

        assert_eq!(growth.session_growth["Afternoon"], SessionGrowth::default());
        assert!(growth.daily_growth.is_empty());
        assert_eq!(growth.average_daily_growth(), 0.0);
    }
}
