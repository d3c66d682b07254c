use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extra {
    pub key: String,
    pub value: bool,
    #[serde(default)]
    pub icon: i64,
}

/// One registrant and every scan recorded against them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extras: Vec<Extra>,
    /// Session name to the days the registrant was scanned for it.
    #[serde(default, deserialize_with = "lenient_scanned")]
    pub scanned: BTreeMap<String, Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl AttendanceRecord {
    /// Iterates every scanned day across all sessions, duplicates included.
    pub fn scanned_days(&self) -> impl Iterator<Item = u32> + '_ {
        self.scanned.values().flatten().copied()
    }

    pub fn has_day(&self, day: u32) -> bool {
        self.scanned_days().any(|d| d == day)
    }

    pub fn attended_session(&self, session: &str) -> bool {
        self.scanned
            .get(session)
            .map(|days| !days.is_empty())
            .unwrap_or(false)
    }

    pub fn attended_any(&self) -> bool {
        self.scanned.values().any(|days| !days.is_empty())
    }

    pub fn first_day(&self) -> Option<u32> {
        self.scanned_days().min()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Non-array session values and non-positive or non-integer days are dropped.
fn lenient_scanned<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<u32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Object(sessions)) = raw else {
        return Ok(BTreeMap::new());
    };

    let mut scanned = BTreeMap::new();
    for (session, value) in sessions {
        let serde_json::Value::Array(items) = value else {
            continue;
        };
        let days = items
            .iter()
            .filter_map(|item| item.as_u64())
            .filter(|day| *day > 0)
            .filter_map(|day| u32::try_from(day).ok())
            .collect();
        scanned.insert(session, days);
    }

    Ok(scanned)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total: usize,
    pub by_branch: BTreeMap<String, usize>,
    /// Scan events per session, not distinct people.
    pub by_session: BTreeMap<String, usize>,
    pub by_day: BTreeMap<u32, usize>,
    pub session_attendance: BTreeMap<String, BTreeMap<u32, usize>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_scanned_only: Option<bool>,
}

impl FilterOptions {
    pub fn is_empty(&self) -> bool {
        self.branch.is_none()
            && self.session.is_none()
            && self.day.is_none()
            && self.show_scanned_only != Some(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedCounts {
    pub scanned: usize,
    pub unscanned: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionEntry {
    pub registered: usize,
    pub attended: usize,
    pub retention_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressivePoint {
    pub day: u32,
    pub cumulative_attended: usize,
    pub cumulative_retention: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionAnalytics {
    pub total_registered: usize,
    pub total_attended: usize,
    pub total_absent: usize,
    pub attendance_rate: f64,
    pub absentee_rate: f64,
    pub retention_by_session: BTreeMap<String, RetentionEntry>,
    pub retention_by_day: BTreeMap<u32, RetentionEntry>,
    pub progressive_retention: Vec<ProgressivePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGrowth {
    pub day: u32,
    pub new_attendees: usize,
    pub cumulative_attendees: usize,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrowth {
    pub total_attendees: usize,
    pub average_per_day: f64,
    pub peak_day: u32,
    pub peak_attendance: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthMetrics {
    pub daily_growth: Vec<DailyGrowth>,
    pub session_growth: BTreeMap<String, SessionGrowth>,
}
