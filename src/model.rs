use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse a "YYYY-MM-DD" field. Unparseable values are treated as absent
/// rather than failing the whole operation.
pub fn parse_ymd(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Weekday as stored on the wire. The collections originate from a browser
/// app that persisted lowercase day names, so serde keeps that spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A fixed 90-minute occupancy unit. `start_time` is "HH:MM".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBlock {
    pub day: Day,
    pub start_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub course_id: String,
    #[serde(default)]
    pub professor_id: Option<String>,
    pub name: String,
    /// Legacy convenience fields; older rows carry days plus a single
    /// start/end range instead of explicit blocks.
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub schedule_blocks: Vec<ScheduleBlock>,
    /// "YYYY-MM-DD" bounds; absent bound means unbounded on that side.
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl Section {
    /// Ongoing iff today falls within [startDate, endDate]; an absent (or
    /// unparseable) bound is open on that side.
    pub fn is_ongoing(&self, today: NaiveDate) -> bool {
        let started = match self.start_date.as_deref().and_then(parse_ymd) {
            Some(start) => start <= today,
            None => true,
        };
        let not_ended = match self.end_date.as_deref().and_then(parse_ymd) {
            Some(end) => today <= end,
            None => true,
        };
        started && not_ended
    }

    /// Finished iff the end date has passed. Sections without an end date
    /// never finish.
    pub fn is_finished(&self, today: NaiveDate) -> bool {
        match self.end_date.as_deref().and_then(parse_ymd) {
            Some(end) => end < today,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Professor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub section_id: String,
    /// Denormalized from the section at enrollment time.
    pub course_id: String,
    pub enrolled_at: String,
}

/// Append-only global status log entry. Current status is the entry with
/// the latest `changed_at`; no entries means active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatusEvent {
    pub id: String,
    pub student_id: String,
    pub is_active: bool,
    pub changed_at: String,
}

/// Append-only per-section status log entry, same resolution rule scoped
/// to one (student, section) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionStatusEvent {
    pub id: String,
    pub student_id: String,
    pub section_id: String,
    pub is_active: bool,
    pub changed_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: String,
    pub present: bool,
}

/// One row per (section, date). Entries grow as students are marked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub section_id: String,
    /// "YYYY-MM-DD"
    pub date: String,
    #[serde(default)]
    pub records: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub student_id: String,
    pub amount: f64,
    pub date: String,
    #[serde(default)]
    pub concept: String,
}
