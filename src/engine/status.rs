use crate::model::{Enrollment, Section, SectionStatusEvent, StudentStatusEvent};
use chrono::{DateTime, NaiveDate};

/// Sort key for `changedAt` strings. Timestamps are written by the engine
/// as RFC 3339 UTC, but imported rows may carry anything; unparseable
/// values sort before every real timestamp instead of failing resolution.
fn changed_at_key(raw: &str) -> i64 {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.timestamp_millis())
        .unwrap_or(i64::MIN)
}

/// Latest-wins reducer over an append-only log. `>=` keeps the later array
/// entry when two events carry the same timestamp; that tie order is
/// load-bearing only in the sense that it must stay stable.
fn latest_is_active<'a, I>(events: I) -> Option<bool>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let mut best: Option<(i64, bool)> = None;
    for (changed_at, is_active) in events {
        let key = changed_at_key(changed_at);
        if best.map(|(k, _)| key >= k).unwrap_or(true) {
            best = Some((key, is_active));
        }
    }
    best.map(|(_, is_active)| is_active)
}

/// Global status: most recent event wins; no events means active. New
/// students start active until explicitly withdrawn.
pub fn student_active(history: &[StudentStatusEvent], student_id: &str) -> bool {
    latest_is_active(
        history
            .iter()
            .filter(|e| e.student_id == student_id)
            .map(|e| (e.changed_at.as_str(), e.is_active)),
    )
    .unwrap_or(true)
}

/// Per-section status, same resolution scoped to one (student, section).
pub fn section_student_active(
    history: &[SectionStatusEvent],
    student_id: &str,
    section_id: &str,
) -> bool {
    latest_is_active(
        history
            .iter()
            .filter(|e| e.student_id == student_id && e.section_id == section_id)
            .map(|e| (e.changed_at.as_str(), e.is_active)),
    )
    .unwrap_or(true)
}

/// The single boolean that gates attendance totals, roster counts and
/// selection lists: global AND per-section.
pub fn effective_status(
    global: &[StudentStatusEvent],
    per_section: &[SectionStatusEvent],
    student_id: &str,
    section_id: &str,
) -> bool {
    student_active(global, student_id) && section_student_active(per_section, student_id, section_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStatus {
    Enrolled,
    Withdrawn,
    NotEnrolled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Withdrawn => "withdrawn",
            EnrollmentStatus::NotEnrolled => "not_enrolled",
        }
    }
}

/// Re-derived from raw enrollments and section date windows on every call;
/// there is no cached current-status field anywhere.
pub fn enrollment_status(
    enrollments: &[Enrollment],
    sections: &[Section],
    global: &[StudentStatusEvent],
    per_section: &[SectionStatusEvent],
    student_id: &str,
    today: NaiveDate,
) -> EnrollmentStatus {
    let ongoing: Vec<&Enrollment> = enrollments
        .iter()
        .filter(|e| e.student_id == student_id)
        .filter(|e| {
            sections
                .iter()
                .find(|s| s.id == e.section_id)
                .map(|s| s.is_ongoing(today))
                .unwrap_or(false)
        })
        .collect();

    if ongoing.is_empty() {
        return EnrollmentStatus::NotEnrolled;
    }
    let any_withdrawn = ongoing
        .iter()
        .any(|e| !effective_status(global, per_section, student_id, &e.section_id));
    if any_withdrawn {
        EnrollmentStatus::Withdrawn
    } else {
        EnrollmentStatus::Enrolled
    }
}
