use crate::model::Day;
use thiserror::Error;

/// Engine-level failures surfaced to the UI. Messages are shown inline, so
/// they carry the names a user needs to act on the conflict.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("student already has an active enrollment for this course in {section_name}")]
    DuplicateActiveEnrollment { section_name: String },

    #[error("schedule conflict with {section_name} on {day} {start}-{end}")]
    ScheduleConflict {
        section_name: String,
        day: Day,
        start: String,
        end: String,
    },

    #[error("section not found: {0}")]
    SectionNotFound(String),
}

impl EngineError {
    /// Wire error code for the IPC envelope.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::DuplicateActiveEnrollment { .. } => "duplicate_enrollment",
            EngineError::ScheduleConflict { .. } => "schedule_conflict",
            EngineError::SectionNotFound(_) => "not_found",
        }
    }
}
