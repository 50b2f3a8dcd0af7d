use crate::engine::status;
use crate::model::{AttendanceRecord, SectionStatusEvent, StudentStatusEvent};
use serde::Serialize;

/// Present/total counts over a section's attendance entries, restricted to
/// students whose effective status currently resolves active. Withdrawn
/// students' raw rows are retained in storage but never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub present: usize,
    pub total: usize,
    pub percentage: u32,
}

/// Round-half-up percentage; empty denominator is 0, not NaN.
fn percentage(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((present as f64 / total as f64) * 100.0).round() as u32
}

/// Aggregate the given rows for one section. Dashboards, course cards and
/// per-student views all go through this one function. Never mutates the
/// rows; aggregating twice over unchanged input yields identical output.
pub fn stats(
    attendance: &[AttendanceRecord],
    section_id: &str,
    global: &[StudentStatusEvent],
    section_history: &[SectionStatusEvent],
) -> AttendanceStats {
    let mut present = 0;
    let mut total = 0;
    for row in attendance.iter().filter(|r| r.section_id == section_id) {
        for entry in &row.records {
            if !status::effective_status(global, section_history, &entry.student_id, section_id) {
                continue;
            }
            total += 1;
            if entry.present {
                present += 1;
            }
        }
    }
    AttendanceStats {
        present,
        total,
        percentage: percentage(present, total),
    }
}
