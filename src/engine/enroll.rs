use crate::engine::error::EngineError;
use crate::engine::status;
use crate::model::{
    AttendanceRecord, Enrollment, Section, SectionStatusEvent, StudentStatusEvent,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

fn section_by_id<'a>(sections: &'a [Section], id: &str) -> Option<&'a Section> {
    sections.iter().find(|s| s.id == id)
}

/// Enrollments for (student, course) referencing a finished section are
/// stale; drop them so they never accumulate. Rows whose section no longer
/// exists are kept (a deleted section has no end date to judge by).
fn prune_finished(
    enrollments: &mut Vec<Enrollment>,
    sections: &[Section],
    student_id: &str,
    course_id: &str,
    today: NaiveDate,
) -> usize {
    let before = enrollments.len();
    enrollments.retain(|e| {
        if e.student_id != student_id || e.course_id != course_id {
            return true;
        }
        match section_by_id(sections, &e.section_id) {
            Some(section) => !section.is_finished(today),
            None => true,
        }
    });
    before - enrollments.len()
}

/// Enroll a student into a section. At most one non-finished enrollment may
/// exist per (student, course); finished rows for the course are pruned
/// first, then any survivor fails the call. The new row always gets a
/// fresh id.
pub fn enroll(
    enrollments: &mut Vec<Enrollment>,
    sections: &[Section],
    student_id: &str,
    section_id: &str,
    course_id: &str,
    today: NaiveDate,
    enrolled_at: &str,
) -> Result<Enrollment, EngineError> {
    prune_finished(enrollments, sections, student_id, course_id, today);

    if let Some(existing) = enrollments
        .iter()
        .find(|e| e.student_id == student_id && e.course_id == course_id)
    {
        let section_name = section_by_id(sections, &existing.section_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| existing.section_id.clone());
        return Err(EngineError::DuplicateActiveEnrollment { section_name });
    }

    let row = Enrollment {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        section_id: section_id.to_string(),
        course_id: course_id.to_string(),
        enrolled_at: enrolled_at.to_string(),
    };
    enrollments.push(row.clone());
    Ok(row)
}

/// Remove every enrollment row matching the pair. Removing nothing is a
/// no-op, not an error.
pub fn unenroll(enrollments: &mut Vec<Enrollment>, section_id: &str, student_id: &str) -> usize {
    let before = enrollments.len();
    enrollments.retain(|e| !(e.section_id == section_id && e.student_id == student_id));
    before - enrollments.len()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAssignment {
    pub student_id: String,
    pub to_section_id: String,
}

/// Result of planning a set of section transfers: the full replacement
/// Enrollment and Attendance collections plus what happened, computed
/// without touching storage. Callers decide when to apply it.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub enrollments: Vec<Enrollment>,
    pub attendance: Vec<AttendanceRecord>,
    pub transferred_students: usize,
    pub moved_entries: usize,
    pub merged_rows: usize,
    pub created_rows: usize,
    pub skipped_entries: usize,
}

/// Plan moving students out of `from_section_id` into their assigned
/// destinations. Per student: source enrollments are dropped and replaced
/// by one fresh row (same courseId, new id), and each dated attendance
/// entry moves to the destination's row for that date - merging into an
/// existing row, creating one if absent, and skipping (never duplicating)
/// when the destination already records the student for that date.
pub fn plan_transfers(
    enrollments: &[Enrollment],
    attendance: &[AttendanceRecord],
    from_section_id: &str,
    assignments: &[TransferAssignment],
    enrolled_at: &str,
) -> TransferPlan {
    let mut new_enrollments = enrollments.to_vec();
    let mut new_attendance = attendance.to_vec();
    let mut transferred_students = 0;
    let mut moved_entries = 0;
    let mut merged_rows = 0;
    let mut created_rows = 0;
    let mut skipped_entries = 0;

    for assignment in assignments {
        let student_id = assignment.student_id.as_str();
        let to_section_id = assignment.to_section_id.as_str();

        let course_id = new_enrollments
            .iter()
            .find(|e| e.section_id == from_section_id && e.student_id == student_id)
            .map(|e| e.course_id.clone());

        if let Some(course_id) = course_id {
            unenroll(&mut new_enrollments, from_section_id, student_id);
            let already_there = new_enrollments
                .iter()
                .any(|e| e.section_id == to_section_id && e.student_id == student_id);
            if !already_there {
                new_enrollments.push(Enrollment {
                    id: Uuid::new_v4().to_string(),
                    student_id: student_id.to_string(),
                    section_id: to_section_id.to_string(),
                    course_id,
                    enrolled_at: enrolled_at.to_string(),
                });
            }
            transferred_students += 1;
        }

        // Walk the source section's dated rows and carry this student's
        // entries across. Source rows are kept even when their records
        // empty out; raw history is never discarded.
        let dates: Vec<String> = new_attendance
            .iter()
            .filter(|row| {
                row.section_id == from_section_id
                    && row.records.iter().any(|r| r.student_id == student_id)
            })
            .map(|row| row.date.clone())
            .collect();

        for date in dates {
            let Some(source) = new_attendance
                .iter_mut()
                .find(|row| row.section_id == from_section_id && row.date == date)
            else {
                continue;
            };
            let Some(entry_idx) = source
                .records
                .iter()
                .position(|r| r.student_id == student_id)
            else {
                continue;
            };
            let entry = source.records.remove(entry_idx);
            moved_entries += 1;

            let dest_idx = new_attendance
                .iter()
                .position(|row| row.section_id == to_section_id && row.date == date);
            match dest_idx {
                Some(i) => {
                    let dest = &mut new_attendance[i];
                    if dest.records.iter().any(|r| r.student_id == student_id) {
                        skipped_entries += 1;
                    } else {
                        dest.records.push(entry);
                        merged_rows += 1;
                    }
                }
                None => {
                    new_attendance.push(AttendanceRecord {
                        id: Uuid::new_v4().to_string(),
                        section_id: to_section_id.to_string(),
                        date,
                        records: vec![entry],
                    });
                    created_rows += 1;
                }
            }
        }
    }

    TransferPlan {
        enrollments: new_enrollments,
        attendance: new_attendance,
        transferred_students,
        moved_entries,
        merged_rows,
        created_rows,
        skipped_entries,
    }
}

/// Append one global status event per student, all stamped with the same
/// batch timestamp. Section-level history is untouched.
pub fn bulk_status_change(
    history: &mut Vec<StudentStatusEvent>,
    student_ids: &[String],
    target_active: bool,
    changed_at: &str,
) -> usize {
    for student_id in student_ids {
        history.push(StudentStatusEvent {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.clone(),
            is_active: target_active,
            changed_at: changed_at.to_string(),
        });
    }
    student_ids.len()
}

/// Append one per-section status event. Callers follow up with
/// `sync_global_status_from_sections`.
pub fn section_status_change(
    history: &mut Vec<SectionStatusEvent>,
    student_id: &str,
    section_id: &str,
    target_active: bool,
    changed_at: &str,
) -> SectionStatusEvent {
    let event = SectionStatusEvent {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        section_id: section_id.to_string(),
        is_active: target_active,
        changed_at: changed_at.to_string(),
    };
    history.push(event.clone());
    event
}

/// Reconcile global status with the per-section picture, looking only at
/// enrollments into ongoing sections: uniformly inactive there while
/// globally active appends a global withdrawal; any section active again
/// while globally inactive appends a global reactivation. Ended sections
/// never influence global status.
pub fn sync_global_status_from_sections(
    global: &mut Vec<StudentStatusEvent>,
    section_history: &[SectionStatusEvent],
    enrollments: &[Enrollment],
    sections: &[Section],
    student_id: &str,
    today: NaiveDate,
    changed_at: &str,
) -> Option<StudentStatusEvent> {
    let ongoing_section_ids: Vec<&str> = enrollments
        .iter()
        .filter(|e| e.student_id == student_id)
        .filter_map(|e| section_by_id(sections, &e.section_id))
        .filter(|s| s.is_ongoing(today))
        .map(|s| s.id.as_str())
        .collect();

    if ongoing_section_ids.is_empty() {
        return None;
    }

    let any_section_active = ongoing_section_ids
        .iter()
        .any(|sec| status::section_student_active(section_history, student_id, sec));
    let globally_active = status::student_active(global, student_id);

    let target = if !any_section_active && globally_active {
        false
    } else if any_section_active && !globally_active {
        true
    } else {
        return None;
    };

    let event = StudentStatusEvent {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        is_active: target,
        changed_at: changed_at.to_string(),
    };
    global.push(event.clone());
    Some(event)
}
