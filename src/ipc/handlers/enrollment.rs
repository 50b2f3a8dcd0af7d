use crate::engine::enroll::{self, TransferAssignment};
use crate::engine::error::EngineError;
use crate::engine::staging;
use crate::ipc::helpers::{
    as_of_date, get_opt_str, get_required_str, now_stamp, parse_object, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, Enrollment, Section};
use crate::store::{names, CollectionStore, SqliteStore};
use serde_json::json;

fn enrollment_list(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_opt_str(params, "studentId");
    let section_id = get_opt_str(params, "sectionId");
    let enrollments: Vec<Enrollment> = store.load(names::ENROLLMENTS)?;
    let rows: Vec<&Enrollment> = enrollments
        .iter()
        .filter(|e| student_id.as_deref().map(|s| e.student_id == s).unwrap_or(true))
        .filter(|e| section_id.as_deref().map(|s| e.section_id == s).unwrap_or(true))
        .collect();
    Ok(json!({ "enrollments": rows }))
}

fn enrollment_enroll(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let section_id = get_required_str(params, "sectionId")?;
    let today = as_of_date(params)?;

    let sections: Vec<Section> = store.load(names::SECTIONS)?;
    let Some(section) = sections.iter().find(|s| s.id == section_id) else {
        return Err(EngineError::SectionNotFound(section_id).into());
    };
    let course_id = get_opt_str(params, "courseId").unwrap_or_else(|| section.course_id.clone());

    let mut enrollments: Vec<Enrollment> = store.load(names::ENROLLMENTS)?;
    let row = enroll::enroll(
        &mut enrollments,
        &sections,
        &student_id,
        &section_id,
        &course_id,
        today,
        &now_stamp(),
    )?;
    store.save(names::ENROLLMENTS, &enrollments)?;
    tracing::debug!(student = %student_id, section = %section_id, "enrolled");
    Ok(json!({ "enrollment": row }))
}

fn enrollment_unenroll(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let student_id = get_required_str(params, "studentId")?;
    let mut enrollments: Vec<Enrollment> = store.load(names::ENROLLMENTS)?;
    let removed = enroll::unenroll(&mut enrollments, &section_id, &student_id);
    if removed > 0 {
        store.save(names::ENROLLMENTS, &enrollments)?;
    }
    Ok(json!({ "removed": removed }))
}

struct PlannedTransfer {
    plan: enroll::TransferPlan,
    enrollments_dirty: bool,
    attendance_dirty: bool,
}

fn plan_from_params(
    store: &SqliteStore,
    params: &serde_json::Value,
) -> Result<PlannedTransfer, HandlerErr> {
    let from_section_id = get_required_str(params, "fromSectionId")?;
    let assignments: Vec<TransferAssignment> = parse_object(params, "assignments")?;
    let enrollments: Vec<Enrollment> = store.load(names::ENROLLMENTS)?;
    let attendance: Vec<AttendanceRecord> = store.load(names::ATTENDANCE)?;
    let plan = enroll::plan_transfers(
        &enrollments,
        &attendance,
        &from_section_id,
        &assignments,
        &now_stamp(),
    );
    let enrollments_dirty = staging::has_unsaved_changes(&plan.enrollments, &enrollments);
    let attendance_dirty = staging::has_unsaved_changes(&plan.attendance, &attendance);
    Ok(PlannedTransfer {
        plan,
        enrollments_dirty,
        attendance_dirty,
    })
}

fn plan_counts(planned: &PlannedTransfer) -> serde_json::Value {
    json!({
        "transferredStudents": planned.plan.transferred_students,
        "movedEntries": planned.plan.moved_entries,
        "mergedRows": planned.plan.merged_rows,
        "createdRows": planned.plan.created_rows,
        "skippedEntries": planned.plan.skipped_entries,
        "hasChanges": planned.enrollments_dirty || planned.attendance_dirty,
    })
}

/// Dry run: what the staged transfers would do, without writing. The
/// `hasChanges` flag drives the caller's unsaved-changes confirmation.
fn transfer_preview(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let planned = plan_from_params(store, params)?;
    Ok(plan_counts(&planned))
}

/// Commit the staged transfers. The two collection writes are sequential;
/// there is no cross-collection transaction.
fn transfer_apply(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let planned = plan_from_params(store, params)?;
    if planned.enrollments_dirty {
        store.save(names::ENROLLMENTS, &planned.plan.enrollments)?;
    }
    if planned.attendance_dirty {
        store.save(names::ATTENDANCE, &planned.plan.attendance)?;
    }
    tracing::debug!(
        students = planned.plan.transferred_students,
        moved = planned.plan.moved_entries,
        "transfer applied"
    );
    Ok(plan_counts(&planned))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "enrollment.list" => Some(respond(state, req, enrollment_list)),
        "enrollment.enroll" => Some(respond(state, req, enrollment_enroll)),
        "enrollment.unenroll" => Some(respond(state, req, enrollment_unenroll)),
        "enrollment.transfer.preview" => Some(respond(state, req, transfer_preview)),
        "enrollment.transfer.apply" => Some(respond(state, req, transfer_apply)),
        _ => None,
    }
}
