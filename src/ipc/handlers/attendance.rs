use crate::engine::{stats, status};
use crate::ipc::helpers::{
    get_opt_str, get_required_bool, get_required_str, parse_object, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceEntry, AttendanceRecord};
use crate::store::{names, CollectionStore, Snapshot, SqliteStore};
use serde_json::json;
use uuid::Uuid;

fn attendance_list(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_opt_str(params, "sectionId");
    let attendance: Vec<AttendanceRecord> = store.load(names::ATTENDANCE)?;
    let rows: Vec<&AttendanceRecord> = attendance
        .iter()
        .filter(|r| section_id.as_deref().map(|s| r.section_id == s).unwrap_or(true))
        .collect();
    Ok(json!({ "attendance": rows }))
}

/// One date's sheet for a section: the effective-active roster with each
/// student's mark (or null when unmarked). Withdrawn students do not
/// appear even when the raw row still records them.
fn attendance_open(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let date = get_required_str(params, "date")?;
    let snapshot = Snapshot::load(store)?;

    let row = snapshot
        .attendance
        .iter()
        .find(|r| r.section_id == section_id && r.date == date);

    let mut students = Vec::new();
    for enrollment in snapshot
        .enrollments
        .iter()
        .filter(|e| e.section_id == section_id)
    {
        if !status::effective_status(
            &snapshot.student_status_history,
            &snapshot.section_student_status_history,
            &enrollment.student_id,
            &section_id,
        ) {
            continue;
        }
        let name = snapshot
            .students
            .iter()
            .find(|s| s.id == enrollment.student_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let present = row.and_then(|r| {
            r.records
                .iter()
                .find(|e| e.student_id == enrollment.student_id)
                .map(|e| e.present)
        });
        students.push(json!({
            "studentId": enrollment.student_id,
            "name": name,
            "present": present,
        }));
    }

    Ok(json!({
        "sectionId": section_id,
        "date": date,
        "recordId": row.map(|r| r.id.clone()),
        "students": students,
    }))
}

/// Mark one student for one date. The row is created lazily on the first
/// mark; marking again overwrites the entry.
fn attendance_mark(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let date = get_required_str(params, "date")?;
    let student_id = get_required_str(params, "studentId")?;
    let present = get_required_bool(params, "present")?;

    let mut attendance: Vec<AttendanceRecord> = store.load(names::ATTENDANCE)?;
    let idx = match attendance
        .iter()
        .position(|r| r.section_id == section_id && r.date == date)
    {
        Some(i) => i,
        None => {
            attendance.push(AttendanceRecord {
                id: Uuid::new_v4().to_string(),
                section_id: section_id.clone(),
                date: date.clone(),
                records: Vec::new(),
            });
            attendance.len() - 1
        }
    };
    let row = &mut attendance[idx];
    match row.records.iter().position(|e| e.student_id == student_id) {
        Some(i) => row.records[i].present = present,
        None => row.records.push(AttendanceEntry {
            student_id: student_id.clone(),
            present,
        }),
    }
    let saved = attendance[idx].clone();
    store.save(names::ATTENDANCE, &attendance)?;
    Ok(json!({ "record": saved }))
}

/// Upsert a whole row: by id when the id matches, otherwise by the
/// (sectionId, date) pair so a section never gets two rows for one date.
fn attendance_save(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let mut record: AttendanceRecord = parse_object(params, "record")?;
    if record.id.trim().is_empty() {
        record.id = Uuid::new_v4().to_string();
    }
    let mut attendance: Vec<AttendanceRecord> = store.load(names::ATTENDANCE)?;
    let idx = attendance
        .iter()
        .position(|r| r.id == record.id)
        .or_else(|| {
            attendance
                .iter()
                .position(|r| r.section_id == record.section_id && r.date == record.date)
        });
    match idx {
        Some(i) => {
            // Keep the stored id when matching on (sectionId, date).
            record.id = attendance[i].id.clone();
            attendance[i] = record.clone();
        }
        None => attendance.push(record.clone()),
    }
    store.save(names::ATTENDANCE, &attendance)?;
    Ok(json!({ "record": record }))
}

fn attendance_stats(store: &SqliteStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let snapshot = Snapshot::load(store)?;
    let result = stats::stats(
        &snapshot.attendance,
        &section_id,
        &snapshot.student_status_history,
        &snapshot.section_student_status_history,
    );
    Ok(json!({ "stats": result }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.list" => Some(respond(state, req, attendance_list)),
        "attendance.open" => Some(respond(state, req, attendance_open)),
        "attendance.mark" => Some(respond(state, req, attendance_mark)),
        "attendance.save" => Some(respond(state, req, attendance_save)),
        "attendance.stats" => Some(respond(state, req, attendance_stats)),
        _ => None,
    }
}
